//! Identifier validation and quoting for Oracle SQL

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Oracle SQL reserved words plus the PL/SQL and SQL*Plus keywords that
/// break unquoted column names in generated DDL.
pub const KEYWORDS: &[&str] = &[
    "ACCESS", "ACCOUNT", "ACTIVATE", "ADD", "ADMIN", "ADVISE", "AFTER", "ALL", "ALL_ROWS",
    "ALLOCATE", "ALTER", "ANALYZE", "AND", "ANY", "ARCHIVE", "ARCHIVELOG", "ARRAY", "AS", "ASC",
    "AT", "AUDIT", "AUTHENTICATED", "AUTHORIZATION", "AUTOEXTEND", "AUTOMATIC", "BACKUP", "BECOME",
    "BEFORE", "BEGIN", "BETWEEN", "BFILE", "BITMAP", "BLOB", "BLOCK", "BODY", "BY", "CACHE",
    "CACHE_INSTANCES", "CANCEL", "CASCADE", "CASE", "CAST", "CFILE", "CHAINED", "CHANGE", "CHAR",
    "CHAR_CS", "CHARACTER", "CHECK", "CHECKPOINT", "CHOOSE", "CHUNK", "CLEAR", "CLOB", "CLONE",
    "CLOSE", "CLOSE_CACHED_OPEN_CURSORS", "CLUSTER", "CLUSTERS", "COALESCE", "COLAUTH", "COLUMN",
    "COLUMN_VALUE", "COLUMNS", "COMMENT", "COMMIT", "COMMITTED", "COMPATIBILITY", "COMPILE",
    "COMPLETE", "COMPOSITE_LIMIT", "COMPRESS", "COMPUTE", "CONNECT", "CONNECT_TIME", "CONSTRAINT",
    "CONSTRAINTS", "CONTENTS", "CONTINUE", "CONTROLFILE", "CONVERT", "COST", "CPU_PER_CALL",
    "CPU_PER_SESSION", "CRASH", "CREATE", "CURRENT", "CURRENT_SCHEMA", "CURREN_USER", "CURSOR",
    "CYCLE", "DANGLING", "DATABASE", "DATAFILE", "DATAFILES", "DATAOBJNO", "DATE", "DBA", "DBHIGH",
    "DBLOW", "DBMAC", "DEALLOCATE", "DEBUG", "DEC", "DECIMAL", "DECLARE", "DEFAULT", "DEFERRABLE",
    "DEFERRED", "DEGREE", "DELETE", "DEREF", "DESC", "DIRECTORY", "DISABLE", "DISCONNECT",
    "DISMOUNT", "DISTINCT", "DISTRIBUTED", "DML", "DOUBLE", "DROP", "DUMP", "EACH", "ELSE",
    "ENABLE", "END", "ENFORCE", "ENTRY", "ESCAPE", "EXCEPT", "EXCEPTION", "EXCEPTIONS", "EXCHANGE",
    "EXCLUDING", "EXCLUSIVE", "EXECUTE", "EXISTS", "EXPIRE", "EXPLAIN", "EXTENT", "EXTENTS",
    "EXTERNALLY", "FAILED_LOGIN_ATTEMPTS", "FALSE", "FAST", "FETCH", "FILE", "FIRST_ROWS",
    "FLAGGER", "FLOAT", "FLOB", "FLUSH", "FOR", "FORCE", "FOREIGN", "FREELIST", "FREELISTS", "FROM",
    "FULL", "FUNCTION", "GLOBAL", "GLOBAL_NAME", "GLOBALLY", "GOTO", "GRANT", "GROUP", "GROUPS",
    "HASH", "HASHKEYS", "HAVING", "HEADER", "HEAP", "IDENTIFIED", "IDGENERATORS", "IDLE_TIME", "IF",
    "IMMEDIATE", "IN", "INCLUDING", "INCREMENT", "IND_PARTITION", "INDEX", "INDEXED", "INDEXES",
    "INDICATOR", "INITIAL", "INITIALLY", "INITRANS", "INSERT", "INSTANCE", "INSTANCES", "INSTEAD",
    "INT", "INTEGER", "INTERMEDIATE", "INTERSECT", "INTO", "IS", "ISOLATION", "ISOLATION_LEVEL",
    "KEEP", "KEY", "KILL", "LABEL", "LAYER", "LESS", "LEVEL", "LIBRARY", "LIKE", "LIMIT", "LINK",
    "LIST", "LOB", "LOCAL", "LOCK", "LOCKED", "LOG", "LOGFILE", "LOGGING", "LOGICAL_READS_PER_CALL",
    "LOGICAL_READS_PER_SESSION", "LONG", "LOOP", "MANAGE", "MASTER", "MAX", "MAXARCHLOGS",
    "MAXDATAFILES", "MAXEXTENTS", "MAXINSTANCES", "MAXLOGFILES", "MAXLOGHISTORY", "MAXLOGMEMBERS",
    "MAXSIZE", "MAXTRANS", "MAXVALUE", "MEMBER", "MIN", "MINEXTENTS", "MINIMUM", "MINUS",
    "MINVALUE", "MLS_LABEL_FORMAT", "MLSLABEL", "MODE", "MODIFY", "MOUNT", "MOVE", "MTS_DISPATCHERS",
    "MULTISET", "NATIONAL", "NCHAR", "NCHAR_CS", "NCLOB", "NEEDED", "NESTED", "NESTED_TABLE_ID",
    "NETWORK", "NEVER", "NEW", "NEXT", "NLS_CALENDAR", "NLS_CHARACTERSET", "NLS_COMP",
    "NLS_CURRENCY", "NLS_DATE_FORMAT", "NLS_DATE_LANGUAGE", "NLS_ISO_CURRENCY", "NLS_LANG",
    "NLS_LANGUAGE", "NLS_NUMERIC_CHARACTERS", "NLS_SORT", "NLS_SPECIAL_CHARS", "NLS_TERRITORY",
    "NO", "NOARCHIVELOG", "NOAUDIT", "NOCACHE", "NOCOMPRESS", "NOCYCLE", "NOFORCE", "NOLOGGING",
    "NOMAXVALUE", "NOMINVALUE", "NONE", "NOORDER", "NOOVERRIDE", "NOPARALLEL", "NORESETLOGS",
    "NOREVERSE", "NORMAL", "NOSORT", "NOT", "NOTHING", "NOWAIT", "NULL", "NUMBER", "NUMERIC",
    "NVARCHAR2", "OBJECT", "OBJNO", "OBJNO_REUSE", "OF", "OFF", "OFFLINE", "OID", "OIDINDEX", "OLD",
    "ON", "ONLINE", "ONLY", "OPCODE", "OPEN", "OPTIMAL", "OPTIMIZER_GOAL", "OPTION", "OR", "ORDER",
    "ORGANIZATION", "OSLABEL", "OVERFLOW", "OVERLAPS", "OWN", "PACKAGE", "PARALLEL", "PARTITION",
    "PASSWORD", "PASSWORD_GRACE_TIME", "PASSWORD_LIFE_TIME", "PASSWORD_LOCK_TIME",
    "PASSWORD_REUSE_MAX", "PASSWORD_REUSE_TIME", "PASSWORD_VERIFY_FUNCTION", "PCTFREE",
    "PCTINCREASE", "PCTTHRESHOLD", "PCTUSED", "PCTVERSION", "PERCENT", "PERMANENT", "PLAN",
    "PLSQL_DEBUG", "POST_TRANSACTION", "PRECISION", "PRESERVE", "PRIMARY", "PRIOR", "PRIVATE",
    "PRIVATE_SGA", "PRIVILEGE", "PRIVILEGES", "PROCEDURE", "PROFILE", "PUBLIC", "PURGE", "QUEUE",
    "QUOTA", "RANGE", "RAW", "RBA", "READ", "READUP", "REAL", "REBUILD", "RECOVER", "RECOVERABLE",
    "RECOVERY", "REF", "REFERENCES", "REFERENCING", "REFRESH", "RENAME", "REPLACE", "RESET",
    "RESETLOGS", "RESIZE", "RESOURCE", "RESTRICTED", "RETURN", "RETURNING", "REUSE", "REVERSE",
    "REVOKE", "ROLE", "ROLES", "ROLLBACK", "ROW", "ROWID", "ROWNUM", "ROWS", "RULE", "SAMPLE",
    "SAVEPOINT", "SB4", "SCAN_INSTANCES", "SCHEMA", "SCN", "SCOPE", "SD_ALL", "SD_INHIBIT",
    "SD_SHOW", "SEG_BLOCK", "SEG_FILE", "SEGMENT", "SELECT", "SEQUENCE", "SERIALIZABLE", "SESSION",
    "SESSION_CACHED_CURSORS", "SESSIONS_PER_USER", "SET", "SHARE", "SHARED", "SHARED_POOL",
    "SHRINK", "SIZE", "SKIP", "SKIP_UNUSABLE_INDEXES", "SMALLINT", "SNAPSHOT", "SOME", "SORT",
    "SPECIFICATION", "SPLIT", "SQL", "SQL_TRACE", "SQLBUF", "SQLCODE", "SQLERROR", "SQLSTATE",
    "STANDBY", "START", "STATEMENT_ID", "STATISTICS", "STOP", "STORAGE", "STORE", "STRUCTURE",
    "SUBTYPE", "SUCCESSFUL", "SWITCH", "SYNONYM", "SYS_OP_ENFORCE_NOT_NULL$", "SYS_OP_NTCIMG$",
    "SYSDATE", "SYSDBA", "SYSOPER", "SYSTEM", "TABAUTH", "TABLE", "TABLES", "TABLESPACE",
    "TABLESPACE_NO", "TABNO", "TEMPORARY", "THAN", "THE", "THEN", "THREAD", "TIME", "TIMESTAMP",
    "TO", "TOPLEVEL", "TRACE", "TRACING", "TRANSACTION", "TRANSITIONAL", "TRIGGER", "TRIGGERS",
    "TRUE", "TRUNCATE", "TX", "TYPE", "UB2", "UBA", "UID", "UNARCHIVED", "UNDO", "UNION", "UNIQUE",
    "UNLIMITED", "UNLOCK", "UNRECOVERABLE", "UNTIL", "UNUSABLE", "UNUSED", "UPDATABLE", "UPDATE",
    "USAGE", "USE", "USER", "USING", "VALIDATE", "VALIDATION", "VALUE", "VALUES", "VARCHAR",
    "VARCHAR2", "VARYING", "VIEW", "VIEWS", "WHEN", "WHENEVER", "WHERE", "WHILE", "WITH", "WITHOUT",
    "WORK", "WRITE", "WRITEDOWN", "WRITEUP", "XID", "YEAR", "ZONE",
];

fn keyword_set() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| KEYWORDS.iter().copied().collect())
}

pub fn is_keyword(word: &str) -> bool {
    keyword_set().contains(word.to_uppercase().as_str())
}

/// Per-column settings declared on a model or seed. Only `quote` matters here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default)]
    pub quote: Option<bool>,
}

/// Column configs keyed by the name the user wrote (bare or already quoted).
pub type ColumnOverrides = BTreeMap<String, ColumnConfig>;

/// An unquoted Oracle identifier must start with a letter and continue with
/// letters, digits, `#`, `$` or `_`.
pub fn is_valid_identifier(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '#' | '$' | '_'))
}

pub fn should_quote(identifier: &str, reserved_keywords: &HashSet<&str>, user_override: bool) -> bool {
    user_override
        || reserved_keywords.contains(identifier.to_uppercase().as_str())
        || !is_valid_identifier(identifier)
}

/// Looks up the `quote` override for a column, by bare name first and then
/// by its quoted form.
pub fn column_quote_override(identifier: &str, overrides: Option<&ColumnOverrides>) -> bool {
    let Some(overrides) = overrides else {
        return false;
    };
    overrides
        .get(identifier)
        .or_else(|| overrides.get(&quote(identifier)))
        .and_then(|c| c.quote)
        .unwrap_or(false)
}

/// `should_quote` against the built-in keyword list and the model's column configs.
pub fn should_identifier_be_quoted(identifier: &str, overrides: Option<&ColumnOverrides>) -> bool {
    should_quote(identifier, keyword_set(), column_quote_override(identifier, overrides))
}

pub fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

pub fn check_and_quote_identifier(identifier: &str, overrides: Option<&ColumnOverrides>) -> String {
    if should_identifier_be_quoted(identifier, overrides) {
        quote(identifier)
    } else {
        identifier.to_string()
    }
}

/// Seed columns follow an explicit `quote` setting when one is given,
/// otherwise they are quoted only when they have to be.
pub fn quote_seed_column(column: &str, quote_config: Option<bool>) -> String {
    let quoted = match quote_config {
        Some(explicit) => explicit,
        None => should_identifier_be_quoted(column, None),
    };
    if quoted {
        quote(column)
    } else {
        column.to_string()
    }
}
