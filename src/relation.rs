//! Relation identity for Oracle
//!
//! Oracle has one namespace per database, so a relation is rendered as
//! `schema.identifier` and the database part is never included.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentName {
    Database,
    Schema,
    Identifier,
}

/// Per-part flags, used both for quoting and for inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub database: bool,
    pub schema: bool,
    pub identifier: bool,
}

impl Policy {
    pub const fn new(database: bool, schema: bool, identifier: bool) -> Self {
        Self { database, schema, identifier }
    }

    /// Nothing quoted.
    pub const fn quote_default() -> Self {
        Self::new(false, false, false)
    }

    /// Schema and identifier rendered, database never.
    pub const fn include_default() -> Self {
        Self::new(false, true, true)
    }

    pub fn get_part(&self, component: ComponentName) -> bool {
        match component {
            ComponentName::Database => self.database,
            ComponentName::Schema => self.schema,
            ComponentName::Identifier => self.identifier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Table,
    View,
    MaterializedView,
    Cte,
    External,
}

impl RelationType {
    /// Maps a catalog type string. Unknown types count as external.
    pub fn from_catalog(kind: &str) -> Self {
        match kind.trim().to_lowercase().replace(' ', "_").as_str() {
            "table" => RelationType::Table,
            "view" => RelationType::View,
            "materialized_view" | "materializedview" => RelationType::MaterializedView,
            "cte" => RelationType::Cte,
            _ => RelationType::External,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Table => "table",
            RelationType::View => "view",
            RelationType::MaterializedView => "materialized_view",
            RelationType::Cte => "cte",
            RelationType::External => "external",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRelation {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub identifier: Option<String>,
    #[serde(rename = "type")]
    pub relation_type: Option<RelationType>,
    pub quote_policy: Policy,
    pub include_policy: Policy,
}

/// Lookup keys used to match a relation in the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchKwargs {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub identifier: Option<String>,
}

pub const EPHEMERAL_PREFIX: &str = "dbt__cte__";

impl OracleRelation {
    pub fn create(database: Option<&str>, schema: Option<&str>, identifier: Option<&str>) -> Self {
        Self {
            database: database.map(str::to_string),
            schema: schema.map(str::to_string),
            identifier: identifier.map(str::to_string),
            relation_type: None,
            quote_policy: Policy::quote_default(),
            include_policy: Policy::include_default(),
        }
    }

    pub fn with_type(mut self, relation_type: RelationType) -> Self {
        self.relation_type = Some(relation_type);
        self
    }

    pub fn with_quote_policy(mut self, quote_policy: Policy) -> Self {
        self.quote_policy = quote_policy;
        self
    }

    pub fn with_include_policy(mut self, include_policy: Policy) -> Self {
        self.include_policy = include_policy;
        self
    }

    pub fn part(&self, component: ComponentName) -> Option<&str> {
        match component {
            ComponentName::Database => self.database.as_deref(),
            ComponentName::Schema => self.schema.as_deref(),
            ComponentName::Identifier => self.identifier.as_deref(),
        }
    }

    pub fn is_table(&self) -> bool {
        self.relation_type == Some(RelationType::Table)
    }

    pub fn is_view(&self) -> bool {
        self.relation_type == Some(RelationType::View)
    }

    pub fn is_materialized_view(&self) -> bool {
        self.relation_type == Some(RelationType::MaterializedView)
    }

    pub fn is_cte(&self) -> bool {
        self.relation_type == Some(RelationType::Cte)
    }

    pub fn render(&self) -> String {
        [ComponentName::Database, ComponentName::Schema, ComponentName::Identifier]
            .into_iter()
            .filter(|c| self.include_policy.get_part(*c))
            .filter_map(|c| {
                let value = self.part(c).filter(|v| !v.is_empty())?;
                Some(if self.quote_policy.get_part(c) {
                    format!("\"{}\"", value)
                } else {
                    value.to_string()
                })
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn add_ephemeral_prefix(name: &str) -> String {
        format!("{}{}__", EPHEMERAL_PREFIX, name)
    }

    /// Oracle folds unquoted names to upper case, so lookups do too.
    pub fn match_kwargs(
        database: Option<&str>,
        schema: Option<&str>,
        identifier: Option<&str>,
        quoting: &Policy,
    ) -> MatchKwargs {
        let fold = |value: Option<&str>, quoted: bool| {
            value.map(|v| if quoted { v.to_string() } else { v.to_uppercase() })
        };
        MatchKwargs {
            database: fold(database, quoting.database),
            schema: fold(schema, quoting.schema),
            identifier: fold(identifier, quoting.identifier),
        }
    }

    pub fn matches(&self, database: Option<&str>, schema: Option<&str>, identifier: Option<&str>) -> bool {
        let wanted = Self::match_kwargs(database, schema, identifier, &self.quote_policy);
        let mine = Self::match_kwargs(
            self.database.as_deref(),
            self.schema.as_deref(),
            self.identifier.as_deref(),
            &self.quote_policy,
        );
        let part_matches = |want: &Option<String>, have: &Option<String>| want.is_none() || want == have;
        part_matches(&wanted.database, &mine.database)
            && part_matches(&wanted.schema, &mine.schema)
            && part_matches(&wanted.identifier, &mine.identifier)
    }
}

impl fmt::Display for OracleRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('"').and_then(|x| x.strip_suffix('"')).unwrap_or(s)
}

/// Rejects a reference to any database other than the connected one. With
/// no known database there is nothing to check against.
pub fn verify_database(database: &str, expected: Option<&str>) -> Result<String> {
    let database = strip_quotes(database);
    let expected = expected.map(strip_quotes).unwrap_or_default();
    if !expected.is_empty() && !database.eq_ignore_ascii_case(expected) {
        return Err(AdapterError::CrossDatabaseReference {
            database: database.to_string(),
            expected: expected.to_string(),
        });
    }
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_schema_and_identifier_only() {
        let r = OracleRelation::create(Some("ORCLPDB"), Some("dbt_test"), Some("orders"));
        assert_eq!(r.render(), "dbt_test.orders");
        let quoted = r.with_quote_policy(Policy::new(false, false, true));
        assert_eq!(quoted.to_string(), "dbt_test.\"orders\"");
    }

    #[test]
    fn missing_parts_are_skipped() {
        let r = OracleRelation::create(None, None, Some("orders"));
        assert_eq!(r.render(), "orders");
    }

    #[test]
    fn ephemeral_prefix() {
        assert_eq!(OracleRelation::add_ephemeral_prefix("stg"), "dbt__cte__stg__");
    }

    #[test]
    fn match_kwargs_folds_unquoted_parts() {
        let kw = OracleRelation::match_kwargs(Some("db"), Some("dbt"), Some("MyTable"), &Policy::new(false, false, true));
        assert_eq!(kw.database.as_deref(), Some("DB"));
        assert_eq!(kw.schema.as_deref(), Some("DBT"));
        assert_eq!(kw.identifier.as_deref(), Some("MyTable"));
    }

    #[test]
    fn matches_case_insensitively_when_unquoted() {
        let r = OracleRelation::create(None, Some("DBT_TEST"), Some("ORDERS"));
        assert!(r.matches(None, Some("dbt_test"), Some("orders")));
        assert!(!r.matches(None, Some("dbt_test"), Some("customers")));
    }

    #[test]
    fn catalog_types() {
        assert_eq!(RelationType::from_catalog("MATERIALIZED VIEW"), RelationType::MaterializedView);
        assert_eq!(RelationType::from_catalog("table"), RelationType::Table);
        assert_eq!(RelationType::from_catalog("synonym"), RelationType::External);
    }

    #[test]
    fn verify_database_rules() {
        assert!(verify_database("\"ORCLPDB\"", Some("orclpdb")).is_ok());
        let err = verify_database("OTHERDB", Some("ORCLPDB")).unwrap_err();
        assert!(matches!(err, AdapterError::CrossDatabaseReference { .. }));
        assert!(verify_database("anything", None).is_ok());
    }
}
