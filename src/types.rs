//! Type mapping between Oracle native types and canonical labels
//!
//! Also decides the column types used when a seed (CSV) is loaded into a
//! new table.

use serde::{Deserialize, Serialize};

/// Smallest VARCHAR2 width given to a text seed column.
pub const MIN_TEXT_WIDTH: usize = 16;
/// Width used when a text seed column has no values at all.
pub const EMPTY_TEXT_WIDTH: usize = 64;

/// Canonical type labels shared with the host framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalType {
    String,
    Integer,
    Numeric,
    Float,
    Timestamp,
    Date,
    Boolean,
    Binary,
    Other,
}

impl CanonicalType {
    /// Classifies an Oracle native type. `NUMBER` with scale 0 is an integer.
    pub fn from_oracle(dtype: &str, precision: Option<u32>, scale: Option<i32>) -> Self {
        let upper = dtype.trim().to_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();
        match base {
            "CHAR" | "NCHAR" | "VARCHAR" | "VARCHAR2" | "NVARCHAR2" | "CLOB" | "NCLOB" | "LONG" => CanonicalType::String,
            "INTEGER" | "INT" | "SMALLINT" => CanonicalType::Integer,
            "NUMBER" if scale == Some(0) && precision.is_some() => CanonicalType::Integer,
            "NUMBER" | "NUMERIC" | "DECIMAL" => CanonicalType::Numeric,
            "FLOAT" | "BINARY_FLOAT" | "BINARY_DOUBLE" | "REAL" | "DOUBLE PRECISION" => CanonicalType::Float,
            "DATE" => CanonicalType::Date,
            "BOOLEAN" => CanonicalType::Boolean,
            "RAW" | "LONG RAW" | "BLOB" | "BFILE" => CanonicalType::Binary,
            b if b.starts_with("TIMESTAMP") => CanonicalType::Timestamp,
            _ => CanonicalType::Other,
        }
    }

    /// The Oracle type used when a canonical label has to become DDL.
    pub fn to_oracle(self) -> &'static str {
        match self {
            CanonicalType::String => "VARCHAR2(4000)",
            CanonicalType::Integer => "INTEGER",
            CanonicalType::Numeric => "NUMBER",
            CanonicalType::Float => "FLOAT",
            CanonicalType::Timestamp => "TIMESTAMP",
            CanonicalType::Date => "DATE",
            CanonicalType::Boolean => "NUMBER(1)",
            CanonicalType::Binary => "BLOB",
            CanonicalType::Other => "VARCHAR2(4000)",
        }
    }
}

/// What a seed loader inferred for one CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedType {
    Text,
    Number,
    Boolean,
    Date,
    DateTime,
    Time,
}

/// `varchar2(n)` wide enough for the longest value, in UTF-8 bytes.
pub fn convert_text_type<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> String {
    let longest = values.into_iter().flatten().map(str::len).max();
    let width = match longest {
        Some(len) => len.max(MIN_TEXT_WIDTH),
        None => EMPTY_TEXT_WIDTH,
    };
    format!("varchar2({})", width)
}

pub fn convert_type<'a>(seed_type: SeedType, values: impl IntoIterator<Item = Option<&'a str>>) -> String {
    match seed_type {
        SeedType::Text => convert_text_type(values),
        SeedType::Number => "number".to_string(),
        SeedType::Boolean => "number(1)".to_string(),
        SeedType::Date | SeedType::DateTime | SeedType::Time => "timestamp".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_width_rules() {
        assert_eq!(convert_text_type([Some("a"), Some("abc")]), "varchar2(16)");
        let long = "x".repeat(40);
        assert_eq!(convert_text_type([Some(long.as_str()), None]), "varchar2(40)");
        assert_eq!(convert_text_type(Vec::<Option<&str>>::new()), "varchar2(64)");
        assert_eq!(convert_text_type([None, None]), "varchar2(64)");
        // byte length, not character count
        let accented = "é".repeat(17);
        assert_eq!(convert_text_type([Some(accented.as_str())]), "varchar2(34)");
    }

    #[test]
    fn other_seed_types() {
        assert_eq!(convert_type(SeedType::Boolean, [Some("true")]), "number(1)");
        assert_eq!(convert_type(SeedType::DateTime, [Some("2024-01-01 00:00:00")]), "timestamp");
        assert_eq!(convert_type(SeedType::Number, [Some("1.5")]), "number");
    }

    #[test]
    fn oracle_to_canonical() {
        assert_eq!(CanonicalType::from_oracle("VARCHAR2", None, None), CanonicalType::String);
        assert_eq!(CanonicalType::from_oracle("NUMBER", Some(10), Some(0)), CanonicalType::Integer);
        assert_eq!(CanonicalType::from_oracle("NUMBER", None, None), CanonicalType::Numeric);
        assert_eq!(CanonicalType::from_oracle("TIMESTAMP(6) WITH TIME ZONE", None, None), CanonicalType::Timestamp);
        assert_eq!(CanonicalType::from_oracle("XMLTYPE", None, None), CanonicalType::Other);
        assert_eq!(CanonicalType::Boolean.to_oracle(), "NUMBER(1)");
    }
}
