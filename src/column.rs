//! Oracle column metadata and type rendering

use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, Result};
use crate::quoting;

/// Canonical type labels and the Oracle type each one becomes in DDL.
pub const TYPE_LABELS: &[(&str, &str)] = &[
    ("STRING", "VARCHAR2(4000)"),
    ("TIMESTAMP", "TIMESTAMP"),
    ("FLOAT", "FLOAT"),
    ("INTEGER", "INTEGER"),
];

const STRING_DATATYPES: &[&str] = &["char", "nchar", "varchar", "varchar2", "nvarchar2", "text", "character varying", "character"];
const NUMBER_DATATYPES: &[&str] = &["number", "float", "numeric", "decimal"];
const INTEGER_DATATYPES: &[&str] = &["smallint", "integer", "int", "bigint"];
const FLOAT_DATATYPES: &[&str] = &["real", "float", "binary_float", "binary_double", "double precision"];

/// Size reported for string columns when the catalog gave none.
const UNKNOWN_STRING_SIZE: u32 = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleColumn {
    pub name: String,
    pub dtype: String,
    #[serde(default)]
    pub char_size: Option<u32>,
    #[serde(default)]
    pub numeric_precision: Option<u32>,
    #[serde(default)]
    pub numeric_scale: Option<i32>,
}

impl OracleColumn {
    pub fn new(name: impl Into<String>, dtype: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dtype: dtype.into(),
            char_size: None,
            numeric_precision: None,
            numeric_scale: None,
        }
    }

    pub fn string(name: impl Into<String>, dtype: impl Into<String>, char_size: u32) -> Self {
        Self {
            char_size: Some(char_size),
            ..Self::new(name, dtype)
        }
    }

    pub fn numeric(name: impl Into<String>, dtype: impl Into<String>, precision: Option<u32>, scale: Option<i32>) -> Self {
        Self {
            numeric_precision: precision,
            numeric_scale: scale,
            ..Self::new(name, dtype)
        }
    }

    /// Parses a description such as `VARCHAR2(30)` or `NUMBER(10,2)`.
    pub fn from_description(name: impl Into<String>, raw_data_type: &str) -> Result<Self> {
        let raw = raw_data_type.trim();
        let Some(open) = raw.find('(') else {
            return Ok(Self::new(name, raw));
        };
        let close = raw.rfind(')').filter(|c| *c > open).ok_or_else(|| {
            AdapterError::runtime(format!("Could not interpret data type \"{}\"", raw_data_type))
        })?;
        let dtype = raw[..open].trim();
        let args: Vec<&str> = raw[open + 1..close].split(',').map(str::trim).collect();
        let bad = || AdapterError::runtime(format!("Could not interpret data_type \"{}\"", raw_data_type));

        // `VARCHAR2(30 BYTE)` / `VARCHAR2(30 CHAR)` carry a length semantic suffix
        let first = args.first().and_then(|a| a.split_whitespace().next()).unwrap_or_default();
        match args.len() {
            1 if is_string_type(dtype) => {
                let size = first.parse().map_err(|_| bad())?;
                Ok(Self::string(name, dtype, size))
            }
            1 => {
                let precision = first.parse().map_err(|_| bad())?;
                Ok(Self::numeric(name, dtype, Some(precision), None))
            }
            2 => {
                let precision = first.parse().map_err(|_| bad())?;
                let scale = args[1].parse().map_err(|_| bad())?;
                Ok(Self::numeric(name, dtype, Some(precision), Some(scale)))
            }
            _ => Err(bad()),
        }
    }

    /// Maps a canonical label (`STRING`, `INTEGER`...) to the Oracle type.
    /// Anything that is not a label is returned unchanged.
    pub fn translate_type(dtype: &str) -> String {
        let upper = dtype.to_uppercase();
        TYPE_LABELS
            .iter()
            .find(|(label, _)| *label == upper)
            .map(|(_, oracle)| oracle.to_string())
            .unwrap_or_else(|| dtype.to_string())
    }

    pub fn quoted(&self) -> String {
        quoting::quote(&self.name)
    }

    /// The name as it should appear in generated SQL.
    pub fn rendered_name(&self) -> String {
        quoting::check_and_quote_identifier(&self.name, None)
    }

    pub fn is_string(&self) -> bool {
        is_string_type(&self.dtype)
    }

    pub fn is_numeric(&self) -> bool {
        NUMBER_DATATYPES.contains(&self.dtype.to_lowercase().as_str())
    }

    pub fn is_integer(&self) -> bool {
        let lower = self.dtype.to_lowercase();
        INTEGER_DATATYPES.contains(&lower.as_str())
            || (lower == "number" && self.numeric_scale == Some(0) && self.numeric_precision.is_some())
    }

    pub fn is_float(&self) -> bool {
        FLOAT_DATATYPES.contains(&self.dtype.to_lowercase().as_str())
    }

    pub fn is_number(&self) -> bool {
        self.is_numeric() || self.is_integer() || self.is_float()
    }

    pub fn string_size(&self) -> Result<u32> {
        if !self.is_string() {
            return Err(AdapterError::runtime("Called string_size() on non-string field!"));
        }
        Ok(self.char_size.unwrap_or(UNKNOWN_STRING_SIZE))
    }

    pub fn data_type(&self) -> String {
        if self.is_string() {
            match self.string_size() {
                Ok(size) => format!("{}({})", self.dtype, size),
                Err(_) => self.dtype.clone(),
            }
        } else if self.is_numeric() {
            numeric_type(&self.dtype, self.numeric_precision, self.numeric_scale)
        } else {
            self.dtype.clone()
        }
    }

    /// Whether this column can be widened in place to `other`.
    pub fn can_expand_to(&self, other: &OracleColumn) -> bool {
        match (self.string_size(), other.string_size()) {
            (Ok(mine), Ok(theirs)) => theirs > mine,
            _ => false,
        }
    }
}

fn is_string_type(dtype: &str) -> bool {
    STRING_DATATYPES.contains(&dtype.to_lowercase().as_str())
}

pub fn numeric_type(dtype: &str, precision: Option<u32>, scale: Option<i32>) -> String {
    match (precision, scale) {
        (Some(p), Some(s)) => format!("{}({},{})", dtype, p, s),
        (Some(p), None) => format!("{}({})", dtype, p),
        _ => dtype.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_translate() {
        assert_eq!(OracleColumn::translate_type("string"), "VARCHAR2(4000)");
        assert_eq!(OracleColumn::translate_type("INTEGER"), "INTEGER");
        assert_eq!(OracleColumn::translate_type("clob"), "clob");
    }

    #[test]
    fn parses_descriptions() {
        let c = OracleColumn::from_description("amount", "NUMBER(10,2)").unwrap();
        assert_eq!(c.numeric_precision, Some(10));
        assert_eq!(c.numeric_scale, Some(2));
        assert_eq!(c.data_type(), "NUMBER(10,2)");

        let s = OracleColumn::from_description("name", "VARCHAR2(30 CHAR)").unwrap();
        assert_eq!(s.char_size, Some(30));
        assert_eq!(s.data_type(), "VARCHAR2(30)");

        let d = OracleColumn::from_description("ts", "TIMESTAMP").unwrap();
        assert_eq!(d.data_type(), "TIMESTAMP");

        assert!(OracleColumn::from_description("x", "NUMBER(a,b)").is_err());
    }

    #[test]
    fn string_without_size_uses_fallback() {
        let c = OracleColumn::new("c", "varchar2");
        assert_eq!(c.data_type(), "varchar2(256)");
    }

    #[test]
    fn integer_detection_includes_scale_zero_numbers() {
        assert!(OracleColumn::numeric("id", "NUMBER", Some(38), Some(0)).is_integer());
        assert!(!OracleColumn::numeric("amt", "NUMBER", Some(10), Some(2)).is_integer());
        assert!(OracleColumn::new("f", "BINARY_DOUBLE").is_float());
    }
}
