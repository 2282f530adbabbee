//! Error types for the Oracle adapter
//!
//! `OracleError` is what a driver backend reports. `AdapterError` is what the
//! rest of the crate returns to callers.

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdapterError>;

/// A failure reported by the Oracle driver, with the `ORA-` code when known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleError {
    pub code: i32,
    pub message: String,
    pub hint: Option<String>,
}

impl OracleError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        let hint = match code {
            1017 => Some("Check your username and password.".into()),
            12154 => Some("Could not resolve the connect identifier. Check tns_name or TNS_ADMIN.".into()),
            12170 => Some("Connection timed out. Check network and firewall.".into()),
            12514 => Some("The listener does not know the requested service.".into()),
            12541 => Some("No listener at specified host:port. Verify the address.".into()),
            12545 => Some("Target host or object does not exist.".into()),
            942 => Some("Table or view does not exist, or you lack permissions.".into()),
            1031 => Some("Insufficient privileges. Contact your DBA.".into()),
            1405 => Some("NULL value encountered where not allowed.".into()),
            _ => None,
        };
        Self { code, message, hint }
    }

    /// An error raised by the client side with no server code attached.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
            hint: None,
        }
    }
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // driver messages usually carry their own ORA- prefix already
        if self.code == 0 || self.message.starts_with("ORA-") {
            write!(f, "{}", self.message)
        } else {
            write!(f, "ORA-{:05}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for OracleError {}

#[cfg(feature = "oracle")]
impl From<oracle::Error> for OracleError {
    fn from(e: oracle::Error) -> Self {
        let code = e.db_error().map(|d| d.code()).unwrap_or(0);
        OracleError::new(code, e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Failed to connect: {0}")]
    FailedToConnect(String),

    #[error("Database Error\n  {0}")]
    Database(String),

    #[error("Runtime Error\n  {message}")]
    Runtime {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cross-db references not allowed in adapter oracle: Got {database}, expected {expected}")]
    CrossDatabaseReference { database: String, expected: String },

    #[error("Compilation Error\n  {0}")]
    Compilation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AdapterError {
    pub fn runtime(message: impl Into<String>) -> Self {
        AdapterError::Runtime {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps any error as a runtime error, keeping it as the source.
    pub fn wrap<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        AdapterError::Runtime {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    pub fn is_database(&self) -> bool {
        matches!(self, AdapterError::Database(_))
    }
}

impl From<OracleError> for AdapterError {
    fn from(e: OracleError) -> Self {
        AdapterError::Database(e.to_string().trim().to_string())
    }
}
