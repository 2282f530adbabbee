//! Oracle adapter for dbt
//!
//! Credentials and connection handling, Oracle quoting and relation rules,
//! materialized view reconciliation and the OML4Py job runner for Python
//! models.

pub mod adapter;
pub mod column;
pub mod connection;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod profile;
pub mod python_submissions;
pub mod quoting;
pub mod relation;
pub mod relation_configs;
pub mod types;

pub use adapter::OracleAdapter;
pub use column::OracleColumn;
pub use connection::{AdapterResponse, OracleConnectionManager};
pub use credentials::OracleCredentials;
pub use driver::{ConnectionFactory, DriverMode, NetConfig};
pub use error::{AdapterError, OracleError, Result};
pub use relation::OracleRelation;

/// Sets up `env_logger` with `info` as the default level. `RUST_LOG`
/// overrides it. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
