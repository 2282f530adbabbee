//! Driver strategy for Oracle connectivity
//!
//! The backend is chosen once, when a `ConnectionFactory` is built. Everything
//! above this module talks to `dyn Driver` / `dyn DriverConnection` only.

pub mod client;
pub mod net_config;
#[cfg(feature = "oracle")]
pub mod odpi;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, OracleError, Result};
pub use net_config::NetConfig;

/// Environment variable selecting the driver mode.
pub const DRIVER_TYPE_ENV: &str = "ORA_DRIVER_TYPE";
/// Name the selector had in the Python adapter, still honoured as a fallback.
pub const LEGACY_DRIVER_TYPE_ENV: &str = "ORA_PYTHON_DRIVER_TYPE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverMode {
    /// Network settings go into the connect string instead of `sqlnet.ora`.
    /// The ODPI-C backend has no pure thin protocol, so it still needs Oracle
    /// Client libraries on the loader path; they are just not primed from
    /// `ORACLE_CLIENT_LIB_DIR` in this mode.
    #[default]
    Thin,
    /// Uses a local Oracle Instant Client.
    Thick,
    /// Legacy cx_Oracle compatible mode. Behaves like thick.
    Cx,
}

impl DriverMode {
    /// Reads `ORA_DRIVER_TYPE`, then `ORA_PYTHON_DRIVER_TYPE`, defaulting to
    /// thin when neither is set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        match non_empty(DRIVER_TYPE_ENV) {
            Some(value) => value.parse(),
            None => match non_empty(LEGACY_DRIVER_TYPE_ENV) {
                Some(value) => {
                    log::info!("{} is deprecated, use {}", LEGACY_DRIVER_TYPE_ENV, DRIVER_TYPE_ENV);
                    value.parse()
                }
                None => Ok(DriverMode::Thin),
            },
        }
    }

    pub fn needs_client_libraries(self) -> bool {
        !matches!(self, DriverMode::Thin)
    }
}

impl FromStr for DriverMode {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "thin" => Ok(DriverMode::Thin),
            "thick" => Ok(DriverMode::Thick),
            "cx" | "cx_oracle" => Ok(DriverMode::Cx),
            other => Err(AdapterError::InvalidConfig(format!(
                "Invalid value '{}' for {}. Use any one of 'cx', 'thin', or 'thick'",
                other, DRIVER_TYPE_ENV
            ))),
        }
    }
}

impl fmt::Display for DriverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DriverMode::Thin => "thin",
            DriverMode::Thick => "thick",
            DriverMode::Cx => "cx",
        };
        f.write_str(s)
    }
}

/// Session purity requested from a pooled (DRCP) server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Purity {
    New,
    /// `self`: reuse a session already tagged for this connection class.
    Reuse,
    Default,
}

impl Purity {
    /// Parses `new`, `self` or `default` (any case). Anything else is ignored
    /// with a warning, as the driver would otherwise reject the connection.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "new" => Some(Purity::New),
            "self" => Some(Purity::Reuse),
            "default" => Some(Purity::Default),
            other => {
                log::warn!("Ignoring unknown purity '{}'. Use one of 'new', 'self' or 'default'", other);
                None
            }
        }
    }
}

/// Everything a backend needs to open one connection.
#[derive(Clone, Default, PartialEq)]
pub struct ConnectParams {
    pub user: String,
    pub password: String,
    pub dsn: String,
    pub sharding_key: Vec<String>,
    pub super_sharding_key: Vec<String>,
    pub connection_class: Option<String>,
    pub purity: Option<Purity>,
    /// Profile-level retry settings. Rendered into the DSN in thin mode,
    /// where they win over `RETRY_COUNT` / `RETRY_DELAY` from the environment.
    pub retry_count: Option<u32>,
    pub retry_delay: Option<u32>,
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("user", &self.user)
            .field("password", &"***")
            .field("dsn", &self.dsn)
            .field("sharding_key", &self.sharding_key)
            .field("super_sharding_key", &self.super_sharding_key)
            .field("connection_class", &self.connection_class)
            .field("purity", &self.purity)
            .field("retry_count", &self.retry_count)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

/// One result row. Column names are kept as the driver reported them and
/// looked up case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Option<String>>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Option<String>>) -> Self {
        Self { columns, values }
    }

    /// Builds a row from `(column, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        let (columns, values) = pairs
            .into_iter()
            .map(|(c, v)| (c.to_string(), v.map(str::to_string)))
            .unzip();
        Self { columns, values }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.get_index(i))
    }

    pub fn get_index(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Named bind parameters, `(name, value)` without the leading colon.
pub type Bindings<'a> = &'a [(&'a str, &'a str)];

/// A live connection handed out by a `Driver`.
pub trait DriverConnection: Send {
    /// Runs a statement and returns the number of rows it touched.
    fn execute(&mut self, sql: &str, bindings: Bindings<'_>) -> std::result::Result<u64, OracleError>;

    fn query(&mut self, sql: &str, bindings: Bindings<'_>) -> std::result::Result<Vec<Row>, OracleError>;

    fn commit(&mut self) -> std::result::Result<(), OracleError>;

    fn rollback(&mut self) -> std::result::Result<(), OracleError>;

    /// Interrupts whatever statement is currently running on the connection.
    fn break_execution(&mut self) -> std::result::Result<(), OracleError>;

    fn close(&mut self) -> std::result::Result<(), OracleError>;
}

/// A backend able to open connections.
pub trait Driver: Send + Sync {
    fn name(&self) -> &'static str;

    fn connect(&self, params: &ConnectParams) -> std::result::Result<Box<dyn DriverConnection>, OracleError>;
}

/// Opens connections with one driver mode and one network configuration,
/// both fixed at construction.
#[derive(Clone)]
pub struct ConnectionFactory {
    mode: DriverMode,
    net_config: NetConfig,
    driver: Arc<dyn Driver>,
}

impl fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("mode", &self.mode)
            .field("net_config", &self.net_config)
            .field("driver", &self.driver.name())
            .finish()
    }
}

impl ConnectionFactory {
    pub fn new(mode: DriverMode, net_config: NetConfig, driver: Arc<dyn Driver>) -> Self {
        match mode {
            DriverMode::Cx => {
                log::warn!("cx_Oracle compatible mode is deprecated. Set {}=thick instead", DRIVER_TYPE_ENV);
            }
            DriverMode::Thin => {
                for key in net_config.thin_unsupported_keys() {
                    log::warn!("{} is not supported in thin mode and will be ignored", key);
                }
            }
            DriverMode::Thick => {}
        }
        log::info!("Oracle adapter using {} mode with the {} driver", mode, driver.name());
        Self { mode, net_config, driver }
    }

    /// Reads the driver mode and network keys from the environment once and
    /// builds a factory around the ODPI-C backend.
    #[cfg(feature = "oracle")]
    pub fn from_env() -> Result<Self> {
        let mode = DriverMode::from_env()?;
        let net_config = NetConfig::from_env();
        if mode.needs_client_libraries() {
            let lib_dir = std::env::var(client::CLIENT_LIB_DIR_ENV).ok();
            client::prime_client(lib_dir.as_deref())?;
        }
        client::export_tns_admin(net_config.config_dir());
        Ok(Self::new(mode, net_config, Arc::new(odpi::OdpiDriver)))
    }

    #[cfg(not(feature = "oracle"))]
    pub fn from_env() -> Result<Self> {
        // still validate the selector so a typo is reported the same way
        DriverMode::from_env()?;
        Err(AdapterError::InvalidConfig(
            "dbt-oracle was built without the `oracle` feature; no database driver is available".into(),
        ))
    }

    pub fn mode(&self) -> DriverMode {
        self.mode
    }

    pub fn net_config(&self) -> &NetConfig {
        &self.net_config
    }

    pub fn connect(&self, params: &ConnectParams) -> std::result::Result<Box<dyn DriverConnection>, OracleError> {
        match self.mode {
            DriverMode::Thin => {
                let net_config = self
                    .net_config
                    .clone()
                    .with_value("RETRY_COUNT", params.retry_count)
                    .with_value("RETRY_DELAY", params.retry_delay);
                let mut params = params.clone();
                params.dsn = net_config.apply_to_dsn(&params.dsn);
                self.driver.connect(&params)
            }
            // thick clients read sqlnet.ora from CONFIG_DIR / TNS_ADMIN
            DriverMode::Thick | DriverMode::Cx => self.driver.connect(params),
        }
    }
}
