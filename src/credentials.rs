//! Oracle credentials and connection addressing
//!
//! A target can be addressed three ways. The first non-empty one wins, in
//! the order connection string, host, TNS alias.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::driver::{ConnectParams, Purity};
use crate::error::{AdapterError, Result};

pub const DEFAULT_PROTOCOL: &str = "tcp";
pub const DEFAULT_PORT: u16 = 1521;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMethod {
    Host,
    Tns,
    ConnectionString,
}

/// Port as written in a profile, either `1521` or `"1521"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Port {
    Number(u16),
    Text(String),
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Number(n) => write!(f, "{}", n),
            Port::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleCredentials {
    pub user: String,
    #[serde(alias = "pass")]
    pub password: String,
    #[serde(default, alias = "dbname")]
    pub database: Option<String>,
    pub schema: String,
    #[serde(default)]
    pub tns_name: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<Port>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub connection_string: Option<String>,
    #[serde(default)]
    pub shardingkey: Vec<String>,
    #[serde(default)]
    pub supershardingkey: Vec<String>,
    #[serde(default)]
    pub cclass: Option<String>,
    #[serde(default)]
    pub purity: Option<String>,
    #[serde(default)]
    pub oml_cloud_service_url: Option<String>,
    #[serde(default)]
    pub retry_count: Option<u32>,
    #[serde(default)]
    pub retry_delay: Option<u32>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl OracleCredentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            database: None,
            schema: schema.into(),
            tns_name: None,
            protocol: None,
            host: None,
            port: None,
            service: None,
            connection_string: None,
            shardingkey: Vec::new(),
            supershardingkey: Vec::new(),
            cclass: None,
            purity: None,
            oml_cloud_service_url: None,
            retry_count: None,
            retry_delay: None,
        }
    }

    pub fn adapter_type(&self) -> &'static str {
        "oracle"
    }

    pub fn connection_method(&self) -> ConnectionMethod {
        if non_empty(&self.connection_string).is_some() {
            ConnectionMethod::ConnectionString
        } else if non_empty(&self.host).is_some() {
            ConnectionMethod::Host
        } else {
            ConnectionMethod::Tns
        }
    }

    /// The connect descriptor handed to the driver.
    pub fn dsn(&self) -> Result<String> {
        match self.connection_method() {
            ConnectionMethod::ConnectionString => Ok(non_empty(&self.connection_string).unwrap_or_default().to_string()),
            ConnectionMethod::Tns => non_empty(&self.tns_name).map(str::to_string).ok_or_else(|| {
                AdapterError::InvalidConfig(
                    "Missing connection details: set one of connection_string, host or tns_name".into(),
                )
            }),
            ConnectionMethod::Host => {
                let host = non_empty(&self.host).unwrap_or_default();
                let service = non_empty(&self.service).ok_or_else(|| {
                    AdapterError::InvalidConfig("service is required when connecting with host".into())
                })?;
                let protocol = non_empty(&self.protocol).unwrap_or(DEFAULT_PROTOCOL).to_lowercase();
                let port = match &self.port {
                    Some(p) if !p.to_string().is_empty() => p.to_string(),
                    _ => DEFAULT_PORT.to_string(),
                };
                Ok(format!("{}://{}:{}/{}", protocol, host, port, service))
            }
        }
    }

    /// Keys shown by debug output. The password is never among them.
    pub fn connection_keys(&self) -> &'static [&'static str] {
        &[
            "user",
            "database",
            "schema",
            "protocol",
            "host",
            "port",
            "tns_name",
            "service",
            "connection_string",
            "shardingkey",
            "supershardingkey",
            "cclass",
            "purity",
            "retry_count",
            "retry_delay",
            "oml_cloud_service_url",
        ]
    }

    /// `(key, value)` pairs for the keys in `connection_keys`, skipping unset ones.
    pub fn connection_info(&self) -> Vec<(&'static str, String)> {
        let opt = |v: &Option<String>| v.clone();
        let list = |v: &Vec<String>| if v.is_empty() { None } else { Some(v.join(",")) };
        let values = [
            Some(self.user.clone()),
            opt(&self.database),
            Some(self.schema.clone()),
            opt(&self.protocol),
            opt(&self.host),
            self.port.as_ref().map(|p| p.to_string()),
            opt(&self.tns_name),
            opt(&self.service),
            opt(&self.connection_string),
            list(&self.shardingkey),
            list(&self.supershardingkey),
            opt(&self.cclass),
            opt(&self.purity),
            self.retry_count.map(|v| v.to_string()),
            self.retry_delay.map(|v| v.to_string()),
            opt(&self.oml_cloud_service_url),
        ];
        self.connection_keys()
            .iter()
            .zip(values)
            .filter_map(|(k, v)| v.map(|v| (*k, v)))
            .collect()
    }

    pub fn unique_field(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn validate(&self) -> Result<()> {
        if self.user.trim().is_empty() {
            return Err(AdapterError::InvalidConfig("user cannot be empty".into()));
        }
        if self.schema.trim().is_empty() {
            return Err(AdapterError::InvalidConfig("schema cannot be empty".into()));
        }
        self.dsn().map(|_| ())
    }

    pub fn connect_params(&self) -> Result<ConnectParams> {
        self.validate()?;
        Ok(ConnectParams {
            user: self.user.clone(),
            password: self.password.clone(),
            dsn: self.dsn()?,
            sharding_key: self.shardingkey.clone(),
            super_sharding_key: self.supershardingkey.clone(),
            connection_class: non_empty(&self.cclass).map(str::to_string),
            purity: non_empty(&self.purity).and_then(Purity::parse),
            retry_count: self.retry_count,
            retry_delay: self.retry_delay,
        })
    }
}

impl fmt::Debug for OracleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("OracleCredentials");
        s.field("password", &"***");
        for (k, v) in self.connection_info() {
            s.field(k, &v);
        }
        s.finish()
    }
}
