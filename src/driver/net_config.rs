//! Network tuning keys read from the environment
//!
//! In thin mode these are rendered into the connect descriptor as Easy
//! Connect Plus parameters. Thick clients get them from `sqlnet.ora`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Environment key and the Easy Connect Plus parameter it maps to.
/// `None` means the key cannot be expressed in a connect string.
pub const NET_CONFIG_KEYS: &[(&str, Option<&str>)] = &[
    ("SSL_SERVER_CERT_DN", Some("ssl_server_cert_dn")),
    ("SSL_SERVER_DN_MATCH", Some("ssl_server_dn_match")),
    ("WALLET_LOCATION", Some("wallet_location")),
    ("WALLET_PASSWORD", None),
    ("EXPIRE_TIME", Some("expire_time")),
    ("HTTPS_PROXY", Some("https_proxy")),
    ("HTTPS_PROXY_PORT", Some("https_proxy_port")),
    ("RETRY_COUNT", Some("retry_count")),
    ("RETRY_DELAY", Some("retry_delay")),
    ("TCP_CONNECT_TIMEOUT", Some("transport_connect_timeout")),
    ("CONFIG_DIR", None),
    ("DISABLE_OOB", Some("disable_oob")),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetConfig {
    values: BTreeMap<String, String>,
}

impl NetConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.to_uppercase(), v.to_string()))
            .collect();
        Self::from_lookup(|key| map.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let values = NET_CONFIG_KEYS
            .iter()
            .filter_map(|(key, _)| {
                lookup(key)
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (key.to_string(), v))
            })
            .collect();
        Self { values }
    }

    /// Sets `key` when `value` is present, replacing whatever the
    /// environment gave.
    pub fn with_value(mut self, key: &str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            self.values.insert(key.to_uppercase(), value.to_string());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_uppercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Directory holding `tnsnames.ora` / `sqlnet.ora`, if configured.
    pub fn config_dir(&self) -> Option<&str> {
        self.get("CONFIG_DIR")
    }

    /// Keys that are set but have no thin-mode equivalent.
    pub fn thin_unsupported_keys(&self) -> Vec<&str> {
        self.values
            .keys()
            .map(String::as_str)
            .filter(|k| *k == "WALLET_PASSWORD")
            .collect()
    }

    /// Appends the configured keys to an Easy Connect DSN. TNS aliases and
    /// full descriptors are returned untouched.
    pub fn apply_to_dsn(&self, dsn: &str) -> String {
        let params: Vec<String> = NET_CONFIG_KEYS
            .iter()
            .filter_map(|(key, param)| {
                let param = (*param)?;
                let value = self.values.get(*key)?;
                Some(format!("{}={}", param, urlencoding::encode(value)))
            })
            .collect();

        if params.is_empty() {
            return dsn.to_string();
        }
        let trimmed = dsn.trim();
        if trimmed.starts_with('(') || !trimmed.contains('/') {
            log::debug!("Connect string is not in Easy Connect form, network keys left to sqlnet.ora");
            return dsn.to_string();
        }

        let separator = if trimmed.contains('?') { '&' } else { '?' };
        format!("{}{}{}", trimmed, separator, params.join("&"))
    }
}
