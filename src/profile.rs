//! `profiles.yml` loading
//!
//! Only the pieces the adapter needs: pick a profile and target, check the
//! adapter type and deserialize the Oracle credentials.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::credentials::OracleCredentials;
use crate::error::{AdapterError, Result};

fn default_threads() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct Target {
    #[serde(rename = "type")]
    pub adapter_type: String,
    #[serde(default = "default_threads")]
    pub threads: u32,
    #[serde(flatten)]
    pub credentials: OracleCredentials,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub target: String,
    pub outputs: BTreeMap<String, Target>,
}

pub type ProfilesFile = BTreeMap<String, Profile>;

pub fn parse_profiles(yaml: &str) -> Result<ProfilesFile> {
    serde_yaml::from_str(yaml).map_err(|e| AdapterError::InvalidConfig(format!("Invalid profiles file: {}", e)))
}

/// Selects a target. With no profile name the file must hold exactly one
/// profile; with no target name the profile's default target is used.
pub fn select_target(profiles: &ProfilesFile, profile: Option<&str>, target: Option<&str>) -> Result<Target> {
    let (profile_name, profile) = match profile {
        Some(name) => profiles
            .get_key_value(name)
            .ok_or_else(|| AdapterError::InvalidConfig(format!("Profile '{}' not found", name)))?,
        None => {
            let mut iter = profiles.iter();
            match (iter.next(), iter.next()) {
                (Some(only), None) => only,
                _ => {
                    return Err(AdapterError::InvalidConfig(
                        "Profile name is required when the file defines more than one profile".into(),
                    ))
                }
            }
        }
    };

    let target_name = target.unwrap_or(profile.target.as_str());
    let selected = profile.outputs.get(target_name).ok_or_else(|| {
        AdapterError::InvalidConfig(format!("Target '{}' not found in profile '{}'", target_name, profile_name))
    })?;

    if !selected.adapter_type.eq_ignore_ascii_case("oracle") {
        return Err(AdapterError::InvalidConfig(format!(
            "Target '{}' has type '{}', expected 'oracle'",
            target_name, selected.adapter_type
        )));
    }
    log::debug!("Using target '{}' of profile '{}'", target_name, profile_name);
    Ok(selected.clone())
}

pub fn load_target(path: &Path, profile: Option<&str>, target: Option<&str>) -> Result<Target> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AdapterError::InvalidConfig(format!("Cannot read {}: {}", path.display(), e)))?;
    select_target(&parse_profiles(&text)?, profile, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{ConnectionMethod, Port};

    const PROFILES: &str = r#"
dbt_test:
  target: dev
  outputs:
    dev:
      type: oracle
      user: scott
      pass: tiger
      dbname: ORCLPDB
      schema: dbt_test
      host: localhost
      port: 1521
      service: orclpdb
      threads: 4
    adb:
      type: oracle
      user: admin
      password: secret
      schema: admin
      tns_name: db_high
      shardingkey: [a, b]
    pg:
      type: postgres
      user: x
      password: y
      schema: z
"#;

    #[test]
    fn default_target_with_aliases() {
        let target = select_target(&parse_profiles(PROFILES).unwrap(), None, None).unwrap();
        assert_eq!(target.threads, 4);
        let creds = target.credentials;
        assert_eq!(creds.password, "tiger");
        assert_eq!(creds.database.as_deref(), Some("ORCLPDB"));
        assert_eq!(creds.port, Some(Port::Number(1521)));
        assert_eq!(creds.connection_method(), ConnectionMethod::Host);
    }

    #[test]
    fn named_target() {
        let target = select_target(&parse_profiles(PROFILES).unwrap(), Some("dbt_test"), Some("adb")).unwrap();
        assert_eq!(target.threads, 1);
        assert_eq!(target.credentials.shardingkey, vec!["a", "b"]);
        assert_eq!(target.credentials.dsn().unwrap(), "db_high");
    }

    #[test]
    fn wrong_adapter_type_or_unknown_target() {
        let profiles = parse_profiles(PROFILES).unwrap();
        assert!(select_target(&profiles, None, Some("pg")).is_err());
        assert!(select_target(&profiles, None, Some("prod")).is_err());
        assert!(select_target(&profiles, Some("other"), None).is_err());
    }
}
