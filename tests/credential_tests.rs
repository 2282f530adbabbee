/// Integration tests for profile loading and credential addressing
///
/// Run these tests with: cargo test --test credential_tests

use std::path::PathBuf;

use dbt_oracle::credentials::ConnectionMethod;
use dbt_oracle::profile;
use dbt_oracle::AdapterError;

const PROFILES: &str = r#"
warehouse:
  target: dev
  outputs:
    dev:
      type: oracle
      user: dbt_dev
      password: dev_secret
      schema: dbt_dev
      protocol: TCPS
      host: adb.eu-frankfurt-1.oraclecloud.com
      port: "1522"
      service: abc_high.adb.oraclecloud.com
      threads: 4
    prod:
      type: oracle
      user: dbt_prod
      pass: prod_secret
      dbname: PRODPDB
      schema: analytics
      tns_name: prod_high
      cclass: DBT
      purity: self
      shardingkey:
        - eu
    other:
      type: postgres
      user: x
      password: y
      schema: public
"#;

fn write_profiles(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("dbt_oracle_{}_{}.yml", name, std::process::id()));
    std::fs::write(&path, PROFILES).expect("write temp profiles file");
    path
}

#[test]
fn default_target_is_loaded_from_file() {
    let path = write_profiles("default");
    let target = profile::load_target(&path, None, None).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(target.threads, 4);
    let creds = target.credentials;
    assert_eq!(creds.connection_method(), ConnectionMethod::Host);
    assert_eq!(
        creds.dsn().unwrap(),
        "tcps://adb.eu-frankfurt-1.oraclecloud.com:1522/abc_high.adb.oraclecloud.com"
    );
    println!("✓ dev target resolved to {}", creds.dsn().unwrap());
}

#[test]
fn named_target_uses_aliases_and_tns() {
    let path = write_profiles("named");
    let target = profile::load_target(&path, Some("warehouse"), Some("prod")).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(target.threads, 1);
    let creds = target.credentials;
    assert_eq!(creds.password, "prod_secret");
    assert_eq!(creds.database.as_deref(), Some("PRODPDB"));
    assert_eq!(creds.connection_method(), ConnectionMethod::Tns);

    let params = creds.connect_params().unwrap();
    assert_eq!(params.dsn, "prod_high");
    assert_eq!(params.connection_class.as_deref(), Some("DBT"));
    assert_eq!(params.sharding_key, vec!["eu".to_string()]);
}

#[test]
fn non_oracle_target_is_rejected() {
    let path = write_profiles("other");
    let err = profile::load_target(&path, None, Some("other")).unwrap_err();
    let _ = std::fs::remove_file(&path);
    assert!(matches!(err, AdapterError::InvalidConfig(ref m) if m.contains("postgres")), "got {:?}", err);
}

#[test]
fn missing_file_is_a_config_error() {
    let err = profile::load_target(&PathBuf::from("/nonexistent/profiles.yml"), None, None).unwrap_err();
    assert!(matches!(err, AdapterError::InvalidConfig(_)));
}

#[test]
fn debug_output_never_shows_the_password() {
    let path = write_profiles("debug");
    let target = profile::load_target(&path, None, Some("prod")).unwrap();
    let _ = std::fs::remove_file(&path);

    let rendered = format!("{:?}", target.credentials);
    assert!(!rendered.contains("prod_secret"));
    assert!(target.credentials.connection_info().iter().all(|(k, _)| *k != "password"));
}
