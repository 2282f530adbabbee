//! Integration tests against a live Oracle database
//!
//! These need the `oracle` feature and a reachable database. Connection
//! parameters come from the environment, optionally via `.env.development`:
//! DBT_ORACLE_USER, DBT_ORACLE_PASSWORD, DBT_ORACLE_SCHEMA and either
//! DBT_ORACLE_CONNECTION_STRING or DBT_ORACLE_HOST / DBT_ORACLE_PORT /
//! DBT_ORACLE_SERVICE.
//!
//! Run with: cargo test --features oracle --test oracle_connection_tests -- --ignored --nocapture

#![cfg(feature = "oracle")]

use std::env;

use dbt_oracle::credentials::Port;
use dbt_oracle::{ConnectionFactory, OracleAdapter, OracleConnectionManager, OracleCredentials};

fn load_test_credentials() -> Option<OracleCredentials> {
    let env_path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".env.development");
    if env_path.exists() {
        dotenv::from_path(&env_path).ok();
    }

    let user = env::var("DBT_ORACLE_USER").ok()?;
    let password = env::var("DBT_ORACLE_PASSWORD").ok()?;
    let schema = env::var("DBT_ORACLE_SCHEMA").unwrap_or_else(|_| user.clone());
    let mut creds = OracleCredentials::new(user, password, schema);
    creds.connection_string = env::var("DBT_ORACLE_CONNECTION_STRING").ok();
    creds.host = env::var("DBT_ORACLE_HOST").ok();
    creds.port = env::var("DBT_ORACLE_PORT").ok().map(Port::Text);
    creds.service = env::var("DBT_ORACLE_SERVICE").ok();
    Some(creds)
}

#[test]
#[ignore] // needs a database
fn debug_query_against_real_database() {
    let creds = match load_test_credentials() {
        Some(c) => c,
        None => {
            println!("⚠️  Skipping test: no database credentials in the environment");
            return;
        }
    };
    let factory = ConnectionFactory::from_env().expect("driver should initialise");
    println!("✓ Testing Oracle connection to: {}", creds.dsn().unwrap());

    let manager = OracleConnectionManager::new(factory, creds, "live");
    let mut adapter = OracleAdapter::new(manager);
    let response = adapter.debug_query().expect("select 1 from dual should succeed");
    assert_eq!(response.rows_affected, 1);

    let db = adapter.database_name().expect("database name");
    println!("✓ Connected to database {}", db);

    let schema = adapter.connections().credentials().schema.clone();
    let relations = adapter.list_relations_without_caching(&schema).expect("list relations");
    println!("✓ {} relations in {}", relations.len(), schema);
}
