/// Integration tests for Oracle Instant Client detection (thick mode)
///
/// Run these tests with: cargo test --test oracle_client_tests

use std::path::PathBuf;

use dbt_oracle::driver::client::{check_client_ready, is_client_primed, prime_client, resolve_client_path, ORACLE_LIB_NAME};
use dbt_oracle::AdapterError;

#[test]
fn client_not_installed() {
    assert!(!check_client_ready(Some("/nonexistent/path/oracle")), "Should return false when the client is missing");
    println!("✓ Returns false when client not installed");
}

#[test]
fn custom_path_with_home_is_expanded() {
    let path = resolve_client_path(Some("~/instantclient_23_4"));
    assert!(!path.to_string_lossy().starts_with('~'));
    assert!(path.ends_with("instantclient_23_4"));
    println!("✓ Home-relative path resolved: {:?}", path);
}

#[test]
fn custom_path_is_kept() {
    let path = resolve_client_path(Some("/opt/oracle/instantclient"));
    assert_eq!(path, PathBuf::from("/opt/oracle/instantclient"));
}

#[test]
fn stub_library_is_not_ready() {
    let dir = std::env::temp_dir().join(format!("dbt_oracle_stub_client_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(ORACLE_LIB_NAME), b"not a library").unwrap();

    let ready = check_client_ready(dir.to_str());
    let _ = std::fs::remove_dir_all(&dir);
    assert!(!ready, "A tiny stub file should not count as an installed client");
}

#[test]
fn prime_without_installation_fails() {
    match prime_client(Some("/nonexistent/path/oracle")) {
        Err(AdapterError::InvalidConfig(msg)) => {
            assert!(msg.contains("not found"), "Error should mention the missing library");
            println!("  Error message: {}", msg);
        }
        other => panic!("expected a config error, got {:?}", other),
    }
    assert!(!is_client_primed());
}

#[test]
#[ignore] // Only run after installing Oracle Instant Client
fn prime_with_installation() {
    let dir = std::env::var("ORACLE_CLIENT_LIB_DIR").ok();
    assert!(check_client_ready(dir.as_deref()), "Oracle client should be installed");
    prime_client(dir.as_deref()).expect("client should load");
    assert!(is_client_primed());
    println!("✓ Prime loads library successfully");
}
