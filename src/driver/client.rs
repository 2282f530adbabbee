/// Oracle Instant Client discovery and loading for thick mode
///
/// Thin mode never touches this module.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::error::{AdapterError, Result};

/// Environment variable pointing at the Instant Client directory.
pub const CLIENT_LIB_DIR_ENV: &str = "ORACLE_CLIENT_LIB_DIR";

/// Loaded client library, kept alive for the life of the process
static ORACLE_CLIENT: OnceLock<Mutex<Option<libloading::Library>>> = OnceLock::new();

#[cfg(target_os = "macos")]
pub const ORACLE_LIB_NAME: &str = "libclntsh.dylib";

#[cfg(target_os = "windows")]
pub const ORACLE_LIB_NAME: &str = "oci.dll";

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const ORACLE_LIB_NAME: &str = "libclntsh.so";

/// Places an Instant Client is commonly unpacked to, in search order.
const DEFAULT_CLIENT_DIRS: &[&str] = &["~/instantclient", "~/lib", "/opt/oracle/instantclient"];

fn expand_home(p: &str) -> PathBuf {
    if let Some(rest) = p.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(p)
}

/// Resolves the Instant Client directory.
///
/// An explicit path wins (with `~/` expanded). Otherwise the first default
/// location containing the client library is used, and when none does the
/// first default is returned so diagnostics show where it was expected.
pub fn resolve_client_path(custom_path: Option<&str>) -> PathBuf {
    if let Some(path) = custom_path.filter(|p| !p.trim().is_empty()) {
        return expand_home(path.trim());
    }

    DEFAULT_CLIENT_DIRS
        .iter()
        .map(|d| expand_home(d))
        .find(|d| d.join(ORACLE_LIB_NAME).exists())
        .unwrap_or_else(|| expand_home(DEFAULT_CLIENT_DIRS[0]))
}

/// True when the client library exists at the resolved location and looks
/// like a real library (a dangling symlink or a tiny stub does not count).
pub fn check_client_ready(custom_path: Option<&str>) -> bool {
    let lib_path = resolve_client_path(custom_path).join(ORACLE_LIB_NAME);

    if !lib_path.is_file() {
        log::debug!("Oracle client library not found at: {:?}", lib_path);
        return false;
    }

    match std::fs::metadata(&lib_path) {
        Ok(metadata) if metadata.len() < 1_048_576 => {
            log::warn!(
                "Oracle client library file is suspiciously small ({} bytes): {:?}",
                metadata.len(),
                lib_path
            );
            false
        }
        Ok(_) => true,
        Err(e) => {
            log::warn!("Failed to get file metadata: {:?} - {}", lib_path, e);
            false
        }
    }
}

fn set_library_path(client_dir: &Path) {
    let value = client_dir.to_string_lossy().to_string();

    #[cfg(target_os = "macos")]
    let var = "DYLD_LIBRARY_PATH";
    #[cfg(target_os = "windows")]
    let var = "PATH";
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let var = "LD_LIBRARY_PATH";

    std::env::set_var(var, &value);
    log::info!("Set {} to: {}", var, value);
}

/// Loads the Instant Client with global symbol visibility so the driver
/// finds it when the first thick connection is made.
pub fn prime_client(custom_path: Option<&str>) -> Result<()> {
    if is_client_primed() {
        return Ok(());
    }

    let client_dir = resolve_client_path(custom_path);
    let lib_path = client_dir.join(ORACLE_LIB_NAME);

    if !lib_path.exists() {
        return Err(AdapterError::InvalidConfig(format!(
            "Oracle client library not found at: {}. Install Oracle Instant Client or set {}",
            lib_path.display(),
            CLIENT_LIB_DIR_ENV
        )));
    }

    set_library_path(&client_dir);

    #[cfg(unix)]
    let library = unsafe {
        use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};
        let unix_lib = UnixLibrary::open(Some(&lib_path), RTLD_NOW | RTLD_GLOBAL)
            .map_err(|e| AdapterError::runtime(format!("Failed to load Oracle client library: {}", e)))?;
        libloading::Library::from(unix_lib)
    };

    #[cfg(not(unix))]
    let library = unsafe {
        libloading::Library::new(&lib_path)
            .map_err(|e| AdapterError::runtime(format!("Failed to load Oracle client library: {}", e)))?
    };

    let mutex = ORACLE_CLIENT.get_or_init(|| Mutex::new(None));
    let mut guard = mutex
        .lock()
        .map_err(|e| AdapterError::runtime(format!("Failed to acquire lock on Oracle client: {}", e)))?;
    *guard = Some(library);

    log::info!("Oracle client library loaded from: {:?}", lib_path);
    Ok(())
}

pub fn is_client_primed() -> bool {
    ORACLE_CLIENT
        .get()
        .and_then(|m| m.lock().ok().map(|g| g.is_some()))
        .unwrap_or(false)
}

/// Points the client at a network config directory unless TNS_ADMIN is
/// already set by the user.
pub fn export_tns_admin(config_dir: Option<&str>) {
    if let Some(dir) = config_dir {
        if std::env::var_os("TNS_ADMIN").is_none() {
            std::env::set_var("TNS_ADMIN", dir);
            log::info!("Set TNS_ADMIN to: {}", dir);
        }
    }
}
