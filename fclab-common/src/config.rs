//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "FCLAB_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "fclab.db";

/// Blob directory name inside the root folder
pub const BLOB_DIR: &str = "blobs";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        match root_folder_from_toml(&config_path) {
            Ok(Some(root_folder)) => return root_folder,
            Ok(None) => {}
            Err(e) => tracing::warn!("Ignoring config file {}: {}", config_path.display(), e),
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Read the `root_folder` key from a TOML config file
pub fn root_folder_from_toml(config_path: &Path) -> Result<Option<PathBuf>> {
    let content = std::fs::read_to_string(config_path)?;
    let config = toml::from_str::<toml::Value>(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    Ok(config
        .get("root_folder")
        .and_then(|v| v.as_str())
        .map(PathBuf::from))
}

/// Get configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("fclab").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/fclab/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("fclab"))
        .unwrap_or_else(|| PathBuf::from("./fclab_data"))
}

/// Resolved root folder and the paths derived from it
#[derive(Debug, Clone)]
pub struct RootFolder {
    path: PathBuf,
}

impl RootFolder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// SQLite database path
    pub fn database_path(&self) -> PathBuf {
        self.path.join(DATABASE_FILE)
    }

    /// Directory holding image bytes
    pub fn blob_path(&self) -> PathBuf {
        self.path.join(BLOB_DIR)
    }

    /// Create the root and blob directories if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(self.blob_path())?;
        Ok(())
    }
}
