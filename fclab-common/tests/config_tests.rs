//! Tests for root folder resolution
//!
//! Uses serial_test to prevent ENV variable race conditions: tests that
//! manipulate FCLAB_ROOT_FOLDER are marked with #[serial].

use fclab_common::config::{
    resolve_root_folder, root_folder_from_toml, RootFolder, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_argument_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/fclab-from-env");

    let root = resolve_root_folder(Some("/tmp/fclab-from-cli"), ROOT_FOLDER_ENV);
    assert_eq!(root, PathBuf::from("/tmp/fclab-from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/fclab-from-env");

    let root = resolve_root_folder(None, ROOT_FOLDER_ENV);
    assert_eq!(root, PathBuf::from("/tmp/fclab-from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_fallback_is_never_empty() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root = resolve_root_folder(None, ROOT_FOLDER_ENV);
    assert!(!root.as_os_str().is_empty());
}

#[test]
fn test_root_folder_from_toml() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");

    std::fs::write(&config_path, "root_folder = \"/srv/fclab\"\n").unwrap();
    assert_eq!(
        root_folder_from_toml(&config_path).unwrap(),
        Some(PathBuf::from("/srv/fclab"))
    );

    std::fs::write(&config_path, "port = 5780\n").unwrap();
    assert_eq!(root_folder_from_toml(&config_path).unwrap(), None);

    std::fs::write(&config_path, "root_folder = [").unwrap();
    assert!(root_folder_from_toml(&config_path).is_err());
}

#[test]
fn test_root_folder_layout() {
    let dir = TempDir::new().unwrap();
    let root = RootFolder::new(dir.path().join("data"));

    root.ensure_directories().unwrap();

    assert!(root.blob_path().is_dir());
    assert_eq!(root.database_path(), dir.path().join("data").join("fclab.db"));
}
