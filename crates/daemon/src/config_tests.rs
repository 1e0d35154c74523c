// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use tempfile::tempdir;

const ENV_KEYS: &[&str] = &[
    "RST_STATE_DIR",
    "RST_CONFIG",
    "RST_LISTEN_ADDR",
    "RST_WORKERS",
    "RST_SCRIPTS_DIR",
    "RST_SNAPSHOT_HISTORY",
    "RST_SYSTEM_ROOT",
    "RST_CATALOG_PATH",
    "RST_VERIFY_DEVICES",
    "RST_DRAIN_TIMEOUT_MS",
    "RST_JOB_TIMEOUT_SECS",
    "RST_JOB_RETENTION_SECS",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_match_the_documented_values() {
    let config = Config::resolve(PathBuf::from("/state"), FileConfig::default()).unwrap();
    assert_eq!(config.listen_addr.to_string(), "0.0.0.0:5000");
    assert_eq!(config.workers, 2);
    assert_eq!(config.snapshot_history, 4);
    assert_eq!(config.scripts_dir, PathBuf::from("/usr/lib/rst/scripts"));
    assert_eq!(config.lock_path, PathBuf::from("/state/daemon.pid"));
    assert_eq!(config.log_path, PathBuf::from("/state/daemon.log"));
    assert_eq!(config.drain_timeout, Duration::from_secs(5));
    assert!(config.verify_devices);
    assert!(config.job_timeout.is_none());
    assert!(config.job_retention.is_none());
    assert!(config.catalog_path.is_none());
}

#[test]
fn zero_job_timeout_disables_supervision() {
    let file = FileConfig {
        job_timeout_secs: Some(0),
        job_retention_secs: Some(0),
        ..FileConfig::default()
    };
    let config = Config::resolve(PathBuf::from("/state"), file).unwrap();
    assert!(config.job_timeout.is_none());
    assert!(config.job_retention.is_none());
}

#[test]
fn invalid_values_name_the_field() {
    let file = FileConfig { listen_addr: Some("nowhere".into()), ..FileConfig::default() };
    let err = Config::resolve(PathBuf::from("/state"), file).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "listen_addr", .. }));

    let file = FileConfig { workers: Some(0), ..FileConfig::default() };
    let err = Config::resolve(PathBuf::from("/state"), file).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "workers", .. }));
}

#[test]
fn explicit_system_root_wins_over_detection() {
    let file = FileConfig { system_root: Some("/dev/sda".into()), ..FileConfig::default() };
    let config = Config::resolve(PathBuf::from("/state"), file).unwrap();
    assert_eq!(config.system_root_device(), "/dev/sda");
}

#[test]
fn unknown_file_keys_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "wokers = 3\n").unwrap();
    assert!(matches!(FileConfig::read(&path), Err(ConfigError::Parse(..))));
}

#[test]
#[serial]
fn file_values_apply_from_the_state_dir() {
    clear_env();
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "listen_addr = \"127.0.0.1:7000\"\nworkers = 3\njob_timeout_secs = 3600\n",
    )
    .unwrap();
    std::env::set_var("RST_STATE_DIR", dir.path());

    let config = Config::load().unwrap();
    assert_eq!(config.state_dir, dir.path());
    assert_eq!(config.listen_addr.to_string(), "127.0.0.1:7000");
    assert_eq!(config.workers, 3);
    assert_eq!(config.job_timeout, Some(Duration::from_secs(3600)));
    clear_env();
}

#[test]
#[serial]
fn environment_overrides_the_file() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "workers = 3\nverify_devices = true\n").unwrap();
    std::env::set_var("RST_STATE_DIR", dir.path());
    std::env::set_var("RST_CONFIG", &path);
    std::env::set_var("RST_WORKERS", "5");
    std::env::set_var("RST_VERIFY_DEVICES", "no");
    std::env::set_var("RST_DRAIN_TIMEOUT_MS", "250");
    std::env::set_var("RST_JOB_RETENTION_SECS", "86400");

    let config = Config::load().unwrap();
    assert_eq!(config.workers, 5);
    assert!(!config.verify_devices);
    assert_eq!(config.drain_timeout, Duration::from_millis(250));
    assert_eq!(config.job_retention, Some(Duration::from_secs(86_400)));
    clear_env();
}

#[test]
#[serial]
fn missing_config_file_falls_back_to_defaults() {
    clear_env();
    let dir = tempdir().unwrap();
    std::env::set_var("RST_STATE_DIR", dir.path());
    std::env::set_var("RST_SNAPSHOT_HISTORY", "8");

    let config = Config::load().unwrap();
    assert_eq!(config.workers, 2);
    assert_eq!(config.snapshot_history, 8);
    clear_env();
}
