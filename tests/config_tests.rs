//! Configuration loading tests

use std::time::Duration;

use shortener::config::{ShutdownPolicy, StaticConfig, StorageBackendType};
use tempfile::TempDir;

#[test]
fn test_defaults() {
    let config = StaticConfig::default();
    assert_eq!(config.storage.backend, StorageBackendType::Memory);
    assert_eq!(config.storage.timeout(), Duration::from_secs(30));
    assert_eq!(config.deletion.flush_interval(), Duration::from_secs(1));
    assert_eq!(config.deletion.max_batch_size, 0);
    assert_eq!(config.deletion.shutdown_policy, ShutdownPolicy::Abandon);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_load_partial_toml_keeps_other_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[storage]
backend = "file"
file_path = "/var/lib/shortener/links.log"

[deletion]
flush_interval_ms = 250
shutdown_policy = "drain"
"#,
    )
    .unwrap();

    let config = StaticConfig::try_load(path.to_str()).unwrap();
    assert_eq!(config.storage.backend, StorageBackendType::File);
    assert_eq!(config.storage.file_path, "/var/lib/shortener/links.log");
    assert_eq!(config.deletion.flush_interval(), Duration::from_millis(250));
    assert_eq!(config.deletion.shutdown_policy, ShutdownPolicy::Drain);
    assert_eq!(config.deletion.channel_capacity, 64);
    assert_eq!(config.storage.pool_size, 10);
}

#[test]
fn test_invalid_backend_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[storage]\nbackend = \"redis\"\n").unwrap();

    assert!(StaticConfig::try_load(path.to_str()).is_err());
    // load() 不会失败，而是回退到默认值
    let config = StaticConfig::load(path.to_str());
    assert_eq!(config.storage.backend, StorageBackendType::Memory);
}

#[test]
fn test_sample_config_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.toml");

    let sample = StaticConfig::generate_sample_config();
    assert!(sample.contains("[storage]"));
    assert!(sample.contains("[deletion]"));

    StaticConfig::default().save_to_file(&path).unwrap();
    let loaded = StaticConfig::try_load(path.to_str()).unwrap();
    assert_eq!(loaded.deletion.flush_timeout_ms, 5000);
    assert_eq!(loaded.storage.database_url, "sqlite://shortlinks.db?mode=rwc");
}

#[test]
fn test_global_config_falls_back_to_defaults() {
    // 未调用 init_config 时返回默认配置
    let config = shortener::config::get_config();
    assert_eq!(config.deletion.channel_capacity, 64);
    assert_eq!(config.logging.format, "text");
}
