use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{ShutdownPolicy, StorageBackendType};
use crate::errors::Result;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 环境变量前缀，分隔符为 `__`，例如 `SHORTENER__STORAGE__BACKEND=file`
pub const ENV_PREFIX: &str = "SHORTENER";

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - storage: 存储后端选择与连接参数
/// - deletion: 异步删除管道的调优参数
/// - logging: 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub deletion: DeletionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    pub fn try_load(path: Option<&str>) -> Result<Self> {
        use config::{Config, Environment, File};

        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize::<StaticConfig>()?)
    }

    /// Same as [`StaticConfig::try_load`], but never fails: a broken config
    /// is reported on stderr and replaced by defaults. Logging is not set up
    /// yet at this point, hence `eprintln!`.
    pub fn load(path: Option<&str>) -> Self {
        match Self::try_load(path) {
            Ok(config) => {
                let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
                if std::path::Path::new(path).exists() {
                    eprintln!("[INFO] Configuration loaded from: {}", path);
                }
                config
            }
            Err(e) => {
                eprintln!("[ERROR] Failed to load config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 存储后端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendType,
    /// file 后端的主日志路径，墓碑日志为 `<file_path>.deleted`
    #[serde(default = "default_file_path")]
    pub file_path: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    /// 单次存储调用的超时（秒）
    #[serde(default = "default_storage_timeout")]
    pub timeout: u64,
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// 删除管道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionConfig {
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,
    /// 每个请求流与汇聚通道的容量
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// 0 表示只按周期刷盘
    #[serde(default)]
    pub max_batch_size: usize,
    #[serde(default)]
    pub shutdown_policy: ShutdownPolicy,
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
}

impl DeletionConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" 或 "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

// ============================================================
// Default value functions
// ============================================================

fn default_file_path() -> String {
    "shortlinks.log".to_string()
}

fn default_database_url() -> String {
    "sqlite://shortlinks.db?mode=rwc".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_storage_timeout() -> u64 {
    30
}

fn default_flush_interval_ms() -> u64 {
    1000
}

fn default_flush_timeout_ms() -> u64 {
    5000
}

fn default_channel_capacity() -> usize {
    64
}

fn default_drain_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

// ============================================================
// Default implementations
// ============================================================

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::default(),
            file_path: default_file_path(),
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_storage_timeout(),
        }
    }
}

impl Default for DeletionConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: default_flush_interval_ms(),
            flush_timeout_ms: default_flush_timeout_ms(),
            channel_capacity: default_channel_capacity(),
            max_batch_size: 0,
            shutdown_policy: ShutdownPolicy::default(),
            drain_timeout_ms: default_drain_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StaticConfig::default();
        assert_eq!(config.storage.backend, StorageBackendType::Memory);
        assert_eq!(config.deletion.flush_interval(), Duration::from_secs(1));
        assert_eq!(config.deletion.flush_timeout(), Duration::from_secs(5));
        assert_eq!(config.deletion.shutdown_policy, ShutdownPolicy::Abandon);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: StaticConfig = toml::from_str(
            r#"
            [storage]
            backend = "file"
            file_path = "/tmp/links.log"

            [deletion]
            shutdown_policy = "drain"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackendType::File);
        assert_eq!(config.storage.file_path, "/tmp/links.log");
        assert_eq!(config.storage.pool_size, 10);
        assert_eq!(config.deletion.shutdown_policy, ShutdownPolicy::Drain);
        assert_eq!(config.deletion.channel_capacity, 64);
    }

    #[test]
    fn test_sample_config_parses_back() {
        let sample = StaticConfig::generate_sample_config();
        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.storage.backend, StorageBackendType::Memory);
        assert_eq!(parsed.deletion.flush_interval_ms, 1000);
    }
}
