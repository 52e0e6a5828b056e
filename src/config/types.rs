//! 配置枚举类型
//!
//! 字符串形式与 TOML / 环境变量中使用的值一致（全小写）。

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// 存储后端类型
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackendType {
    #[default]
    Memory,
    File,
    Database,
}

/// What the deletion pipeline does with in-flight producers on shutdown.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ShutdownPolicy {
    /// Cancel producers immediately; unread requests are lost.
    #[default]
    Abandon,
    /// Wait (bounded) for producers to hand everything to the aggregator.
    Drain,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_backend_type_round_trips_through_str() {
        for backend in StorageBackendType::iter() {
            let parsed = StorageBackendType::from_str(backend.as_ref()).unwrap();
            assert_eq!(parsed, backend);
        }
        assert_eq!(
            StorageBackendType::from_str("DATABASE").unwrap(),
            StorageBackendType::Database
        );
        assert!(StorageBackendType::from_str("sled").is_err());
    }

    #[test]
    fn test_shutdown_policy_display() {
        assert_eq!(ShutdownPolicy::Drain.to_string(), "drain");
        assert_eq!(ShutdownPolicy::default(), ShutdownPolicy::Abandon);
    }
}
