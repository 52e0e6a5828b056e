use std::fmt;

use crate::storage::UrlPair;

/// 错误的能力分类
///
/// 调用方只需要关心这四类结果，而不是具体的错误来源。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 短码已被占用
    Conflict,
    /// 映射不存在（或用户名下没有任何链接）
    NotExist,
    /// 映射存在但已被软删除
    Deleted,
    /// 后端不可用、超时、I/O 或其他非状态类错误
    Io,
}

#[derive(Debug, Clone)]
pub enum ShortenerError {
    /// `existing` is filled in by the service layer when it can look up
    /// the pair that owns the code; backends leave it empty.
    Conflict {
        short_code: String,
        existing: Option<Box<UrlPair>>,
    },
    NotExist(String),
    Deleted(String),
    Validation(String),
    Timeout(String),
    Unavailable(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Serialization(String),
    ConfigLoad(String),
}

impl ShortenerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShortenerError::Conflict { .. } => ErrorKind::Conflict,
            ShortenerError::NotExist(_) => ErrorKind::NotExist,
            ShortenerError::Deleted(_) => ErrorKind::Deleted,
            ShortenerError::Validation(_)
            | ShortenerError::Timeout(_)
            | ShortenerError::Unavailable(_)
            | ShortenerError::DatabaseConfig(_)
            | ShortenerError::DatabaseConnection(_)
            | ShortenerError::DatabaseOperation(_)
            | ShortenerError::FileOperation(_)
            | ShortenerError::Serialization(_)
            | ShortenerError::ConfigLoad(_) => ErrorKind::Io,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub fn is_not_exist(&self) -> bool {
        self.kind() == ErrorKind::NotExist
    }

    pub fn is_deleted(&self) -> bool {
        self.kind() == ErrorKind::Deleted
    }

    /// 冲突时已存在的链接（如果服务层查到了）
    pub fn existing_pair(&self) -> Option<&UrlPair> {
        match self {
            ShortenerError::Conflict { existing, .. } => existing.as_deref(),
            _ => None,
        }
    }

    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ShortenerError::Conflict { .. } => "E001",
            ShortenerError::NotExist(_) => "E002",
            ShortenerError::Deleted(_) => "E003",
            ShortenerError::Validation(_) => "E004",
            ShortenerError::Timeout(_) => "E005",
            ShortenerError::Unavailable(_) => "E006",
            ShortenerError::DatabaseConfig(_) => "E007",
            ShortenerError::DatabaseConnection(_) => "E008",
            ShortenerError::DatabaseOperation(_) => "E009",
            ShortenerError::FileOperation(_) => "E010",
            ShortenerError::Serialization(_) => "E011",
            ShortenerError::ConfigLoad(_) => "E012",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ShortenerError::Conflict { .. } => "Short Code Conflict",
            ShortenerError::NotExist(_) => "Resource Not Found",
            ShortenerError::Deleted(_) => "Resource Deleted",
            ShortenerError::Validation(_) => "Validation Error",
            ShortenerError::Timeout(_) => "Operation Timed Out",
            ShortenerError::Unavailable(_) => "Service Unavailable",
            ShortenerError::DatabaseConfig(_) => "Database Configuration Error",
            ShortenerError::DatabaseConnection(_) => "Database Connection Error",
            ShortenerError::DatabaseOperation(_) => "Database Operation Error",
            ShortenerError::FileOperation(_) => "File Operation Error",
            ShortenerError::Serialization(_) => "Serialization Error",
            ShortenerError::ConfigLoad(_) => "Configuration Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> String {
        match self {
            ShortenerError::Conflict { short_code, .. } => {
                format!("short code '{}' is already taken", short_code)
            }
            ShortenerError::NotExist(msg)
            | ShortenerError::Deleted(msg)
            | ShortenerError::Validation(msg)
            | ShortenerError::Timeout(msg)
            | ShortenerError::Unavailable(msg)
            | ShortenerError::DatabaseConfig(msg)
            | ShortenerError::DatabaseConnection(msg)
            | ShortenerError::DatabaseOperation(msg)
            | ShortenerError::FileOperation(msg)
            | ShortenerError::Serialization(msg)
            | ShortenerError::ConfigLoad(msg) => msg.clone(),
        }
    }

    /// 格式化为彩色输出（用于 CLI）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ShortenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ShortenerError {}

// 便捷的构造函数
impl ShortenerError {
    pub fn conflict<T: Into<String>>(short_code: T) -> Self {
        ShortenerError::Conflict {
            short_code: short_code.into(),
            existing: None,
        }
    }

    pub fn not_exist<T: Into<String>>(msg: T) -> Self {
        ShortenerError::NotExist(msg.into())
    }

    pub fn deleted<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Deleted(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Validation(msg.into())
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Timeout(msg.into())
    }

    pub fn unavailable<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Unavailable(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        ShortenerError::FileOperation(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ShortenerError::Serialization(msg.into())
    }

    pub fn config_load<T: Into<String>>(msg: T) -> Self {
        ShortenerError::ConfigLoad(msg.into())
    }
}

impl From<sea_orm::DbErr> for ShortenerError {
    fn from(err: sea_orm::DbErr) -> Self {
        ShortenerError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for ShortenerError {
    fn from(err: std::io::Error) -> Self {
        ShortenerError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for ShortenerError {
    fn from(err: serde_json::Error) -> Self {
        ShortenerError::Serialization(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for ShortenerError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        ShortenerError::Timeout(err.to_string())
    }
}

impl From<config::ConfigError> for ShortenerError {
    fn from(err: config::ConfigError) -> Self {
        ShortenerError::ConfigLoad(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShortenerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_projection() {
        assert_eq!(ShortenerError::conflict("abc").kind(), ErrorKind::Conflict);
        assert_eq!(ShortenerError::not_exist("x").kind(), ErrorKind::NotExist);
        assert_eq!(ShortenerError::deleted("x").kind(), ErrorKind::Deleted);
        assert_eq!(ShortenerError::timeout("x").kind(), ErrorKind::Io);
        assert_eq!(ShortenerError::file_operation("x").kind(), ErrorKind::Io);
    }

    #[test]
    fn test_conflict_message_contains_code() {
        let err = ShortenerError::conflict("abc123");
        assert!(err.to_string().contains("abc123"));
        assert!(err.existing_pair().is_none());
    }
}
