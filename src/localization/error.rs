//! 本地化模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制

use std::fmt;

use thiserror::Error;

/// 本地化错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocalizationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 偏好存储读写失败（调用方降级为"无偏好"）
    #[error("存储错误: {0}")]
    StorageError(String),

    /// 单个文本的翻译调用失败
    #[error("翻译服务错误: {0}")]
    ProviderError(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 速率限制错误
    #[error("请求速率过快，已达到限制")]
    RateLimitExceeded,

    /// 超时错误
    #[error("操作超时: {0}")]
    TimeoutError(String),

    /// 更新的语言切换请求抢占了正在进行的翻译轮次
    #[error("翻译轮次 {generation} 已被更新的请求取代")]
    PassAborted { generation: u64 },

    /// 语言不在语言目录中
    #[error("未知语言: {0}")]
    UnknownLanguage(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl LocalizationError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            LocalizationError::NetworkError(_) => true,
            LocalizationError::TimeoutError(_) => true,
            LocalizationError::ProviderError(_) => true,
            LocalizationError::RateLimitExceeded => true,
            LocalizationError::StorageError(_) => true,
            LocalizationError::ConfigError(_) => false,
            LocalizationError::PassAborted { .. } => false,
            LocalizationError::UnknownLanguage(_) => false,
            LocalizationError::ParseError(_) => false,
            LocalizationError::SerializationError(_) => false,
            LocalizationError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LocalizationError::ConfigError(_) => ErrorSeverity::Critical,
            LocalizationError::StorageError(_) => ErrorSeverity::Warning,
            LocalizationError::ProviderError(_) => ErrorSeverity::Warning,
            LocalizationError::NetworkError(_) => ErrorSeverity::Warning,
            LocalizationError::RateLimitExceeded => ErrorSeverity::Warning,
            LocalizationError::TimeoutError(_) => ErrorSeverity::Warning,
            LocalizationError::PassAborted { .. } => ErrorSeverity::Info,
            LocalizationError::UnknownLanguage(_) => ErrorSeverity::Info,
            LocalizationError::ParseError(_) => ErrorSeverity::Error,
            LocalizationError::SerializationError(_) => ErrorSeverity::Error,
            LocalizationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            LocalizationError::ConfigError(_) => ErrorCategory::Configuration,
            LocalizationError::StorageError(_) => ErrorCategory::Storage,
            LocalizationError::ProviderError(_) => ErrorCategory::Provider,
            LocalizationError::NetworkError(_) => ErrorCategory::Network,
            LocalizationError::RateLimitExceeded => ErrorCategory::RateLimit,
            LocalizationError::TimeoutError(_) => ErrorCategory::Timeout,
            LocalizationError::PassAborted { .. } => ErrorCategory::Cancellation,
            LocalizationError::UnknownLanguage(_) => ErrorCategory::Input,
            LocalizationError::ParseError(_) => ErrorCategory::Parsing,
            LocalizationError::SerializationError(_) => ErrorCategory::Serialization,
            LocalizationError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let new_msg = format!("{} (上下文: {})", self, context);

        match &mut self {
            LocalizationError::ConfigError(msg)
            | LocalizationError::StorageError(msg)
            | LocalizationError::ProviderError(msg)
            | LocalizationError::NetworkError(msg)
            | LocalizationError::TimeoutError(msg)
            | LocalizationError::UnknownLanguage(msg)
            | LocalizationError::ParseError(msg)
            | LocalizationError::SerializationError(msg)
            | LocalizationError::InternalError(msg) => *msg = new_msg,
            LocalizationError::RateLimitExceeded | LocalizationError::PassAborted { .. } => {}
        }

        self
    }

    /// 是否为轮次被抢占
    pub fn is_aborted(&self) -> bool {
        matches!(self, LocalizationError::PassAborted { .. })
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Storage,
    Provider,
    Network,
    RateLimit,
    Timeout,
    Cancellation,
    Input,
    Parsing,
    Serialization,
    Internal,
}

impl From<std::io::Error> for LocalizationError {
    fn from(error: std::io::Error) -> Self {
        LocalizationError::ParseError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for LocalizationError {
    fn from(error: serde_json::Error) -> Self {
        LocalizationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for LocalizationError {
    fn from(error: toml::de::Error) -> Self {
        LocalizationError::ConfigError(format!("TOML解析错误: {}", error))
    }
}

impl From<redb::Error> for LocalizationError {
    fn from(error: redb::Error) -> Self {
        LocalizationError::StorageError(error.to_string())
    }
}

impl From<reqwest::Error> for LocalizationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            LocalizationError::TimeoutError(error.to_string())
        } else if error.is_connect() || error.is_request() {
            LocalizationError::NetworkError(error.to_string())
        } else {
            LocalizationError::ProviderError(error.to_string())
        }
    }
}

impl From<tokio::time::error::Elapsed> for LocalizationError {
    fn from(error: tokio::time::error::Elapsed) -> Self {
        LocalizationError::TimeoutError(format!("异步操作超时: {}", error))
    }
}

impl From<crate::env::EnvError> for LocalizationError {
    fn from(error: crate::env::EnvError) -> Self {
        LocalizationError::ConfigError(error.to_string())
    }
}

/// 错误结果类型别名
pub type LocalizationResult<T> = Result<T, LocalizationError>;

/// 错误统计信息
#[derive(Debug, Clone, Default)]
pub struct ErrorStats {
    pub total_errors: usize,
    pub by_category: std::collections::HashMap<ErrorCategory, usize>,
    pub by_severity: std::collections::HashMap<ErrorSeverity, usize>,
    pub retryable_errors: usize,
    pub critical_errors: usize,
}

impl ErrorStats {
    /// 记录错误
    pub fn record_error(&mut self, error: &LocalizationError) {
        self.total_errors += 1;

        *self.by_category.entry(error.category()).or_insert(0) += 1;

        let severity = error.severity();
        *self.by_severity.entry(severity).or_insert(0) += 1;

        if error.is_retryable() {
            self.retryable_errors += 1;
        }

        if severity == ErrorSeverity::Critical {
            self.critical_errors += 1;
        }
    }

    /// 合并另一份统计
    pub fn merge(&mut self, other: &ErrorStats) {
        self.total_errors += other.total_errors;
        for (category, count) in &other.by_category {
            *self.by_category.entry(*category).or_insert(0) += count;
        }
        for (severity, count) in &other.by_severity {
            *self.by_severity.entry(*severity).or_insert(0) += count;
        }
        self.retryable_errors += other.retryable_errors;
        self.critical_errors += other.critical_errors;
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Default::default();
    }

    /// 获取错误率
    pub fn error_rate(&self, total_operations: usize) -> f64 {
        if total_operations == 0 {
            0.0
        } else {
            self.total_errors as f64 / total_operations as f64
        }
    }
}

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &LocalizationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("本地化信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("本地化警告: {}", error),
            ErrorSeverity::Error => tracing::error!("本地化错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("本地化严重错误: {}", error),
        }
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> LocalizationError {
        LocalizationError::ConfigError(msg.to_string())
    }

    /// 创建存储错误
    pub fn storage_error<T: fmt::Display>(msg: T) -> LocalizationError {
        LocalizationError::StorageError(msg.to_string())
    }

    /// 创建翻译服务错误
    pub fn provider_error<T: fmt::Display>(msg: T) -> LocalizationError {
        LocalizationError::ProviderError(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err = LocalizationError::ProviderError("503".to_string());
        assert!(err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::Provider);
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let aborted = LocalizationError::PassAborted { generation: 3 };
        assert!(aborted.is_aborted());
        assert!(!aborted.is_retryable());
        assert_eq!(aborted.category(), ErrorCategory::Cancellation);
    }

    #[test]
    fn test_with_context() {
        let err = helpers::storage_error("disk full").with_context("save");
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert!(err.to_string().contains("disk full"));
        assert!(err.to_string().contains("save"));

        let unchanged = LocalizationError::RateLimitExceeded.with_context("ignored");
        assert_eq!(unchanged, LocalizationError::RateLimitExceeded);
    }

    #[test]
    fn test_error_stats() {
        let mut stats = ErrorStats::default();
        stats.record_error(&LocalizationError::ProviderError("a".to_string()));
        stats.record_error(&LocalizationError::ProviderError("b".to_string()));
        stats.record_error(&LocalizationError::ConfigError("c".to_string()));

        assert_eq!(stats.total_errors, 3);
        assert_eq!(stats.by_category[&ErrorCategory::Provider], 2);
        assert_eq!(stats.retryable_errors, 2);
        assert_eq!(stats.critical_errors, 1);
        assert!((stats.error_rate(6) - 0.5).abs() < f64::EPSILON);

        stats.reset();
        assert_eq!(stats.total_errors, 0);
        assert_eq!(stats.error_rate(0), 0.0);
    }

    #[test]
    fn test_error_stats_merge() {
        let mut pass = ErrorStats::default();
        pass.record_error(&LocalizationError::NetworkError("down".to_string()));

        let mut total = ErrorStats::default();
        total.record_error(&LocalizationError::NetworkError("down".to_string()));
        total.merge(&pass);

        assert_eq!(total.total_errors, 2);
        assert_eq!(total.by_category[&ErrorCategory::Network], 2);
        assert_eq!(total.retryable_errors, 2);
    }
}
