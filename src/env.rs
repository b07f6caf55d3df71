//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，所有变量都以 `PAGELOCALE_` 为前缀

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    /// 仅在变量被显式设置时返回值，用于配置覆盖
    fn get_set() -> Option<EnvResult<T>> {
        env::var(Self::NAME).ok().map(|value| Self::parse(&value))
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "PAGELOCALE_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何非空值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 本地化相关环境变量
pub mod localization {
    use super::*;

    /// 源语言（页面原文所用语言）
    pub struct SourceLang;
    impl EnvVar<String> for SourceLang {
        const NAME: &'static str = "PAGELOCALE_SOURCE_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Language the page content is authored in";

        fn parse(value: &str) -> EnvResult<String> {
            let lang = value.trim().to_lowercase();
            if crate::localization::catalog::is_valid_language_code(&lang) {
                Ok(lang)
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("'{}' is not a valid language tag", value),
                })
            }
        }
    }

    /// 翻译服务地址
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "PAGELOCALE_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Translation provider endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 每批次文本节点数
    pub struct BatchSize;
    impl EnvVar<usize> for BatchSize {
        const NAME: &'static str = "PAGELOCALE_BATCH_SIZE";
        const DEFAULT: Option<usize> = Some(10);
        const DESCRIPTION: &'static str = "Text nodes translated concurrently per batch";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 200)
        }
    }

    /// 单次请求超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "PAGELOCALE_REQUEST_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(30));
        const DESCRIPTION: &'static str = "Per-request provider timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds: u64 = value.trim().parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of seconds".to_string(),
            })?;

            if seconds == 0 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout must be greater than 0".to_string(),
                });
            }

            if seconds > 300 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout too long (max 300 seconds)".to_string(),
                });
            }

            Ok(Duration::from_secs(seconds))
        }
    }

    /// 限流重试开关
    pub struct RetryEnabled;
    impl EnvVar<bool> for RetryEnabled {
        const NAME: &'static str = "PAGELOCALE_RETRY_ENABLED";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Back off and retry when the provider rate-limits";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 内容根元素
    pub struct RootElement;
    impl EnvVar<String> for RootElement {
        const NAME: &'static str = "PAGELOCALE_ROOT_ELEMENT";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Tag name of the element whose subtree is localized";

        fn parse(value: &str) -> EnvResult<String> {
            let tag = value.trim().to_lowercase();
            if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!("'{}' is not a valid tag name", value),
                });
            }
            Ok(tag)
        }
    }
}

/// 存储相关环境变量
pub mod storage {
    use super::*;

    /// 语言偏好数据库路径
    pub struct PreferencePath;
    impl EnvVar<String> for PreferencePath {
        const NAME: &'static str = "PAGELOCALE_PREFERENCE_PATH";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Path of the language preference database";

        fn parse(value: &str) -> EnvResult<String> {
            let path = value.trim();
            if path.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path cannot be empty".to_string(),
                });
            }
            Ok(shellexpand::tilde(path).into_owned())
        }
    }
}

fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Invalid boolean '{}'. Use: true/false, 1/0, yes/no, on/off", value),
        }),
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let number: usize = value.trim().parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if number < min || number > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value must be between {} and {}", min, max),
        });
    }

    Ok(number)
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables\n\n");

    docs.push_str("## Core\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: \"info\")\n",
        core::LogLevel::NAME,
        core::LogLevel::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        core::NoColor::NAME,
        core::NoColor::DESCRIPTION,
        core::NoColor::DEFAULT
    ));

    docs.push_str("\n## Localization\n\n");
    docs.push_str(&format!(
        "- `{}`: {}\n",
        localization::SourceLang::NAME,
        localization::SourceLang::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {}\n",
        localization::ApiUrl::NAME,
        localization::ApiUrl::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        localization::BatchSize::NAME,
        localization::BatchSize::DESCRIPTION,
        localization::BatchSize::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        localization::RequestTimeout::NAME,
        localization::RequestTimeout::DESCRIPTION,
        localization::RequestTimeout::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        localization::RetryEnabled::NAME,
        localization::RetryEnabled::DESCRIPTION,
        localization::RetryEnabled::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {}\n",
        localization::RootElement::NAME,
        localization::RootElement::DESCRIPTION
    ));

    docs.push_str("\n## Storage\n\n");
    docs.push_str(&format!(
        "- `{}`: {}\n",
        storage::PreferencePath::NAME,
        storage::PreferencePath::DESCRIPTION
    ));

    docs
}
