//! 本地化配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

pub use manager::{ConfigManager, LocalizationConfig};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 批次处理相关
    pub const DEFAULT_BATCH_SIZE: usize = 10;

    // 默认API设置
    pub const DEFAULT_API_URL: &str = "http://localhost:1188/translate";
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_MAX_RETRY_ATTEMPTS: usize = 3;
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

    // DOM相关
    pub const DEFAULT_ROOT_ELEMENT: &str = "main";
    pub const ROOT_FALLBACK_ELEMENT: &str = "body";
    pub const DEFAULT_ANNOTATION_ATTR: &str = "data-origin-text";

    // 不可渲染或不可改写的元素，其整棵子树都不会被改写
    pub const SKIP_ELEMENTS: &[&str] = &[
        "script", "style", "noscript", "template", "code", "pre", "textarea", "svg", "math",
    ];

    // 偏好存储
    pub const DEFAULT_PREFERENCE_PATH: &str = "~/.local/share/pagelocale/preferences.redb";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "pagelocale.toml",
        ".pagelocale.toml",
        "~/.config/pagelocale/config.toml",
        "/etc/pagelocale/config.toml",
    ];
}
