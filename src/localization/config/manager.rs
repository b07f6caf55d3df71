//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::localization::catalog::{Language, LanguageCatalog, DEFAULT_SOURCE_LANGUAGE};
use crate::localization::error::{LocalizationError, LocalizationResult};

/// 本地化配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalizationConfig {
    // 语言
    pub source_lang: String,
    /// 替换内置语言目录；为空时使用内置目录
    pub languages: Option<Vec<Language>>,

    // 翻译服务
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub retry_enabled: bool,
    pub max_retry_attempts: usize,
    pub retry_delay_ms: u64,

    // 批次
    pub batch_size: usize,

    // DOM
    pub root_element: String,
    pub skip_elements: Vec<String>,
    pub annotation_attr: String,

    // 偏好存储
    pub preference_path: String,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            source_lang: DEFAULT_SOURCE_LANGUAGE.to_string(),
            languages: None,

            api_url: constants::DEFAULT_API_URL.to_string(),
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            retry_enabled: true,
            max_retry_attempts: constants::DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_delay_ms: constants::DEFAULT_RETRY_DELAY.as_millis() as u64,

            batch_size: constants::DEFAULT_BATCH_SIZE,

            root_element: constants::DEFAULT_ROOT_ELEMENT.to_string(),
            skip_elements: constants::SKIP_ELEMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            annotation_attr: constants::DEFAULT_ANNOTATION_ATTR.to_string(),

            preference_path: constants::DEFAULT_PREFERENCE_PATH.to_string(),
        }
    }
}

impl LocalizationConfig {
    /// 验证配置
    pub fn validate(&self) -> LocalizationResult<()> {
        if self.batch_size == 0 {
            return Err(LocalizationError::ConfigError("批次大小不能为0".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(LocalizationError::ConfigError("请求超时不能为0".to_string()));
        }

        if self.retry_enabled && self.max_retry_attempts == 0 {
            return Err(LocalizationError::ConfigError(
                "启用重试时重试次数不能为0".to_string(),
            ));
        }

        let url = url::Url::parse(&self.api_url).map_err(|e| {
            LocalizationError::ConfigError(format!("API地址无效 '{}': {}", self.api_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(LocalizationError::ConfigError(format!(
                "API地址必须使用 http 或 https: {}",
                self.api_url
            )));
        }

        if !self.annotation_attr.starts_with("data-") || self.annotation_attr.len() <= 5 {
            return Err(LocalizationError::ConfigError(format!(
                "注释属性必须是 data-* 属性: {}",
                self.annotation_attr
            )));
        }

        if self.root_element.trim().is_empty() {
            return Err(LocalizationError::ConfigError("根元素不能为空".to_string()));
        }

        // 目录本身负责校验源语言与语言标识
        self.catalog()?;

        Ok(())
    }

    /// 应用环境变量覆盖
    ///
    /// 只覆盖显式设置的变量；无法解析的值记录警告后忽略
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{localization, storage, EnvVar};

        fn take<T>(result: Option<crate::env::EnvResult<T>>) -> Option<T> {
            match result? {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("忽略无效的环境变量: {}", e);
                    None
                }
            }
        }

        if let Some(source_lang) = take(localization::SourceLang::get_set()) {
            self.source_lang = source_lang;
        }

        if let Some(api_url) = take(localization::ApiUrl::get_set()) {
            tracing::info!("环境变量覆盖 API URL: {}", api_url);
            self.api_url = api_url;
        }

        if let Some(batch_size) = take(localization::BatchSize::get_set()) {
            self.batch_size = batch_size;
        }

        if let Some(timeout) = take(localization::RequestTimeout::get_set()) {
            self.request_timeout_secs = timeout.as_secs();
        }

        if let Some(retry_enabled) = take(localization::RetryEnabled::get_set()) {
            self.retry_enabled = retry_enabled;
        }

        if let Some(root_element) = take(localization::RootElement::get_set()) {
            self.root_element = root_element;
        }

        if let Some(path) = take(storage::PreferencePath::get_set()) {
            self.preference_path = path;
        }
    }

    /// 根据配置构建语言目录
    pub fn catalog(&self) -> LocalizationResult<LanguageCatalog> {
        match &self.languages {
            Some(languages) => LanguageCatalog::new(&self.source_lang, languages.clone()),
            None => LanguageCatalog::builtin(&self.source_lang),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// 展开 `~` 后的偏好数据库路径
    pub fn preference_path(&self) -> String {
        shellexpand::tilde(&self.preference_path).into_owned()
    }
}

/// 简化的配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    config: LocalizationConfig,
}

impl ConfigManager {
    /// 按搜索路径加载配置，应用环境变量并验证
    pub fn new() -> LocalizationResult<Self> {
        let config = Self::load_config()?;
        Self::finish(config)
    }

    /// 从指定文件加载配置，应用环境变量并验证
    pub fn from_file(path: &str) -> LocalizationResult<Self> {
        Self::load_dotenv();
        let config = Self::load_from_file(&shellexpand::tilde(path))?;
        Self::finish(config)
    }

    fn finish(mut config: LocalizationConfig) -> LocalizationResult<Self> {
        config.apply_env_overrides();
        config.validate()?;
        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &LocalizationConfig {
        &self.config
    }

    pub fn into_config(self) -> LocalizationConfig {
        self.config
    }

    /// 从文件加载配置
    fn load_config() -> LocalizationResult<LocalizationConfig> {
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(&expanded_path);
            }
        }

        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(LocalizationConfig::default())
    }

    /// 从指定文件加载配置
    fn load_from_file(path: &str) -> LocalizationResult<LocalizationConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LocalizationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .map_err(|e| LocalizationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| LocalizationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::debug!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &str) -> LocalizationResult<()> {
        let content = Self::example_config()?;

        std::fs::write(path, content)
            .map_err(|e| LocalizationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }

    /// 示例配置文本
    pub fn example_config() -> LocalizationResult<String> {
        toml::to_string_pretty(&LocalizationConfig::default())
            .map_err(|e| LocalizationError::ConfigError(format!("序列化配置失败: {}", e)))
    }
}
