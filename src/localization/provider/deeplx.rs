//! DeepLX 翻译服务适配器
//!
//! 请求体 `{"text", "source_lang", "target_lang"}`，响应体 `{"code", "data", "message"}`。
//! 服务限流（HTTP 429 或 `code == 429`）时按指数退避重试，其他错误立即返回。

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use super::TranslationProvider;
use crate::localization::config::LocalizationConfig;
use crate::localization::error::{helpers, LocalizationError, LocalizationResult};

/// 错误信息中保留的响应体长度
const ERROR_BODY_PREVIEW: usize = 200;

/// 适配器配置
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_url: String,
    pub source_lang: String,
    pub timeout: Duration,
    pub retry_enabled: bool,
    pub max_retry_attempts: usize,
    pub retry_delay: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::from(&LocalizationConfig::default())
    }
}

impl From<&LocalizationConfig> for ProviderConfig {
    fn from(config: &LocalizationConfig) -> Self {
        Self {
            api_url: config.api_url.clone(),
            source_lang: config.source_lang.clone(),
            timeout: config.request_timeout(),
            retry_enabled: config.retry_enabled,
            max_retry_attempts: config.max_retry_attempts.max(1),
            retry_delay: config.retry_delay(),
        }
    }
}

/// DeepLX 请求体
#[derive(Debug, Clone, Serialize)]
pub struct DeepLxRequest<'a> {
    pub text: &'a str,
    pub source_lang: String,
    pub target_lang: String,
}

impl<'a> DeepLxRequest<'a> {
    pub fn new(text: &'a str, source_lang: &str, target_lang: &str) -> Self {
        Self {
            text,
            source_lang: source_lang.to_uppercase(),
            target_lang: target_lang.to_uppercase(),
        }
    }
}

/// DeepLX 响应体
#[derive(Debug, Clone, Deserialize)]
pub struct DeepLxResponse {
    pub code: u16,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl DeepLxResponse {
    /// 解析响应体并取出译文
    pub fn parse(body: &[u8]) -> LocalizationResult<String> {
        let response: DeepLxResponse = serde_json::from_slice(body)
            .map_err(|e| helpers::provider_error(format!("无法解析翻译响应: {}", e)))?;
        response.into_translation()
    }

    pub fn into_translation(self) -> LocalizationResult<String> {
        match self.code {
            200 => match self.data {
                Some(data) if !data.trim().is_empty() => Ok(data),
                Some(_) => Err(helpers::provider_error("翻译结果为空")),
                None => Err(helpers::provider_error("翻译响应缺少 data 字段")),
            },
            429 => Err(LocalizationError::RateLimitExceeded),
            code => Err(helpers::provider_error(format!(
                "翻译服务返回错误码 {}: {}",
                code,
                self.message.unwrap_or_default()
            ))),
        }
    }
}

/// DeepLX HTTP 适配器
#[derive(Debug, Clone)]
pub struct DeepLxProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl DeepLxProvider {
    pub fn new(config: ProviderConfig) -> LocalizationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("pagelocale/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| helpers::config_error(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_config(config: &LocalizationConfig) -> LocalizationResult<Self> {
        Self::new(ProviderConfig::from(config))
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// 第 `attempt` 次重试前的等待时间（从 0 开始）
    fn backoff(&self, attempt: usize) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16) as u32);
        self.config.retry_delay.saturating_mul(factor)
    }

    async fn send_once(&self, text: &str, target: &str) -> LocalizationResult<String> {
        let body = serde_json::to_vec(&DeepLxRequest::new(text, &self.config.source_lang, target))?;

        let response = self
            .client
            .post(&self.config.api_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LocalizationError::RateLimitExceeded);
        }

        let bytes = response.bytes().await?;
        if !status.is_success() {
            let preview: String = String::from_utf8_lossy(&bytes)
                .chars()
                .take(ERROR_BODY_PREVIEW)
                .collect();
            return Err(helpers::provider_error(format!("HTTP {}: {}", status, preview)));
        }

        DeepLxResponse::parse(&bytes)
    }
}

impl TranslationProvider for DeepLxProvider {
    async fn translate(&self, text: &str, target: &str) -> LocalizationResult<String> {
        // 目标即源语言时不发请求
        if target.eq_ignore_ascii_case(&self.config.source_lang) {
            return Ok(text.to_string());
        }

        let max_attempts = if self.config.retry_enabled {
            self.config.max_retry_attempts.max(1)
        } else {
            1
        };

        let mut attempt = 0;
        loop {
            metrics::counter!("pagelocale_provider_requests_total").increment(1);

            match self.send_once(text, target).await {
                Ok(translated) => return Ok(translated),
                Err(LocalizationError::RateLimitExceeded) if attempt + 1 < max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        "翻译服务限流，{:.1}秒后进行第 {} 次重试",
                        delay.as_secs_f32(),
                        attempt + 1
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    metrics::counter!("pagelocale_provider_failures_total").increment(1);
                    return Err(e);
                }
            }
        }
    }
}
