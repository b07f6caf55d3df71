//! DeepLX 适配器集成测试
//!
//! 使用本地模拟服务器验证请求格式、限流重试和错误映射

use std::time::Duration;

use pagelocale::localization::{
    DeepLxProvider, LocalizationError, ProviderConfig, TranslationProvider,
};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::MockDeepLx;

fn provider_for(server: &MockDeepLx, retry_enabled: bool) -> DeepLxProvider {
    DeepLxProvider::new(ProviderConfig {
        api_url: server.url.clone(),
        source_lang: "en".to_string(),
        timeout: Duration::from_secs(5),
        retry_enabled,
        max_retry_attempts: 3,
        retry_delay: Duration::from_millis(1),
    })
    .unwrap()
}

#[tokio::test]
async fn test_successful_translation_request() {
    let server = MockDeepLx::start(vec![(200, r#"{"code":200,"data":"अभी दान करें"}"#)]).await;
    let provider = provider_for(&server, true);

    let translated = provider.translate("Donate now", "hi").await.unwrap();
    assert_eq!(translated, "अभी दान करें");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].head.starts_with("POST /translate"));

    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body["text"], "Donate now");
    assert_eq!(body["source_lang"], "EN");
    assert_eq!(body["target_lang"], "HI");
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockDeepLx::start(vec![
        (429, r#"{"code":429,"message":"slow down"}"#),
        (200, r#"{"code":429}"#),
        (200, r#"{"code":200,"data":"ఇప్పుడే దానం చేయండి"}"#),
    ])
    .await;
    let provider = provider_for(&server, true);

    let translated = provider.translate("Donate now", "te").await.unwrap();
    assert_eq!(translated, "ఇప్పుడే దానం చేయండి");
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn test_rate_limit_without_retry_fails() {
    let server = MockDeepLx::start(vec![(429, "{}"), (200, r#"{"code":200,"data":"x"}"#)]).await;
    let provider = provider_for(&server, false);

    let err = provider.translate("Donate now", "ta").await.unwrap_err();
    assert_eq!(err, LocalizationError::RateLimitExceeded);
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockDeepLx::start(vec![
        (500, "internal failure"),
        (200, r#"{"code":200,"data":"x"}"#),
    ])
    .await;
    let provider = provider_for(&server, true);

    let err = provider.translate("Donate now", "bn").await.unwrap_err();
    assert!(matches!(&err, LocalizationError::ProviderError(msg) if msg.contains("internal failure")));
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_provider_error_code_in_body() {
    let server = MockDeepLx::start(vec![(200, r#"{"code":503,"message":"unavailable"}"#)]).await;
    let provider = provider_for(&server, true);

    let err = provider.translate("Donate now", "de").await.unwrap_err();
    assert!(matches!(err, LocalizationError::ProviderError(_)));
}

#[tokio::test]
async fn test_source_target_never_reaches_server() {
    let server = MockDeepLx::start(vec![(200, r#"{"code":200,"data":"x"}"#)]).await;
    let provider = provider_for(&server, true);

    assert_eq!(provider.translate("Donate now", "en").await.unwrap(), "Donate now");
    assert!(server.requests().is_empty());
}
