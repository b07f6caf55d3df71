//! 翻译服务适配器
//!
//! - `deeplx`: 基于 HTTP 的 DeepLX 协议适配器

pub mod deeplx;

pub use deeplx::{DeepLxProvider, DeepLxRequest, DeepLxResponse, ProviderConfig};

use crate::localization::error::LocalizationResult;

/// 翻译服务
///
/// 所有调用都在单线程上交错执行，因此返回的 future 不要求 `Send`。
/// 失败时返回错误，绝不返回猜测的文本。
#[allow(async_fn_in_trait)]
pub trait TranslationProvider {
    async fn translate(&self, text: &str, target: &str) -> LocalizationResult<String>;
}

impl<P: TranslationProvider + ?Sized> TranslationProvider for &P {
    async fn translate(&self, text: &str, target: &str) -> LocalizationResult<String> {
        (**self).translate(text, target).await
    }
}
