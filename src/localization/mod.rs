//! 页面本地化引擎
//!
//! 把已渲染文档中的可见文本就地翻译为目标语言，并把源语言原文记录在文档里，
//! 因此可以在任意语言之间反复切换而不会累积翻译误差，也可以无损地恢复原文。
//!
//! ## 模块组织
//!
//! - `catalog` - 语言目录
//! - `config` - 配置管理
//! - `core` - 语言上下文
//! - `error` - 错误类型
//! - `pipeline` - 扫描、原文记录与批次编排
//! - `provider` - 翻译服务适配器
//! - `storage` - 语言偏好存储

pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod storage;

pub use catalog::{Language, LanguageCatalog, DEFAULT_SOURCE_LANGUAGE};
pub use config::{ConfigManager, LocalizationConfig};
pub use core::{ChangeOutcome, LanguageContext};
pub use error::{ErrorStats, LocalizationError, LocalizationResult};
pub use pipeline::{
    BatchOrchestrator, DomTree, GenerationCounter, NodeKind, OriginCache, PassReport,
    PassSettings, PassTicket, RcDomTree, ScanStats, TextNodeScanner,
};
pub use provider::{DeepLxProvider, ProviderConfig, TranslationProvider};
pub use storage::{MemoryPreferenceStore, PreferenceStore, RedbPreferenceStore};
