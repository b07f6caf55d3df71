//! 语言上下文
//!
//! [`LanguageContext`] 是引擎对外的唯一入口，持有页面当前显示的语言、
//! 正在进行的目标语言以及轮次计数器。界面只通过三个操作与它交互：
//!
//! - [`LanguageContext::current_language`]: 当前语言
//! - [`LanguageContext::change_language`]: 请求切换语言
//! - [`LanguageContext::is_translating`]: 是否有翻译轮次在进行
//!
//! ## 状态
//!
//! ```text
//! Idle(current = L) --change(L')--> Translating(current = L, target = L')
//! Translating(target = L') --pass done--> Idle(current = L')
//! Translating(target = L') --change(L'')--> Translating(target = L'')
//! ```
//!
//! 切换到源语言时执行恢复，把原文记录写回文本节点。更新的请求会使旧轮次
//! 失效，旧轮次返回 [`PassAborted`](crate::localization::LocalizationError::PassAborted) 且不再改写文档。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use pagelocale::localization::{
//!     DeepLxProvider, LanguageCatalog, LanguageContext, PassSettings, RcDomTree,
//!     RedbPreferenceStore,
//! };
//!
//! let context = LanguageContext::new(
//!     LanguageCatalog::default(),
//!     RcDomTree,
//!     root,
//!     DeepLxProvider::from_config(&config)?,
//!     RedbPreferenceStore::open(config.preference_path()),
//!     PassSettings::from(&config),
//! );
//!
//! context.change_language("hi").await?;
//! assert_eq!(context.current_language(), "hi");
//! ```

use std::cell::RefCell;

use crate::localization::catalog::LanguageCatalog;
use crate::localization::error::{helpers, ErrorStats, LocalizationResult};
use crate::localization::pipeline::{
    BatchOrchestrator, DomTree, GenerationCounter, PassReport, PassSettings,
};
use crate::localization::provider::TranslationProvider;
use crate::localization::storage::PreferenceStore;

/// 一次语言切换请求的结果
#[derive(Debug, Clone)]
pub enum ChangeOutcome {
    /// 请求的语言已经是当前语言或正在进行的目标语言
    Unchanged,
    /// 完成了一轮翻译
    Translated(PassReport),
    /// 恢复为源语言原文
    Restored(PassReport),
}

impl ChangeOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            ChangeOutcome::Unchanged => None,
            ChangeOutcome::Translated(report) | ChangeOutcome::Restored(report) => Some(report),
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, ChangeOutcome::Unchanged)
    }
}

/// 页面语言上下文
pub struct LanguageContext<T: DomTree, P: TranslationProvider, S: PreferenceStore> {
    catalog: LanguageCatalog,
    tree: T,
    root: T::Node,
    provider: P,
    store: S,
    settings: PassSettings,
    current: RefCell<String>,
    target: RefCell<Option<String>>,
    generations: GenerationCounter,
    last_report: RefCell<Option<PassReport>>,
    error_stats: RefCell<ErrorStats>,
}

impl<T: DomTree, P: TranslationProvider, S: PreferenceStore> LanguageContext<T, P, S> {
    /// 创建上下文
    ///
    /// 初始语言取自偏好存储；没有偏好或偏好不在语言目录中时使用源语言。
    /// 创建时不会改写文档，需要时调用 [`Self::refresh`] 应用初始语言。
    pub fn new(
        catalog: LanguageCatalog,
        tree: T,
        root: T::Node,
        provider: P,
        store: S,
        mut settings: PassSettings,
    ) -> Self {
        settings.source_lang = catalog.source().to_string();

        let initial = match store.load() {
            Some(saved) => match catalog.resolve(&saved) {
                Ok(language) => language.code.clone(),
                Err(_) => {
                    tracing::warn!("忽略无效的语言偏好: {}", saved);
                    catalog.source().to_string()
                }
            },
            None => catalog.source().to_string(),
        };
        tracing::debug!("初始语言: {}", initial);

        Self {
            catalog,
            tree,
            root,
            provider,
            store,
            settings,
            current: RefCell::new(initial),
            target: RefCell::new(None),
            generations: GenerationCounter::default(),
            last_report: RefCell::new(None),
            error_stats: RefCell::new(ErrorStats::default()),
        }
    }

    /// 页面当前显示的语言
    pub fn current_language(&self) -> String {
        self.current.borrow().clone()
    }

    /// 正在进行的翻译轮次的目标语言
    pub fn pending_language(&self) -> Option<String> {
        self.target.borrow().clone()
    }

    /// 是否有翻译轮次在进行
    pub fn is_translating(&self) -> bool {
        self.target.borrow().is_some()
    }

    /// 切换页面语言
    ///
    /// 语言代码不在目录中时返回 [`UnknownLanguage`](crate::localization::LocalizationError::UnknownLanguage)，文档不变。
    /// 请求的语言与正在进行的目标（或当前语言）相同时什么都不做。
    pub async fn change_language(&self, code: &str) -> LocalizationResult<ChangeOutcome> {
        let language = self.catalog.resolve(code)?.code.clone();

        let effective = self
            .pending_language()
            .unwrap_or_else(|| self.current_language());
        if language == effective {
            tracing::debug!("语言已是 {}，忽略切换请求", language);
            return Ok(ChangeOutcome::Unchanged);
        }

        tracing::info!("切换语言: {} -> {}", effective, language);
        self.apply(language).await
    }

    /// 把当前语言重新应用到文档
    pub async fn refresh(&self) -> LocalizationResult<ChangeOutcome> {
        let language = self
            .pending_language()
            .unwrap_or_else(|| self.current_language());
        self.apply(language).await
    }

    async fn apply(&self, language: String) -> LocalizationResult<ChangeOutcome> {
        let ticket = self.generations.begin();
        *self.target.borrow_mut() = Some(language.clone());

        let orchestrator = BatchOrchestrator::new(&self.tree, &self.provider, &self.settings);
        let result = orchestrator.run_pass(&self.root, &language, ticket).await;

        match result {
            Ok(report) => {
                *self.target.borrow_mut() = None;

                // 全部失败时页面没有变化，保持原语言以便重试
                if report.nodes_translated == 0 && report.nodes_failed > 0 {
                    tracing::warn!(
                        "{} 个文本全部翻译失败，保持语言 {}",
                        report.nodes_failed,
                        self.current_language()
                    );
                } else {
                    *self.current.borrow_mut() = language.clone();
                    self.store.save(&language);
                }

                self.error_stats.borrow_mut().merge(&report.errors);
                *self.last_report.borrow_mut() = Some(report.clone());

                if self.catalog.is_source(&language) {
                    Ok(ChangeOutcome::Restored(report))
                } else {
                    Ok(ChangeOutcome::Translated(report))
                }
            }
            Err(e) => {
                if e.is_aborted() {
                    metrics::counter!("pagelocale_passes_aborted_total").increment(1);
                    tracing::info!("放弃语言 {} 的翻译轮次 {}", language, ticket.generation());
                } else {
                    helpers::log_error(&e);
                    self.error_stats.borrow_mut().record_error(&e);
                    if ticket.is_current() {
                        *self.target.borrow_mut() = None;
                    }
                }
                Err(e)
            }
        }
    }

    /// 最近一次完成的轮次报告
    pub fn last_report(&self) -> Option<PassReport> {
        self.last_report.borrow().clone()
    }

    /// 所有完成轮次的累计错误统计
    pub fn error_stats(&self) -> ErrorStats {
        self.error_stats.borrow().clone()
    }

    /// 已签发的最新轮次编号
    pub fn generation(&self) -> u64 {
        self.generations.latest()
    }

    pub fn catalog(&self) -> &LanguageCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &PassSettings {
        &self.settings
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    pub fn root(&self) -> &T::Node {
        &self.root
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
