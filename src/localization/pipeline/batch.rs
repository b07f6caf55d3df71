//! 批次翻译编排
//!
//! 一轮翻译的流程：
//!
//! 1. 扫描根节点下的文本节点
//! 2. 按文档顺序切分为固定大小的批次
//! 3. 批次之间顺序执行，批次内部并发调用翻译服务
//! 4. 成功的节点改写文本并确认原文记录；失败的节点保持原样，继续处理其余节点
//!
//! 每一轮持有一张 [`PassTicket`]。有更新的轮次开始后，旧轮次在下一个检查点
//! 停止，并且不再改写任何节点。

use std::cell::Cell;
use std::time::{Duration, Instant};

use futures::future::join_all;

use super::origin::OriginCache;
use super::scanner::TextNodeScanner;
use super::tree::DomTree;
use crate::localization::config::LocalizationConfig;
use crate::localization::error::{helpers, ErrorStats, LocalizationError, LocalizationResult};
use crate::localization::provider::TranslationProvider;

/// 编排参数
#[derive(Debug, Clone, PartialEq)]
pub struct PassSettings {
    pub source_lang: String,
    pub batch_size: usize,
    pub skip_elements: Vec<String>,
    pub annotation_attr: String,
}

impl Default for PassSettings {
    fn default() -> Self {
        Self::from(&LocalizationConfig::default())
    }
}

impl From<&LocalizationConfig> for PassSettings {
    fn from(config: &LocalizationConfig) -> Self {
        Self {
            source_lang: config.source_lang.clone(),
            batch_size: config.batch_size.max(1),
            skip_elements: config.skip_elements.clone(),
            annotation_attr: config.annotation_attr.clone(),
        }
    }
}

/// 轮次代数计数器
#[derive(Debug, Default)]
pub struct GenerationCounter {
    latest: Cell<u64>,
}

impl GenerationCounter {
    /// 开始新的一轮，之前签发的票据全部失效
    pub fn begin(&self) -> PassTicket<'_> {
        let generation = self.latest.get() + 1;
        self.latest.set(generation);
        PassTicket {
            generation,
            latest: &self.latest,
        }
    }

    pub fn latest(&self) -> u64 {
        self.latest.get()
    }
}

/// 一轮翻译的票据
#[derive(Debug, Clone, Copy)]
pub struct PassTicket<'a> {
    generation: u64,
    latest: &'a Cell<u64>,
}

impl PassTicket<'_> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.latest.get() == self.generation
    }

    pub fn ensure_current(&self) -> LocalizationResult<()> {
        if self.is_current() {
            Ok(())
        } else {
            Err(LocalizationError::PassAborted {
                generation: self.generation,
            })
        }
    }
}

/// 单个节点的处理结果
#[derive(Debug, Clone, PartialEq)]
enum NodeOutcome {
    Translated,
    Skipped,
    Failed(LocalizationError),
    Discarded,
}

/// 一轮翻译或恢复的报告
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub target: String,
    pub generation: u64,
    pub nodes_scanned: usize,
    /// 按派发顺序记录每个批次的节点数
    pub batch_sizes: Vec<usize>,
    pub nodes_translated: usize,
    pub nodes_failed: usize,
    pub nodes_skipped: usize,
    pub nodes_restored: usize,
    pub errors: ErrorStats,
    pub elapsed: Duration,
}

impl PassReport {
    fn new(target: &str, generation: u64) -> Self {
        Self {
            target: target.to_string(),
            generation,
            ..Default::default()
        }
    }

    pub fn batches_dispatched(&self) -> usize {
        self.batch_sizes.len()
    }

    /// 是否所有节点都成功
    pub fn is_complete(&self) -> bool {
        self.nodes_failed == 0
    }
}

/// 批次翻译编排器
pub struct BatchOrchestrator<'a, T: DomTree, P: TranslationProvider> {
    tree: &'a T,
    provider: &'a P,
    settings: &'a PassSettings,
    scanner: TextNodeScanner<'a, T>,
    origin: OriginCache<'a, T>,
}

impl<'a, T: DomTree, P: TranslationProvider> BatchOrchestrator<'a, T, P> {
    pub fn new(tree: &'a T, provider: &'a P, settings: &'a PassSettings) -> Self {
        Self {
            tree,
            provider,
            settings,
            scanner: TextNodeScanner::new(tree, &settings.skip_elements),
            origin: OriginCache::new(tree, &settings.annotation_attr),
        }
    }

    /// 把 `root` 下的文本翻译为 `target`
    ///
    /// `target` 为源语言时改为执行恢复，不调用翻译服务
    pub async fn run_pass(
        &self,
        root: &T::Node,
        target: &str,
        ticket: PassTicket<'_>,
    ) -> LocalizationResult<PassReport> {
        if target == self.settings.source_lang {
            return self.restore_pass(root, ticket);
        }

        let start_time = Instant::now();
        let mut report = PassReport::new(target, ticket.generation());

        let nodes: Vec<T::Node> = self.scanner.scan(root).collect();
        report.nodes_scanned = nodes.len();

        if nodes.is_empty() {
            tracing::info!("没有找到需要翻译的文本");
            return Ok(report);
        }

        let batch_size = self.settings.batch_size.max(1);
        let total_batches = nodes.len().div_ceil(batch_size);
        tracing::info!(
            "开始翻译轮次 {} -> {}: {} 个文本节点, {} 个批次",
            ticket.generation(),
            target,
            nodes.len(),
            total_batches
        );

        for (i, batch) in nodes.chunks(batch_size).enumerate() {
            ticket.ensure_current()?;

            tracing::debug!("处理批次 {}/{}: {} 项", i + 1, total_batches, batch.len());
            report.batch_sizes.push(batch.len());

            let outcomes = join_all(
                batch
                    .iter()
                    .map(|node| self.translate_node(node, target, ticket)),
            )
            .await;

            for outcome in outcomes {
                match outcome {
                    NodeOutcome::Translated => report.nodes_translated += 1,
                    NodeOutcome::Skipped => report.nodes_skipped += 1,
                    NodeOutcome::Failed(e) => {
                        report.nodes_failed += 1;
                        report.errors.record_error(&e);
                    }
                    NodeOutcome::Discarded => {}
                }
            }
        }

        ticket.ensure_current()?;

        report.elapsed = start_time.elapsed();
        metrics::counter!("pagelocale_nodes_translated_total")
            .increment(report.nodes_translated as u64);

        tracing::info!(
            "翻译轮次 {} 完成: 成功 {}, 失败 {}, 跳过 {}, 耗时 {:?}",
            ticket.generation(),
            report.nodes_translated,
            report.nodes_failed,
            report.nodes_skipped,
            report.elapsed
        );

        Ok(report)
    }

    /// 把 `root` 下有原文记录的文本节点恢复为原文
    pub fn restore_pass(
        &self,
        root: &T::Node,
        ticket: PassTicket<'_>,
    ) -> LocalizationResult<PassReport> {
        ticket.ensure_current()?;

        let start_time = Instant::now();
        let mut report = PassReport::new(&self.settings.source_lang, ticket.generation());

        for node in self.scanner.scan(root) {
            report.nodes_scanned += 1;
            match self.origin.annotation(&node) {
                Some(source) if source != self.tree.text(&node) => {
                    self.tree.set_text(&node, &source);
                    report.nodes_restored += 1;
                }
                _ => report.nodes_skipped += 1,
            }
        }

        report.elapsed = start_time.elapsed();
        tracing::info!(
            "恢复原文完成: 恢复 {} / {} 个文本节点",
            report.nodes_restored,
            report.nodes_scanned
        );

        Ok(report)
    }

    async fn translate_node(
        &self,
        node: &T::Node,
        target: &str,
        ticket: PassTicket<'_>,
    ) -> NodeOutcome {
        let source = self.origin.get_source(node);
        let (leading, core, trailing) = split_padding(&source);
        if core.is_empty() {
            return NodeOutcome::Skipped;
        }

        let result = self.provider.translate(core, target).await;

        // 等待期间可能已有更新的轮次开始
        if !ticket.is_current() {
            return NodeOutcome::Discarded;
        }

        // 空译文按失败处理，节点保留当前文本
        let result = result.and_then(|translated| {
            if translated.trim().is_empty() {
                Err(helpers::provider_error("翻译结果为空"))
            } else {
                Ok(translated)
            }
        });

        match result {
            Ok(translated) => {
                self.tree
                    .set_text(node, &format!("{}{}{}", leading, translated.trim(), trailing));
                self.origin.record_source(node, &source);
                NodeOutcome::Translated
            }
            Err(e) => {
                tracing::warn!("文本翻译失败，保留当前文本 {:?}: {}", truncate(core, 40), e);
                NodeOutcome::Failed(e)
            }
        }
    }
}

/// 拆分首尾空白
fn split_padding(text: &str) -> (&str, &str, &str) {
    let core = text.trim();
    let start = text.len() - text.trim_start().len();
    let end = start + core.len();
    (&text[..start], core, &text[end..])
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
