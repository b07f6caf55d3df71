//! 文本处理管道
//!
//! - `tree`: 文档树抽象
//! - `scanner`: 文本节点扫描
//! - `origin`: 源语言原文记录
//! - `batch`: 批次翻译与恢复

pub mod batch;
pub mod origin;
pub mod scanner;
pub mod tree;

pub use batch::{BatchOrchestrator, GenerationCounter, PassReport, PassSettings, PassTicket};
pub use origin::OriginCache;
pub use scanner::{ScanStats, TextNodeScanner, TextNodes};
pub use tree::{DomTree, NodeKind, RcDomTree};
