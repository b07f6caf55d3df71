//! 引擎核心
//!
//! - `context`: 语言上下文与状态机

pub mod context;

pub use context::{ChangeOutcome, LanguageContext};
