//! # pagelocale
//!
//! 就地本地化已渲染的 HTML 文档。
//!
//! ## 模块组织
//!
//! - `env` - 类型化的环境变量
//! - `parsers` - HTML 解析与序列化
//! - `localization` - 本地化引擎

pub mod env;
pub mod localization;
pub mod parsers;

pub use localization::*;
pub use parsers::{html_to_dom, serialize_document};
