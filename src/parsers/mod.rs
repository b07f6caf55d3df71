//! # 解析器模块
//!
//! 负责把已渲染的页面读入DOM、在DOM上做读写，再把结果写回字节流。
//!
//! - `html` - HTML文档解析、DOM操作、序列化

pub mod html;

pub use html::{html_to_dom, serialize_document};
