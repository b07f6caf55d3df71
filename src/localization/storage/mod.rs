//! 语言偏好存储
//!
//! - `preference`: 偏好存储接口及其 redb / 内存实现

pub mod preference;

pub use preference::{MemoryPreferenceStore, PreferenceStore, RedbPreferenceStore};
