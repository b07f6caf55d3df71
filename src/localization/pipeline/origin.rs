//! 来源文本缓存
//!
//! 把文本节点的源语言原文记录在父元素的 `data-*` 属性上。每一轮翻译都从这里
//! 取原文，因此无论切换多少次语言，都不会把译文再翻译一遍。
//!
//! 父元素有多个文本子节点时，每个文本子节点占用一个槽位：第 0 个文本子节点
//! 使用基础属性名，第 k 个使用 `<基础属性名>-<k>`。

use super::tree::{DomTree, NodeKind};
use crate::localization::config::constants;

/// 来源文本缓存
#[derive(Debug, Clone)]
pub struct OriginCache<'t, T: DomTree> {
    tree: &'t T,
    attr: String,
}

impl<'t, T: DomTree> OriginCache<'t, T> {
    pub fn new(tree: &'t T, attr: &str) -> Self {
        Self {
            tree,
            attr: attr.to_string(),
        }
    }

    pub fn with_default_attr(tree: &'t T) -> Self {
        Self::new(tree, constants::DEFAULT_ANNOTATION_ATTR)
    }

    /// 节点的源语言原文
    ///
    /// 尚无记录时（第一轮翻译），页面仍显示原文，直接返回当前文本
    pub fn get_source(&self, node: &T::Node) -> String {
        self.annotation(node)
            .unwrap_or_else(|| self.tree.text(node))
    }

    /// 已记录的原文
    pub fn annotation(&self, node: &T::Node) -> Option<String> {
        let (parent, slot) = self.slot(node)?;
        self.tree.attr(&parent, &slot)
    }

    /// 记录原文
    ///
    /// 只有在尚无记录或记录与 `text` 相同时才写入；已记录的原文永远不会被
    /// 其他文本覆盖。返回记录后的槽位是否等于 `text`。
    pub fn record_source(&self, node: &T::Node, text: &str) -> bool {
        let Some((parent, slot)) = self.slot(node) else {
            return false;
        };

        match self.tree.attr(&parent, &slot) {
            Some(existing) if existing == text => true,
            Some(existing) => {
                tracing::debug!(
                    "保留已有原文记录 {}={:?}，忽略 {:?}",
                    slot,
                    existing,
                    text
                );
                false
            }
            None => {
                self.tree.set_attr(&parent, &slot, text);
                true
            }
        }
    }

    /// 节点所在的父元素及其属性槽位名
    fn slot(&self, node: &T::Node) -> Option<(T::Node, String)> {
        let parent = self.tree.parent(node)?;
        let ordinal = self
            .tree
            .children(&parent)
            .iter()
            .filter(|child| self.tree.kind(child) == NodeKind::Text)
            .position(|child| self.tree.same_node(child, node))?;

        let slot = if ordinal == 0 {
            self.attr.clone()
        } else {
            format!("{}-{}", self.attr, ordinal)
        };

        Some((parent, slot))
    }
}
