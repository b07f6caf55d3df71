//! DOM树抽象
//!
//! 扫描器、来源缓存和批次编排只通过 [`DomTree`] 访问文档，
//! 因此既可以运行在 html5ever 的 `RcDom` 上，也可以运行在测试用的内存树上。

use std::rc::Rc;

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::{
    get_node_attr, get_node_name, get_parent_node, get_text_content, set_node_attr,
    set_text_content,
};

/// 节点类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// 元素节点，携带小写标签名
    Element(String),
    /// 文本叶子节点
    Text,
    /// 文档、注释、doctype 等
    Other,
}

/// 可读写的文档树
pub trait DomTree {
    type Node: Clone;

    fn kind(&self, node: &Self::Node) -> NodeKind;

    /// 按文档顺序返回子节点
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn same_node(&self, a: &Self::Node, b: &Self::Node) -> bool;

    /// 文本节点内容；非文本节点返回空串
    fn text(&self, node: &Self::Node) -> String;

    fn set_text(&self, node: &Self::Node, text: &str);

    fn attr(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attr(&self, node: &Self::Node, name: &str, value: &str);

    /// 父元素的标签名
    fn parent_tag(&self, node: &Self::Node) -> Option<String> {
        match self.kind(&self.parent(node)?) {
            NodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }
}

impl<T: DomTree + ?Sized> DomTree for &T {
    type Node = T::Node;

    fn kind(&self, node: &Self::Node) -> NodeKind {
        (**self).kind(node)
    }

    fn children(&self, node: &Self::Node) -> Vec<Self::Node> {
        (**self).children(node)
    }

    fn parent(&self, node: &Self::Node) -> Option<Self::Node> {
        (**self).parent(node)
    }

    fn same_node(&self, a: &Self::Node, b: &Self::Node) -> bool {
        (**self).same_node(a, b)
    }

    fn text(&self, node: &Self::Node) -> String {
        (**self).text(node)
    }

    fn set_text(&self, node: &Self::Node, text: &str) {
        (**self).set_text(node, text)
    }

    fn attr(&self, node: &Self::Node, name: &str) -> Option<String> {
        (**self).attr(node, name)
    }

    fn set_attr(&self, node: &Self::Node, name: &str, value: &str) {
        (**self).set_attr(node, name, value)
    }
}

/// `markup5ever_rcdom` 上的 [`DomTree`] 实现
#[derive(Debug, Clone, Copy, Default)]
pub struct RcDomTree;

impl DomTree for RcDomTree {
    type Node = Handle;

    fn kind(&self, node: &Handle) -> NodeKind {
        match node.data {
            NodeData::Element { .. } => NodeKind::Element(
                get_node_name(node).unwrap_or_default().to_ascii_lowercase(),
            ),
            NodeData::Text { .. } => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn children(&self, node: &Handle) -> Vec<Handle> {
        node.children.borrow().clone()
    }

    fn parent(&self, node: &Handle) -> Option<Handle> {
        get_parent_node(node)
    }

    fn same_node(&self, a: &Handle, b: &Handle) -> bool {
        Rc::ptr_eq(a, b)
    }

    fn text(&self, node: &Handle) -> String {
        get_text_content(node).unwrap_or_default()
    }

    fn set_text(&self, node: &Handle, text: &str) {
        set_text_content(node, text);
    }

    fn attr(&self, node: &Handle, name: &str) -> Option<String> {
        get_node_attr(node, name)
    }

    fn set_attr(&self, node: &Handle, name: &str, value: &str) {
        set_node_attr(node, name, Some(value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::{find_first_element, html_to_dom};

    #[test]
    fn test_rcdom_tree_navigation() {
        let dom = html_to_dom(b"<main><p>One</p><!-- c --></main>", "utf-8").unwrap();
        let tree = RcDomTree;
        let main = find_first_element(&dom.document, "main").unwrap();

        assert_eq!(tree.kind(&main), NodeKind::Element("main".to_string()));

        let children = tree.children(&main);
        assert_eq!(children.len(), 2);
        assert_eq!(tree.kind(&children[1]), NodeKind::Other);

        let text = tree.children(&children[0])[0].clone();
        assert_eq!(tree.kind(&text), NodeKind::Text);
        assert_eq!(tree.text(&text), "One");
        assert_eq!(tree.parent_tag(&text).as_deref(), Some("p"));
        assert!(tree.same_node(&tree.parent(&text).unwrap(), &children[0]));
        assert!(!tree.same_node(&children[0], &main));
    }
}
