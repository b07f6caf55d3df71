//! 文本节点扫描器
//!
//! 深度优先遍历根节点下的文档树，惰性产出可翻译的文本叶子节点

use super::tree::{DomTree, NodeKind};
use crate::localization::config::constants;

/// 扫描统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub nodes_visited: usize,
    pub subtrees_skipped: usize,
    pub blank_texts: usize,
    pub eligible_texts: usize,
}

/// 文本节点扫描器
#[derive(Debug, Clone)]
pub struct TextNodeScanner<'t, T: DomTree> {
    tree: &'t T,
    skip_elements: Vec<String>,
}

impl<'t, T: DomTree> TextNodeScanner<'t, T> {
    pub fn new(tree: &'t T, skip_elements: &[String]) -> Self {
        Self {
            tree,
            skip_elements: skip_elements.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// 使用内置跳过列表创建扫描器
    pub fn with_default_skips(tree: &'t T) -> Self {
        Self {
            tree,
            skip_elements: constants::SKIP_ELEMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// 扫描 `root` 下的文本节点
    ///
    /// 返回的迭代器只能消费一次；再次调用会重新遍历树的当前状态
    pub fn scan(&self, root: &T::Node) -> TextNodes<'_, 't, T> {
        TextNodes {
            scanner: self,
            stack: vec![root.clone()],
            stats: ScanStats::default(),
        }
    }

    /// 标签是否属于代码、样式或不渲染的元素
    pub fn is_skipped_tag(&self, tag: &str) -> bool {
        self.skip_elements.iter().any(|skip| skip == tag)
    }

    fn is_eligible(&self, node: &T::Node) -> bool {
        if let Some(tag) = self.tree.parent_tag(node) {
            if self.is_skipped_tag(&tag) {
                return false;
            }
        }
        !self.tree.text(node).trim().is_empty()
    }
}

/// 惰性文本节点序列
pub struct TextNodes<'s, 't, T: DomTree> {
    scanner: &'s TextNodeScanner<'t, T>,
    stack: Vec<T::Node>,
    stats: ScanStats,
}

impl<T: DomTree> TextNodes<'_, '_, T> {
    /// 已遍历部分的统计
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }
}

impl<T: DomTree> Iterator for TextNodes<'_, '_, T> {
    type Item = T::Node;

    fn next(&mut self) -> Option<T::Node> {
        let tree = self.scanner.tree;

        while let Some(node) = self.stack.pop() {
            self.stats.nodes_visited += 1;

            match tree.kind(&node) {
                NodeKind::Text => {
                    if self.scanner.is_eligible(&node) {
                        self.stats.eligible_texts += 1;
                        return Some(node);
                    }
                    self.stats.blank_texts += 1;
                }
                NodeKind::Element(tag) if self.scanner.is_skipped_tag(&tag) => {
                    self.stats.subtrees_skipped += 1;
                }
                NodeKind::Element(_) | NodeKind::Other => {
                    // 逆序压栈，保证按文档顺序弹出
                    self.stack.extend(tree.children(&node).into_iter().rev());
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::pipeline::tree::RcDomTree;
    use crate::parsers::html::{find_first_element, html_to_dom};

    fn texts(html: &str, root_tag: &str) -> Vec<String> {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        let root = find_first_element(&dom.document, root_tag).unwrap();
        let tree = RcDomTree;
        let scanner = TextNodeScanner::with_default_skips(&tree);
        scanner.scan(&root).map(|n| tree.text(&n)).collect()
    }

    #[test]
    fn test_document_order() {
        let found = texts(
            "<main><h1>Title</h1><p>First <b>bold</b> last</p><ul><li>A</li><li>B</li></ul></main>",
            "main",
        );
        assert_eq!(found, vec!["Title", "First ", "bold", " last", "A", "B"]);
    }

    #[test]
    fn test_skips_code_style_and_blank() {
        let found = texts(
            "<main>\n  <script>var x = 'hi';</script><style>p{}</style>\
             <p>Keep</p>   <pre><span>code</span></pre><noscript>ns</noscript>\
             <textarea>typed</textarea></main>",
            "main",
        );
        assert_eq!(found, vec!["Keep"]);
    }

    #[test]
    fn test_root_limits_scope() {
        let html = "<body><nav>Menu</nav><main><p>Body</p></main><footer>Foot</footer></body>";
        assert_eq!(texts(html, "main"), vec!["Body"]);
        assert_eq!(texts(html, "body"), vec!["Menu", "Body", "Foot"]);
    }

    #[test]
    fn test_rescan_sees_current_state() {
        let dom = html_to_dom(b"<main><p>One</p></main>", "utf-8").unwrap();
        let root = find_first_element(&dom.document, "main").unwrap();
        let tree = RcDomTree;
        let scanner = TextNodeScanner::with_default_skips(&tree);

        let first: Vec<_> = scanner.scan(&root).collect();
        assert_eq!(first.len(), 1);
        tree.set_text(&first[0], "   ");

        assert_eq!(scanner.scan(&root).count(), 0);
    }

    #[test]
    fn test_scan_stats() {
        let dom = html_to_dom(b"<main><p>a</p> <script>x</script></main>", "utf-8").unwrap();
        let root = find_first_element(&dom.document, "main").unwrap();
        let tree = RcDomTree;
        let scanner = TextNodeScanner::with_default_skips(&tree);

        let mut nodes = scanner.scan(&root);
        while nodes.next().is_some() {}

        let stats = nodes.stats();
        assert_eq!(stats.eligible_texts, 1);
        assert_eq!(stats.blank_texts, 1);
        assert_eq!(stats.subtrees_skipped, 1);
    }
}
