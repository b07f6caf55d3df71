// 集成测试公共模块
//
// 提供内存文档树、模拟翻译服务、模拟 DeepLX 服务器和 HTML 辅助工具

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use markup5ever_rcdom::{Handle, RcDom};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use pagelocale::localization::{
    DomTree, LocalizationError, LocalizationResult, NodeKind, PassSettings, TranslationProvider,
};
use pagelocale::parsers::html::{find_first_element, get_text_content, html_to_dom};

/// 内存树节点
#[derive(Debug, Clone)]
enum FakeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct FakeNode {
    data: FakeData,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// 基于数组的内存文档树，节点用下标表示
#[derive(Debug, Default)]
pub struct FakeTree {
    nodes: RefCell<Vec<FakeNode>>,
}

impl FakeTree {
    /// 创建只有根元素的树
    pub fn with_root(tag: &str) -> (Self, usize) {
        let tree = Self::default();
        let root = tree.push(None, FakeData::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
        });
        (tree, root)
    }

    fn push(&self, parent: Option<usize>, data: FakeData) -> usize {
        let mut nodes = self.nodes.borrow_mut();
        let id = nodes.len();
        nodes.push(FakeNode {
            data,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            nodes[parent].children.push(id);
        }
        id
    }

    pub fn add_element(&self, parent: usize, tag: &str) -> usize {
        self.push(Some(parent), FakeData::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
        })
    }

    pub fn add_text(&self, parent: usize, text: &str) -> usize {
        self.push(Some(parent), FakeData::Text(text.to_string()))
    }

    /// 添加 `<tag>text</tag>`，返回文本节点
    pub fn add_leaf(&self, parent: usize, tag: &str, text: &str) -> usize {
        let element = self.add_element(parent, tag);
        self.add_text(element, text)
    }

    /// 添加 n 个 `<p>Text i</p>`，返回文本节点
    pub fn add_paragraphs(&self, parent: usize, n: usize) -> Vec<usize> {
        (0..n)
            .map(|i| self.add_leaf(parent, "p", &format!("Text {}", i)))
            .collect()
    }

    pub fn text_of(&self, node: usize) -> String {
        self.text(&node)
    }

    pub fn parent_of(&self, node: usize) -> usize {
        self.nodes.borrow()[node].parent.expect("node has a parent")
    }

    /// 文本节点父元素上的原文记录（第 0 槽位）
    pub fn annotation_of(&self, text_node: usize) -> Option<String> {
        self.attr(&self.parent_of(text_node), "data-origin-text")
    }
}

impl DomTree for FakeTree {
    type Node = usize;

    fn kind(&self, node: &usize) -> NodeKind {
        match &self.nodes.borrow()[*node].data {
            FakeData::Element { tag, .. } => NodeKind::Element(tag.clone()),
            FakeData::Text(_) => NodeKind::Text,
        }
    }

    fn children(&self, node: &usize) -> Vec<usize> {
        self.nodes.borrow()[*node].children.clone()
    }

    fn parent(&self, node: &usize) -> Option<usize> {
        self.nodes.borrow()[*node].parent
    }

    fn same_node(&self, a: &usize, b: &usize) -> bool {
        a == b
    }

    fn text(&self, node: &usize) -> String {
        match &self.nodes.borrow()[*node].data {
            FakeData::Text(text) => text.clone(),
            FakeData::Element { .. } => String::new(),
        }
    }

    fn set_text(&self, node: &usize, text: &str) {
        if let FakeData::Text(current) = &mut self.nodes.borrow_mut()[*node].data {
            *current = text.to_string();
        }
    }

    fn attr(&self, node: &usize, name: &str) -> Option<String> {
        match &self.nodes.borrow()[*node].data {
            FakeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone()),
            FakeData::Text(_) => None,
        }
    }

    fn set_attr(&self, node: &usize, name: &str, value: &str) {
        if let FakeData::Element { attrs, .. } = &mut self.nodes.borrow_mut()[*node].data {
            match attrs.iter_mut().find(|(key, _)| key == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }
}

/// 模拟翻译服务
///
/// 译文为 `<target>:<text>`，便于检查是否从原文翻译
#[derive(Debug, Default)]
pub struct MockProvider {
    delay: Option<Duration>,
    fail_on: RefCell<HashSet<String>>,
    fail_all: Cell<bool>,
    calls: RefCell<Vec<(String, String)>>,
    in_flight: Cell<usize>,
    max_in_flight: Cell<usize>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用等待 `delay`（配合暂停的时钟使用）
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail_on(&self, text: &str) {
        self.fail_on.borrow_mut().insert(text.to_string());
    }

    pub fn fail_all(&self, fail: bool) {
        self.fail_all.set(fail);
    }

    /// 按调用顺序记录的 (文本, 目标语言)
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn calls_for(&self, target: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|(_, t)| t == target)
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.get()
    }
}

impl TranslationProvider for MockProvider {
    async fn translate(&self, text: &str, target: &str) -> LocalizationResult<String> {
        self.calls
            .borrow_mut()
            .push((text.to_string(), target.to_string()));

        let in_flight = self.in_flight.get() + 1;
        self.in_flight.set(in_flight);
        self.max_in_flight.set(self.max_in_flight.get().max(in_flight));

        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        self.in_flight.set(self.in_flight.get() - 1);

        if self.fail_all.get() || self.fail_on.borrow().contains(text) {
            return Err(LocalizationError::ProviderError(format!(
                "mock failure for {:?}",
                text
            )));
        }

        Ok(format!("{}:{}", target, text))
    }
}

/// 测试用编排参数
pub fn settings(batch_size: usize) -> PassSettings {
    PassSettings {
        batch_size,
        ..PassSettings::default()
    }
}

/// HTML 测试辅助工具
pub struct HtmlTestHelper;

impl HtmlTestHelper {
    pub fn parse(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "utf-8").expect("valid html")
    }

    pub fn element(dom: &RcDom, tag: &str) -> Handle {
        find_first_element(&dom.document, tag).expect("element present")
    }

    /// 元素的第一个子节点的文本
    pub fn first_text(dom: &RcDom, tag: &str) -> String {
        let element = Self::element(dom, tag);
        let child = element.children.borrow()[0].clone();
        get_text_content(&child).unwrap_or_default()
    }

    pub fn donation_page() -> String {
        r#"<!DOCTYPE html>
<html lang="en">
<head><title>Give Food</title><style>p { color: red; }</style></head>
<body>
  <nav><a href="/">Home</a></nav>
  <main>
    <h1>Feed a family</h1>
    <p>Every meal <b>counts</b>. Donate today.</p>
    <script>var label = "Donate";</script>
    <pre><code>not translated</code></pre>
    <button>  Donate now  </button>
  </main>
  <footer>Contact us</footer>
</body>
</html>"#
            .to_string()
    }
}

/// 一次收到的 HTTP 请求
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub head: String,
    pub body: String,
}

/// 模拟 DeepLX 服务器
///
/// 每个连接处理一个请求，按顺序返回预设的 (状态码, 响应体)
pub struct MockDeepLx {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockDeepLx {
    pub async fn start(responses: Vec<(u16, &str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let responses: Vec<(u16, String)> = responses
            .into_iter()
            .map(|(status, body)| (status, body.to_string()))
            .collect();
        let recorded = Arc::clone(&requests);

        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                if let Some(request) = read_request(&mut socket).await {
                    recorded.lock().unwrap().push(request);
                }
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason(status),
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            url: format!("http://{}/translate", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some(RecordedRequest { head, body })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}
