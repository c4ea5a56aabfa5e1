//! Test harness for scenario tests
//!
//! Provides an in-memory host tree that records every operation the renderer
//! performs on it, so reconciliation properties can be asserted by counting
//! creates, inserts, moves and removals.

use indexmap::IndexMap;
use slotmap::{new_key_type, Key, KeyData, SlotMap};
use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use vela_core::Value;
use vela_runtime::vnode::handler_key;
use vela_runtime::{
    App, AppConfig, Component, Handler, HostNode, HostOps, PropValue, Props, Renderer, Runtime,
};

new_key_type! {
    struct NodeKey;
}

fn to_host(key: NodeKey) -> HostNode {
    HostNode::from_raw(key.data().as_ffi())
}

fn to_key(node: HostNode) -> NodeKey {
    KeyData::from_ffi(node.to_raw()).into()
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum NodeKind {
    Element(String),
    Text,
    Comment,
}

struct MemNode {
    kind: NodeKind,
    text: String,
    props: IndexMap<String, PropValue>,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

impl MemNode {
    fn new(kind: NodeKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            props: IndexMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Number of calls per host operation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HostOpCounts {
    pub create_element: usize,
    pub create_text: usize,
    pub create_comment: usize,
    pub set_element_text: usize,
    pub set_text: usize,
    /// Inserts of detached nodes
    pub insert: usize,
    /// Inserts of nodes that already had a parent
    pub moves: usize,
    pub remove: usize,
    pub patch_prop: usize,
}

impl HostOpCounts {
    pub fn creates(&self) -> usize {
        self.create_element + self.create_text + self.create_comment
    }

    /// Every operation that changes the host tree
    pub fn total(&self) -> usize {
        self.creates()
            + self.set_element_text
            + self.set_text
            + self.insert
            + self.moves
            + self.remove
            + self.patch_prop
    }
}

#[derive(Default)]
struct HostState {
    nodes: SlotMap<NodeKey, MemNode>,
    counts: HostOpCounts,
}

impl HostState {
    fn detach(&mut self, key: NodeKey) -> bool {
        let Some(parent) = self.nodes.get_mut(key).and_then(|node| node.parent.take()) else {
            return false;
        };
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.retain(|&child| child != key);
        }
        true
    }

    fn serialize_into(&self, key: NodeKey, out: &mut String) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        match &node.kind {
            NodeKind::Text => out.push_str(&node.text),
            NodeKind::Comment => {
                let _ = write!(out, "<!--{}-->", node.text);
            }
            NodeKind::Element(tag) => {
                let _ = write!(out, "<{tag}");
                for (name, value) in &node.props {
                    if let PropValue::Value(value) = value {
                        let _ = write!(out, " {name}=\"{value}\"");
                    }
                }
                out.push('>');
                if node.children.is_empty() {
                    out.push_str(&node.text);
                }
                for &child in &node.children {
                    self.serialize_into(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

/// In-memory host tree (cheap to clone; clones share the tree)
#[derive(Clone, Default)]
pub struct MemoryHost {
    state: Rc<RefCell<HostState>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached container element; not counted
    pub fn create_root(&self, id: &str) -> HostNode {
        let mut state = self.state.borrow_mut();
        let mut node = MemNode::new(NodeKind::Element("div".to_string()), "");
        node.props
            .insert("id".to_string(), PropValue::Value(Value::from(id)));
        to_host(state.nodes.insert(node))
    }

    pub fn counts(&self) -> HostOpCounts {
        self.state.borrow().counts
    }

    pub fn reset_counts(&self) {
        self.state.borrow_mut().counts = HostOpCounts::default();
    }

    /// Markup of the children of `node`
    pub fn inner_html(&self, node: HostNode) -> String {
        let state = self.state.borrow();
        let mut out = String::new();
        if let Some(mem) = state.nodes.get(to_key(node)) {
            if mem.children.is_empty() {
                out.push_str(&mem.text);
            }
            for &child in &mem.children {
                state.serialize_into(child, &mut out);
            }
        }
        out
    }

    /// Markup of `node` itself
    pub fn serialize(&self, node: HostNode) -> String {
        let mut out = String::new();
        self.state.borrow().serialize_into(to_key(node), &mut out);
        out
    }

    pub fn children(&self, node: HostNode) -> Vec<HostNode> {
        self.state
            .borrow()
            .nodes
            .get(to_key(node))
            .map(|mem| mem.children.iter().copied().map(to_host).collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, node: HostNode) -> Option<HostNode> {
        self.state
            .borrow()
            .nodes
            .get(to_key(node))
            .and_then(|mem| mem.parent)
            .map(to_host)
    }

    pub fn text(&self, node: HostNode) -> Option<String> {
        self.state
            .borrow()
            .nodes
            .get(to_key(node))
            .map(|mem| mem.text.clone())
    }

    pub fn prop(&self, node: HostNode, key: &str) -> Option<Value> {
        self.state
            .borrow()
            .nodes
            .get(to_key(node))
            .and_then(|mem| mem.props.get(key))
            .and_then(PropValue::as_value)
            .cloned()
    }

    /// Nodes currently attached somewhere under `root`, `root` excluded
    pub fn attached_count(&self, root: HostNode) -> usize {
        let state = self.state.borrow();
        let mut stack = vec![to_key(root)];
        let mut count = 0;
        while let Some(key) = stack.pop() {
            if let Some(node) = state.nodes.get(key) {
                count += node.children.len();
                stack.extend(node.children.iter().copied());
            }
        }
        count
    }

    /// First element under `root` (depth-first) with the given tag
    pub fn find_element(&self, root: HostNode, tag: &str) -> Option<HostNode> {
        let state = self.state.borrow();
        let mut stack = vec![to_key(root)];
        while let Some(key) = stack.pop() {
            let node = state.nodes.get(key)?;
            if key != to_key(root) && node.kind == NodeKind::Element(tag.to_string()) {
                return Some(to_host(key));
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Invoke the `event` handler prop of `node`. Returns false if it has none.
    pub fn dispatch(&self, node: HostNode, event: &str, payload: Value) -> bool {
        let handler: Option<Handler> = self
            .state
            .borrow()
            .nodes
            .get(to_key(node))
            .and_then(|mem| mem.props.get(&handler_key(event)))
            .and_then(PropValue::as_handler)
            .cloned();
        match handler {
            Some(handler) => {
                handler.call(&payload);
                true
            }
            None => false,
        }
    }
}

impl HostOps for MemoryHost {
    fn create_element(&mut self, tag: &str) -> HostNode {
        let mut state = self.state.borrow_mut();
        state.counts.create_element += 1;
        to_host(
            state
                .nodes
                .insert(MemNode::new(NodeKind::Element(tag.to_string()), "")),
        )
    }

    fn create_text(&mut self, text: &str) -> HostNode {
        let mut state = self.state.borrow_mut();
        state.counts.create_text += 1;
        to_host(state.nodes.insert(MemNode::new(NodeKind::Text, text)))
    }

    fn create_comment(&mut self, text: &str) -> HostNode {
        let mut state = self.state.borrow_mut();
        state.counts.create_comment += 1;
        to_host(state.nodes.insert(MemNode::new(NodeKind::Comment, text)))
    }

    fn set_element_text(&mut self, el: HostNode, text: &str) {
        let mut state = self.state.borrow_mut();
        state.counts.set_element_text += 1;
        let key = to_key(el);
        let children = state
            .nodes
            .get_mut(key)
            .map(|node| {
                node.text = text.to_string();
                std::mem::take(&mut node.children)
            })
            .unwrap_or_default();
        for child in children {
            if let Some(child) = state.nodes.get_mut(child) {
                child.parent = None;
            }
        }
    }

    fn set_text(&mut self, node: HostNode, text: &str) {
        let mut state = self.state.borrow_mut();
        state.counts.set_text += 1;
        if let Some(node) = state.nodes.get_mut(to_key(node)) {
            node.text = text.to_string();
        }
    }

    fn insert(&mut self, node: HostNode, parent: HostNode, anchor: Option<HostNode>) {
        let mut state = self.state.borrow_mut();
        let (key, parent_key) = (to_key(node), to_key(parent));
        if state.detach(key) {
            state.counts.moves += 1;
        } else {
            state.counts.insert += 1;
        }

        let Some(parent_node) = state.nodes.get_mut(parent_key) else {
            return;
        };
        let index = anchor
            .map(to_key)
            .and_then(|anchor| parent_node.children.iter().position(|&c| c == anchor))
            .unwrap_or(parent_node.children.len());
        parent_node.children.insert(index, key);
        if let Some(node) = state.nodes.get_mut(key) {
            node.parent = Some(parent_key);
        }
    }

    fn remove(&mut self, node: HostNode) {
        let mut state = self.state.borrow_mut();
        state.counts.remove += 1;
        state.detach(to_key(node));
    }

    fn patch_prop(
        &mut self,
        el: HostNode,
        key: &str,
        _prev: Option<&PropValue>,
        next: Option<&PropValue>,
    ) {
        let mut state = self.state.borrow_mut();
        state.counts.patch_prop += 1;
        if let Some(node) = state.nodes.get_mut(to_key(el)) {
            match next {
                Some(value) => {
                    node.props.insert(key.to_string(), value.clone());
                }
                None => {
                    node.props.shift_remove(key);
                }
            }
        }
    }

    fn next_sibling(&self, node: HostNode) -> Option<HostNode> {
        let state = self.state.borrow();
        let key = to_key(node);
        let parent = state.nodes.get(key)?.parent?;
        let siblings = &state.nodes.get(parent)?.children;
        let index = siblings.iter().position(|&c| c == key)?;
        siblings.get(index + 1).copied().map(to_host)
    }

    fn query_selector(&self, selector: &str) -> Option<HostNode> {
        let id = selector.strip_prefix('#')?;
        let state = self.state.borrow();
        state
            .nodes
            .iter()
            .find(|(_, node)| {
                node.props
                    .get("id")
                    .and_then(PropValue::as_value)
                    .and_then(Value::as_str)
                    == Some(id)
            })
            .map(|(key, _)| to_host(key))
    }
}

/// Per-test environment: an isolated runtime, a memory host and a root container
pub struct TestContext {
    pub host: MemoryHost,
    pub runtime: Runtime,
    pub renderer: Renderer,
    pub root: HostNode,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let host = MemoryHost::new();
        let runtime = Runtime::new();
        let root = host.create_root("app");
        let renderer = Renderer::builder(host.clone())
            .runtime(runtime.clone())
            .config(config)
            .build();
        Self {
            host,
            runtime,
            renderer,
            root,
        }
    }

    /// Mount `component` into the root container
    pub fn mount(&self, component: &Component, props: Props) -> anyhow::Result<App> {
        let app = self.renderer.create_app(component, props);
        app.mount(self.root)?;
        Ok(app)
    }

    pub fn html(&self) -> String {
        self.host.inner_html(self.root)
    }

    pub fn flush(&self) -> usize {
        self.runtime.scheduler.flush()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a scenario
#[derive(Debug)]
pub enum TestResult {
    Passed,
    Failed { reason: String },
}

impl TestResult {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestResult::Passed)
    }
}

/// Install a test subscriber honoring `RUST_LOG`; safe to call repeatedly
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}
