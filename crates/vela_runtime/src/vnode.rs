//! Virtual node model
//!
//! A [`VNode`] is a cheap description of one unit of host UI. Render
//! functions build fresh trees on every render; the renderer compares them
//! against the previous tree and records the realized host handles back into
//! the nodes it mounts.

use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use vela_core::Value;

use crate::component::{Component, ComponentInstance};
use crate::host::HostNode;
use crate::key::Key;

/// The kind of a node, with the data that identifies its type
#[derive(Clone)]
pub enum VNodeType {
    /// Host element with a tag name
    Element(Rc<str>),
    /// Component instance boundary
    Component(Component),
    /// Text node; content lives in [`Children::Text`]
    Text,
    /// Comment node; content lives in [`Children::Text`]
    Comment,
    /// Transparent group of children between two anchors
    Fragment,
}

impl VNodeType {
    pub fn name(&self) -> &str {
        match self {
            VNodeType::Element(tag) => tag,
            VNodeType::Component(c) => c.name(),
            VNodeType::Text => "#text",
            VNodeType::Comment => "#comment",
            VNodeType::Fragment => "#fragment",
        }
    }

    /// Same kind and, for elements and components, same tag or definition
    pub fn same_type(&self, other: &VNodeType) -> bool {
        match (self, other) {
            (VNodeType::Element(a), VNodeType::Element(b)) => a == b,
            (VNodeType::Component(a), VNodeType::Component(b)) => a.ptr_eq(b),
            (VNodeType::Text, VNodeType::Text)
            | (VNodeType::Comment, VNodeType::Comment)
            | (VNodeType::Fragment, VNodeType::Fragment) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for VNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNodeType::Element(tag) => write!(f, "Element({tag})"),
            VNodeType::Component(c) => write!(f, "Component({})", c.name()),
            VNodeType::Text => f.write_str("Text"),
            VNodeType::Comment => f.write_str("Comment"),
            VNodeType::Fragment => f.write_str("Fragment"),
        }
    }
}

/// Children of a node
#[derive(Clone, Debug, Default)]
pub enum Children {
    #[default]
    None,
    Text(String),
    List(Vec<VNode>),
}

impl Children {
    pub fn is_none(&self) -> bool {
        matches!(self, Children::None)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Children::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[VNode]> {
        match self {
            Children::List(list) => Some(list),
            _ => None,
        }
    }
}

impl From<Vec<VNode>> for Children {
    fn from(list: Vec<VNode>) -> Self {
        Children::List(list)
    }
}

impl From<&str> for Children {
    fn from(text: &str) -> Self {
        Children::Text(text.to_string())
    }
}

impl From<String> for Children {
    fn from(text: String) -> Self {
        Children::Text(text)
    }
}

// =============================================================================
// PROPS
// =============================================================================

/// Event handler stored as a prop; compared by identity
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&Value)>);

impl Handler {
    pub fn new(f: impl Fn(&Value) + 'static) -> Self {
        Handler(Rc::new(f))
    }

    pub fn call(&self, event: &Value) {
        (self.0)(event)
    }

    pub fn ptr_eq(&self, other: &Handler) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.0) as *const (),
            Rc::as_ptr(&other.0) as *const (),
        )
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// A single prop value
#[derive(Clone, Debug)]
pub enum PropValue {
    Value(Value),
    Handler(Handler),
}

impl PropValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            PropValue::Value(v) => Some(v),
            PropValue::Handler(_) => None,
        }
    }

    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            PropValue::Handler(h) => Some(h),
            PropValue::Value(_) => None,
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Value(a), PropValue::Value(b)) => a.same_value(b),
            (PropValue::Handler(a), PropValue::Handler(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<Value> for PropValue {
    fn from(v: Value) -> Self {
        PropValue::Value(v)
    }
}

impl From<Handler> for PropValue {
    fn from(h: Handler) -> Self {
        PropValue::Handler(h)
    }
}

macro_rules! prop_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PropValue {
                fn from(v: $ty) -> Self {
                    PropValue::Value(Value::from(v))
                }
            }
        )*
    };
}

prop_value_from!(bool, i32, i64, f64, &str, String);

/// Insertion-ordered prop map
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props(IndexMap<String, PropValue>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style value prop
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), PropValue::Value(value.into()));
        self
    }

    /// Builder-style event handler prop (`on("click", ..)` stores `onClick`)
    pub fn on(mut self, event: &str, handler: impl Fn(&Value) + 'static) -> Self {
        self.0
            .insert(handler_key(event), PropValue::Handler(Handler::new(handler)));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PropValue) -> Option<PropValue> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    /// Value of a non-handler prop
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.0.get(key).and_then(PropValue::as_value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        self.0.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Prop name for an event: `click` -> `onClick`
pub fn handler_key(event: &str) -> String {
    let mut chars = event.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_uppercase(), chars.as_str()),
        None => "on".to_string(),
    }
}

// =============================================================================
// VNODE
// =============================================================================

/// A node in the virtual tree
#[derive(Clone)]
pub struct VNode {
    ty: VNodeType,
    props: Props,
    children: Children,
    key: Option<Key>,
    /// Realized host node (fragment start anchor for fragments)
    pub(crate) el: Cell<Option<HostNode>>,
    /// Fragment end anchor
    pub(crate) anchor: Cell<Option<HostNode>>,
    pub(crate) component: RefCell<Option<Rc<ComponentInstance>>>,
}

impl VNode {
    /// Build a node. A `key` prop is lifted out of the props into the node key.
    pub fn new(ty: VNodeType, mut props: Props, children: Children) -> Self {
        let key = props.remove("key").and_then(|prop| match prop {
            PropValue::Value(Value::Null) => None,
            PropValue::Value(Value::Int(i)) => Some(Key::Int(i)),
            PropValue::Value(Value::Str(s)) => Some(Key::Str(s)),
            PropValue::Value(other) => Some(Key::from(other.to_string())),
            PropValue::Handler(_) => None,
        });

        let children = match (&ty, children) {
            (VNodeType::Fragment, Children::Text(text)) => {
                Children::List(vec![VNode::text(text)])
            }
            (VNodeType::Fragment, Children::None) => Children::List(Vec::new()),
            (_, children) => children,
        };

        Self {
            ty,
            props,
            children,
            key,
            el: Cell::new(None),
            anchor: Cell::new(None),
            component: RefCell::new(None),
        }
    }

    pub fn element(tag: &str, props: Props, children: impl Into<Children>) -> Self {
        Self::new(VNodeType::Element(Rc::from(tag)), props, children.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(VNodeType::Text, Props::new(), Children::Text(text.into()))
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self::new(VNodeType::Comment, Props::new(), Children::Text(text.into()))
    }

    pub fn fragment(children: Vec<VNode>) -> Self {
        Self::new(VNodeType::Fragment, Props::new(), Children::List(children))
    }

    pub fn component(component: &Component, props: Props) -> Self {
        Self::new(
            VNodeType::Component(component.clone()),
            props,
            Children::None,
        )
    }

    /// Set the node key
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn ty(&self) -> &VNodeType {
        &self.ty
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// Realized host node, once mounted
    pub fn el(&self) -> Option<HostNode> {
        self.el.get()
    }

    /// Instance backing a mounted component node
    pub fn component_instance(&self) -> Option<Rc<ComponentInstance>> {
        self.component.borrow().clone()
    }

    /// Text content of a text or comment node
    pub fn text_content(&self) -> &str {
        self.children.as_text().unwrap_or_default()
    }

    pub fn is_element(&self) -> bool {
        matches!(self.ty, VNodeType::Element(_))
    }

    pub fn is_component(&self) -> bool {
        matches!(self.ty, VNodeType::Component(_))
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.ty, VNodeType::Fragment)
    }
}

/// Whether `n2` can be patched onto `n1` in place: same kind, type and key
pub fn is_same_vnode_type(n1: &VNode, n2: &VNode) -> bool {
    n1.ty.same_type(&n2.ty) && n1.key == n2.key
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        s.field("type", &self.ty);
        if let Some(key) = &self.key {
            s.field("key", key);
        }
        if !self.props.is_empty() {
            s.field("props", &self.props);
        }
        if !self.children.is_none() {
            s.field("children", &self.children);
        }
        if let Some(el) = self.el.get() {
            s.field("el", &el);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prop_is_extracted() {
        let node = VNode::element("li", Props::new().with("key", "a").with("class", "x"), "A");
        assert_eq!(node.key(), Some(&Key::from("a")));
        assert!(!node.props().contains_key("key"));
        assert!(node.props().contains_key("class"));

        let numbered = VNode::element("li", Props::new().with("key", 3), Children::None);
        assert_eq!(numbered.key(), Some(&Key::Int(3)));
    }

    #[test]
    fn test_same_vnode_type() {
        let a = VNode::element("div", Props::new(), Children::None);
        let b = VNode::element("div", Props::new().with("id", "x"), Children::None);
        let c = VNode::element("span", Props::new(), Children::None);
        assert!(is_same_vnode_type(&a, &b));
        assert!(!is_same_vnode_type(&a, &c));

        let keyed = VNode::element("div", Props::new(), Children::None).with_key("k");
        assert!(!is_same_vnode_type(&a, &keyed));

        assert!(is_same_vnode_type(&VNode::text("a"), &VNode::text("b")));
        assert!(!is_same_vnode_type(&VNode::text("a"), &VNode::comment("a")));
    }

    #[test]
    fn test_fragment_children_normalized_to_list() {
        let node = VNode::new(VNodeType::Fragment, Props::new(), Children::Text("hi".into()));
        let list = node.children().as_list().unwrap_or_default();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].text_content(), "hi");

        let empty = VNode::new(VNodeType::Fragment, Props::new(), Children::None);
        assert_eq!(empty.children().as_list().map(<[VNode]>::len), Some(0));
    }

    #[test]
    fn test_prop_value_equality() {
        let handler = Handler::new(|_| {});
        assert_eq!(
            PropValue::Handler(handler.clone()),
            PropValue::Handler(handler)
        );
        assert_ne!(
            PropValue::Handler(Handler::new(|_| {})),
            PropValue::Handler(Handler::new(|_| {}))
        );
        assert_eq!(PropValue::from(1), PropValue::from(1));
        assert_ne!(PropValue::from(1), PropValue::from("1"));
    }

    #[test]
    fn test_handler_key() {
        assert_eq!(handler_key("click"), "onClick");
        assert_eq!(handler_key("input"), "onInput");
    }
}
