//! Node construction helpers
//!
//! ```
//! use vela_runtime::{h, h_with, Props, VNode};
//!
//! let list = h("ul", vec![
//!     h_with("li", Props::new().with("key", "a"), "A"),
//!     h_with("li", Props::new().with("key", "b"), "B"),
//! ]);
//! assert_eq!(list.children().as_list().map(<[VNode]>::len), Some(2));
//!
//! let button = h("button", Props::new().with("type", "submit"));
//! assert!(button.props().contains_key("type"));
//! ```

use std::rc::Rc;

use crate::component::Component;
use crate::vnode::{Children, Props, VNode, VNodeType};

/// Second argument of [`h`], disambiguated by its type
#[derive(Debug, Default)]
pub enum HArg {
    #[default]
    None,
    /// An ordered collection becomes the child list
    Children(Vec<VNode>),
    /// A single node becomes a one-element child list
    Node(VNode),
    /// Anything else is props
    Props(Props),
    /// Text content
    Text(String),
}

impl From<Vec<VNode>> for HArg {
    fn from(children: Vec<VNode>) -> Self {
        HArg::Children(children)
    }
}

impl From<VNode> for HArg {
    fn from(node: VNode) -> Self {
        HArg::Node(node)
    }
}

impl From<Props> for HArg {
    fn from(props: Props) -> Self {
        HArg::Props(props)
    }
}

impl From<&str> for HArg {
    fn from(text: &str) -> Self {
        HArg::Text(text.to_string())
    }
}

impl From<String> for HArg {
    fn from(text: String) -> Self {
        HArg::Text(text)
    }
}

impl From<()> for HArg {
    fn from(_: ()) -> Self {
        HArg::None
    }
}

impl From<&str> for VNodeType {
    fn from(tag: &str) -> Self {
        VNodeType::Element(Rc::from(tag))
    }
}

impl From<String> for VNodeType {
    fn from(tag: String) -> Self {
        VNodeType::Element(Rc::from(tag))
    }
}

impl From<Component> for VNodeType {
    fn from(component: Component) -> Self {
        VNodeType::Component(component)
    }
}

impl From<&Component> for VNodeType {
    fn from(component: &Component) -> Self {
        VNodeType::Component(component.clone())
    }
}

/// Build a node from a type and one argument that is either children or props
pub fn h(ty: impl Into<VNodeType>, arg: impl Into<HArg>) -> VNode {
    let ty = ty.into();
    match arg.into() {
        HArg::None => VNode::new(ty, Props::new(), Children::None),
        HArg::Children(children) => VNode::new(ty, Props::new(), Children::List(children)),
        HArg::Node(node) => VNode::new(ty, Props::new(), Children::List(vec![node])),
        HArg::Props(props) => VNode::new(ty, props, Children::List(Vec::new())),
        HArg::Text(text) => VNode::new(ty, Props::new(), Children::Text(text)),
    }
}

/// Build a node from a type, props and children
pub fn h_with(ty: impl Into<VNodeType>, props: Props, children: impl Into<Children>) -> VNode {
    VNode::new(ty.into(), props, children.into())
}

impl From<VNode> for Children {
    fn from(node: VNode) -> Self {
        Children::List(vec![node])
    }
}

impl From<()> for Children {
    fn from(_: ()) -> Self {
        Children::None
    }
}
