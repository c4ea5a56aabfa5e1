//! Host operation table
//!
//! The renderer has no platform knowledge. Everything it does to the host
//! tree goes through [`HostOps`], implemented by the platform adapter (a DOM
//! bridge, a native widget tree, or the in-memory host used by tests).

use crate::vnode::PropValue;

/// Opaque handle to a node in the host tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostNode(u64);

impl HostNode {
    /// Convert to raw u64 for storage
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from raw u64
    pub fn from_raw(raw: u64) -> Self {
        HostNode(raw)
    }
}

/// Operations the renderer performs on the host tree
pub trait HostOps {
    /// Create a detached element
    fn create_element(&mut self, tag: &str) -> HostNode;

    /// Create a detached text node
    fn create_text(&mut self, text: &str) -> HostNode;

    /// Create a detached comment node
    fn create_comment(&mut self, text: &str) -> HostNode;

    /// Replace all children of `el` with a single text content
    fn set_element_text(&mut self, el: HostNode, text: &str);

    /// Change the content of a text node
    fn set_text(&mut self, node: HostNode, text: &str);

    /// Insert (or move) `node` into `parent` before `anchor`, or last if `anchor` is `None`
    fn insert(&mut self, node: HostNode, parent: HostNode, anchor: Option<HostNode>);

    /// Detach `node` from its parent
    fn remove(&mut self, node: HostNode);

    /// Apply a prop change. `None` means absent on that side.
    fn patch_prop(
        &mut self,
        el: HostNode,
        key: &str,
        prev: Option<&PropValue>,
        next: Option<&PropValue>,
    );

    /// Sibling following `node` in its parent, if any
    fn next_sibling(&self, node: HostNode) -> Option<HostNode>;

    /// Resolve a selector to a node. Hosts without selector support return `None`.
    fn query_selector(&self, _selector: &str) -> Option<HostNode> {
        None
    }
}
