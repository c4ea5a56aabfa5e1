//! Application handle
//!
//! An [`App`] owns a root component and the renderer it mounts through.
//! Mounting renders the root into a host container; state changes after that
//! are applied when the scheduler flushes.
//!
//! ```ignore
//! let app = renderer.create_app(&counter, Props::new());
//! app.mount("#app")?;
//!
//! app.dispatch(|| state.set("count", 1));
//! app.unmount()?;
//! ```

use std::cell::Cell;
use std::rc::Rc;

use crate::component::{Component, ComponentInstance};
use crate::error::{Result, RuntimeError};
use crate::host::{HostNode, HostOps};
use crate::renderer::{create_renderer, Renderer};
use crate::vnode::{Props, VNode};

/// Where an application mounts
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MountTarget {
    /// A host node the caller already holds
    Node(HostNode),
    /// Resolved through [`HostOps::query_selector`]
    Selector(String),
}

impl From<HostNode> for MountTarget {
    fn from(node: HostNode) -> Self {
        MountTarget::Node(node)
    }
}

impl From<&str> for MountTarget {
    fn from(selector: &str) -> Self {
        MountTarget::Selector(selector.to_string())
    }
}

impl From<String> for MountTarget {
    fn from(selector: String) -> Self {
        MountTarget::Selector(selector)
    }
}

/// A root component bound to a renderer
pub struct App {
    renderer: Renderer,
    root: Component,
    props: Props,
    container: Cell<Option<HostNode>>,
}

impl Renderer {
    /// Create an application for `root`; nothing renders until [`App::mount`]
    pub fn create_app(&self, root: &Component, props: Props) -> App {
        App {
            renderer: self.clone(),
            root: root.clone(),
            props,
            container: Cell::new(None),
        }
    }
}

/// Create an application over `host` with the shared runtime
pub fn create_app(root: &Component, props: Props, host: impl HostOps + 'static) -> App {
    create_renderer(host).create_app(root, props)
}

impl App {
    /// Render the root component into `target`
    pub fn mount(&self, target: impl Into<MountTarget>) -> Result<()> {
        if self.container.get().is_some() {
            return Err(RuntimeError::AlreadyMounted);
        }

        let container = match target.into() {
            MountTarget::Node(node) => node,
            MountTarget::Selector(selector) => match self.renderer.query_selector(&selector) {
                Some(node) => node,
                None => {
                    tracing::error!(%selector, "mount target not found");
                    return Err(RuntimeError::MountTargetNotFound(selector));
                }
            },
        };

        tracing::debug!(
            component = self.root.name(),
            container = container.to_raw(),
            "mounting app"
        );
        self.container.set(Some(container));
        self.renderer.render(
            Some(VNode::component(&self.root, self.props.clone())),
            container,
        );
        Ok(())
    }

    /// Tear down the rendered tree, running unmount hooks
    pub fn unmount(&self) -> Result<()> {
        let container = self.container.take().ok_or(RuntimeError::NotMounted)?;
        tracing::debug!(component = self.root.name(), "unmounting app");
        self.renderer.render(None, container);
        Ok(())
    }

    pub fn is_mounted(&self) -> bool {
        self.container.get().is_some()
    }

    /// Run queued updates once; returns the number of jobs run
    pub fn flush(&self) -> usize {
        self.renderer.runtime().scheduler.flush()
    }

    /// Flush until nothing is queued or the configured pass limit is hit
    pub fn flush_until_idle(&self) -> usize {
        let scheduler = &self.renderer.runtime().scheduler;
        let max_passes = self.renderer.config().max_flush_passes;
        let mut total = 0;
        for _ in 0..max_passes {
            if !scheduler.has_pending() {
                return total;
            }
            total += scheduler.flush();
        }
        if scheduler.has_pending() {
            tracing::warn!(
                max_passes,
                "updates still pending after the flush pass limit, possible update loop"
            );
        }
        total
    }

    /// Apply `f` (typically a state change) and flush the updates it causes
    pub fn dispatch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.flush();
        let result = f();
        self.flush_until_idle();
        result
    }

    /// Instance of the mounted root component
    pub fn root_instance(&self) -> Option<Rc<ComponentInstance>> {
        self.renderer.root_instance(self.container.get()?)
    }

    pub fn container(&self) -> Option<HostNode> {
        self.container.get()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root.name())
            .field("container", &self.container.get())
            .finish()
    }
}
