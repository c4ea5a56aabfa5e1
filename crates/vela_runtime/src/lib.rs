//! Vela Runtime
//!
//! Virtual nodes, keyed reconciliation, batched component updates and the
//! application handle, built on the reactive graph in [`vela_core`].
//!
//! - **Virtual nodes**: [`VNode`] trees built with [`h`] / [`h_with`]
//! - **Renderer**: [`Renderer`] patches trees into any [`HostOps`] implementation
//! - **Scheduler**: [`Scheduler`] deduplicates update [`Job`]s and flushes them in order
//! - **Components**: [`ComponentDef`] with state, setup, render and lifecycle hooks
//! - **Watchers**: [`watch`] callbacks with previous and new values
//!
//! # Example
//!
//! ```rust
//! use vela_runtime::{h, ComponentDef, VNode};
//!
//! let counter = ComponentDef::new("Counter")
//!     .data(|| vela_core::Object::new().with("count", 0))
//!     .render(|ctx| Ok(h("span", ctx.state().get("count").to_text())))
//!     .build();
//!
//! let root: VNode = h(&counter, ());
//! assert!(root.is_component());
//! ```

pub mod app;
pub mod component;
pub mod config;
pub mod diff;
pub mod error;
pub mod h;
pub mod host;
pub mod key;
pub mod lifecycle;
pub mod renderer;
pub mod runtime;
pub mod scheduler;
pub mod vnode;
pub mod watch;

pub use app::{create_app, App, MountTarget};
pub use component::{
    render_fn, Component, ComponentDef, ComponentInstance, LifecyclePhase, RenderContext,
    RenderFn, SetupContext, TemplateCompiler,
};
pub use config::AppConfig;
pub use diff::get_sequence;
pub use error::{Result, RuntimeError};
pub use h::{h, h_with, HArg};
pub use host::{HostNode, HostOps};
pub use key::Key;
pub use lifecycle::{
    current_instance, on_before_mount, on_before_unmount, on_before_update, on_mounted,
    on_unmounted, on_updated, LifecycleHook,
};
pub use renderer::{create_renderer, Renderer, RendererBuilder};
pub use runtime::{Runtime, RuntimeStats};
pub use scheduler::{Job, Scheduler};
pub use vnode::{Children, Handler, PropValue, Props, VNode, VNodeType};
pub use watch::{watch, FlushMode, WatchHandle, WatchOptions, WatchSource};
