//! Component definitions and instances
//!
//! A [`Component`] is an immutable definition shared by every node that uses
//! it. Mounting a component node creates a [`ComponentInstance`], which owns
//! the instance state, the resolved render function, the current subtree, the
//! lifecycle hooks and the update effect.
//!
//! ```
//! use vela_core::Object;
//! use vela_runtime::{h, Component, ComponentDef};
//!
//! let counter: Component = ComponentDef::new("Counter")
//!     .data(|| Object::new().with("count", 0))
//!     .render(|ctx| Ok(h("span", ctx.state().get("count").to_text())))
//!     .build();
//! assert_eq!(counter.name(), "Counter");
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use vela_core::{Object, Reactive, ReactiveEffect, ReactiveGraph, Value};

use crate::config::AppConfig;
use crate::error::RuntimeError;
use crate::host::HostNode;
use crate::lifecycle::{self, Hook, LifecycleHook, LifecycleHooks};
use crate::scheduler::Job;
use crate::vnode::{Props, VNode};

/// Render function: instance context in, subtree out
pub type RenderFn = Rc<dyn Fn(&RenderContext<'_>) -> anyhow::Result<VNode>>;

/// Setup function; may return a render function that takes precedence
pub type SetupFn = Rc<dyn Fn(&SetupContext<'_>) -> Option<RenderFn>>;

/// Produces the initial state object of each instance
pub type DataFn = Rc<dyn Fn() -> Object>;

/// Wrap a closure as a [`RenderFn`]
pub fn render_fn<F>(f: F) -> RenderFn
where
    F: Fn(&RenderContext<'_>) -> anyhow::Result<VNode> + 'static,
{
    Rc::new(f)
}

/// Compiles template source into a render function
pub trait TemplateCompiler {
    fn compile(&self, template: &str) -> anyhow::Result<RenderFn>;
}

// =============================================================================
// DEFINITION
// =============================================================================

/// Builder for a component definition
pub struct ComponentDef {
    name: String,
    data: Option<DataFn>,
    setup: Option<SetupFn>,
    render: Option<RenderFn>,
    template: Option<String>,
}

impl ComponentDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: None,
            setup: None,
            render: None,
            template: None,
        }
    }

    /// Initial state, called once per instance
    pub fn data<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Object + 'static,
    {
        self.data = Some(Rc::new(f));
        self
    }

    pub fn setup<F>(mut self, f: F) -> Self
    where
        F: Fn(&SetupContext<'_>) -> Option<RenderFn> + 'static,
    {
        self.setup = Some(Rc::new(f));
        self
    }

    pub fn render<F>(mut self, f: F) -> Self
    where
        F: Fn(&RenderContext<'_>) -> anyhow::Result<VNode> + 'static,
    {
        self.render = Some(Rc::new(f));
        self
    }

    /// Template source, compiled when no render function is available
    pub fn template(mut self, source: impl Into<String>) -> Self {
        self.template = Some(source.into());
        self
    }

    pub fn build(self) -> Component {
        Component(Rc::new(self))
    }
}

/// Shared handle to a component definition; equality is identity
#[derive(Clone)]
pub struct Component(Rc<ComponentDef>);

impl Component {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn def(&self) -> &ComponentDef {
        &self.0
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.0.name)
            .field("has_render", &self.0.render.is_some())
            .field("has_template", &self.0.template.is_some())
            .finish()
    }
}

// =============================================================================
// CONTEXTS
// =============================================================================

/// What a render function sees of its instance
pub struct RenderContext<'a> {
    instance: &'a ComponentInstance,
}

impl<'a> RenderContext<'a> {
    /// Reactive instance state; reads during render are tracked
    pub fn state(&self) -> &Reactive {
        &self.instance.state
    }

    /// Value of a prop passed by the parent
    pub fn prop(&self, key: &str) -> Option<Value> {
        self.instance.props.borrow().value(key).cloned()
    }

    pub fn props(&self) -> Props {
        self.instance.props.borrow().clone()
    }

    pub fn graph(&self) -> &ReactiveGraph {
        &self.instance.graph
    }

    pub fn uid(&self) -> u64 {
        self.instance.uid
    }
}

/// What a setup function sees of its instance
pub struct SetupContext<'a> {
    instance: &'a ComponentInstance,
}

impl<'a> SetupContext<'a> {
    pub fn state(&self) -> &Reactive {
        &self.instance.state
    }

    pub fn prop(&self, key: &str) -> Option<Value> {
        self.instance.props.borrow().value(key).cloned()
    }

    pub fn props(&self) -> Props {
        self.instance.props.borrow().clone()
    }

    /// Graph for creating refs, computed values and effects owned by this component
    pub fn graph(&self) -> &ReactiveGraph {
        &self.instance.graph
    }
}

// =============================================================================
// INSTANCE
// =============================================================================

static NEXT_UID: AtomicU64 = AtomicU64::new(0);

/// Where an instance is in its lifetime
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecyclePhase {
    Created,
    SetUp,
    Mounting,
    Mounted,
    Updating,
    Unmounting,
    Unmounted,
}

/// Result of one render invocation
pub(crate) enum RenderOutcome {
    Node(VNode),
    /// No render function resolved
    Empty,
    /// The render function failed; the previous subtree stays
    Failed,
}

/// A mounted (or mounting) component
pub struct ComponentInstance {
    uid: u64,
    component: Component,
    graph: ReactiveGraph,
    state: Reactive,
    props: RefCell<Props>,
    render: RefCell<Option<RenderFn>>,
    phase: Cell<LifecyclePhase>,
    hooks: RefCell<LifecycleHooks>,
    pub(crate) subtree: RefCell<Option<VNode>>,
    pub(crate) effect: RefCell<Option<ReactiveEffect<()>>>,
    pub(crate) update: RefCell<Option<Job>>,
    pub(crate) container: Cell<Option<HostNode>>,
    pub(crate) anchor: Cell<Option<HostNode>>,
}

impl ComponentInstance {
    pub(crate) fn new(component: Component, props: Props, graph: &ReactiveGraph) -> Rc<Self> {
        let data = component.def().data.clone();
        let raw = graph.untracked(|| data.map(|f| f()).unwrap_or_default());
        let uid = NEXT_UID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(uid, component = component.name(), "component instance created");

        Rc::new(Self {
            uid,
            state: graph.reactive(&raw),
            graph: graph.clone(),
            component,
            props: RefCell::new(props),
            render: RefCell::new(None),
            phase: Cell::new(LifecyclePhase::Created),
            hooks: RefCell::new(LifecycleHooks::default()),
            subtree: RefCell::new(None),
            effect: RefCell::new(None),
            update: RefCell::new(None),
            container: Cell::new(None),
            anchor: Cell::new(None),
        })
    }

    /// Run setup and resolve the render function.
    ///
    /// Precedence: render returned by setup, explicit render, compiled template.
    pub(crate) fn setup(
        self: &Rc<Self>,
        compiler: Option<&dyn TemplateCompiler>,
        config: &AppConfig,
    ) {
        let def = self.component.def();

        let from_setup = def.setup.clone().and_then(|setup| {
            lifecycle::with_current_instance(self, || {
                self.graph.untracked(|| setup(&SetupContext { instance: self }))
            })
        });

        let render = from_setup
            .or_else(|| def.render.clone())
            .or_else(|| self.compile_template(compiler));

        if render.is_none() && config.warn_missing_render {
            tracing::warn!(
                uid = self.uid,
                component = self.name(),
                "component has no render function or template"
            );
        }

        *self.render.borrow_mut() = render;
        self.phase.set(LifecyclePhase::SetUp);
    }

    fn compile_template(&self, compiler: Option<&dyn TemplateCompiler>) -> Option<RenderFn> {
        let template = self.component.def().template.as_deref()?;
        let Some(compiler) = compiler else {
            tracing::warn!(
                component = self.name(),
                "component has a template but no compiler is installed"
            );
            return None;
        };
        match compiler.compile(template) {
            Ok(render) => Some(render),
            Err(source) => {
                let err = RuntimeError::Compile {
                    component: self.name().to_string(),
                    source,
                };
                tracing::error!(error = %err, "template compilation failed");
                None
            }
        }
    }

    /// Invoke the render function, catching failures at this boundary
    pub(crate) fn render_root(&self) -> RenderOutcome {
        let render = self.render.borrow().clone();
        let Some(render) = render else {
            return RenderOutcome::Empty;
        };
        match render(&RenderContext { instance: self }) {
            Ok(node) => RenderOutcome::Node(node),
            Err(err) => {
                let message = format!("{err:#}");
                tracing::error!(
                    uid = self.uid,
                    component = self.name(),
                    error = %message,
                    "render failed"
                );
                RenderOutcome::Failed
            }
        }
    }

    pub(crate) fn add_hook(&self, kind: LifecycleHook, hook: Hook) {
        self.hooks.borrow_mut().push(kind, hook);
    }

    /// Run the hooks for `kind` with tracking paused
    pub(crate) fn run_hooks(&self, kind: LifecycleHook) {
        let hooks = self.hooks.borrow().get(kind);
        if hooks.is_empty() {
            return;
        }
        self.graph.untracked(|| {
            for hook in &hooks {
                hook();
            }
        });
    }

    pub(crate) fn set_phase(&self, phase: LifecyclePhase) {
        tracing::debug!(uid = self.uid, component = self.name(), ?phase, "lifecycle");
        self.phase.set(phase);
    }

    pub(crate) fn set_props(&self, props: Props) {
        *self.props.borrow_mut() = props;
    }

    pub(crate) fn update_job(&self) -> Option<Job> {
        self.update.borrow().clone()
    }

    /// Rerun the update effect now
    pub(crate) fn run_update(&self) {
        let effect = self.effect.borrow().clone();
        if let Some(effect) = effect {
            effect.run();
        }
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn name(&self) -> &str {
        self.component.name()
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase.get()
    }

    pub fn is_mounted(&self) -> bool {
        matches!(
            self.phase.get(),
            LifecyclePhase::Mounted | LifecyclePhase::Updating
        )
    }

    pub fn state(&self) -> &Reactive {
        &self.state
    }

    pub fn props(&self) -> Props {
        self.props.borrow().clone()
    }

    /// Whether the update effect is still subscribed
    pub fn is_effect_active(&self) -> bool {
        self.effect
            .borrow()
            .as_ref()
            .map_or(false, ReactiveEffect::is_active)
    }

    /// Number of hooks registered for `kind`
    pub fn hook_count(&self, kind: LifecycleHook) -> usize {
        self.hooks.borrow().count(kind)
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("uid", &self.uid)
            .field("component", &self.name())
            .field("phase", &self.phase.get())
            .finish()
    }
}
