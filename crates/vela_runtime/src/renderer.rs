//! Patch engine
//!
//! The [`Renderer`] reconciles `(old, new)` virtual node pairs into calls on
//! the host operation table:
//!
//! - Identical node references are a no-op
//! - Nodes of a different kind, type or key are replaced: the old node is
//!   unmounted and the new one mounted where it stood
//! - Otherwise the host node is reused and only differences are applied
//!
//! Child lists are reconciled by the keyed diff in [`crate::diff`].
//! Component nodes mount an instance whose update effect queues a job on the
//! [`Scheduler`](crate::Scheduler) instead of re-rendering synchronously.

use rustc_hash::FxHashMap;
use std::cell::{RefCell, RefMut};
use std::rc::{Rc, Weak};

use vela_core::ReactiveEffect;

use crate::component::{ComponentInstance, LifecyclePhase, RenderOutcome, TemplateCompiler};
use crate::config::AppConfig;
use crate::host::{HostNode, HostOps};
use crate::lifecycle::LifecycleHook;
use crate::runtime::Runtime;
use crate::scheduler::Job;
use crate::vnode::{is_same_vnode_type, Children, PropValue, Props, VNode, VNodeType};

pub(crate) struct RendererInner {
    host: RefCell<Box<dyn HostOps>>,
    runtime: Runtime,
    compiler: Option<Rc<dyn TemplateCompiler>>,
    /// Root node rendered into each container
    roots: RefCell<FxHashMap<HostNode, VNode>>,
    config: AppConfig,
}

/// Reconciles virtual trees into a host tree (cheap to clone)
#[derive(Clone)]
pub struct Renderer {
    inner: Rc<RendererInner>,
}

/// Builder for a [`Renderer`]
pub struct RendererBuilder {
    host: Box<dyn HostOps>,
    runtime: Option<Runtime>,
    compiler: Option<Rc<dyn TemplateCompiler>>,
    config: AppConfig,
}

impl RendererBuilder {
    /// Use `runtime` instead of the thread's shared graph and scheduler
    pub fn runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Compiler for components that only carry a template
    pub fn compiler(mut self, compiler: impl TemplateCompiler + 'static) -> Self {
        self.compiler = Some(Rc::new(compiler));
        self
    }

    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Renderer {
        Renderer {
            inner: Rc::new(RendererInner {
                host: RefCell::new(self.host),
                runtime: self.runtime.unwrap_or_else(Runtime::shared),
                compiler: self.compiler,
                roots: RefCell::new(FxHashMap::default()),
                config: self.config,
            }),
        }
    }
}

/// Create a renderer over `host` using the shared runtime and default config
pub fn create_renderer(host: impl HostOps + 'static) -> Renderer {
    Renderer::builder(host).build()
}

impl Renderer {
    pub fn builder(host: impl HostOps + 'static) -> RendererBuilder {
        RendererBuilder {
            host: Box::new(host),
            runtime: None,
            compiler: None,
            config: AppConfig::default(),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    fn from_weak(weak: &Weak<RendererInner>) -> Option<Renderer> {
        weak.upgrade().map(|inner| Renderer { inner })
    }

    /// Render `vnode` into `container`, patching against what was rendered
    /// there before. `None` unmounts the previous tree.
    pub fn render(&self, vnode: Option<VNode>, container: HostNode) {
        let prev = self.inner.roots.borrow_mut().remove(&container);
        match vnode {
            None => {
                if let Some(prev) = prev {
                    self.unmount(&prev);
                }
            }
            Some(vnode) => {
                self.patch(prev.as_ref(), &vnode, container, None);
                self.inner.roots.borrow_mut().insert(container, vnode);
            }
        }
    }

    /// Instance of the root component rendered into `container`
    pub fn root_instance(&self, container: HostNode) -> Option<Rc<ComponentInstance>> {
        self.inner
            .roots
            .borrow()
            .get(&container)
            .and_then(VNode::component_instance)
    }

    pub(crate) fn query_selector(&self, selector: &str) -> Option<HostNode> {
        self.inner.host.borrow().query_selector(selector)
    }

    // =========================================================================
    // HOST OPERATIONS
    // =========================================================================

    fn host(&self) -> RefMut<'_, Box<dyn HostOps>> {
        self.inner.host.borrow_mut()
    }

    fn host_create_element(&self, tag: &str) -> HostNode {
        let el = self.host().create_element(tag);
        if self.inner.config.trace_host_ops {
            tracing::trace!(el = el.to_raw(), tag, "create_element");
        }
        el
    }

    fn host_create_text(&self, text: &str) -> HostNode {
        let node = self.host().create_text(text);
        if self.inner.config.trace_host_ops {
            tracing::trace!(node = node.to_raw(), text, "create_text");
        }
        node
    }

    fn host_create_comment(&self, text: &str) -> HostNode {
        let node = self.host().create_comment(text);
        if self.inner.config.trace_host_ops {
            tracing::trace!(node = node.to_raw(), text, "create_comment");
        }
        node
    }

    fn host_set_element_text(&self, el: HostNode, text: &str) {
        if self.inner.config.trace_host_ops {
            tracing::trace!(el = el.to_raw(), text, "set_element_text");
        }
        self.host().set_element_text(el, text);
    }

    fn host_set_text(&self, node: HostNode, text: &str) {
        if self.inner.config.trace_host_ops {
            tracing::trace!(node = node.to_raw(), text, "set_text");
        }
        self.host().set_text(node, text);
    }

    fn host_insert(&self, node: HostNode, parent: HostNode, anchor: Option<HostNode>) {
        if self.inner.config.trace_host_ops {
            tracing::trace!(
                node = node.to_raw(),
                parent = parent.to_raw(),
                anchor = ?anchor.map(HostNode::to_raw),
                "insert"
            );
        }
        self.host().insert(node, parent, anchor);
    }

    fn host_patch_prop(
        &self,
        el: HostNode,
        key: &str,
        prev: Option<&PropValue>,
        next: Option<&PropValue>,
    ) {
        if self.inner.config.trace_host_ops {
            tracing::trace!(el = el.to_raw(), key, clear = next.is_none(), "patch_prop");
        }
        self.host().patch_prop(el, key, prev, next);
    }

    fn host_remove(&self, node: HostNode) {
        if self.inner.config.trace_host_ops {
            tracing::trace!(node = node.to_raw(), "remove");
        }
        self.host().remove(node);
    }

    fn host_next_sibling(&self, node: HostNode) -> Option<HostNode> {
        self.inner.host.borrow().next_sibling(node)
    }

    // =========================================================================
    // PATCH
    // =========================================================================

    /// Reconcile `n1` (previously mounted, or `None`) into `n2`
    pub(crate) fn patch(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        let mut n1 = n1;
        let mut anchor = anchor;

        if let Some(old) = n1 {
            if std::ptr::eq(old, n2) {
                return;
            }
            if !is_same_vnode_type(old, n2) {
                anchor = self.next_host_node(old).or(anchor);
                self.unmount(old);
                n1 = None;
            }
        }

        match n2.ty() {
            VNodeType::Text => self.process_text(n1, n2, container, anchor),
            VNodeType::Comment => self.process_comment(n1, n2, container, anchor),
            VNodeType::Fragment => self.process_fragment(n1, n2, container, anchor),
            VNodeType::Element(_) => self.process_element(n1, n2, container, anchor),
            VNodeType::Component(_) => self.process_component(n1, n2, container, anchor),
        }
    }

    fn process_text(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        match n1 {
            None => {
                let node = self.host_create_text(n2.text_content());
                n2.el.set(Some(node));
                self.host_insert(node, container, anchor);
            }
            Some(n1) => {
                n2.el.set(n1.el.get());
                if n1.text_content() != n2.text_content() {
                    if let Some(node) = n1.el.get() {
                        self.host_set_text(node, n2.text_content());
                    }
                }
            }
        }
    }

    fn process_comment(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        match n1 {
            None => {
                let node = self.host_create_comment(n2.text_content());
                n2.el.set(Some(node));
                self.host_insert(node, container, anchor);
            }
            // Comments are static
            Some(n1) => n2.el.set(n1.el.get()),
        }
    }

    fn process_fragment(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        match n1 {
            None => {
                let start = self.host_create_text("");
                let end = self.host_create_text("");
                n2.el.set(Some(start));
                n2.anchor.set(Some(end));
                self.host_insert(start, container, anchor);
                self.host_insert(end, container, anchor);
                if let Children::List(children) = n2.children() {
                    self.mount_children(children, container, Some(end));
                }
            }
            Some(n1) => {
                n2.el.set(n1.el.get());
                n2.anchor.set(n1.anchor.get());
                self.patch_children(n1, n2, container, n1.anchor.get());
            }
        }
    }

    fn process_element(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        match n1 {
            None => self.mount_element(n2, container, anchor),
            Some(n1) => self.patch_element(n1, n2),
        }
    }

    fn mount_element(&self, vnode: &VNode, container: HostNode, anchor: Option<HostNode>) {
        let VNodeType::Element(tag) = vnode.ty() else {
            return;
        };
        let el = self.host_create_element(tag);
        vnode.el.set(Some(el));

        match vnode.children() {
            Children::Text(text) => self.host_set_element_text(el, text),
            Children::List(children) => self.mount_children(children, el, None),
            Children::None => {}
        }

        for (key, value) in vnode.props().iter() {
            self.host_patch_prop(el, key, None, Some(value));
        }

        self.host_insert(el, container, anchor);
    }

    fn patch_element(&self, n1: &VNode, n2: &VNode) {
        let Some(el) = n1.el.get() else {
            return;
        };
        n2.el.set(Some(el));
        self.patch_props(el, n1.props(), n2.props());
        self.patch_children(n1, n2, el, None);
    }

    /// Apply changed props, then clear props absent from `new`
    fn patch_props(&self, el: HostNode, old: &Props, new: &Props) {
        if std::ptr::eq(old, new) {
            return;
        }
        for (key, next) in new.iter() {
            let prev = old.get(key);
            if prev != Some(next) {
                self.host_patch_prop(el, key, prev, Some(next));
            }
        }
        for (key, prev) in old.iter() {
            if !new.contains_key(key) {
                self.host_patch_prop(el, key, Some(prev), None);
            }
        }
    }

    /// Reconcile the children of `n1` into those of `n2` under `container`
    fn patch_children(
        &self,
        n1: &VNode,
        n2: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        match (n1.children(), n2.children()) {
            (Children::List(old), Children::Text(text)) => {
                self.unmount_children(old);
                self.host_set_element_text(container, text);
            }
            (old, Children::Text(text)) => {
                if old.as_text() != Some(text.as_str()) {
                    self.host_set_element_text(container, text);
                }
            }
            (Children::List(old), Children::List(new)) => {
                self.patch_keyed_children(old, new, container, anchor);
            }
            (Children::List(old), Children::None) => self.unmount_children(old),
            (Children::Text(_), Children::List(new)) => {
                self.host_set_element_text(container, "");
                self.mount_children(new, container, anchor);
            }
            (Children::Text(_), Children::None) => self.host_set_element_text(container, ""),
            (Children::None, Children::List(new)) => self.mount_children(new, container, anchor),
            (Children::None, Children::None) => {}
        }
    }

    pub(crate) fn mount_children(
        &self,
        children: &[VNode],
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        for child in children {
            self.patch(None, child, container, anchor);
        }
    }

    // =========================================================================
    // COMPONENTS
    // =========================================================================

    fn process_component(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        match n1 {
            None => self.mount_component(n2, container, anchor),
            Some(n1) => self.update_component(n1, n2),
        }
    }

    fn mount_component(&self, vnode: &VNode, container: HostNode, anchor: Option<HostNode>) {
        let VNodeType::Component(component) = vnode.ty() else {
            return;
        };
        let instance = ComponentInstance::new(
            component.clone(),
            vnode.props().clone(),
            &self.inner.runtime.reactive,
        );
        *vnode.component.borrow_mut() = Some(instance.clone());
        instance.container.set(Some(container));
        instance.anchor.set(anchor);

        instance.setup(self.inner.compiler.as_deref(), &self.inner.config);
        self.setup_render_effect(&instance);
    }

    /// Wrap render-and-patch in an effect whose reruns go through the scheduler
    fn setup_render_effect(&self, instance: &Rc<ComponentInstance>) {
        let weak_instance = Rc::downgrade(instance);
        let update = Job::new(move || {
            if let Some(instance) = weak_instance.upgrade() {
                instance.run_update();
            }
        });

        let weak_instance = Rc::downgrade(instance);
        let weak_renderer = Rc::downgrade(&self.inner);
        let scheduler = self.inner.runtime.scheduler.clone();
        let job = update.clone();
        let effect = ReactiveEffect::with_scheduler(
            &self.inner.runtime.reactive,
            move || {
                let (Some(instance), Some(renderer)) =
                    (weak_instance.upgrade(), Renderer::from_weak(&weak_renderer))
                else {
                    return;
                };
                renderer.component_update(&instance);
            },
            move || scheduler.queue_job(job.clone()),
        );

        *instance.effect.borrow_mut() = Some(effect);
        *instance.update.borrow_mut() = Some(update.clone());
        update.run();
    }

    /// Body of a component's update effect: first run mounts, later runs update
    fn component_update(&self, instance: &Rc<ComponentInstance>) {
        let Some(container) = instance.container.get() else {
            return;
        };

        if !instance.is_mounted() {
            instance.set_phase(LifecyclePhase::Mounting);
            instance.run_hooks(LifecycleHook::BeforeMount);

            let subtree = match instance.render_root() {
                RenderOutcome::Node(node) => Some(node),
                RenderOutcome::Empty => None,
                // Holds the component's place until a render succeeds
                RenderOutcome::Failed => Some(VNode::comment("")),
            };
            if let Some(tree) = &subtree {
                self.patch(None, tree, container, instance.anchor.get());
            }
            *instance.subtree.borrow_mut() = subtree;

            instance.run_hooks(LifecycleHook::Mounted);
            instance.set_phase(LifecyclePhase::Mounted);
        } else {
            instance.set_phase(LifecyclePhase::Updating);
            instance.run_hooks(LifecycleHook::BeforeUpdate);

            match instance.render_root() {
                RenderOutcome::Node(next) => {
                    let prev = instance.subtree.borrow_mut().take();
                    self.patch(prev.as_ref(), &next, container, instance.anchor.get());
                    *instance.subtree.borrow_mut() = Some(next);
                }
                RenderOutcome::Empty => {
                    let prev = instance.subtree.borrow_mut().take();
                    if let Some(prev) = prev {
                        self.unmount(&prev);
                    }
                }
                // Previous subtree stays mounted as-is
                RenderOutcome::Failed => {}
            }

            instance.set_phase(LifecyclePhase::Mounted);
            instance.run_hooks(LifecycleHook::Updated);
        }
    }

    /// Carry the instance over to the new node; re-render now if props changed
    fn update_component(&self, n1: &VNode, n2: &VNode) {
        let Some(instance) = n1.component_instance() else {
            return;
        };
        *n2.component.borrow_mut() = Some(instance.clone());

        if n1.props() != n2.props() {
            instance.set_props(n2.props().clone());
            if let Some(job) = instance.update_job() {
                self.inner.runtime.scheduler.invalidate_job(&job);
                job.run();
            }
        }
    }

    // =========================================================================
    // UNMOUNT
    // =========================================================================

    /// Tear down `vnode` and everything below it, removing every host node it created
    pub(crate) fn unmount(&self, vnode: &VNode) {
        match vnode.ty() {
            VNodeType::Component(_) => {
                if let Some(instance) = vnode.component_instance() {
                    self.unmount_component(&instance);
                }
            }
            VNodeType::Fragment => {
                if let Children::List(children) = vnode.children() {
                    self.unmount_children(children);
                }
                if let Some(start) = vnode.el.get() {
                    self.host_remove(start);
                }
                if let Some(end) = vnode.anchor.get() {
                    self.host_remove(end);
                }
            }
            VNodeType::Element(_) => {
                if let Children::List(children) = vnode.children() {
                    self.unmount_children(children);
                }
                if let Some(el) = vnode.el.get() {
                    self.host_remove(el);
                }
            }
            VNodeType::Text | VNodeType::Comment => {
                if let Some(el) = vnode.el.get() {
                    self.host_remove(el);
                }
            }
        }
    }

    pub(crate) fn unmount_children(&self, children: &[VNode]) {
        for child in children {
            self.unmount(child);
        }
    }

    fn unmount_component(&self, instance: &Rc<ComponentInstance>) {
        if instance.phase() == LifecyclePhase::Unmounted {
            return;
        }
        instance.set_phase(LifecyclePhase::Unmounting);
        instance.run_hooks(LifecycleHook::BeforeUnmount);

        let effect = instance.effect.borrow().clone();
        if let Some(effect) = effect {
            effect.stop();
        }
        if let Some(job) = instance.update_job() {
            self.inner.runtime.scheduler.invalidate_job(&job);
        }

        let subtree = instance.subtree.borrow_mut().take();
        if let Some(subtree) = subtree {
            self.unmount(&subtree);
        }

        instance.run_hooks(LifecycleHook::Unmounted);
        instance.set_phase(LifecyclePhase::Unmounted);
    }

    // =========================================================================
    // HOST NODE QUERIES
    // =========================================================================

    /// First host node of a mounted node (components resolve through their subtree)
    pub(crate) fn first_host_node(&self, vnode: &VNode) -> Option<HostNode> {
        match vnode.ty() {
            VNodeType::Component(_) => {
                let instance = vnode.component_instance()?;
                let subtree = instance.subtree.borrow();
                subtree.as_ref().and_then(|tree| self.first_host_node(tree))
            }
            _ => vnode.el.get(),
        }
    }

    /// Host node following the last host node of a mounted node
    fn next_host_node(&self, vnode: &VNode) -> Option<HostNode> {
        match vnode.ty() {
            VNodeType::Component(_) => {
                let instance = vnode.component_instance()?;
                let subtree = instance.subtree.borrow();
                subtree.as_ref().and_then(|tree| self.next_host_node(tree))
            }
            VNodeType::Fragment => vnode.anchor.get().and_then(|end| self.host_next_sibling(end)),
            _ => vnode.el.get().and_then(|el| self.host_next_sibling(el)),
        }
    }

    /// Relocate a mounted node before `anchor`
    pub(crate) fn move_vnode(&self, vnode: &VNode, container: HostNode, anchor: Option<HostNode>) {
        match vnode.ty() {
            VNodeType::Component(_) => {
                if let Some(instance) = vnode.component_instance() {
                    let subtree = instance.subtree.borrow();
                    if let Some(tree) = subtree.as_ref() {
                        self.move_vnode(tree, container, anchor);
                    }
                }
            }
            VNodeType::Fragment => {
                if let Some(start) = vnode.el.get() {
                    self.host_insert(start, container, anchor);
                }
                if let Children::List(children) = vnode.children() {
                    for child in children {
                        self.move_vnode(child, container, anchor);
                    }
                }
                if let Some(end) = vnode.anchor.get() {
                    self.host_insert(end, container, anchor);
                }
            }
            _ => {
                if let Some(el) = vnode.el.get() {
                    self.host_insert(el, container, anchor);
                }
            }
        }
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("roots", &self.inner.roots.borrow().len())
            .field("config", &self.inner.config)
            .finish()
    }
}
