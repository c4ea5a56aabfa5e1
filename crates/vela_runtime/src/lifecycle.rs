//! Lifecycle hook registration
//!
//! Registrars append a callback to the instance whose setup is currently
//! running. Called outside of setup they log a warning and do nothing.
//!
//! ```ignore
//! let def = ComponentDef::new("Clock")
//!     .setup(|_ctx| {
//!         on_mounted(|| tracing::info!("mounted"));
//!         on_unmounted(|| tracing::info!("gone"));
//!         None
//!     })
//!     .build();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::ComponentInstance;

/// A lifecycle callback
pub type Hook = Rc<dyn Fn()>;

/// Points in an instance's lifetime where hooks run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleHook {
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeUnmount,
    Unmounted,
}

/// Per-phase hook arrays of one instance
#[derive(Default)]
pub struct LifecycleHooks {
    before_mount: Vec<Hook>,
    mounted: Vec<Hook>,
    before_update: Vec<Hook>,
    updated: Vec<Hook>,
    before_unmount: Vec<Hook>,
    unmounted: Vec<Hook>,
}

impl LifecycleHooks {
    fn slot(&self, kind: LifecycleHook) -> &Vec<Hook> {
        match kind {
            LifecycleHook::BeforeMount => &self.before_mount,
            LifecycleHook::Mounted => &self.mounted,
            LifecycleHook::BeforeUpdate => &self.before_update,
            LifecycleHook::Updated => &self.updated,
            LifecycleHook::BeforeUnmount => &self.before_unmount,
            LifecycleHook::Unmounted => &self.unmounted,
        }
    }

    fn slot_mut(&mut self, kind: LifecycleHook) -> &mut Vec<Hook> {
        match kind {
            LifecycleHook::BeforeMount => &mut self.before_mount,
            LifecycleHook::Mounted => &mut self.mounted,
            LifecycleHook::BeforeUpdate => &mut self.before_update,
            LifecycleHook::Updated => &mut self.updated,
            LifecycleHook::BeforeUnmount => &mut self.before_unmount,
            LifecycleHook::Unmounted => &mut self.unmounted,
        }
    }

    pub fn push(&mut self, kind: LifecycleHook, hook: Hook) {
        self.slot_mut(kind).push(hook);
    }

    /// Snapshot of the hooks registered for `kind`
    pub fn get(&self, kind: LifecycleHook) -> Vec<Hook> {
        self.slot(kind).clone()
    }

    /// Number of hooks registered for `kind`
    pub fn count(&self, kind: LifecycleHook) -> usize {
        self.slot(kind).len()
    }
}

thread_local! {
    static CURRENT_INSTANCE: RefCell<Vec<Rc<ComponentInstance>>> = const { RefCell::new(Vec::new()) };
}

struct CurrentInstanceGuard;

impl Drop for CurrentInstanceGuard {
    fn drop(&mut self) {
        CURRENT_INSTANCE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Run `f` with `instance` as the instance being initialized
pub(crate) fn with_current_instance<R>(instance: &Rc<ComponentInstance>, f: impl FnOnce() -> R) -> R {
    CURRENT_INSTANCE.with(|stack| stack.borrow_mut().push(instance.clone()));
    let _guard = CurrentInstanceGuard;
    f()
}

/// The instance whose setup is running, if any
pub fn current_instance() -> Option<Rc<ComponentInstance>> {
    CURRENT_INSTANCE.with(|stack| stack.borrow().last().cloned())
}

fn inject_hook(kind: LifecycleHook, hook: Hook) {
    match current_instance() {
        Some(instance) => instance.add_hook(kind, hook),
        None => tracing::warn!(?kind, "lifecycle hook registered outside of component setup"),
    }
}

pub fn on_before_mount(hook: impl Fn() + 'static) {
    inject_hook(LifecycleHook::BeforeMount, Rc::new(hook));
}

pub fn on_mounted(hook: impl Fn() + 'static) {
    inject_hook(LifecycleHook::Mounted, Rc::new(hook));
}

pub fn on_before_update(hook: impl Fn() + 'static) {
    inject_hook(LifecycleHook::BeforeUpdate, Rc::new(hook));
}

pub fn on_updated(hook: impl Fn() + 'static) {
    inject_hook(LifecycleHook::Updated, Rc::new(hook));
}

pub fn on_before_unmount(hook: impl Fn() + 'static) {
    inject_hook(LifecycleHook::BeforeUnmount, Rc::new(hook));
}

pub fn on_unmounted(hook: impl Fn() + 'static) {
    inject_hook(LifecycleHook::Unmounted, Rc::new(hook));
}
