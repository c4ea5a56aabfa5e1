//! Single-value reactive cells: [`Ref`] and [`Computed`]

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{ReactiveError, Result};
use crate::object::Field;
use crate::reactive::{DepId, ReactiveEffect, ReactiveGraph, WeakGraph};
use crate::value::Value;

// =============================================================================
// REF
// =============================================================================

struct RefInner<T> {
    value: RefCell<T>,
    dep: DepId,
    graph: WeakGraph,
}

impl<T> Drop for RefInner<T> {
    fn drop(&mut self) {
        if let Some(graph) = ReactiveGraph::upgrade(&self.graph) {
            graph.release_dep(self.dep);
        }
    }
}

/// A reactive cell holding one value.
///
/// Reading tracks; writing notifies only when the new value differs from the
/// old one (`PartialEq`; for [`Value`] and [`Field`] this is same-value
/// comparison).
pub struct Ref<T> {
    inner: Rc<RefInner<T>>,
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl ReactiveGraph {
    /// Create a reactive cell
    pub fn create_ref<T: Clone + PartialEq + 'static>(&self, value: T) -> Ref<T> {
        Ref {
            inner: Rc::new(RefInner {
                value: RefCell::new(value),
                dep: self.create_dep(),
                graph: self.downgrade(),
            }),
        }
    }

    /// Create a cell holding a dynamic value; objects are stored wrapped
    pub fn create_ref_value(&self, value: impl Into<Value>) -> Ref<Field> {
        let field = self.wrap(value.into());
        self.create_ref(field)
    }

    /// Create a lazily evaluated, cached derived value
    pub fn create_computed<T, F>(&self, getter: F) -> Computed<T>
    where
        T: Clone + 'static,
        F: Fn() -> T + 'static,
    {
        Computed::build(self, Box::new(getter), None)
    }

    /// Create a derived value whose writes are forwarded to `setter`
    pub fn create_writable_computed<T, F, S>(&self, getter: F, setter: S) -> Computed<T>
    where
        T: Clone + 'static,
        F: Fn() -> T + 'static,
        S: Fn(T) + 'static,
    {
        Computed::build(self, Box::new(getter), Some(Rc::new(setter)))
    }
}

impl<T> Ref<T> {
    fn track(&self) {
        if let Some(graph) = ReactiveGraph::upgrade(&self.inner.graph) {
            graph.track_dep(self.inner.dep);
        }
    }

    fn trigger(&self) {
        if let Some(graph) = ReactiveGraph::upgrade(&self.inner.graph) {
            graph.trigger_dep(self.inner.dep);
        }
    }

    /// Borrow the value without cloning (tracked).
    ///
    /// The value stays borrowed while `f` runs: a [`set`](Self::set) on this
    /// ref from inside `f` is ignored with a warning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    pub fn dep(&self) -> DepId {
        self.inner.dep
    }

    /// Whether both handles are the same cell
    pub fn ptr_eq(&self, other: &Ref<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> Ref<T> {
    /// Tracked read
    pub fn get(&self) -> T {
        self.track();
        self.inner.value.borrow().clone()
    }

    /// Read without subscribing the active effect
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T: PartialEq> Ref<T> {
    /// Replace the value, notifying subscribers if it changed
    pub fn set(&self, value: T) {
        {
            let Ok(mut current) = self.inner.value.try_borrow_mut() else {
                tracing::warn!("ref written while borrowed by `with`; write ignored");
                return;
            };
            if *current == value {
                return;
            }
            *current = value;
        }
        self.trigger();
    }
}

impl<T: Clone + PartialEq> Ref<T> {
    /// Compute a new value from the current one (untracked) and [`set`](Self::set) it
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.inner.value.borrow());
        self.set(next);
    }
}

impl Ref<Field> {
    /// Set from a raw value, wrapping objects
    pub fn set_value(&self, value: impl Into<Value>) {
        let field = match ReactiveGraph::upgrade(&self.inner.graph) {
            Some(graph) => graph.wrap(value.into()),
            None => return,
        };
        self.set(field);
    }
}

impl<T: fmt::Debug> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("value", &self.inner.value.borrow())
            .finish()
    }
}

// =============================================================================
// COMPUTED
// =============================================================================

type Setter<T> = Rc<dyn Fn(T)>;

struct ComputedInner<T> {
    effect: ReactiveEffect<T>,
    value: RefCell<Option<T>>,
    dirty: Cell<bool>,
    dep: DepId,
    graph: WeakGraph,
    setter: Option<Setter<T>>,
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.effect.stop();
        if let Some(graph) = ReactiveGraph::upgrade(&self.graph) {
            graph.release_dep(self.dep);
        }
    }
}

/// A lazily evaluated, cached derived value.
///
/// The getter runs at most once per invalidation and only when the value is
/// read. Invalidation does not recompute: it marks the value dirty and
/// notifies the computed's own readers.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Computed<T> {
    fn build(graph: &ReactiveGraph, getter: Box<dyn Fn() -> T>, setter: Option<Setter<T>>) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let weak = weak.clone();
            let dep = graph.create_dep();
            let graph_weak = graph.downgrade();
            let scheduler = move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if inner.dirty.replace(true) {
                    return;
                }
                if let Some(graph) = ReactiveGraph::upgrade(&graph_weak) {
                    graph.trigger_dep(inner.dep);
                }
            };
            ComputedInner {
                effect: ReactiveEffect::build(graph, getter, Some(Rc::new(scheduler)), true),
                value: RefCell::new(None),
                dirty: Cell::new(true),
                dep,
                graph: graph.downgrade(),
                setter,
            }
        });
        Self { inner }
    }

    /// Tracked read, recomputing first if dirty
    pub fn get(&self) -> T {
        if let Some(graph) = ReactiveGraph::upgrade(&self.inner.graph) {
            graph.track_dep(self.inner.dep);
        }

        if !self.inner.dirty.get() {
            if let Some(value) = self.inner.value.borrow().as_ref() {
                return value.clone();
            }
        }

        let value = self.inner.effect.run();
        *self.inner.value.borrow_mut() = Some(value.clone());
        self.inner.dirty.set(false);
        value
    }

    /// Whether the next read will rerun the getter
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Forward a write to the setter.
    ///
    /// Read-only computed values reject writes with
    /// [`ReactiveError::ReadonlyComputed`] and leave state untouched.
    pub fn set(&self, value: T) -> Result<()> {
        match &self.inner.setter {
            Some(setter) => {
                setter(value);
                Ok(())
            }
            None => {
                tracing::warn!("write to a read-only computed value ignored");
                Err(ReactiveError::ReadonlyComputed)
            }
        }
    }

    pub fn is_writable(&self) -> bool {
        self.inner.setter.is_some()
    }

    pub fn dep(&self) -> DepId {
        self.inner.dep
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("value", &self.inner.value.borrow())
            .field("dirty", &self.inner.dirty.get())
            .finish()
    }
}
