//! Fine-grained dependency tracking
//!
//! The [`ReactiveGraph`] records which effects read which dependency sets
//! ([`DepId`]) and reruns (or schedules) exactly those effects when a dependency
//! is triggered:
//!
//! - A **dep** is the subscriber set for one observed slot: an `(object, key)`
//!   pair, a [`Ref`](crate::Ref), or a [`Computed`](crate::Computed). It only
//!   holds effect ids, never ownership of the effect.
//! - An **effect** is a tracked computation. Membership is kept symmetric: each
//!   effect also records the deps it subscribes to, so cleanup before a rerun
//!   and [`ReactiveEffect::stop`] are exact.
//! - Exactly one effect is *active* at a time. Runs push onto an explicit
//!   active stack and pop on every exit path, including unwinding, so nested
//!   runs (a computed read inside another effect) attribute reads correctly.
//!
//! Notification order is deterministic: a trigger snapshots the subscriber
//! list and notifies computed-backed effects before all others, so a computed
//! is marked stale before any effect that reads it reruns.

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::object::ReactiveInner;
use crate::value::ObjectId;

new_key_type! {
    /// Unique identifier for an effect
    pub struct EffectId;
    /// Unique identifier for a dependency set
    pub struct DepId;
}

/// Callback invoked instead of rerunning an effect when it is notified
pub type EffectScheduler = Rc<dyn Fn()>;

/// Type-erased handle the graph uses to rerun an effect
pub(crate) trait Runnable {
    fn run_erased(&self);
}

/// Observed slot of a reactive object
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum SlotKey {
    Field(Rc<str>),
    /// Key set of the object (adding or removing fields)
    Iterate,
}

struct DepNode {
    /// Subscribers in subscription order
    subscribers: SmallVec<[EffectId; 4]>,
    /// Object slot this dep observes (`None` for refs and computed values)
    slot: Option<(ObjectId, SlotKey)>,
}

struct EffectNode {
    runner: Rc<dyn Runnable>,
    scheduler: Option<EffectScheduler>,
    /// Deps read during the last run
    deps: SmallVec<[DepId; 4]>,
    /// Backs a computed value (notified first)
    computed: bool,
}

pub(crate) struct GraphInner {
    effects: RefCell<SlotMap<EffectId, EffectNode>>,
    deps: RefCell<SlotMap<DepId, DepNode>>,
    targets: RefCell<FxHashMap<ObjectId, FxHashMap<SlotKey, DepId>>>,
    /// Original object -> wrapper registry (weak: wrappers die with their last handle)
    pub(crate) wrappers: RefCell<FxHashMap<ObjectId, Weak<ReactiveInner>>>,
    /// `None` entries pause tracking
    active: RefCell<Vec<Option<EffectId>>>,
}

pub(crate) type WeakGraph = Weak<GraphInner>;

/// The reactive system: dependency graph, wrapper registry and active-effect stack.
///
/// Cheap to clone; clones share the same graph. Handles created from a graph
/// (refs, computed values, wrappers, effects) hold weak references to it, so
/// dropping the last `ReactiveGraph` handle turns them inert.
#[derive(Clone)]
pub struct ReactiveGraph {
    pub(crate) inner: Rc<GraphInner>,
}

impl ReactiveGraph {
    /// Create a new, empty reactive graph
    pub fn new() -> Self {
        Self {
            inner: Rc::new(GraphInner {
                effects: RefCell::new(SlotMap::with_key()),
                deps: RefCell::new(SlotMap::with_key()),
                targets: RefCell::new(FxHashMap::default()),
                wrappers: RefCell::new(FxHashMap::default()),
                active: RefCell::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakGraph {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &WeakGraph) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Whether two handles refer to the same graph
    pub fn ptr_eq(&self, other: &ReactiveGraph) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Drop every effect, dep, observed target and cached wrapper.
    ///
    /// Handles created before the reset stay valid but no longer track or
    /// trigger anything.
    pub fn reset(&self) {
        let effects: Vec<EffectNode> = self
            .inner
            .effects
            .borrow_mut()
            .drain()
            .map(|(_, node)| node)
            .collect();
        self.inner.deps.borrow_mut().clear();
        let targets = std::mem::take(&mut *self.inner.targets.borrow_mut());
        let wrappers = std::mem::take(&mut *self.inner.wrappers.borrow_mut());
        self.inner.active.borrow_mut().clear();

        // Effect closures may own refs whose Drop calls back into the graph
        drop(effects);
        drop(targets);
        drop(wrappers);
        tracing::debug!("reactive graph reset");
    }

    // =========================================================================
    // ACTIVE EFFECT
    // =========================================================================

    /// The effect currently collecting dependencies, if any
    pub fn active_effect(&self) -> Option<EffectId> {
        self.inner.active.borrow().last().copied().flatten()
    }

    /// Whether reads right now would be recorded as dependencies
    pub fn is_tracking(&self) -> bool {
        self.active_effect().is_some()
    }

    /// Run `f` with dependency tracking paused
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = ActiveGuard::enter(&self.inner, None);
        f()
    }

    // =========================================================================
    // DEPS
    // =========================================================================

    /// Allocate a standalone dependency set (used by refs and computed values)
    pub fn create_dep(&self) -> DepId {
        self.inner.deps.borrow_mut().insert(DepNode {
            subscribers: SmallVec::new(),
            slot: None,
        })
    }

    /// Free a dependency set and unlink it from its subscribers
    pub fn release_dep(&self, dep: DepId) {
        // Called from Drop impls: never panic on a held borrow
        let Ok(mut deps) = self.inner.deps.try_borrow_mut() else {
            return;
        };
        let Some(node) = deps.remove(dep) else {
            return;
        };
        drop(deps);

        if let Ok(mut effects) = self.inner.effects.try_borrow_mut() {
            for id in node.subscribers {
                if let Some(effect) = effects.get_mut(id) {
                    effect.deps.retain(|d| *d != dep);
                }
            }
        }
    }

    /// Subscribe the active effect to `dep`. No-op when nothing is tracking.
    pub fn track_dep(&self, dep: DepId) {
        let Some(effect_id) = self.active_effect() else {
            return;
        };

        let mut deps = self.inner.deps.borrow_mut();
        let Some(dep_node) = deps.get_mut(dep) else {
            return;
        };
        if dep_node.subscribers.contains(&effect_id) {
            return;
        }

        let mut effects = self.inner.effects.borrow_mut();
        // A stopped effect may still be finishing its last run
        let Some(effect_node) = effects.get_mut(effect_id) else {
            return;
        };
        dep_node.subscribers.push(effect_id);
        effect_node.deps.push(dep);
    }

    /// Notify every subscriber of `dep`.
    ///
    /// Subscribers are snapshotted first; computed-backed effects are
    /// notified before plain effects.
    pub fn trigger_dep(&self, dep: DepId) {
        let subscribers = match self.inner.deps.borrow().get(dep) {
            Some(node) if !node.subscribers.is_empty() => node.subscribers.clone(),
            _ => return,
        };

        let (computed, plain): (SmallVec<[EffectId; 4]>, SmallVec<[EffectId; 4]>) = {
            let effects = self.inner.effects.borrow();
            subscribers
                .iter()
                .copied()
                .partition(|id| effects.get(*id).map_or(false, |node| node.computed))
        };

        for id in computed.into_iter().chain(plain) {
            self.notify(id);
        }
    }

    fn notify(&self, id: EffectId) {
        // An effect writing state it reads does not rerun itself
        if self.active_effect() == Some(id) {
            return;
        }

        let action = {
            let effects = self.inner.effects.borrow();
            // Stopped earlier in this notification wave
            let Some(node) = effects.get(id) else {
                return;
            };
            match &node.scheduler {
                Some(scheduler) => Notify::Schedule(scheduler.clone()),
                None => Notify::Run(node.runner.clone()),
            }
        };

        match action {
            Notify::Schedule(scheduler) => scheduler(),
            Notify::Run(runner) => runner.run_erased(),
        }
    }

    /// Number of effects subscribed to `dep`
    pub fn subscriber_count(&self, dep: DepId) -> usize {
        self.inner
            .deps
            .borrow()
            .get(dep)
            .map_or(0, |node| node.subscribers.len())
    }

    // =========================================================================
    // OBJECT SLOTS
    // =========================================================================

    /// Record that the active effect read `key` of `target`
    pub fn track(&self, target: ObjectId, key: &str) {
        self.track_slot(target, SlotKey::Field(Rc::from(key)));
    }

    /// Notify the subscribers of `key` on `target`
    pub fn trigger(&self, target: ObjectId, key: &str) {
        self.trigger_slot(target, &SlotKey::Field(Rc::from(key)));
    }

    pub(crate) fn track_iterate(&self, target: ObjectId) {
        self.track_slot(target, SlotKey::Iterate);
    }

    pub(crate) fn trigger_iterate(&self, target: ObjectId) {
        self.trigger_slot(target, &SlotKey::Iterate);
    }

    fn track_slot(&self, target: ObjectId, key: SlotKey) {
        if !self.is_tracking() {
            return;
        }
        let existing = self
            .inner
            .targets
            .borrow()
            .get(&target)
            .and_then(|slots| slots.get(&key).copied());
        let dep = match existing {
            Some(dep) => dep,
            None => {
                let dep = self.inner.deps.borrow_mut().insert(DepNode {
                    subscribers: SmallVec::new(),
                    slot: Some((target, key.clone())),
                });
                self.inner
                    .targets
                    .borrow_mut()
                    .entry(target)
                    .or_default()
                    .insert(key, dep);
                dep
            }
        };
        self.track_dep(dep);
    }

    fn trigger_slot(&self, target: ObjectId, key: &SlotKey) {
        let dep = self
            .inner
            .targets
            .borrow()
            .get(&target)
            .and_then(|slots| slots.get(key).copied());
        if let Some(dep) = dep {
            self.trigger_dep(dep);
        }
    }

    /// Free the object-slot deps of `target` nobody subscribes to.
    ///
    /// Runs when the last handle to a wrapper drops. Deps that still have
    /// subscribers stay until those effects stop reading them.
    pub(crate) fn release_target(&self, target: ObjectId) {
        // Called from Drop impls: never panic on a held borrow
        if let Ok(mut wrappers) = self.inner.wrappers.try_borrow_mut() {
            if wrappers.get(&target).map_or(false, |w| w.strong_count() == 0) {
                wrappers.remove(&target);
            }
        }
        let (Ok(mut targets), Ok(mut deps)) = (
            self.inner.targets.try_borrow_mut(),
            self.inner.deps.try_borrow_mut(),
        ) else {
            return;
        };
        let Some(slots) = targets.get_mut(&target) else {
            return;
        };
        slots.retain(|_, dep| {
            let subscribed = deps.get(*dep).map(|node| !node.subscribers.is_empty());
            if subscribed == Some(false) {
                deps.remove(*dep);
            }
            subscribed == Some(true)
        });
        if slots.is_empty() {
            targets.remove(&target);
        }
    }

    /// Free an object-slot dep left without subscribers once its wrapper is gone
    fn prune_slot_deps(&self, candidates: &[DepId]) {
        for &dep in candidates {
            let slot = match self.inner.deps.borrow().get(dep) {
                Some(node) if node.subscribers.is_empty() => node.slot.clone(),
                _ => None,
            };
            let Some((target, key)) = slot else {
                continue;
            };
            let wrapped = self
                .inner
                .wrappers
                .borrow()
                .get(&target)
                .map_or(false, |w| w.strong_count() > 0);
            if wrapped {
                continue;
            }

            self.inner.deps.borrow_mut().remove(dep);
            let mut targets = self.inner.targets.borrow_mut();
            if let Some(slots) = targets.get_mut(&target) {
                slots.remove(&key);
                if slots.is_empty() {
                    targets.remove(&target);
                }
            }
        }
    }

    /// Dep of an observed `(target, key)` slot, if anything ever tracked it
    pub fn dep_of(&self, target: ObjectId, key: &str) -> Option<DepId> {
        self.inner
            .targets
            .borrow()
            .get(&target)
            .and_then(|slots| slots.get(&SlotKey::Field(Rc::from(key))).copied())
    }

    // =========================================================================
    // EFFECTS
    // =========================================================================

    /// Create an effect and run it once immediately
    pub fn create_effect<T, F>(&self, f: F) -> ReactiveEffect<T>
    where
        T: 'static,
        F: Fn() -> T + 'static,
    {
        let effect = ReactiveEffect::new(self, f);
        effect.run();
        effect
    }

    fn register_effect(
        &self,
        runner: Rc<dyn Runnable>,
        scheduler: Option<EffectScheduler>,
        computed: bool,
    ) -> EffectId {
        self.inner.effects.borrow_mut().insert(EffectNode {
            runner,
            scheduler,
            deps: SmallVec::new(),
            computed,
        })
    }

    fn is_effect_alive(&self, id: EffectId) -> bool {
        self.inner.effects.borrow().contains_key(id)
    }

    /// Unsubscribe an effect from every dep it read on its last run
    fn cleanup_effect(&self, id: EffectId) {
        let deps = match self.inner.effects.borrow_mut().get_mut(id) {
            Some(node) => std::mem::take(&mut node.deps),
            None => return,
        };
        {
            let mut dep_nodes = self.inner.deps.borrow_mut();
            for dep in &deps {
                if let Some(node) = dep_nodes.get_mut(*dep) {
                    node.subscribers.retain(|s| *s != id);
                }
            }
        }
        self.prune_slot_deps(&deps);
    }

    fn stop_effect(&self, id: EffectId) {
        let node = self.inner.effects.borrow_mut().remove(id);
        let Some(node) = node else {
            return;
        };
        {
            let mut deps = self.inner.deps.borrow_mut();
            for dep in &node.deps {
                if let Some(dep_node) = deps.get_mut(*dep) {
                    dep_node.subscribers.retain(|s| *s != id);
                }
            }
        }
        self.prune_slot_deps(&node.deps);
        // Dropped with no graph borrow held
        drop(node);
    }

    /// Get statistics about the reactive graph
    pub fn stats(&self) -> ReactiveStats {
        ReactiveStats {
            effect_count: self.inner.effects.borrow().len(),
            dep_count: self.inner.deps.borrow().len(),
            target_count: self.inner.targets.borrow().len(),
            wrapper_count: self.inner.wrappers.borrow().len(),
            active_depth: self.inner.active.borrow().len(),
        }
    }
}

impl Default for ReactiveGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReactiveGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveGraph")
            .field("stats", &self.stats())
            .finish()
    }
}

enum Notify {
    Schedule(EffectScheduler),
    Run(Rc<dyn Runnable>),
}

/// Pushes onto the active stack; pops on drop, including during unwinding
struct ActiveGuard<'a> {
    graph: &'a GraphInner,
}

impl<'a> ActiveGuard<'a> {
    fn enter(graph: &'a GraphInner, effect: Option<EffectId>) -> Self {
        graph.active.borrow_mut().push(effect);
        Self { graph }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.graph.active.borrow_mut().pop();
    }
}

/// Statistics about the reactive graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactiveStats {
    pub effect_count: usize,
    pub dep_count: usize,
    pub target_count: usize,
    pub wrapper_count: usize,
    pub active_depth: usize,
}

// =============================================================================
// EFFECT HANDLE
// =============================================================================

struct EffectInner<T> {
    id: Cell<EffectId>,
    graph: WeakGraph,
    func: Box<dyn Fn() -> T>,
}

impl<T> EffectInner<T> {
    fn run(&self) -> T {
        let Some(graph) = ReactiveGraph::upgrade(&self.graph) else {
            return (self.func)();
        };
        let id = self.id.get();
        // Stopped effects still run, untracked
        if !graph.is_effect_alive(id) {
            return (self.func)();
        }

        graph.cleanup_effect(id);
        let _guard = ActiveGuard::enter(&graph.inner, Some(id));
        (self.func)()
    }
}

impl<T: 'static> Runnable for EffectInner<T> {
    fn run_erased(&self) {
        let _ = self.run();
    }
}

/// A tracked computation.
///
/// The graph keeps the effect alive until [`stop`](Self::stop) is called;
/// dropping the handle does not stop it.
pub struct ReactiveEffect<T> {
    inner: Rc<EffectInner<T>>,
}

impl<T: 'static> ReactiveEffect<T> {
    /// Create an effect that reruns itself when notified. Does not run it.
    pub fn new(graph: &ReactiveGraph, f: impl Fn() -> T + 'static) -> Self {
        Self::build(graph, Box::new(f), None, false)
    }

    /// Create an effect that calls `scheduler` instead of rerunning when notified
    pub fn with_scheduler(
        graph: &ReactiveGraph,
        f: impl Fn() -> T + 'static,
        scheduler: impl Fn() + 'static,
    ) -> Self {
        Self::build(graph, Box::new(f), Some(Rc::new(scheduler)), false)
    }

    pub(crate) fn build(
        graph: &ReactiveGraph,
        func: Box<dyn Fn() -> T>,
        scheduler: Option<EffectScheduler>,
        computed: bool,
    ) -> Self {
        let inner = Rc::new(EffectInner {
            id: Cell::new(EffectId::default()),
            graph: graph.downgrade(),
            func,
        });
        let id = graph.register_effect(inner.clone(), scheduler, computed);
        inner.id.set(id);
        Self { inner }
    }
}

impl<T> ReactiveEffect<T> {
    pub fn id(&self) -> EffectId {
        self.inner.id.get()
    }

    /// Run the wrapped function, recording its reads as this effect's deps
    pub fn run(&self) -> T {
        self.inner.run()
    }

    /// Unsubscribe from every dep; future triggers no longer reach this effect.
    ///
    /// Idempotent. A run already in progress completes.
    pub fn stop(&self) {
        if let Some(graph) = ReactiveGraph::upgrade(&self.inner.graph) {
            graph.stop_effect(self.id());
        }
    }

    /// Whether the effect is still registered with a live graph
    pub fn is_active(&self) -> bool {
        ReactiveGraph::upgrade(&self.inner.graph)
            .map_or(false, |graph| graph.is_effect_alive(self.id()))
    }

    /// Number of deps read during the last run
    pub fn dep_count(&self) -> usize {
        ReactiveGraph::upgrade(&self.inner.graph).map_or(0, |graph| {
            graph
                .inner
                .effects
                .borrow()
                .get(self.id())
                .map_or(0, |node| node.deps.len())
        })
    }
}

impl<T> Clone for ReactiveEffect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for ReactiveEffect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;
    use std::cell::RefCell;

    #[test]
    fn test_track_outside_effect_is_noop() {
        let graph = ReactiveGraph::new();
        let target = Object::new();

        graph.track(target.id(), "count");

        assert_eq!(graph.dep_of(target.id(), "count"), None);
        assert_eq!(graph.stats().dep_count, 0);
    }

    #[test]
    fn test_track_and_trigger() {
        let graph = ReactiveGraph::new();
        let target = Object::new();
        let runs = Rc::new(Cell::new(0));

        let runs_clone = runs.clone();
        let g = graph.clone();
        let id = target.id();
        let _effect = graph.create_effect(move || {
            g.track(id, "count");
            runs_clone.set(runs_clone.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        graph.trigger(target.id(), "count");
        assert_eq!(runs.get(), 2);

        // Untracked key does nothing
        graph.trigger(target.id(), "other");
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_membership_is_symmetric() {
        let graph = ReactiveGraph::new();
        let a = graph.create_dep();
        let b = graph.create_dep();

        let g = graph.clone();
        let effect = graph.create_effect(move || {
            g.track_dep(a);
            g.track_dep(b);
            g.track_dep(a);
        });

        assert_eq!(effect.dep_count(), 2);
        assert_eq!(graph.subscriber_count(a), 1);
        assert_eq!(graph.subscriber_count(b), 1);

        effect.stop();
        assert_eq!(graph.subscriber_count(a), 0);
        assert_eq!(graph.subscriber_count(b), 0);
        assert!(!effect.is_active());

        // Idempotent
        effect.stop();
    }

    #[test]
    fn test_deps_reflect_latest_run() {
        let graph = ReactiveGraph::new();
        let a = graph.create_dep();
        let b = graph.create_dep();
        let use_a = Rc::new(Cell::new(true));

        let g = graph.clone();
        let flag = use_a.clone();
        let _effect = graph.create_effect(move || {
            if flag.get() {
                g.track_dep(a);
            } else {
                g.track_dep(b);
            }
        });
        assert_eq!(graph.subscriber_count(a), 1);

        use_a.set(false);
        graph.trigger_dep(a);
        assert_eq!(graph.subscriber_count(a), 0);
        assert_eq!(graph.subscriber_count(b), 1);
    }

    #[test]
    fn test_scheduler_replaces_rerun() {
        let graph = ReactiveGraph::new();
        let dep = graph.create_dep();
        let runs = Rc::new(Cell::new(0));
        let scheduled = Rc::new(Cell::new(0));

        let g = graph.clone();
        let runs_clone = runs.clone();
        let scheduled_clone = scheduled.clone();
        let effect = ReactiveEffect::with_scheduler(
            &graph,
            move || {
                g.track_dep(dep);
                runs_clone.set(runs_clone.get() + 1);
            },
            move || scheduled_clone.set(scheduled_clone.get() + 1),
        );
        effect.run();
        assert_eq!(runs.get(), 1);

        graph.trigger_dep(dep);
        graph.trigger_dep(dep);
        assert_eq!(runs.get(), 1);
        assert_eq!(scheduled.get(), 2);
    }

    #[test]
    fn test_nested_runs_restore_active_effect() {
        let graph = ReactiveGraph::new();
        let outer_dep = graph.create_dep();
        let inner_dep = graph.create_dep();

        let g = graph.clone();
        let inner = ReactiveEffect::new(&graph, move || g.track_dep(inner_dep));

        let g = graph.clone();
        let inner_clone = inner.clone();
        let outer = graph.create_effect(move || {
            inner_clone.run();
            // Back to the outer effect after the nested run
            g.track_dep(outer_dep);
            g.active_effect()
        });

        assert_eq!(outer.run(), Some(outer.id()));
        assert_eq!(graph.subscriber_count(outer_dep), 1);
        assert_eq!(graph.subscriber_count(inner_dep), 1);
        assert_eq!(inner.dep_count(), 1);
        assert_eq!(outer.dep_count(), 1);
        assert_eq!(graph.active_effect(), None);
    }

    #[test]
    fn test_active_effect_restored_after_panic() {
        let graph = ReactiveGraph::new();
        let effect = ReactiveEffect::<()>::new(&graph, || panic!("render failed"));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| effect.run()));
        assert!(result.is_err());
        assert_eq!(graph.active_effect(), None);
        assert_eq!(graph.stats().active_depth, 0);
    }

    #[test]
    fn test_computed_subscribers_notified_first() {
        let graph = ReactiveGraph::new();
        let dep = graph.create_dep();
        let order = Rc::new(RefCell::new(Vec::new()));

        // Plain effect subscribes first
        let g = graph.clone();
        let log = order.clone();
        let plain = ReactiveEffect::with_scheduler(
            &graph,
            move || g.track_dep(dep),
            move || log.borrow_mut().push("plain"),
        );
        plain.run();

        let g = graph.clone();
        let log = order.clone();
        let computed = ReactiveEffect::build(
            &graph,
            Box::new(move || g.track_dep(dep)),
            Some(Rc::new(move || log.borrow_mut().push("computed"))),
            true,
        );
        computed.run();

        graph.trigger_dep(dep);
        assert_eq!(*order.borrow(), vec!["computed", "plain"]);
    }

    #[test]
    fn test_self_trigger_does_not_recurse() {
        let graph = ReactiveGraph::new();
        let dep = graph.create_dep();
        let runs = Rc::new(Cell::new(0));

        let g = graph.clone();
        let runs_clone = runs.clone();
        let _effect = graph.create_effect(move || {
            g.track_dep(dep);
            runs_clone.set(runs_clone.get() + 1);
            g.trigger_dep(dep);
        });
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_untracked_pauses_tracking() {
        let graph = ReactiveGraph::new();
        let dep = graph.create_dep();

        let g = graph.clone();
        let effect = graph.create_effect(move || {
            g.untracked(|| g.track_dep(dep));
        });
        assert_eq!(effect.dep_count(), 0);
        assert_eq!(graph.subscriber_count(dep), 0);
    }

    #[test]
    fn test_release_dep_unlinks_effects() {
        let graph = ReactiveGraph::new();
        let dep = graph.create_dep();

        let g = graph.clone();
        let effect = graph.create_effect(move || g.track_dep(dep));
        assert_eq!(effect.dep_count(), 1);

        graph.release_dep(dep);
        assert_eq!(effect.dep_count(), 0);
        assert_eq!(graph.stats().dep_count, 0);
    }

    #[test]
    fn test_reset() {
        let graph = ReactiveGraph::new();
        let dep = graph.create_dep();
        let runs = Rc::new(Cell::new(0));

        let g = graph.clone();
        let runs_clone = runs.clone();
        let effect = graph.create_effect(move || {
            g.track_dep(dep);
            runs_clone.set(runs_clone.get() + 1);
        });

        graph.reset();
        assert_eq!(graph.stats().effect_count, 0);
        assert_eq!(graph.stats().dep_count, 0);
        assert!(!effect.is_active());

        graph.trigger_dep(dep);
        assert_eq!(runs.get(), 1);
    }
}
