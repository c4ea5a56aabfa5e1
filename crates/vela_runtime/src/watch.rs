//! Watchers
//!
//! A watcher runs a callback with the new and previous value of a source
//! whenever the source changes. Like component updates, callbacks are
//! batched through the scheduler by default, so several writes before the
//! next flush produce one callback with the final value.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use vela_runtime::{Runtime, WatchOptions};
//!
//! let runtime = Runtime::new();
//! let count = runtime.reactive.create_ref(0);
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let sink = log.clone();
//! let _handle = runtime.watch(
//!     count.clone(),
//!     move |new: &i32, old: Option<&i32>| sink.borrow_mut().push((*new, old.copied())),
//!     WatchOptions::default(),
//! );
//!
//! count.set(1);
//! count.set(2);
//! runtime.scheduler.flush();
//! assert_eq!(*log.borrow(), vec![(2, Some(0))]);
//! ```

use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::rc::Rc;

use vela_core::{Computed, Field, ObjectId, Reactive, ReactiveEffect, Ref, Value};

use crate::runtime::Runtime;
use crate::scheduler::Job;

/// When a triggered watcher runs its callback
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlushMode {
    /// Queued with component updates
    #[default]
    Pre,
    /// After the queued jobs of the flush
    Post,
    /// Synchronously inside the write that triggered it
    Sync,
}

/// Watcher options
#[derive(Clone, Copy, Debug, Default)]
pub struct WatchOptions {
    /// Track every nested field of the value, and call back even if the
    /// top-level value is the same object
    pub deep: bool,
    /// Call back once right away with no previous value
    pub immediate: bool,
    pub flush: FlushMode,
}

impl WatchOptions {
    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    pub fn flush(mut self, mode: FlushMode) -> Self {
        self.flush = mode;
        self
    }
}

// =============================================================================
// SOURCES
// =============================================================================

/// What a watcher observes
pub struct WatchSource<T> {
    getter: Rc<dyn Fn() -> T>,
    force_deep: bool,
}

impl<T> WatchSource<T> {
    /// Observe whatever `f` reads
    pub fn getter(f: impl Fn() -> T + 'static) -> Self {
        Self {
            getter: Rc::new(f),
            force_deep: false,
        }
    }
}

impl<T: Clone + 'static> From<Ref<T>> for WatchSource<T> {
    fn from(r: Ref<T>) -> Self {
        WatchSource::getter(move || r.get())
    }
}

impl<T: Clone + 'static> From<Computed<T>> for WatchSource<T> {
    fn from(c: Computed<T>) -> Self {
        WatchSource::getter(move || c.get())
    }
}

/// Watching a reactive object is always deep
impl From<Reactive> for WatchSource<Reactive> {
    fn from(r: Reactive) -> Self {
        Self {
            getter: Rc::new(move || r.clone()),
            force_deep: true,
        }
    }
}

/// Deep dependency collection: read every nested field
pub trait Traverse {
    fn traverse(&self, seen: &mut FxHashSet<ObjectId>);
}

impl Traverse for Reactive {
    fn traverse(&self, seen: &mut FxHashSet<ObjectId>) {
        if !seen.insert(self.id()) {
            return;
        }
        for key in self.keys() {
            self.get(&key).traverse(seen);
        }
    }
}

impl Traverse for Field {
    fn traverse(&self, seen: &mut FxHashSet<ObjectId>) {
        if let Field::Object(r) = self {
            r.traverse(seen);
        }
    }
}

macro_rules! traverse_leaf {
    ($($ty:ty),*) => {
        $(
            impl Traverse for $ty {
                fn traverse(&self, _seen: &mut FxHashSet<ObjectId>) {}
            }
        )*
    };
}

// Raw values are not reactive; there is nothing to track below them
traverse_leaf!(bool, i32, i64, u32, u64, usize, f32, f64, String, Rc<str>, Value);

impl<T: Traverse> Traverse for Option<T> {
    fn traverse(&self, seen: &mut FxHashSet<ObjectId>) {
        if let Some(v) = self {
            v.traverse(seen);
        }
    }
}

impl<T: Traverse> Traverse for Vec<T> {
    fn traverse(&self, seen: &mut FxHashSet<ObjectId>) {
        for v in self {
            v.traverse(seen);
        }
    }
}

impl<A: Traverse, B: Traverse> Traverse for (A, B) {
    fn traverse(&self, seen: &mut FxHashSet<ObjectId>) {
        self.0.traverse(seen);
        self.1.traverse(seen);
    }
}

// =============================================================================
// WATCHER
// =============================================================================

type WatchCallback<T> = Box<dyn Fn(&T, Option<&T>)>;

struct WatchState<T> {
    effect: ReactiveEffect<T>,
    old: RefCell<Option<T>>,
    callback: WatchCallback<T>,
    deep: bool,
    job: RefCell<Option<Job>>,
}

impl<T: PartialEq + 'static> WatchState<T> {
    fn run_job(&self) {
        if !self.effect.is_active() {
            return;
        }
        let new = self.effect.run();
        let old = self.old.borrow_mut().take();
        if self.deep || old.as_ref() != Some(&new) {
            (self.callback)(&new, old.as_ref());
        }
        *self.old.borrow_mut() = Some(new);
    }

    fn job(&self) -> Option<Job> {
        self.job.borrow().clone()
    }
}

/// Stops a watcher
pub struct WatchHandle {
    stop: Box<dyn Fn()>,
}

impl WatchHandle {
    /// Stop watching; pending callbacks are dropped. Idempotent.
    pub fn stop(&self) {
        (self.stop)()
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle").finish_non_exhaustive()
    }
}

impl Runtime {
    /// Call `callback(new, old)` whenever `source` changes.
    ///
    /// The watcher lives until [`WatchHandle::stop`] is called or the graph
    /// is reset; dropping the handle does not stop it.
    pub fn watch<T, S, F>(&self, source: S, callback: F, options: WatchOptions) -> WatchHandle
    where
        T: Clone + PartialEq + Traverse + 'static,
        S: Into<WatchSource<T>>,
        F: Fn(&T, Option<&T>) + 'static,
    {
        let source = source.into();
        let deep = options.deep || source.force_deep;
        let getter = source.getter;

        // Filled once the state exists; owned by the effect's scheduler so
        // the watcher lives as long as its effect
        let slot: Rc<RefCell<Option<Rc<WatchState<T>>>>> = Rc::new(RefCell::new(None));

        let scheduler = self.scheduler.clone();
        let flush = options.flush;
        let notify_slot = slot.clone();
        let effect = ReactiveEffect::with_scheduler(
            &self.reactive,
            move || {
                let value = getter();
                if deep {
                    value.traverse(&mut FxHashSet::default());
                }
                value
            },
            move || {
                let state = notify_slot.borrow().clone();
                let Some(state) = state else {
                    return;
                };
                match flush {
                    FlushMode::Sync => state.run_job(),
                    FlushMode::Pre => {
                        if let Some(job) = state.job() {
                            scheduler.queue_job(job);
                        }
                    }
                    FlushMode::Post => {
                        if let Some(job) = state.job() {
                            scheduler.queue_post_flush_cb(job);
                        }
                    }
                }
            },
        );

        let state = Rc::new(WatchState {
            effect: effect.clone(),
            old: RefCell::new(None),
            callback: Box::new(callback),
            deep,
            job: RefCell::new(None),
        });
        let weak = Rc::downgrade(&state);
        *state.job.borrow_mut() = Some(Job::new(move || {
            if let Some(state) = weak.upgrade() {
                state.run_job();
            }
        }));
        *slot.borrow_mut() = Some(state.clone());

        if options.immediate {
            state.run_job();
        } else {
            *state.old.borrow_mut() = Some(effect.run());
        }
        tracing::debug!(?flush, deep, immediate = options.immediate, "watcher created");

        let scheduler = self.scheduler.clone();
        WatchHandle {
            stop: Box::new(move || {
                effect.stop();
                let state = slot.borrow_mut().take();
                if let Some(job) = state.and_then(|state| state.job()) {
                    scheduler.invalidate_job(&job);
                }
            }),
        }
    }
}

/// [`Runtime::watch`] on the thread's shared runtime
pub fn watch<T, S, F>(source: S, callback: F, options: WatchOptions) -> WatchHandle
where
    T: Clone + PartialEq + Traverse + 'static,
    S: Into<WatchSource<T>>,
    F: Fn(&T, Option<&T>) + 'static,
{
    Runtime::shared().watch(source, callback, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_core::Object;

    type Log<T> = Rc<RefCell<Vec<(T, Option<T>)>>>;

    fn recorder<T: Clone + 'static>() -> (Log<T>, impl Fn(&T, Option<&T>)) {
        let log: Log<T> = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        (log, move |new: &T, old: Option<&T>| {
            sink.borrow_mut().push((new.clone(), old.cloned()))
        })
    }

    #[test]
    fn test_writes_before_flush_coalesce() {
        let runtime = Runtime::new();
        let count = runtime.reactive.create_ref(0);
        let (log, cb) = recorder::<i32>();

        let _handle = runtime.watch(count.clone(), cb, WatchOptions::default());
        count.set(1);
        count.set(2);
        assert!(log.borrow().is_empty());

        runtime.scheduler.flush();
        assert_eq!(*log.borrow(), vec![(2, Some(0))]);
    }

    #[test]
    fn test_unchanged_value_skips_callback() {
        let runtime = Runtime::new();
        let count = runtime.reactive.create_ref(0);
        let (log, cb) = recorder::<i32>();

        let _handle = runtime.watch(count.clone(), cb, WatchOptions::default());
        count.set(1);
        count.set(0);
        runtime.scheduler.flush();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_immediate() {
        let runtime = Runtime::new();
        let count = runtime.reactive.create_ref(5);
        let (log, cb) = recorder::<i32>();

        let _handle = runtime.watch(count, cb, WatchOptions::default().immediate());
        assert_eq!(*log.borrow(), vec![(5, None)]);
    }

    #[test]
    fn test_sync_flush() {
        let runtime = Runtime::new();
        let count = runtime.reactive.create_ref(0);
        let (log, cb) = recorder::<i32>();

        let _handle = runtime.watch(
            count.clone(),
            cb,
            WatchOptions::default().flush(FlushMode::Sync),
        );
        count.set(1);
        count.set(2);
        assert_eq!(*log.borrow(), vec![(1, Some(0)), (2, Some(1))]);
    }

    #[test]
    fn test_post_flush_runs_after_jobs() {
        let runtime = Runtime::new();
        let count = runtime.reactive.create_ref(0);
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        let _post = runtime.watch(
            count.clone(),
            move |_: &i32, _| o.borrow_mut().push("post"),
            WatchOptions::default().flush(FlushMode::Post),
        );
        let o = order.clone();
        let _pre = runtime.watch(
            count.clone(),
            move |_: &i32, _| o.borrow_mut().push("pre"),
            WatchOptions::default(),
        );

        count.set(1);
        runtime.scheduler.flush();
        assert_eq!(*order.borrow(), vec!["pre", "post"]);
    }

    #[test]
    fn test_getter_source_and_computed() {
        let runtime = Runtime::new();
        let state = runtime.reactive.reactive(&Object::new().with("n", 1));
        let (log, cb) = recorder::<i64>();

        let s = state.clone();
        let _handle = runtime.watch(
            WatchSource::getter(move || s.get("n").as_i64().unwrap_or_default()),
            cb,
            WatchOptions::default(),
        );

        let s = state.clone();
        let doubled = runtime
            .reactive
            .create_computed(move || s.get("n").as_i64().unwrap_or_default() * 2);
        let (computed_log, computed_cb) = recorder::<i64>();
        let _computed_handle = runtime.watch(doubled, computed_cb, WatchOptions::default());

        state.set("n", 4);
        runtime.scheduler.flush();
        assert_eq!(*log.borrow(), vec![(4, Some(1))]);
        assert_eq!(*computed_log.borrow(), vec![(8, Some(2))]);
    }

    #[test]
    fn test_reactive_source_is_deep() {
        let runtime = Runtime::new();
        let inner = Object::new().with("name", "a");
        let state = runtime.reactive.reactive(&Object::new().with("user", inner.clone()));
        let calls = Rc::new(RefCell::new(0));

        let c = calls.clone();
        let _handle = runtime.watch(
            state.clone(),
            move |_: &Reactive, _| *c.borrow_mut() += 1,
            WatchOptions::default(),
        );

        // Nested write
        runtime.reactive.reactive(&inner).set("name", "b");
        runtime.scheduler.flush();
        assert_eq!(*calls.borrow(), 1);

        // New key
        state.set("extra", true);
        runtime.scheduler.flush();
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn test_stop() {
        let runtime = Runtime::new();
        let count = runtime.reactive.create_ref(0);
        let (log, cb) = recorder::<i32>();

        let handle = runtime.watch(count.clone(), cb, WatchOptions::default());
        count.set(1);
        handle.stop();
        runtime.scheduler.flush();
        count.set(2);
        runtime.scheduler.flush();
        assert!(log.borrow().is_empty());
        assert_eq!(runtime.reactive.subscriber_count(count.dep()), 0);

        handle.stop();
    }
}
