//! Thread-local default reactive graph
//!
//! Most applications use a single reactive system. [`ReactiveGraph::shared`]
//! returns a per-thread graph, and the free functions here create state on it
//! without passing a graph around:
//!
//! ```
//! use vela_core::context_state::{create_computed, create_ref};
//!
//! let count = create_ref(1);
//! let c = count.clone();
//! let doubled = create_computed(move || c.get() * 2);
//!
//! count.set(4);
//! assert_eq!(doubled.get(), 8);
//! ```
//!
//! Tests that need isolation should build their own [`ReactiveGraph`] instead.

use crate::object::Reactive;
use crate::reactive::{ReactiveEffect, ReactiveGraph};
use crate::signal::{Computed, Ref};
use crate::value::Object;

thread_local! {
    static SHARED_GRAPH: ReactiveGraph = ReactiveGraph::new();
}

impl ReactiveGraph {
    /// The calling thread's default graph
    pub fn shared() -> ReactiveGraph {
        SHARED_GRAPH.with(ReactiveGraph::clone)
    }
}

/// Create a reactive cell on the shared graph
pub fn create_ref<T: Clone + PartialEq + 'static>(value: T) -> Ref<T> {
    ReactiveGraph::shared().create_ref(value)
}

/// Create a computed value on the shared graph
pub fn create_computed<T, F>(getter: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    ReactiveGraph::shared().create_computed(getter)
}

/// Create and run an effect on the shared graph
pub fn create_effect<T, F>(f: F) -> ReactiveEffect<T>
where
    T: 'static,
    F: Fn() -> T + 'static,
{
    ReactiveGraph::shared().create_effect(f)
}

/// Wrap an object on the shared graph
pub fn reactive(object: &Object) -> Reactive {
    ReactiveGraph::shared().reactive(object)
}

/// Run `f` without tracking on the shared graph
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    ReactiveGraph::shared().untracked(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_shared_graph_is_per_thread_singleton() {
        assert!(ReactiveGraph::shared().ptr_eq(&ReactiveGraph::shared()));
    }

    #[test]
    fn test_free_functions_share_a_graph() {
        let state = reactive(&Object::new().with("n", 1));
        let seen = Rc::new(Cell::new(0));

        let s = state.clone();
        let seen_clone = seen.clone();
        let effect = create_effect(move || {
            seen_clone.set(s.get("n").as_i64().unwrap_or_default());
        });

        state.set("n", 7);
        assert_eq!(seen.get(), 7);

        effect.stop();
        state.set("n", 8);
        assert_eq!(seen.get(), 7);
    }
}
