//! Vela Reactive Core
//!
//! Dependency-tracking primitives for the Vela rendering runtime:
//!
//! - **Reactive objects**: [`Reactive`] wrappers track reads per `(object, key)`
//!   and notify on writes
//! - **Refs**: [`Ref`] single-value cells with change detection
//! - **Computed values**: [`Computed`] lazily evaluated, cached derivations
//! - **Effects**: [`ReactiveEffect`] tracked computations, rerun or scheduled
//!   when their dependencies change
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use vela_core::{Object, ReactiveGraph};
//!
//! let graph = ReactiveGraph::new();
//! let state = graph.reactive(&Object::new().with("count", 1));
//!
//! // Derived values recompute only when read after a change
//! let s = state.clone();
//! let doubled = graph.create_computed(move || s.get("count").as_i64().unwrap_or(0) * 2);
//!
//! // Effects rerun when anything they read changes
//! let seen = Rc::new(Cell::new(0));
//! let seen_clone = seen.clone();
//! let d = doubled.clone();
//! let _effect = graph.create_effect(move || seen_clone.set(d.get()));
//!
//! state.set("count", 5);
//! assert_eq!(doubled.get(), 10);
//! assert_eq!(seen.get(), 10);
//! ```

pub mod context_state;
pub mod error;
pub mod object;
pub mod reactive;
pub mod signal;
pub mod value;

pub use error::{ReactiveError, Result};
pub use object::{Field, Reactive};
pub use reactive::{
    DepId, EffectId, EffectScheduler, ReactiveEffect, ReactiveGraph, ReactiveStats,
};
pub use signal::{Computed, Ref};
pub use value::{Object, ObjectId, Value};
