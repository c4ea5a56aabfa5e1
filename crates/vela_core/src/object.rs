//! Reactive wrappers over plain objects
//!
//! A [`Reactive`] intercepts reads and writes on an [`Object`]: reads record
//! the `(object, key)` pair as a dependency of the active effect, writes go
//! through to the underlying object and notify the effects that read the key.
//!
//! Wrapping is identity-preserving: wrapping the same object twice yields the
//! same wrapper while any handle to it is alive. Nested objects are wrapped
//! lazily when read.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::reactive::{ReactiveGraph, WeakGraph};
use crate::value::{same_f64, Object, ObjectId, Value};

pub(crate) struct ReactiveInner {
    object: Object,
    graph: WeakGraph,
}

impl Drop for ReactiveInner {
    fn drop(&mut self) {
        if let Some(graph) = ReactiveGraph::upgrade(&self.graph) {
            graph.release_target(self.object.id());
        }
    }
}

/// Reactive view of an [`Object`]
#[derive(Clone)]
pub struct Reactive {
    inner: Rc<ReactiveInner>,
}

impl ReactiveGraph {
    /// Wrap `object` so reads are tracked and writes trigger.
    ///
    /// Returns the cached wrapper if `object` was wrapped before.
    pub fn reactive(&self, object: &Object) -> Reactive {
        let id = object.id();
        if let Some(existing) = self
            .inner
            .wrappers
            .borrow()
            .get(&id)
            .and_then(Weak::upgrade)
        {
            return Reactive { inner: existing };
        }

        let inner = Rc::new(ReactiveInner {
            object: object.clone(),
            graph: self.downgrade(),
        });
        self.inner
            .wrappers
            .borrow_mut()
            .insert(id, Rc::downgrade(&inner));
        tracing::trace!(object = id.to_raw(), "wrapped object");
        Reactive { inner }
    }

    /// Convert a raw value read from state, wrapping objects
    pub fn wrap(&self, value: Value) -> Field {
        match value {
            Value::Null => Field::Null,
            Value::Bool(b) => Field::Bool(b),
            Value::Int(i) => Field::Int(i),
            Value::Float(f) => Field::Float(f),
            Value::Str(s) => Field::Str(s),
            Value::Object(o) => Field::Object(self.reactive(&o)),
        }
    }
}

impl Reactive {
    fn graph(&self) -> Option<ReactiveGraph> {
        ReactiveGraph::upgrade(&self.inner.graph)
    }

    /// Wrapper that neither tracks nor triggers, for graphs that are gone
    fn detached(object: Object, graph: WeakGraph) -> Reactive {
        Reactive {
            inner: Rc::new(ReactiveInner { object, graph }),
        }
    }

    fn wrap_value(&self, value: Value) -> Field {
        match self.graph() {
            Some(graph) => graph.wrap(value),
            None => match value {
                Value::Object(o) => Field::Object(Self::detached(o, self.inner.graph.clone())),
                other => Field::from_primitive(other),
            },
        }
    }

    /// Tracked read. Missing keys read as [`Field::Null`] and are still tracked.
    pub fn get(&self, key: &str) -> Field {
        if let Some(graph) = self.graph() {
            graph.track(self.id(), key);
        }
        let value = self.inner.object.get(key).unwrap_or_default();
        self.wrap_value(value)
    }

    /// Write through to the underlying object and notify readers of `key`.
    ///
    /// Always notifies, even when the value is unchanged. Adding a new key
    /// also notifies readers of the key set.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let previous = self.inner.object.insert(key, value);
        if let Some(graph) = self.graph() {
            graph.trigger(self.id(), key);
            if previous.is_none() {
                graph.trigger_iterate(self.id());
            }
        }
    }

    /// Apply `f` to the current (untracked) value of `key` and write the result
    pub fn update(&self, key: &str, f: impl FnOnce(Value) -> Value) {
        let current = self.inner.object.get(key).unwrap_or_default();
        self.set(key, f(current));
    }

    /// Remove `key`, notifying its readers and readers of the key set
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.inner.object.remove(key);
        if removed.is_some() {
            if let Some(graph) = self.graph() {
                graph.trigger(self.id(), key);
                graph.trigger_iterate(self.id());
            }
        }
        removed
    }

    /// Tracked membership test
    pub fn has(&self, key: &str) -> bool {
        if let Some(graph) = self.graph() {
            graph.track(self.id(), key);
        }
        self.inner.object.contains_key(key)
    }

    /// Field names in insertion order; tracks the key set
    pub fn keys(&self) -> Vec<String> {
        if let Some(graph) = self.graph() {
            graph.track_iterate(self.id());
        }
        self.inner.object.keys()
    }

    /// The underlying object. Access through it is untracked.
    pub fn to_raw(&self) -> Object {
        self.inner.object.clone()
    }

    pub fn id(&self) -> ObjectId {
        self.inner.object.id()
    }

    /// Whether both handles are the same wrapper
    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("object", &self.inner.object)
            .finish()
    }
}

impl From<Reactive> for Value {
    fn from(r: Reactive) -> Self {
        Value::Object(r.to_raw())
    }
}

impl From<&Reactive> for Value {
    fn from(r: &Reactive) -> Self {
        Value::Object(r.to_raw())
    }
}

// =============================================================================
// FIELD
// =============================================================================

/// A value read through a reactive wrapper.
///
/// Same shape as [`Value`], except nested objects come back wrapped so reads
/// through them are tracked too.
#[derive(Clone, Debug, Default)]
pub enum Field {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Object(Reactive),
}

impl Field {
    fn from_primitive(value: Value) -> Field {
        match value {
            Value::Null | Value::Object(_) => Field::Null,
            Value::Bool(b) => Field::Bool(b),
            Value::Int(i) => Field::Int(i),
            Value::Float(f) => Field::Float(f),
            Value::Str(s) => Field::Str(s),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Field::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Field::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Int(i) => Some(*i as f64),
            Field::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Field::Object(r) => Some(r),
            _ => None,
        }
    }

    /// Unwrap back to a raw value
    pub fn into_value(self) -> Value {
        match self {
            Field::Null => Value::Null,
            Field::Bool(b) => Value::Bool(b),
            Field::Int(i) => Value::Int(i),
            Field::Float(f) => Value::Float(f),
            Field::Str(s) => Value::Str(s),
            Field::Object(r) => Value::Object(r.to_raw()),
        }
    }

    /// Display text for interpolation into templates
    pub fn to_text(&self) -> String {
        match self {
            Field::Null => String::new(),
            Field::Bool(b) => b.to_string(),
            Field::Int(i) => i.to_string(),
            Field::Float(f) => f.to_string(),
            Field::Str(s) => s.to_string(),
            Field::Object(r) => format!("[object #{}]", r.id().to_raw()),
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Null, Field::Null) => true,
            (Field::Bool(a), Field::Bool(b)) => a == b,
            (Field::Int(a), Field::Int(b)) => a == b,
            (Field::Float(a), Field::Float(b)) => same_f64(*a, *b),
            (Field::Str(a), Field::Str(b)) => a == b,
            (Field::Object(a), Field::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<Field> for Value {
    fn from(field: Field) -> Self {
        field.into_value()
    }
}

impl From<&Field> for Value {
    fn from(field: &Field) -> Self {
        field.clone().into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_reactive_identity_is_cached() {
        let graph = ReactiveGraph::new();
        let raw = Object::new().with("count", 0);

        let a = graph.reactive(&raw);
        let b = graph.reactive(&raw);
        assert!(a.ptr_eq(&b));
        assert!(a.to_raw().ptr_eq(&raw));
    }

    #[test]
    fn test_writes_go_through_to_raw() {
        let graph = ReactiveGraph::new();
        let raw = Object::new().with("count", 0);
        let state = graph.reactive(&raw);

        state.set("count", 5);
        assert_eq!(raw.get("count"), Some(Value::Int(5)));
        assert_eq!(state.get("count"), Field::Int(5));
    }

    #[test]
    fn test_effect_reruns_on_tracked_write() {
        let graph = ReactiveGraph::new();
        let state = graph.reactive(&Object::new().with("count", 0).with("other", 0));
        let seen = Rc::new(Cell::new(-1));

        let s = state.clone();
        let seen_clone = seen.clone();
        let _effect = graph.create_effect(move || {
            seen_clone.set(s.get("count").as_i64().unwrap_or_default());
        });
        assert_eq!(seen.get(), 0);

        state.set("count", 3);
        assert_eq!(seen.get(), 3);

        // Unread key does not rerun
        seen.set(-1);
        state.set("other", 1);
        assert_eq!(seen.get(), -1);
    }

    #[test]
    fn test_set_triggers_even_when_unchanged() {
        let graph = ReactiveGraph::new();
        let state = graph.reactive(&Object::new().with("count", 1));
        let runs = Rc::new(Cell::new(0));

        let s = state.clone();
        let runs_clone = runs.clone();
        let _effect = graph.create_effect(move || {
            let _ = s.get("count");
            runs_clone.set(runs_clone.get() + 1);
        });

        state.set("count", 1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_nested_objects_are_wrapped_lazily() {
        let graph = ReactiveGraph::new();
        let inner = Object::new().with("name", "a");
        let state = graph.reactive(&Object::new().with("user", inner.clone()));
        let seen = Rc::new(std::cell::RefCell::new(String::new()));

        let s = state.clone();
        let seen_clone = seen.clone();
        let _effect = graph.create_effect(move || {
            if let Field::Object(user) = s.get("user") {
                *seen_clone.borrow_mut() = user.get("name").to_text();
            }
        });
        assert_eq!(*seen.borrow(), "a");

        // Mutating through a separately obtained wrapper reaches the effect
        graph.reactive(&inner).set("name", "b");
        assert_eq!(*seen.borrow(), "b");
    }

    #[test]
    fn test_keys_track_additions_and_removals() {
        let graph = ReactiveGraph::new();
        let state = graph.reactive(&Object::new().with("a", 1));
        let count = Rc::new(Cell::new(0));

        let s = state.clone();
        let count_clone = count.clone();
        let _effect = graph.create_effect(move || count_clone.set(s.keys().len()));
        assert_eq!(count.get(), 1);

        state.set("b", 2);
        assert_eq!(count.get(), 2);

        state.remove("a");
        assert_eq!(count.get(), 1);

        // Removing a missing key is silent
        assert_eq!(state.remove("missing"), None);
    }

    #[test]
    fn test_wrapper_is_inert_after_graph_drop() {
        let graph = ReactiveGraph::new();
        let raw = Object::new().with("nested", Object::new());
        let state = graph.reactive(&raw);
        drop(graph);

        state.set("count", 1);
        assert_eq!(state.get("count"), Field::Int(1));
        assert!(matches!(state.get("nested"), Field::Object(_)));
    }

    #[test]
    fn test_dropped_wrappers_release_registry_and_deps() {
        let graph = ReactiveGraph::new();

        for i in 0..1000 {
            let state = graph.reactive(&Object::new().with("n", i));
            let s = state.clone();
            let effect = graph.create_effect(move || {
                let _ = s.get("n");
            });
            effect.stop();
        }

        let stats = graph.stats();
        assert_eq!(stats.effect_count, 0);
        assert_eq!(stats.dep_count, 0);
        assert_eq!(stats.target_count, 0);
        assert_eq!(stats.wrapper_count, 0);
    }

    #[test]
    fn test_subscribed_slot_outlives_wrapper() {
        let graph = ReactiveGraph::new();
        let inner = Object::new().with("name", "a");
        let state = graph.reactive(&Object::new().with("user", inner.clone()));
        let runs = Rc::new(Cell::new(0));

        let s = state.clone();
        let r = runs.clone();
        let effect = graph.create_effect(move || {
            // The nested wrapper drops at the end of the read
            if let Field::Object(user) = s.get("user") {
                let _ = user.get("name");
            }
            r.set(r.get() + 1);
        });
        assert_eq!(graph.stats().wrapper_count, 1);

        graph.reactive(&inner).set("name", "b");
        assert_eq!(runs.get(), 2);

        effect.stop();
        drop(effect);
        drop(state);
        let stats = graph.stats();
        assert_eq!(stats.dep_count, 0);
        assert_eq!(stats.target_count, 0);
        assert_eq!(stats.wrapper_count, 0);
    }
}
