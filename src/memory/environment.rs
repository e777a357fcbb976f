//! Lexically chained variable scopes
//!
//! An [`Environment`] is one scope: a name→[`Value`] map plus an optional link
//! to its parent. Lookups walk outward through the chain; plain binds always
//! land in the scope they are called on. Scopes are shared through [`Arc`] so a
//! child scope handed to a handler keeps its ancestors alive.
//!
//! Each scope carries its own [`RwLock`]. No operation holds more than one
//! scope lock at a time, so concurrent readers and writers on different levels
//! of the chain cannot deadlock.

use super::value::Value;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A single scope in the variable chain
#[derive(Debug, Default)]
pub struct Environment {
    store: RwLock<FxHashMap<String, Value>>,
    parent: Option<Arc<Environment>>,
}

impl Environment {
    /// Create a root scope with no parent.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a child scope whose lookups fall back to `parent`.
    pub fn child(parent: &Arc<Environment>) -> Arc<Self> {
        Arc::new(Self {
            store: RwLock::new(FxHashMap::default()),
            parent: Some(Arc::clone(parent)),
        })
    }

    pub fn parent(&self) -> Option<&Arc<Environment>> {
        self.parent.as_ref()
    }

    /// Resolve `name` in this scope or the nearest ancestor that binds it.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.store.read().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bind `name` in this scope, shadowing any ancestor binding.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.store.write().insert(name.into(), value);
    }

    /// Overwrite the binding in the first scope that already owns `name`.
    ///
    /// Returns `false` (and changes nothing) when no scope in the chain binds it.
    pub fn update(&self, name: &str, value: Value) -> bool {
        {
            let mut store = self.store.write();
            if let Some(slot) = store.get_mut(name) {
                *slot = value;
                return true;
            }
        }
        match &self.parent {
            Some(parent) => parent.update(name, value),
            None => false,
        }
    }

    /// Remove `name` from this scope only. Ancestor bindings become visible again.
    pub fn delete_local(&self, name: &str) -> Option<Value> {
        self.store.write().remove(name)
    }

    /// Names bound directly in this scope, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.store.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Names visible from this scope, innermost first, without duplicates.
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys = self.keys();
        let mut scope = self.parent.clone();
        while let Some(env) = scope {
            for key in env.keys() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
            scope = env.parent.clone();
        }
        keys
    }

    /// Copy of this scope's own bindings, detached from the chain.
    pub fn snapshot(&self) -> FxHashMap<String, Value> {
        self.store.read().clone()
    }
}

impl Clone for Environment {
    /// Copies this scope's bindings; the copy shares the same parent.
    fn clone(&self) -> Self {
        Self {
            store: RwLock::new(self.store.read().clone()),
            parent: self.parent.clone(),
        }
    }
}
