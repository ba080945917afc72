//! Per-render state shared by the instance-bound functions
//!
//! A [`RenderScope`] is created for exactly one top-level render. The
//! registry materializes `get`, `set`, `include` and `file` against it, so
//! every nested template invoked during that render sees the same store,
//! while a later render starts from an empty one.

use indexmap::IndexMap;
use minijinja::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::FunctionError;

/// Maximum nesting depth for `include` (prevents infinite loops)
pub const MAX_INCLUDE_DEPTH: usize = 32;

/// Key/value scratch space backing `get` and `set`
#[derive(Debug, Default)]
pub struct ScopedStore {
    entries: Mutex<IndexMap<Value, Value>>,
}

impl ScopedStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, IndexMap<Value, Value>> {
        // A poisoned lock only means another call panicked mid-insert; the map is still usable
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read a value, `None` if the key was never set
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.entries().get(key).cloned()
    }

    /// Write a value, replacing any previous one
    pub fn set(&self, key: Value, value: Value) {
        self.entries().insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Facade handed to factory bindings for the duration of one render
#[derive(Debug, Clone)]
pub struct RenderScope {
    store: Arc<ScopedStore>,
    root: Value,
    dry_run: bool,
    include_depth: Arc<AtomicUsize>,
}

impl RenderScope {
    /// Create a scope whose top-level data is `root`
    pub fn new(root: Value) -> Self {
        Self {
            store: Arc::new(ScopedStore::new()),
            root,
            dry_run: false,
            include_depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Example mode: functions with side effects outside the render
    /// (reading files) return placeholders instead
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn store(&self) -> &ScopedStore {
        &self.store
    }

    /// The data the entry template was executed with
    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Track one level of `include` nesting until the guard is dropped
    pub(crate) fn enter_include(&self) -> Result<IncludeGuard, FunctionError> {
        let depth = self.include_depth.fetch_add(1, Ordering::SeqCst) + 1;
        let guard = IncludeGuard {
            depth: Arc::clone(&self.include_depth),
        };

        if depth > MAX_INCLUDE_DEPTH {
            return Err(FunctionError::invalid(
                "include",
                format!(
                    "recursion depth {depth} exceeded maximum {MAX_INCLUDE_DEPTH} - check for templates including themselves"
                ),
            ));
        }

        Ok(guard)
    }
}

/// Decrements the include depth when dropped
#[derive(Debug)]
pub(crate) struct IncludeGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for IncludeGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_get_set() {
        let store = ScopedStore::new();
        assert!(store.get(&Value::from("key")).is_none());

        store.set(Value::from("key"), Value::from("value"));
        assert_eq!(store.get(&Value::from("key")), Some(Value::from("value")));

        store.set(Value::from("key"), Value::from(42));
        assert_eq!(store.get(&Value::from("key")), Some(Value::from(42)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clones_share_store() {
        let scope = RenderScope::new(Value::UNDEFINED);
        let clone = scope.clone();

        clone.store().set(Value::from("shared"), Value::from(true));
        assert_eq!(scope.store().get(&Value::from("shared")), Some(Value::from(true)));
    }

    #[test]
    fn test_separate_scopes_do_not_share() {
        let first = RenderScope::new(Value::UNDEFINED);
        let second = RenderScope::new(Value::UNDEFINED);

        first.store().set(Value::from("key"), Value::from("value"));
        assert!(second.store().is_empty());
    }

    #[test]
    fn test_include_depth_guard() {
        let scope = RenderScope::new(Value::UNDEFINED);

        {
            let mut guards = Vec::new();
            for _ in 0..MAX_INCLUDE_DEPTH {
                guards.push(scope.enter_include().unwrap());
            }
            assert!(scope.enter_include().is_err());
        }

        // Guards dropped, depth is back to zero
        assert!(scope.enter_include().is_ok());
    }
}
