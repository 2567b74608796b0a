use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::artifact::Artifact;
use crate::compiler;
use crate::error::{OpaLinkError, Result};
use crate::eval::{PreparedQuery, ResultEntry};

/// Opaque prepared-query identifier. Issued from 1 upwards, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub u64);

impl Handle {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
struct RegistryInner {
    last: u64,
    entries: HashMap<Handle, Arc<PreparedQuery>>,
}

/// Prepared-query registry:
/// - `handle -> PreparedQuery`
/// - monotonically increasing handle counter
///
/// Both live behind one mutex. The lock is held for map access only; compiling
/// and evaluating always happen outside it.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `module_source` with `query` and register the result.
    pub fn create(&self, query: &str, module_name: &str, module_source: &str) -> Result<Handle> {
        let prepared = compiler::compile_module(query, module_name, module_source)?;
        Ok(self.insert(prepared))
    }

    /// Prepare an artifact and register the result.
    pub fn create_from_artifact(&self, artifact: &Artifact) -> Result<Handle> {
        let prepared = compiler::prepare_artifact(artifact)?;
        Ok(self.insert(prepared))
    }

    /// Register an already prepared query.
    pub fn insert(&self, prepared: PreparedQuery) -> Handle {
        let prepared = Arc::new(prepared);
        let handle = {
            let mut inner = self.lock();
            inner.last += 1;
            let handle = Handle(inner.last);
            inner.entries.insert(handle, Arc::clone(&prepared));
            handle
        };
        tracing::debug!(handle = %handle, query = prepared.query(), "prepared query registered");
        handle
    }

    /// Remove `handle`. Absent or already disposed handles are a no-op.
    /// Returns whether an entry was removed.
    pub fn dispose(&self, handle: Handle) -> bool {
        let removed = self.lock().entries.remove(&handle).is_some();
        if removed {
            tracing::debug!(handle = %handle, "prepared query disposed");
        }
        removed
    }

    /// Shared reference to the prepared query. Stays usable after a
    /// concurrent `dispose` of the same handle; later lookups report `NotFound`.
    pub fn lookup(&self, handle: Handle) -> Result<Arc<PreparedQuery>> {
        self.lock()
            .entries
            .get(&handle)
            .cloned()
            .ok_or(OpaLinkError::NotFound(handle))
    }

    pub fn eval_bool(&self, handle: Handle, input: &str) -> Result<bool> {
        self.lookup(handle)?.eval_bool(input)
    }

    pub fn eval(&self, handle: Handle, input: &str) -> Result<Vec<ResultEntry>> {
        self.lookup(handle)?.eval(input)
    }

    pub fn eval_json(&self, handle: Handle, input: &str) -> Result<String> {
        self.lookup(handle)?.eval_json(input)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // Map and counter are updated together under the guard, so a
        // poisoned lock still holds consistent state.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    const MODULE: &str = "package example\n\ndefault allow := false\n";

    #[test]
    fn handles_start_at_one() {
        let reg = Registry::new();
        assert_eq!(reg.create("data.example.allow", "example.rego", MODULE).unwrap(), Handle(1));
        assert_eq!(reg.create("data.example.allow", "example.rego", MODULE).unwrap(), Handle(2));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn disposed_handles_are_not_reused() {
        let reg = Registry::new();
        let a = reg.create("data.example.allow", "example.rego", MODULE).unwrap();
        assert!(reg.dispose(a));
        let b = reg.create("data.example.allow", "example.rego", MODULE).unwrap();
        assert!(b > a);
    }

    #[test]
    fn failed_create_leaves_registry_untouched() {
        let reg = Registry::new();
        assert!(reg.create("data.example.allow", "bad.rego", "package").is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn lookup_outlives_dispose() {
        let reg = Registry::new();
        let h = reg.create("data.example.allow", "example.rego", MODULE).unwrap();
        let held = reg.lookup(h).unwrap();
        reg.dispose(h);
        assert!(!held.eval_bool("{}").unwrap());
        assert_eq!(reg.lookup(h).unwrap_err().code().as_str(), "NOT_FOUND");
    }
}
