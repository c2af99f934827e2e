//! Owner-partitioned function registry.
//!
//! Maps `(OwnerKey, FunctionName)` to a callable. The registry has no
//! persistence of its own — it is rebuilt from the loader on demand — and no
//! cross-owner visibility: clearing or reloading one owner never touches
//! another's entries.

use crate::function::ToolFunction;
use crate::identifiers::{FunctionName, OwnerKey};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// In-process registry of callable functions, partitioned by owner key.
///
/// Concurrent access for different owners never interferes. Mutation for a
/// single owner is single-flow by construction (the coordinator drives one
/// turn at a time per owner), so no same-owner write races are expected.
#[derive(Default)]
pub struct FunctionRegistry {
    owners: DashMap<OwnerKey, HashMap<FunctionName, Arc<dyn ToolFunction>>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable under `(owner, name)`. Idempotent upsert: a
    /// previous entry under the same key is replaced, last write wins.
    pub fn register(&self, owner: &OwnerKey, name: FunctionName, callable: Arc<dyn ToolFunction>) {
        debug!(owner = %owner, function = %name, "Registering function");
        self.owners
            .entry(owner.clone())
            .or_default()
            .insert(name, callable);
    }

    /// Look up a callable. `None` is a registry miss — the caller decides
    /// whether that is fatal.
    pub fn lookup(&self, owner: &OwnerKey, name: &FunctionName) -> Option<Arc<dyn ToolFunction>> {
        self.owners
            .get(owner)
            .and_then(|functions| functions.get(name).cloned())
    }

    /// Drop an owner's entire map. Used before a full reload; a reload is
    /// always clear-then-rebuild, never a partial update.
    pub fn clear(&self, owner: &OwnerKey) {
        if self.owners.remove(owner).is_some() {
            debug!(owner = %owner, "Cleared function registry for owner");
        }
    }

    /// Names currently registered for an owner, sorted for determinism.
    pub fn function_names(&self, owner: &OwnerKey) -> Vec<FunctionName> {
        let mut names: Vec<FunctionName> = self
            .owners
            .get(owner)
            .map(|functions| functions.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Number of functions registered for an owner.
    pub fn len(&self, owner: &OwnerKey) -> usize {
        self.owners
            .get(owner)
            .map(|functions| functions.len())
            .unwrap_or(0)
    }

    /// Whether an owner has no registered functions.
    pub fn is_empty(&self, owner: &OwnerKey) -> bool {
        self.len(owner) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionError;
    use async_trait::async_trait;

    struct StaticFunction(&'static str);

    #[async_trait]
    impl ToolFunction for StaticFunction {
        async fn invoke(
            &self,
            _args: serde_json::Value,
        ) -> Result<serde_json::Value, FunctionError> {
            Ok(serde_json::Value::String(self.0.to_string()))
        }
    }

    fn owner(key: &str) -> OwnerKey {
        OwnerKey::new_unchecked(key)
    }

    fn name(value: &str) -> FunctionName {
        FunctionName::new_unchecked(value)
    }

    #[test]
    fn lookup_finds_registered_function() {
        let registry = FunctionRegistry::new();
        registry.register(&owner("a"), name("greet"), Arc::new(StaticFunction("hi")));

        assert!(registry.lookup(&owner("a"), &name("greet")).is_some());
        assert!(registry.lookup(&owner("a"), &name("ghostFn")).is_none());
    }

    #[test]
    fn owners_are_isolated() {
        let registry = FunctionRegistry::new();
        registry.register(&owner("a"), name("greet"), Arc::new(StaticFunction("hi")));

        assert!(registry.lookup(&owner("b"), &name("greet")).is_none());
        assert_eq!(registry.len(&owner("b")), 0);
    }

    #[tokio::test]
    async fn register_is_last_write_wins() {
        let registry = FunctionRegistry::new();
        registry.register(&owner("a"), name("greet"), Arc::new(StaticFunction("old")));
        registry.register(&owner("a"), name("greet"), Arc::new(StaticFunction("new")));

        assert_eq!(registry.len(&owner("a")), 1);
        let callable = registry.lookup(&owner("a"), &name("greet")).unwrap();
        let result = callable.invoke(serde_json::json!({})).await.unwrap();
        assert_eq!(result, serde_json::Value::String("new".to_string()));
    }

    #[test]
    fn clear_drops_only_the_given_owner() {
        let registry = FunctionRegistry::new();
        registry.register(&owner("a"), name("greet"), Arc::new(StaticFunction("hi")));
        registry.register(&owner("b"), name("greet"), Arc::new(StaticFunction("yo")));

        registry.clear(&owner("a"));

        assert!(registry.is_empty(&owner("a")));
        assert!(registry.lookup(&owner("b"), &name("greet")).is_some());
    }

    #[test]
    fn function_names_are_sorted() {
        let registry = FunctionRegistry::new();
        registry.register(&owner("a"), name("zulu"), Arc::new(StaticFunction("z")));
        registry.register(&owner("a"), name("alpha"), Arc::new(StaticFunction("a")));

        let names = registry.function_names(&owner("a"));
        assert_eq!(names, vec![name("alpha"), name("zulu")]);
    }
}
