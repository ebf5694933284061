//! Entity repository registry.
//!
//! Maps entity-type identifiers to their repositories once, at
//! configuration time. Pipelines resolve a typed handle up front instead of
//! doing string-keyed dispatch per call.

use std::collections::HashMap;
use std::sync::Arc;

use crate::store::EntityStore;

/// Registry of entity repositories, keyed by entity type.
#[derive(Clone, Default)]
pub struct EntityRegistry {
    stores: HashMap<String, Arc<dyn EntityStore>>,
}

impl EntityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository for an entity type.
    ///
    /// Replaces any previous registration for the same type.
    pub fn register(&mut self, entity_type: impl Into<String>, store: Arc<dyn EntityStore>) {
        self.stores.insert(entity_type.into(), store);
    }

    /// Register a repository, builder style.
    #[must_use]
    pub fn with(mut self, entity_type: impl Into<String>, store: Arc<dyn EntityStore>) -> Self {
        self.register(entity_type, store);
        self
    }

    /// Resolve the repository for an entity type.
    #[must_use]
    pub fn resolve(&self, entity_type: &str) -> Option<Arc<dyn EntityStore>> {
        self.stores.get(entity_type).cloned()
    }

    /// Registered entity types.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.stores.keys().map(String::as_str)
    }

    /// Number of registered entity types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("entity_types", &self.stores.keys().collect::<Vec<_>>())
            .finish()
    }
}
