//! Persistence collaborator traits.
//!
//! The sync engine talks to the hosting application's entity store through
//! these traits and never assumes a particular storage technology.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::installation::Installation;
use crate::record::LocalRecord;

/// Errors surfaced by a persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Write rejected because it would duplicate an existing record.
    #[error("Duplicate record: {message}")]
    Duplicate { message: String },

    /// Backend failure.
    #[error("Store backend error: {message}")]
    Backend { message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a not found error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a duplicate error.
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::Duplicate {
            message: message.into(),
        }
    }

    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Query filter over an entity collection.
///
/// Field equality only; this is the narrow query surface the engine needs.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Match on the record's external link id.
    pub external_id: Option<String>,
    /// Exact-match constraints on record fields.
    pub fields: Map<String, Value>,
}

impl Filter {
    /// Filter matching a single external id.
    #[must_use]
    pub fn by_external_id(id: impl Into<String>) -> Self {
        Self {
            external_id: Some(id.into()),
            fields: Map::new(),
        }
    }

    /// Add a field equality constraint.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Check whether a record satisfies this filter.
    #[must_use]
    pub fn matches(&self, record: &LocalRecord) -> bool {
        if let Some(ref external_id) = self.external_id {
            if record.external_id.as_deref() != Some(external_id.as_str()) {
                return false;
            }
        }
        self.fields
            .iter()
            .all(|(key, value)| record.fields.get(key) == Some(value))
    }
}

/// CRUD collaborator for one entity collection.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Get a record by id.
    async fn get(&self, id: Uuid) -> StoreResult<Option<LocalRecord>>;

    /// Find records matching a filter.
    async fn find(&self, filter: &Filter) -> StoreResult<Vec<LocalRecord>>;

    /// List records modified after the given instant (all records when
    /// `since` is `None`).
    async fn list_modified_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<LocalRecord>>;

    /// Insert a new record.
    async fn insert(&self, record: &LocalRecord) -> StoreResult<()>;

    /// Update an existing record.
    async fn update(&self, record: &LocalRecord) -> StoreResult<()>;

    /// Find the record linked to an external item, if any.
    async fn find_by_external_id(&self, external_id: &str) -> StoreResult<Option<LocalRecord>> {
        let mut matches = self.find(&Filter::by_external_id(external_id)).await?;
        Ok(matches.pop())
    }
}

/// Read/update collaborator for installations.
///
/// The engine only reads installations and writes back `last_sync` and
/// `last_error`; creation and removal belong to the hosting application.
#[async_trait]
pub trait InstallationStore: Send + Sync {
    /// Get an installation by id.
    async fn get(&self, id: Uuid) -> StoreResult<Option<Installation>>;

    /// Persist an updated installation.
    async fn update(&self, installation: &Installation) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Provider;
    use serde_json::json;

    #[test]
    fn test_filter_by_external_id() {
        let record = LocalRecord::linked(Map::new(), "EXT-1".to_string(), Provider::Asana);
        assert!(Filter::by_external_id("EXT-1").matches(&record));
        assert!(!Filter::by_external_id("EXT-2").matches(&record));

        let unlinked = LocalRecord::new(Map::new());
        assert!(!Filter::by_external_id("EXT-1").matches(&unlinked));
    }

    #[test]
    fn test_filter_by_fields() {
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("open"));
        let record = LocalRecord::new(fields);

        assert!(Filter::default()
            .with_field("status", json!("open"))
            .matches(&record));
        assert!(!Filter::default()
            .with_field("status", json!("closed"))
            .matches(&record));
        assert!(!Filter::default()
            .with_field("missing", json!(1))
            .matches(&record));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let record = LocalRecord::new(Map::new());
        assert!(Filter::default().matches(&record));
    }
}
