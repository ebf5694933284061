//! Local entity records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::provider::Provider;

/// One local entity instance: an opaque field map plus the link stamps that
/// tie it to an external item.
///
/// A record linked to an external item carries exactly one `external_id` for
/// its `(entity_type, provider)` pair; import matches on that id before ever
/// creating a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalRecord {
    /// Record ID.
    pub id: Uuid,
    /// Id of the linked external item, once linked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Provider the external item belongs to, once linked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_source: Option<Provider>,
    /// Last local modification time.
    pub updated_at: DateTime<Utc>,
    /// Entity fields, keyed by local field names.
    pub fields: Map<String, Value>,
}

impl LocalRecord {
    /// Create a new unlinked record.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: None,
            external_source: None,
            updated_at: Utc::now(),
            fields,
        }
    }

    /// Create a record linked to an external item.
    #[must_use]
    pub fn linked(fields: Map<String, Value>, external_id: String, source: Provider) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: Some(external_id),
            external_source: Some(source),
            updated_at: Utc::now(),
            fields,
        }
    }

    /// Check whether this record is linked to an external item.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.external_id.is_some()
    }

    /// Get a field value by local key.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Overwrite fields with the given values and bump `updated_at`.
    pub fn apply_fields(&mut self, updates: &Map<String, Value>) {
        for (key, value) in updates {
            self.fields.insert(key.clone(), value.clone());
        }
        self.updated_at = Utc::now();
    }
}
