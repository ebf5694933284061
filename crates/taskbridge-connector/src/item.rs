//! External items as returned by a PM tool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One item from the external tool: a stable id plus an opaque field map.
///
/// `updated_at` is optional because not every tool reports modification
/// times through the integration endpoint; downstream conflict detection
/// compensates when it is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalItem {
    /// Stable id on the external tool.
    pub id: String,
    /// Item fields, keyed by external field names.
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Last modification time on the external tool, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExternalItem {
    /// Create a new item.
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
            updated_at: None,
        }
    }

    /// Set the external modification time.
    #[must_use]
    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }
}
