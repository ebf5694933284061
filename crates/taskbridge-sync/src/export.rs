//! Export pipeline: local records out to the external tool.

use std::sync::Arc;
use tracing::{debug, instrument};

use chrono::{DateTime, Utc};
use taskbridge_connector::{ExternalItem, PmConnector};
use taskbridge_core::{EntityMapping, EntityStore, LocalRecord};

use crate::error::SyncResult;
use crate::mapper::{FieldMapper, MapDirection};

/// Result of exporting one mapping.
#[derive(Debug, Default)]
pub struct ExportOutcome {
    /// Records accepted by the external tool.
    pub exported: usize,
}

/// Pushes locally modified records to the external tool as one batch.
///
/// Export is batch-atomic: a single request carries every record, and a
/// failure fails the whole mapping's export. Partial submission is left to
/// the external tool's own semantics.
pub struct ExportPipeline {
    connector: Arc<dyn PmConnector>,
}

impl ExportPipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new(connector: Arc<dyn PmConnector>) -> Self {
        Self { connector }
    }

    /// Export every record of one mapping modified since `last_sync`.
    ///
    /// Skips the network entirely when nothing changed.
    #[instrument(skip(self, store, mapping), fields(entity_type = %mapping.entity_type, resource = %mapping.external_resource))]
    pub async fn export_all(
        &self,
        store: Arc<dyn EntityStore>,
        mapping: &EntityMapping,
        last_sync: Option<DateTime<Utc>>,
    ) -> SyncResult<ExportOutcome> {
        let provider = self.connector.provider();
        let modified = store.list_modified_since(last_sync).await?;

        let mapper = FieldMapper::new(mapping);
        let items: Vec<ExternalItem> = modified
            .iter()
            // Records linked to a different tool belong to that tool's sync.
            .filter(|r| r.external_source.is_none() || r.external_source == Some(provider))
            .map(|r| outbound_item(r, &mapper))
            .collect();

        if items.is_empty() {
            debug!("No modified records; skipping export");
            return Ok(ExportOutcome::default());
        }

        let exported = self
            .connector
            .export_items(&mapping.external_resource, items)
            .await?;
        debug!(exported, "Exported batch");

        Ok(ExportOutcome { exported })
    }
}

/// Build the outbound wire item for one record. Unlinked records carry
/// their local id so the external tool can establish the link.
fn outbound_item(record: &LocalRecord, mapper: &FieldMapper) -> ExternalItem {
    let id = record
        .external_id
        .clone()
        .unwrap_or_else(|| record.id.to_string());
    ExternalItem::new(id, mapper.map_fields(&record.fields, MapDirection::Export))
        .with_updated_at(record.updated_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskbridge_core::Provider;

    fn mapping() -> EntityMapping {
        EntityMapping::new("task", "issues").with_field("title", "summary")
    }

    #[test]
    fn test_outbound_item_uses_external_id_when_linked() {
        let mut fields = serde_json::Map::new();
        fields.insert("title".to_string(), json!("Fix login"));
        let record = LocalRecord::linked(fields, "EXT-1".to_string(), Provider::Jira);

        let item = outbound_item(&record, &FieldMapper::new(&mapping()));
        assert_eq!(item.id, "EXT-1");
        assert_eq!(item.fields.get("summary"), Some(&json!("Fix login")));
        assert_eq!(item.updated_at, Some(record.updated_at));
    }

    #[test]
    fn test_outbound_item_falls_back_to_local_id() {
        let record = LocalRecord::new(serde_json::Map::new());
        let item = outbound_item(&record, &FieldMapper::new(&mapping()));
        assert_eq!(item.id, record.id.to_string());
    }
}
