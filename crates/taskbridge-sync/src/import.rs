//! Import pipeline: external items into the local store.

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use taskbridge_connector::{ExternalItem, PmConnector};
use taskbridge_core::{EntityMapping, EntityStore, LocalRecord, Provider};

use crate::conflict::ConflictDetector;
use crate::error::{SyncError, SyncResult};
use crate::mapper::{FieldMapper, MapDirection};
use crate::report::{ConflictSnapshot, ErrorScope, SyncCounts, SyncErrorEntry};
use crate::resolver::{ConflictResolver, ResolutionChoice};

/// Default bound on concurrent item processing within one mapping.
pub const DEFAULT_ITEM_CONCURRENCY: usize = 4;

/// Result of importing one mapping.
#[derive(Debug, Default)]
pub struct ImportOutcome {
    /// Aggregated counts (`exported` stays zero here).
    pub counts: SyncCounts,
    /// Conflict snapshots, resolved and unresolved.
    pub snapshots: Vec<ConflictSnapshot>,
    /// Per-item errors.
    pub errors: Vec<SyncErrorEntry>,
}

/// Outcome of processing a single item.
struct ItemOutcome {
    imported: bool,
    detected: usize,
    resolved: usize,
    snapshots: Vec<ConflictSnapshot>,
}

/// Pulls items from the external tool and reconciles them into the local
/// store.
pub struct ImportPipeline {
    connector: Arc<dyn PmConnector>,
    resolver: Arc<ConflictResolver>,
    concurrency: usize,
}

impl ImportPipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new(connector: Arc<dyn PmConnector>, resolver: Arc<ConflictResolver>) -> Self {
        Self {
            connector,
            resolver,
            concurrency: DEFAULT_ITEM_CONCURRENCY,
        }
    }

    /// Bound concurrent item processing.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Import every item of one mapping.
    ///
    /// Fails only when the fetch itself fails; anything after that is
    /// per-item. A failed item is recorded in the outcome's error list and
    /// never aborts the rest of the batch.
    #[instrument(skip(self, store, mapping), fields(entity_type = %mapping.entity_type, resource = %mapping.external_resource))]
    pub async fn import_all(
        &self,
        store: Arc<dyn EntityStore>,
        mapping: &EntityMapping,
    ) -> SyncResult<ImportOutcome> {
        let items = self
            .connector
            .fetch_items(&mapping.external_resource)
            .await?;
        debug!(count = items.len(), "Fetched external items");

        let mapper = Arc::new(FieldMapper::new(mapping));
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let provider = self.connector.provider();
        let entity_type = mapping.entity_type.clone();

        let mut tasks: JoinSet<(String, SyncResult<ItemOutcome>)> = JoinSet::new();
        for item in items {
            let store = store.clone();
            let mapper = mapper.clone();
            let resolver = self.resolver.clone();
            let semaphore = semaphore.clone();
            let entity_type = entity_type.clone();
            let item_id = item.id.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result =
                    process_item(&*store, &mapper, &resolver, provider, &entity_type, item).await;
                (item_id, result)
            });
        }

        let mut outcome = ImportOutcome::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(item_outcome))) => {
                    if item_outcome.imported {
                        outcome.counts.imported += 1;
                    }
                    outcome.counts.conflicts_detected += item_outcome.detected;
                    outcome.counts.conflicts_resolved += item_outcome.resolved;
                    outcome.snapshots.extend(item_outcome.snapshots);
                }
                Ok((item_id, Err(e))) => {
                    warn!(item_id = %item_id, error = %e, "Item import failed");
                    outcome
                        .errors
                        .push(SyncErrorEntry::new(ErrorScope::Item, item_id, e.to_string()));
                }
                Err(e) => {
                    outcome.errors.push(SyncErrorEntry::new(
                        ErrorScope::Item,
                        "<task>",
                        format!("item task failed: {e}"),
                    ));
                }
            }
        }

        Ok(outcome)
    }
}

/// Reconcile one external item against the local store.
async fn process_item(
    store: &dyn EntityStore,
    mapper: &FieldMapper,
    resolver: &ConflictResolver,
    provider: Provider,
    entity_type: &str,
    item: ExternalItem,
) -> SyncResult<ItemOutcome> {
    if item.id.trim().is_empty() {
        return Err(SyncError::item_processing(
            "<missing>",
            "external item has an empty id",
        ));
    }

    let mapped = mapper.map_fields(&item.fields, MapDirection::Import);

    // Match by external id before creating anything; a linked record holds
    // exactly one external id per (entity_type, provider).
    let existing = store.find_by_external_id(&item.id).await?;

    let Some(mut record) = existing else {
        let record = LocalRecord::linked(mapped, item.id.clone(), provider);
        store.insert(&record).await?;
        return Ok(ItemOutcome {
            imported: true,
            detected: 0,
            resolved: 0,
            snapshots: Vec::new(),
        });
    };

    let conflicts = ConflictDetector::detect(&record, &mapped, item.updated_at);
    if conflicts.is_empty() {
        record.apply_fields(&mapped);
        store.update(&record).await?;
        return Ok(ItemOutcome {
            imported: true,
            detected: 0,
            resolved: 0,
            snapshots: Vec::new(),
        });
    }

    let detected = conflicts.len();
    let mut outcomes = Vec::with_capacity(detected);
    for conflict in &conflicts {
        outcomes.push(resolver.resolve(conflict).await);
    }
    let resolved = outcomes.iter().filter(|o| o.resolved).count();

    let snapshots: Vec<ConflictSnapshot> = outcomes
        .iter()
        .map(|o| ConflictSnapshot {
            entity_type: entity_type.to_string(),
            external_id: item.id.clone(),
            outcome: o.clone(),
        })
        .collect();

    // Any unresolved conflict parks the whole record for manual review.
    if resolved < detected {
        return Ok(ItemOutcome {
            imported: false,
            detected,
            resolved,
            snapshots,
        });
    }

    let updates = apply_resolutions(mapped, &outcomes);
    record.apply_fields(&updates);
    store.update(&record).await?;

    Ok(ItemOutcome {
        imported: true,
        detected,
        resolved,
        snapshots,
    })
}

/// Fold the resolutions into the mapped external fields: local wins drop
/// out, merges substitute their value, external wins keep the mapped value.
fn apply_resolutions(
    mut mapped: Map<String, Value>,
    outcomes: &[crate::resolver::ResolvedConflict],
) -> Map<String, Value> {
    for outcome in outcomes {
        match outcome.resolution.choice {
            ResolutionChoice::Local => {
                mapped.remove(&outcome.conflict.field);
            }
            ResolutionChoice::Merge => {
                if let Some(merged) = &outcome.resolution.merged_value {
                    mapped.insert(outcome.conflict.field.clone(), merged.clone());
                } else {
                    mapped.remove(&outcome.conflict.field);
                }
            }
            ResolutionChoice::External => {}
        }
    }
    mapped
}
