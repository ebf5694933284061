//! Pass orchestration.
//!
//! The orchestrator owns one synchronization pass end to end: validate the
//! installation, fan out over its entity mappings, aggregate the outcome
//! into a [`SyncLog`], and write the bookkeeping back.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use taskbridge_connector::{ConnectorFactory, PmConnector};
use taskbridge_core::{Actor, EntityMapping, EntityRegistry, EntityStore, Installation, InstallationStore};

use crate::ai::ConflictAdjudicator;
use crate::export::ExportPipeline;
use crate::import::{ImportPipeline, DEFAULT_ITEM_CONCURRENCY};
use crate::report::{
    ConflictSnapshot, ErrorScope, PassDirection, SyncCounts, SyncErrorEntry, SyncLog, SyncLogStore,
    SyncStatus,
};
use crate::resolver::ConflictResolver;

/// Outcome of one entity mapping's share of a pass.
#[derive(Default)]
struct MappingOutcome {
    counts: SyncCounts,
    snapshots: Vec<ConflictSnapshot>,
    errors: Vec<SyncErrorEntry>,
}

/// Runs synchronization passes for installations.
pub struct SyncOrchestrator {
    registry: EntityRegistry,
    connectors: Arc<dyn ConnectorFactory>,
    installations: Arc<dyn InstallationStore>,
    logs: Arc<dyn SyncLogStore>,
    adjudicator: Option<Arc<dyn ConflictAdjudicator>>,
    import_concurrency: usize,
}

impl SyncOrchestrator {
    /// Create an orchestrator over the given collaborators.
    #[must_use]
    pub fn new(
        registry: EntityRegistry,
        connectors: Arc<dyn ConnectorFactory>,
        installations: Arc<dyn InstallationStore>,
        logs: Arc<dyn SyncLogStore>,
    ) -> Self {
        Self {
            registry,
            connectors,
            installations,
            logs,
            adjudicator: None,
            import_concurrency: DEFAULT_ITEM_CONCURRENCY,
        }
    }

    /// Attach the AI collaborator used by the `ai_suggest` policy.
    #[must_use]
    pub fn with_adjudicator(mut self, adjudicator: Arc<dyn ConflictAdjudicator>) -> Self {
        self.adjudicator = Some(adjudicator);
        self
    }

    /// Bound concurrent item processing per mapping.
    #[must_use]
    pub fn with_import_concurrency(mut self, concurrency: usize) -> Self {
        self.import_concurrency = concurrency.max(1);
        self
    }

    /// Store of the logs this orchestrator writes.
    #[must_use]
    pub fn log_store(&self) -> Arc<dyn SyncLogStore> {
        self.logs.clone()
    }

    /// Run one pass for an installation.
    ///
    /// Infallible: every failure mode ends in a finalized log. Configuration
    /// problems fail the pass before any network call; anything later is
    /// scoped to the mapping or item it hit and degrades the status to
    /// partial at worst.
    #[instrument(skip(self, installation), fields(installation_id = %installation.id, direction = %direction))]
    pub async fn run_pass(
        &self,
        installation: &Installation,
        direction: PassDirection,
        actor: Actor,
    ) -> SyncLog {
        let mut log = SyncLog::start(installation.id, direction, actor);
        if let Err(e) = self.logs.create(&log).await {
            warn!(error = %e, "Failed to persist starting sync log");
        }

        // Configuration gate: nothing leaves the process until the
        // installation, its mappings, the entity stores, and the connector
        // all check out.
        let connector = match self.validate(installation) {
            Ok(connector) => connector,
            Err(message) => {
                log.errors
                    .push(SyncErrorEntry::new(ErrorScope::Config, &installation.name, &message));
                log.finalize(SyncStatus::Failed);
                self.persist(&log).await;
                self.write_back(installation, Some(message)).await;
                return log;
            }
        };

        let resolver = Arc::new(self.resolver_for(installation));
        let pass_started = log.started_at;

        let mapping_runs = installation
            .entity_mappings
            .iter()
            .map(|mapping| self.run_mapping(installation, mapping, direction, &connector, &resolver));
        for outcome in join_all(mapping_runs).await {
            log.counts.merge(&outcome.counts);
            log.conflicts.extend(outcome.snapshots);
            log.errors.extend(outcome.errors);
        }

        let status = if log.errors.is_empty() && log.unresolved_conflicts() == 0 {
            SyncStatus::Completed
        } else {
            SyncStatus::Partial
        };
        log.finalize(status);
        self.persist(&log).await;

        // Completed and partial passes both advance the sync cursor; items
        // they did handle are handled. A partial pass keeps an error summary
        // on the installation so degraded syncs stay visible.
        if let Ok(Some(mut current)) = self.installations.get(installation.id).await {
            current.last_sync = Some(pass_started);
            current.last_error = match log.status {
                SyncStatus::Completed => None,
                _ => Some(format!(
                    "partial pass: {} error(s), {} unresolved conflict(s)",
                    log.errors.len(),
                    log.unresolved_conflicts()
                )),
            };
            if let Err(e) = self.installations.update(&current).await {
                warn!(error = %e, "Failed to write back last_sync");
            }
        }

        info!(
            status = %log.status,
            imported = log.counts.imported,
            exported = log.counts.exported,
            conflicts = log.counts.conflicts_detected,
            unresolved = log.unresolved_conflicts(),
            errors = log.errors.len(),
            "Sync pass finished"
        );
        log
    }

    /// Validate the installation and build its connector.
    fn validate(&self, installation: &Installation) -> Result<Arc<dyn PmConnector>, String> {
        installation.validate()?;
        for mapping in &installation.entity_mappings {
            if self.registry.resolve(&mapping.entity_type).is_none() {
                return Err(format!(
                    "no entity store registered for '{}'",
                    mapping.entity_type
                ));
            }
        }
        self.connectors
            .connector_for(installation)
            .map_err(|e| format!("connector configuration rejected: {e}"))
    }

    fn resolver_for(&self, installation: &Installation) -> ConflictResolver {
        let resolver = ConflictResolver::new(installation.settings.conflict_policy);
        match &self.adjudicator {
            Some(adjudicator) => resolver.with_adjudicator(adjudicator.clone()),
            None => resolver,
        }
    }

    async fn run_mapping(
        &self,
        installation: &Installation,
        mapping: &EntityMapping,
        direction: PassDirection,
        connector: &Arc<dyn PmConnector>,
        resolver: &Arc<ConflictResolver>,
    ) -> MappingOutcome {
        let mut outcome = MappingOutcome::default();
        // Guaranteed present; validate() resolved every mapping already.
        let Some(store) = self.registry.resolve(&mapping.entity_type) else {
            return outcome;
        };

        if direction.includes_import() && mapping.direction.includes_import() {
            self.run_import(mapping, connector, resolver, store.clone(), &mut outcome)
                .await;
        }
        if direction.includes_export() && mapping.direction.includes_export() {
            self.run_export(installation, mapping, connector, store, &mut outcome)
                .await;
        }
        outcome
    }

    async fn run_import(
        &self,
        mapping: &EntityMapping,
        connector: &Arc<dyn PmConnector>,
        resolver: &Arc<ConflictResolver>,
        store: Arc<dyn EntityStore>,
        outcome: &mut MappingOutcome,
    ) {
        let pipeline = ImportPipeline::new(connector.clone(), resolver.clone())
            .with_concurrency(self.import_concurrency);
        match pipeline.import_all(store, mapping).await {
            Ok(import) => {
                outcome.counts.merge(&import.counts);
                outcome.snapshots.extend(import.snapshots);
                outcome.errors.extend(import.errors);
            }
            Err(e) => {
                warn!(entity_type = %mapping.entity_type, error = %e, "Import failed");
                outcome.errors.push(SyncErrorEntry::new(
                    ErrorScope::Mapping,
                    &mapping.entity_type,
                    e.to_string(),
                ));
            }
        }
    }

    async fn run_export(
        &self,
        installation: &Installation,
        mapping: &EntityMapping,
        connector: &Arc<dyn PmConnector>,
        store: Arc<dyn EntityStore>,
        outcome: &mut MappingOutcome,
    ) {
        let pipeline = ExportPipeline::new(connector.clone());
        match pipeline
            .export_all(store, mapping, installation.last_sync)
            .await
        {
            Ok(export) => outcome.counts.exported += export.exported,
            Err(e) => {
                warn!(entity_type = %mapping.entity_type, error = %e, "Export failed");
                outcome.errors.push(SyncErrorEntry::new(
                    ErrorScope::Export,
                    &mapping.entity_type,
                    e.to_string(),
                ));
            }
        }
    }

    async fn persist(&self, log: &SyncLog) {
        if let Err(e) = self.logs.finalize(log).await {
            warn!(log_id = %log.id, error = %e, "Failed to persist finalized sync log");
        }
    }

    /// Record a fatal pass on the installation itself.
    async fn write_back(&self, installation: &Installation, error: Option<String>) {
        if let Ok(Some(mut current)) = self.installations.get(installation.id).await {
            current.last_error = error;
            if let Err(e) = self.installations.update(&current).await {
                warn!(error = %e, "Failed to write back last_error");
            }
        }
    }
}
