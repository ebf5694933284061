//! Sync pass logging.
//!
//! A [`SyncLog`] is the persisted audit record of one orchestration pass:
//! created `in_progress` when the pass starts, finalized exactly once when
//! it ends, immutable afterwards.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use taskbridge_core::{Actor, StoreError, StoreResult};

use crate::resolver::ResolvedConflict;

/// Requested direction of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassDirection {
    /// Only import-capable mappings run.
    Import,
    /// Only export-capable mappings run.
    Export,
    /// Both directions, per mapping configuration.
    Full,
}

impl PassDirection {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PassDirection::Import => "import",
            PassDirection::Export => "export",
            PassDirection::Full => "full",
        }
    }

    /// Check if this pass imports.
    #[must_use]
    pub fn includes_import(&self) -> bool {
        matches!(self, PassDirection::Import | PassDirection::Full)
    }

    /// Check if this pass exports.
    #[must_use]
    pub fn includes_export(&self) -> bool {
        matches!(self, PassDirection::Export | PassDirection::Full)
    }
}

impl std::fmt::Display for PassDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// The pass is running.
    InProgress,
    /// Every mapping succeeded and no conflict stayed unresolved.
    Completed,
    /// Some mappings succeeded, but conflicts stayed unresolved or some
    /// mappings errored.
    Partial,
    /// A fatal error prevented any mapping from running.
    Failed,
}

impl SyncStatus {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::InProgress => "in_progress",
            SyncStatus::Completed => "completed",
            SyncStatus::Partial => "partial",
            SyncStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SyncStatus::InProgress)
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_progress" => Ok(SyncStatus::InProgress),
            "completed" => Ok(SyncStatus::Completed),
            "partial" => Ok(SyncStatus::Partial),
            "failed" => Ok(SyncStatus::Failed),
            _ => Err(format!("Unknown sync status: {s}")),
        }
    }
}

/// Aggregated counts for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    /// Items imported (created or updated locally).
    pub imported: usize,
    /// Records exported.
    pub exported: usize,
    /// Conflicts detected.
    pub conflicts_detected: usize,
    /// Conflicts settled automatically.
    pub conflicts_resolved: usize,
}

impl SyncCounts {
    /// Merge another set of counts into this one.
    pub fn merge(&mut self, other: &SyncCounts) {
        self.imported += other.imported;
        self.exported += other.exported;
        self.conflicts_detected += other.conflicts_detected;
        self.conflicts_resolved += other.conflicts_resolved;
    }
}

/// Scope at which an error was caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    /// Installation or mapping configuration.
    Config,
    /// One entity mapping's import fetch.
    Mapping,
    /// One imported item.
    Item,
    /// One entity mapping's export batch.
    Export,
}

impl ErrorScope {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorScope::Config => "config",
            ErrorScope::Mapping => "mapping",
            ErrorScope::Item => "item",
            ErrorScope::Export => "export",
        }
    }
}

/// One error accumulated during a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncErrorEntry {
    /// Scope the error was caught at.
    pub scope: ErrorScope,
    /// What the error relates to (entity type, item id, ...).
    pub context: String,
    /// Error message.
    pub message: String,
}

impl SyncErrorEntry {
    /// Create a new entry.
    pub fn new(scope: ErrorScope, context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scope,
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Snapshot of one conflict and how it was (or was not) settled, kept on
/// the log for operator review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictSnapshot {
    /// Entity type the conflicting record belongs to.
    pub entity_type: String,
    /// External item id involved.
    pub external_id: String,
    /// The conflict and its resolution (or logged suggestion).
    #[serde(flatten)]
    pub outcome: ResolvedConflict,
}

/// Persisted record of one orchestration pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncLog {
    /// Log ID.
    pub id: Uuid,
    /// Installation the pass ran for.
    pub installation_id: Uuid,
    /// Requested direction.
    pub direction: PassDirection,
    /// Pass status.
    pub status: SyncStatus,
    /// Aggregated counts.
    pub counts: SyncCounts,
    /// Conflict snapshots (resolved and unresolved).
    pub conflicts: Vec<ConflictSnapshot>,
    /// Errors accumulated during the pass.
    pub errors: Vec<SyncErrorEntry>,
    /// Who triggered the pass.
    pub triggered_by: Actor,
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// When the pass finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Pass duration in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl SyncLog {
    /// Create a log for a pass that is starting now.
    #[must_use]
    pub fn start(installation_id: Uuid, direction: PassDirection, triggered_by: Actor) -> Self {
        Self {
            id: Uuid::new_v4(),
            installation_id,
            direction,
            status: SyncStatus::InProgress,
            counts: SyncCounts::default(),
            conflicts: Vec::new(),
            errors: Vec::new(),
            triggered_by,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: None,
        }
    }

    /// Number of conflicts left unresolved for manual review.
    #[must_use]
    pub fn unresolved_conflicts(&self) -> usize {
        self.conflicts.iter().filter(|c| !c.outcome.resolved).count()
    }

    /// Move the log to its terminal state and stamp timing.
    ///
    /// Finalizing an already-terminal log is a no-op; a log is finalized
    /// exactly once.
    pub fn finalize(&mut self, status: SyncStatus) {
        if self.status.is_terminal() {
            return;
        }
        let finished = Utc::now();
        self.status = status;
        self.finished_at = Some(finished);
        self.duration_ms = Some(
            (finished - self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        );
    }
}

/// Append-only persistence collaborator for sync logs.
#[async_trait]
pub trait SyncLogStore: Send + Sync {
    /// Persist a newly started log.
    async fn create(&self, log: &SyncLog) -> StoreResult<()>;

    /// Persist a finalized log.
    async fn finalize(&self, log: &SyncLog) -> StoreResult<()>;

    /// List logs for an installation, newest first.
    async fn list_for_installation(&self, installation_id: Uuid) -> StoreResult<Vec<SyncLog>>;
}

/// In-memory sync log store for tests and in-process embedders.
#[derive(Default)]
pub struct MemorySyncLogStore {
    logs: RwLock<Vec<SyncLog>>,
}

impl MemorySyncLogStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SyncLogStore for MemorySyncLogStore {
    async fn create(&self, log: &SyncLog) -> StoreResult<()> {
        self.logs.write().await.push(log.clone());
        Ok(())
    }

    async fn finalize(&self, log: &SyncLog) -> StoreResult<()> {
        let mut logs = self.logs.write().await;
        let Some(existing) = logs.iter_mut().find(|l| l.id == log.id) else {
            return Err(StoreError::not_found("sync log", log.id.to_string()));
        };
        if existing.status.is_terminal() {
            return Err(StoreError::backend(format!(
                "sync log {} is already finalized",
                log.id
            )));
        }
        *existing = log.clone();
        Ok(())
    }

    async fn list_for_installation(&self, installation_id: Uuid) -> StoreResult<Vec<SyncLog>> {
        let mut logs: Vec<SyncLog> = self
            .logs
            .read()
            .await
            .iter()
            .filter(|l| l.installation_id == installation_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(logs)
    }
}
