//! Synchronization engine between local project records and external PM
//! tools.
//!
//! One installation connects the hosting application to one external tool
//! (Jira, Asana, Linear, ...) through that tool's integration endpoint. A
//! sync pass imports external items into local records and exports locally
//! modified records back, translating field names per the installation's
//! entity mappings, settling per-field conflicts under the configured
//! policy, and leaving behind a [`SyncLog`] audit record.
//!
//! Layering:
//!
//! - [`FieldMapper`] renames keys between the local and external schemas.
//! - [`ConflictDetector`] diffs a local record against a mapped external
//!   item; [`ConflictResolver`] settles the diffs, optionally asking a
//!   [`ConflictAdjudicator`] for a confidence-scored suggestion.
//! - [`ImportPipeline`] and [`ExportPipeline`] move one entity mapping's
//!   worth of data, with per-item isolation inward and one atomic batch
//!   outward.
//! - [`SyncOrchestrator`] runs a whole pass and owns its log;
//!   [`SyncScheduler`] runs passes on the installations' own timers.
//!
//! Persistence and the AI collaborator stay behind traits; the engine never
//! assumes a storage technology or a model vendor.

pub mod ai;
pub mod conflict;
pub mod error;
pub mod export;
pub mod import;
pub mod mapper;
pub mod orchestrator;
pub mod report;
pub mod resolver;
pub mod scheduler;

pub use ai::{AiSuggestion, ConflictAdjudicator, ConflictQuestion};
pub use conflict::{Conflict, ConflictDetector};
pub use error::{SyncError, SyncResult};
pub use export::{ExportOutcome, ExportPipeline};
pub use import::{ImportOutcome, ImportPipeline, DEFAULT_ITEM_CONCURRENCY};
pub use mapper::{FieldMapper, MapDirection};
pub use orchestrator::SyncOrchestrator;
pub use report::{
    ConflictSnapshot, ErrorScope, MemorySyncLogStore, PassDirection, SyncCounts, SyncErrorEntry,
    SyncLog, SyncLogStore, SyncStatus,
};
pub use resolver::{
    ConflictResolution, ConflictResolver, ResolutionChoice, ResolvedConflict, AUTO_APPLY_THRESHOLD,
};
pub use scheduler::SyncScheduler;
