//! Taskbridge core domain model.
//!
//! Shared types for the synchronization engine: installations, entity
//! mappings, local records, actor identity, and the collaborator traits for
//! persistence. The engine never assumes a particular storage technology;
//! everything it touches goes through [`EntityStore`] and
//! [`InstallationStore`].

pub mod actor;
pub mod installation;
pub mod mapping;
pub mod memory;
pub mod provider;
pub mod record;
pub mod registry;
pub mod store;

pub use actor::Actor;
pub use installation::{ConflictPolicy, Installation, SyncSettings};
pub use mapping::{EntityMapping, FieldMapping, SyncDirection};
pub use memory::{MemoryInstallationStore, MemoryStore};
pub use provider::Provider;
pub use record::LocalRecord;
pub use registry::EntityRegistry;
pub use store::{EntityStore, Filter, InstallationStore, StoreError, StoreResult};
