//! Sync error types.

use thiserror::Error;

use taskbridge_connector::ConnectorError;
use taskbridge_core::StoreError;

/// Errors that can occur during a synchronization pass.
///
/// Only [`SyncError::Configuration`] is fatal for a pass; everything else is
/// caught at the narrowest scope (per mapping, per item) and accumulated
/// into the pass's log.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Installation or mapping is malformed. Fatal, detected before any
    /// network call.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Talking to the external PM tool failed. Recoverable per mapping.
    #[error("External API error: {0}")]
    ExternalApi(#[from] ConnectorError),

    /// Processing one item failed. Recoverable per item.
    #[error("Item processing error for '{item_id}': {message}")]
    ItemProcessing { item_id: String, message: String },

    /// The AI collaborator failed or returned unusable data. Never fatal;
    /// the resolver falls back to latest-wins.
    #[error("AI resolution error: {message}")]
    AiResolution { message: String },

    /// Persistence collaborator error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an item processing error.
    pub fn item_processing(item_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ItemProcessing {
            item_id: item_id.into(),
            message: message.into(),
        }
    }

    /// Create an AI resolution error.
    pub fn ai_resolution(message: impl Into<String>) -> Self {
        Self::AiResolution {
            message: message.into(),
        }
    }

    /// Check if this error aborts the whole pass.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Configuration { .. })
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
