//! PM connector capability traits.

use async_trait::async_trait;
use std::sync::Arc;

use taskbridge_core::{Installation, Provider};

use crate::error::ConnectorResult;
use crate::item::ExternalItem;

/// Collaborator for one external PM tool.
///
/// Implementations are expected to be cheap to clone behind an `Arc` and
/// safe to call concurrently; the engine fans out over entity mappings.
#[async_trait]
pub trait PmConnector: Send + Sync {
    /// Provider this connector talks to.
    fn provider(&self) -> Provider;

    /// Display name for this connector instance.
    fn display_name(&self) -> &str;

    /// Test connectivity and credentials.
    async fn test_connection(&self) -> ConnectorResult<()>;

    /// Fetch all items for a resource from the external tool.
    async fn fetch_items(&self, resource: &str) -> ConnectorResult<Vec<ExternalItem>>;

    /// Push a batch of items for a resource to the external tool.
    ///
    /// Returns the count of items the tool accepted. One call per mapping; a
    /// failure aborts the whole batch.
    async fn export_items(&self, resource: &str, items: Vec<ExternalItem>)
        -> ConnectorResult<usize>;
}

/// Builds a connector for an installation.
///
/// The engine serves many installations with differing endpoints and
/// credentials; the factory is the seam that lets tests substitute fakes.
pub trait ConnectorFactory: Send + Sync {
    /// Build a connector for the installation's endpoint and credentials.
    ///
    /// Fails when the installation's connector configuration is unusable.
    fn connector_for(&self, installation: &Installation) -> ConnectorResult<Arc<dyn PmConnector>>;
}
