//! External PM tool collaborator.
//!
//! Defines the [`PmConnector`] capability trait the sync engine calls and a
//! generic REST implementation speaking the shared integration wire
//! contract: `GET {endpoint}/pm/import` and `POST {endpoint}/pm/export`,
//! authenticated with a bearer token.
//!
//! The specific wire formats of each PM tool (Jira, Asana, ...) live behind
//! the provider's integration endpoint; this crate only knows the shared
//! contract.

pub mod error;
pub mod item;
pub mod rest;
pub mod traits;

pub use error::{ConnectorError, ConnectorResult};
pub use item::ExternalItem;
pub use rest::{RestConfig, RestConnectorFactory, RestPmConnector};
pub use traits::{ConnectorFactory, PmConnector};
