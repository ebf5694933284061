//! Actor identity for attributing sync activity.
//!
//! Every operation that writes an audit trail takes an explicit [`Actor`]
//! rather than reading an ambient "current user".

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who triggered an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum Actor {
    /// The periodic scheduler.
    Scheduler,
    /// A specific user (manual trigger).
    User(Uuid),
    /// The hosting application itself.
    System,
}

impl Actor {
    /// User id, if this actor is a user.
    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Actor::User(id) => Some(*id),
            _ => None,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Scheduler => write!(f, "scheduler"),
            Actor::User(id) => write!(f, "user:{id}"),
            Actor::System => write!(f, "system"),
        }
    }
}
