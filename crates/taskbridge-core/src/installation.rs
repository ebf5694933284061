//! Installation configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::mapping::EntityMapping;
use crate::provider::Provider;

/// Conflict resolution policy for an installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// External value always wins.
    ExternalWins,
    /// The more recently updated side wins; ties favor external.
    LatestWins,
    /// Delegate to the AI collaborator; auto-apply only above the
    /// confidence threshold.
    AiSuggest,
}

impl ConflictPolicy {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::ExternalWins => "external_wins",
            ConflictPolicy::LatestWins => "latest_wins",
            ConflictPolicy::AiSuggest => "ai_suggest",
        }
    }
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "external_wins" => Ok(ConflictPolicy::ExternalWins),
            "latest_wins" => Ok(ConflictPolicy::LatestWins),
            "ai_suggest" => Ok(ConflictPolicy::AiSuggest),
            _ => Err(format!("Unknown conflict policy: {s}")),
        }
    }
}

/// Per-installation sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Whether sync is enabled for this installation.
    pub enabled: bool,
    /// Minutes between scheduled passes.
    pub interval_minutes: u64,
    /// How conflicts are settled.
    pub conflict_policy: ConflictPolicy,
}

impl SyncSettings {
    /// Get the sync interval as a Duration.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 15,
            conflict_policy: ConflictPolicy::LatestWins,
        }
    }
}

/// One configured connection between the host system and one external PM
/// tool.
///
/// Owned by the hosting application; the sync engine reads it and only
/// writes back `last_sync` and `last_error`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Installation {
    /// Installation ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// External tool this installation connects to.
    pub provider: Provider,
    /// Base URL of the external tool's integration endpoint.
    pub api_endpoint: String,
    /// Bearer token for the external tool.
    pub api_key: String,
    /// Configured entity mappings.
    pub entity_mappings: Vec<EntityMapping>,
    /// Sync settings.
    pub settings: SyncSettings,
    /// Time of the last successful or partial pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
    /// Error message from the last failed pass, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl std::fmt::Debug for Installation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installation")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("api_endpoint", &self.api_endpoint)
            .field("api_key", &"***")
            .field("entity_mappings", &self.entity_mappings.len())
            .field("settings", &self.settings)
            .field("last_sync", &self.last_sync)
            .finish()
    }
}

impl Installation {
    /// Create a new installation with default settings.
    pub fn new(
        name: impl Into<String>,
        provider: Provider,
        api_endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            provider,
            api_endpoint: api_endpoint.into(),
            api_key: api_key.into(),
            entity_mappings: Vec::new(),
            settings: SyncSettings::default(),
            last_sync: None,
            last_error: None,
        }
    }

    /// Add an entity mapping.
    #[must_use]
    pub fn with_mapping(mut self, mapping: EntityMapping) -> Self {
        self.entity_mappings.push(mapping);
        self
    }

    /// Set sync settings.
    #[must_use]
    pub fn with_settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate the installation configuration.
    ///
    /// Runs before any network call; a failure here is fatal for the pass.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_endpoint.trim().is_empty() {
            return Err("api_endpoint must not be empty".to_string());
        }
        if self.api_key.trim().is_empty() {
            return Err("api_key must not be empty".to_string());
        }
        if self.entity_mappings.is_empty() {
            return Err("installation has no entity mappings".to_string());
        }
        if self.settings.interval_minutes == 0 {
            return Err("interval_minutes must be at least 1".to_string());
        }
        for mapping in &self.entity_mappings {
            mapping.validate()?;
        }
        Ok(())
    }
}
