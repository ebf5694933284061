//! Declarative entity and field mapping configuration.

use serde::{Deserialize, Serialize};

/// Direction in which an entity mapping synchronizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Import from and export to the external tool.
    Bidirectional,
    /// Only pull items from the external tool.
    ImportOnly,
    /// Only push local records to the external tool.
    ExportOnly,
}

impl SyncDirection {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::Bidirectional => "bidirectional",
            SyncDirection::ImportOnly => "import_only",
            SyncDirection::ExportOnly => "export_only",
        }
    }

    /// Check if this direction includes importing.
    #[must_use]
    pub fn includes_import(&self) -> bool {
        matches!(
            self,
            SyncDirection::Bidirectional | SyncDirection::ImportOnly
        )
    }

    /// Check if this direction includes exporting.
    #[must_use]
    pub fn includes_export(&self) -> bool {
        matches!(
            self,
            SyncDirection::Bidirectional | SyncDirection::ExportOnly
        )
    }
}

impl std::fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SyncDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bidirectional" => Ok(SyncDirection::Bidirectional),
            "import_only" => Ok(SyncDirection::ImportOnly),
            "export_only" => Ok(SyncDirection::ExportOnly),
            _ => Err(format!("Unknown sync direction: {s}")),
        }
    }
}

/// A single local-key ↔ external-key translation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Field name on the local record.
    pub local: String,
    /// Field name on the external item.
    pub external: String,
}

impl FieldMapping {
    /// Create a new field mapping.
    pub fn new(local: impl Into<String>, external: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            external: external.into(),
        }
    }
}

/// Pairs a local entity type with an external resource and its field
/// translations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMapping {
    /// Local entity type (key into the entity registry).
    pub entity_type: String,
    /// Resource name on the external tool (e.g. "issues", "tasks").
    pub external_resource: String,
    /// Field translation table.
    pub field_mappings: Vec<FieldMapping>,
    /// Which way this mapping synchronizes.
    pub direction: SyncDirection,
}

impl EntityMapping {
    /// Create a bidirectional mapping.
    pub fn new(entity_type: impl Into<String>, external_resource: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            external_resource: external_resource.into(),
            field_mappings: Vec::new(),
            direction: SyncDirection::Bidirectional,
        }
    }

    /// Add a field mapping.
    #[must_use]
    pub fn with_field(mut self, local: impl Into<String>, external: impl Into<String>) -> Self {
        self.field_mappings.push(FieldMapping::new(local, external));
        self
    }

    /// Set the sync direction.
    #[must_use]
    pub fn with_direction(mut self, direction: SyncDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Validate the mapping configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.entity_type.trim().is_empty() {
            return Err("entity_type must not be empty".to_string());
        }
        if self.external_resource.trim().is_empty() {
            return Err("external_resource must not be empty".to_string());
        }
        if self.field_mappings.is_empty() {
            return Err(format!(
                "mapping for '{}' has no field mappings",
                self.entity_type
            ));
        }
        Ok(())
    }
}
