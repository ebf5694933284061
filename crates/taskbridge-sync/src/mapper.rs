//! Field mapping between local and external key spaces.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use taskbridge_core::EntityMapping;

/// Direction of a field mapping operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapDirection {
    /// External keys to local keys.
    Import,
    /// Local keys to external keys.
    Export,
}

impl MapDirection {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MapDirection::Import => "import",
            MapDirection::Export => "export",
        }
    }
}

impl std::fmt::Display for MapDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bidirectional key translator built from an entity mapping's field table.
///
/// Pure: no side effects, no I/O. Source keys absent from the mapping table
/// are dropped silently; over the mapped keys, import and export are exact
/// inverses of each other.
#[derive(Debug, Clone)]
pub struct FieldMapper {
    /// external key → local key
    import: HashMap<String, String>,
    /// local key → external key
    export: HashMap<String, String>,
}

impl FieldMapper {
    /// Build a mapper from an entity mapping.
    #[must_use]
    pub fn new(mapping: &EntityMapping) -> Self {
        let mut import = HashMap::with_capacity(mapping.field_mappings.len());
        let mut export = HashMap::with_capacity(mapping.field_mappings.len());
        for field in &mapping.field_mappings {
            import.insert(field.external.clone(), field.local.clone());
            export.insert(field.local.clone(), field.external.clone());
        }
        Self { import, export }
    }

    /// Translate a record's keys in the given direction.
    #[must_use]
    pub fn map_fields(&self, record: &Map<String, Value>, direction: MapDirection) -> Map<String, Value> {
        let table = match direction {
            MapDirection::Import => &self.import,
            MapDirection::Export => &self.export,
        };

        let mut mapped = Map::new();
        for (key, value) in record {
            if let Some(target) = table.get(key) {
                mapped.insert(target.clone(), value.clone());
            }
        }
        mapped
    }

    /// Number of mapped field pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.import.len()
    }

    /// Check if no fields are mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.import.is_empty()
    }
}
