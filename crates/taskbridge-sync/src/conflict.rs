//! Field-level conflict detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use taskbridge_core::LocalRecord;

/// A detected disagreement between a local and an external value for the
/// same logical field.
///
/// Ephemeral: exists only during one sync pass, persisted only as part of a
/// sync log snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Local field name.
    pub field: String,
    /// Value currently stored locally.
    pub local_value: Value,
    /// Value reported by the external tool (already mapped to local keys).
    pub external_value: Value,
    /// Last local modification time.
    pub local_updated_at: DateTime<Utc>,
    /// Last external modification time.
    pub external_updated_at: DateTime<Utc>,
    /// True when the external tool did not report a modification time and
    /// `external_updated_at` was approximated as "now".
    #[serde(default)]
    pub external_updated_at_estimated: bool,
}

/// Compares a local record against a mapped external record.
pub struct ConflictDetector;

impl ConflictDetector {
    /// Detect per-field conflicts.
    ///
    /// Emits one conflict for every key of the mapped external record where
    /// the local record holds a structurally different value. Keys absent
    /// locally are pure imports and never conflict.
    #[must_use]
    pub fn detect(
        local: &LocalRecord,
        mapped_external: &Map<String, Value>,
        external_updated_at: Option<DateTime<Utc>>,
    ) -> Vec<Conflict> {
        let (external_ts, estimated) = match external_updated_at {
            Some(ts) => (ts, false),
            None => (Utc::now(), true),
        };

        let mut conflicts = Vec::new();
        for (field, external_value) in mapped_external {
            let Some(local_value) = local.field(field) else {
                continue;
            };
            if local_value != external_value {
                conflicts.push(Conflict {
                    field: field.clone(),
                    local_value: local_value.clone(),
                    external_value: external_value.clone(),
                    local_updated_at: local.updated_at,
                    external_updated_at: external_ts,
                    external_updated_at_estimated: estimated,
                });
            }
        }
        conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> LocalRecord {
        LocalRecord::new(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        )
    }

    fn external(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_differing_value_conflicts() {
        let local = record(&[("title", json!("old title"))]);
        let ts = Utc::now();
        let conflicts =
            ConflictDetector::detect(&local, &external(&[("title", json!("new title"))]), Some(ts));

        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.field, "title");
        assert_eq!(conflict.local_value, json!("old title"));
        assert_eq!(conflict.external_value, json!("new title"));
        assert_eq!(conflict.external_updated_at, ts);
        assert!(!conflict.external_updated_at_estimated);
    }

    #[test]
    fn test_equal_values_do_not_conflict() {
        let local = record(&[("title", json!("same"))]);
        let conflicts =
            ConflictDetector::detect(&local, &external(&[("title", json!("same"))]), None);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_keys_absent_locally_are_pure_import() {
        let local = record(&[("title", json!("t"))]);
        let conflicts = ConflictDetector::detect(
            &local,
            &external(&[("title", json!("t")), ("status", json!("open"))]),
            None,
        );
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_local_only_fields_never_conflict() {
        // Records differing only in fields absent from the external payload.
        let local = record(&[("title", json!("t")), ("notes", json!("private"))]);
        let conflicts =
            ConflictDetector::detect(&local, &external(&[("title", json!("t"))]), None);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_missing_external_timestamp_is_estimated() {
        let local = record(&[("title", json!("a"))]);
        let before = Utc::now();
        let conflicts =
            ConflictDetector::detect(&local, &external(&[("title", json!("b"))]), None);
        let after = Utc::now();

        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].external_updated_at_estimated);
        assert!(conflicts[0].external_updated_at >= before);
        assert!(conflicts[0].external_updated_at <= after);
    }

    #[test]
    fn test_structural_equality_is_deep() {
        let local = record(&[("labels", json!(["bug", "p1"]))]);

        let same = ConflictDetector::detect(&local, &external(&[("labels", json!(["bug", "p1"]))]), None);
        assert!(same.is_empty());

        let reordered =
            ConflictDetector::detect(&local, &external(&[("labels", json!(["p1", "bug"]))]), None);
        assert_eq!(reordered.len(), 1);
    }
}
