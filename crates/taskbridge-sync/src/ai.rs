//! AI collaborator seam for conflict adjudication.
//!
//! The collaborator is a black-box decision function: it receives a
//! structured description of one conflict plus the JSON schema its answer
//! must satisfy, and returns a confidence-scored suggestion. It is treated
//! as unreliable; the resolver wraps every call with a fallback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::conflict::Conflict;
use crate::error::SyncResult;
use crate::resolver::ResolutionChoice;

/// Structured description of one conflict, as handed to the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictQuestion {
    /// Field in conflict.
    pub field: String,
    /// Locally stored value.
    pub local_value: Value,
    /// Externally reported value.
    pub external_value: Value,
    /// Last local modification time.
    pub local_updated_at: DateTime<Utc>,
    /// Last external modification time.
    pub external_updated_at: DateTime<Utc>,
}

impl ConflictQuestion {
    /// Build a question from a detected conflict.
    #[must_use]
    pub fn from_conflict(conflict: &Conflict) -> Self {
        Self {
            field: conflict.field.clone(),
            local_value: conflict.local_value.clone(),
            external_value: conflict.external_value.clone(),
            local_updated_at: conflict.local_updated_at,
            external_updated_at: conflict.external_updated_at,
        }
    }

    /// Render the natural-language prompt for the collaborator.
    #[must_use]
    pub fn prompt(&self) -> String {
        format!(
            "A synchronization conflict was detected on field '{}'.\n\
             Local value (last updated {}): {}\n\
             External value (last updated {}): {}\n\
             Decide which value to keep, or propose a merged value. \
             Answer with JSON matching the provided schema.",
            self.field,
            self.local_updated_at.to_rfc3339(),
            self.local_value,
            self.external_updated_at.to_rfc3339(),
            self.external_value,
        )
    }

    /// JSON schema the collaborator's answer must satisfy.
    #[must_use]
    pub fn response_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "choice": { "type": "string", "enum": ["local", "external", "merge"] },
                "confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                "explanation": { "type": "string" },
                "merged_value": {}
            },
            "required": ["choice", "confidence", "explanation"]
        })
    }
}

/// Suggestion returned by the collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSuggestion {
    /// Which side to keep (or merge).
    pub choice: ResolutionChoice,
    /// Collaborator's confidence in [0, 1].
    pub confidence: f64,
    /// Human-readable justification.
    pub explanation: String,
    /// Proposed merged value when `choice` is merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_value: Option<Value>,
}

impl AiSuggestion {
    /// Check the suggestion is usable: confidence in range, and a merged
    /// value present whenever merge was chosen.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        if !(0.0..=1.0).contains(&self.confidence) || !self.confidence.is_finite() {
            return false;
        }
        if self.choice == ResolutionChoice::Merge && self.merged_value.is_none() {
            return false;
        }
        true
    }
}

/// Black-box conflict adjudicator.
#[async_trait]
pub trait ConflictAdjudicator: Send + Sync {
    /// Ask the collaborator to settle one conflict.
    ///
    /// May fail or be slow; callers must not rely on it succeeding.
    async fn adjudicate(&self, question: &ConflictQuestion) -> SyncResult<AiSuggestion>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict() -> Conflict {
        Conflict {
            field: "title".to_string(),
            local_value: json!("local title"),
            external_value: json!("external title"),
            local_updated_at: Utc::now(),
            external_updated_at: Utc::now(),
            external_updated_at_estimated: false,
        }
    }

    #[test]
    fn test_prompt_carries_both_values() {
        let prompt = ConflictQuestion::from_conflict(&conflict()).prompt();
        assert!(prompt.contains("title"));
        assert!(prompt.contains("local title"));
        assert!(prompt.contains("external title"));
    }

    #[test]
    fn test_response_schema_requires_core_fields() {
        let schema = ConflictQuestion::response_schema();
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("choice")));
        assert!(required.contains(&json!("confidence")));
        assert!(required.contains(&json!("explanation")));
    }

    #[test]
    fn test_suggestion_well_formed() {
        let suggestion = AiSuggestion {
            choice: ResolutionChoice::External,
            confidence: 0.9,
            explanation: "newer".to_string(),
            merged_value: None,
        };
        assert!(suggestion.is_well_formed());
    }

    #[test]
    fn test_suggestion_rejects_out_of_range_confidence() {
        let mut suggestion = AiSuggestion {
            choice: ResolutionChoice::Local,
            confidence: 1.5,
            explanation: String::new(),
            merged_value: None,
        };
        assert!(!suggestion.is_well_formed());

        suggestion.confidence = f64::NAN;
        assert!(!suggestion.is_well_formed());
    }

    #[test]
    fn test_merge_requires_merged_value() {
        let suggestion = AiSuggestion {
            choice: ResolutionChoice::Merge,
            confidence: 0.9,
            explanation: "combine".to_string(),
            merged_value: None,
        };
        assert!(!suggestion.is_well_formed());
    }

    #[test]
    fn test_suggestion_deserializes_without_merged_value() {
        let suggestion: AiSuggestion = serde_json::from_value(json!({
            "choice": "external",
            "confidence": 0.95,
            "explanation": "external edit is newer"
        }))
        .unwrap();
        assert_eq!(suggestion.choice, ResolutionChoice::External);
        assert!(suggestion.merged_value.is_none());
    }
}
