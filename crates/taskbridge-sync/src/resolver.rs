//! Conflict resolution policies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use taskbridge_core::ConflictPolicy;

use crate::ai::{ConflictAdjudicator, ConflictQuestion};
use crate::conflict::Conflict;

/// Confidence above which an AI suggestion is applied without review.
pub const AUTO_APPLY_THRESHOLD: f64 = 0.8;

/// Which side of a conflict wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionChoice {
    /// Keep the local value.
    Local,
    /// Take the external value.
    External,
    /// Use a merged value.
    Merge,
}

impl ResolutionChoice {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionChoice::Local => "local",
            ResolutionChoice::External => "external",
            ResolutionChoice::Merge => "merge",
        }
    }
}

impl std::fmt::Display for ResolutionChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of settling one conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictResolution {
    /// Winning side.
    pub choice: ResolutionChoice,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Why this choice was made.
    pub explanation: String,
    /// Merged value when `choice` is merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_value: Option<Value>,
}

/// A conflict together with its resolution and whether it may be applied
/// automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedConflict {
    /// The detected conflict.
    pub conflict: Conflict,
    /// The resolution (or, when unresolved, the suggestion on record).
    pub resolution: ConflictResolution,
    /// False when the conflict stays open for manual operator review; the
    /// resolution is then only a logged suggestion.
    pub resolved: bool,
}

/// Applies a resolution policy to detected conflicts.
///
/// Infallible by contract: resolution runs inside a larger batch and must
/// never abort it, so every failure path degrades to a policy decision.
pub struct ConflictResolver {
    policy: ConflictPolicy,
    adjudicator: Option<Arc<dyn ConflictAdjudicator>>,
}

impl ConflictResolver {
    /// Create a resolver for a static policy.
    #[must_use]
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            adjudicator: None,
        }
    }

    /// Attach the AI collaborator used by the `ai_suggest` policy.
    #[must_use]
    pub fn with_adjudicator(mut self, adjudicator: Arc<dyn ConflictAdjudicator>) -> Self {
        self.adjudicator = Some(adjudicator);
        self
    }

    /// Policy this resolver applies.
    #[must_use]
    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Settle one conflict.
    pub async fn resolve(&self, conflict: &Conflict) -> ResolvedConflict {
        match self.policy {
            ConflictPolicy::ExternalWins => ResolvedConflict {
                conflict: conflict.clone(),
                resolution: ConflictResolution {
                    choice: ResolutionChoice::External,
                    confidence: 1.0,
                    explanation: "external value wins under the external_wins policy".to_string(),
                    merged_value: None,
                },
                resolved: true,
            },
            ConflictPolicy::LatestWins => ResolvedConflict {
                conflict: conflict.clone(),
                resolution: latest_wins(conflict, 1.0, None),
                resolved: true,
            },
            ConflictPolicy::AiSuggest => self.resolve_with_ai(conflict).await,
        }
    }

    async fn resolve_with_ai(&self, conflict: &Conflict) -> ResolvedConflict {
        let Some(adjudicator) = &self.adjudicator else {
            warn!(
                field = %conflict.field,
                "ai_suggest policy configured without an adjudicator; falling back to latest_wins"
            );
            return fallback(conflict, "no AI adjudicator configured");
        };

        let question = ConflictQuestion::from_conflict(conflict);
        match adjudicator.adjudicate(&question).await {
            Ok(suggestion) if suggestion.is_well_formed() => {
                let resolved = suggestion.confidence > AUTO_APPLY_THRESHOLD;
                ResolvedConflict {
                    conflict: conflict.clone(),
                    resolution: ConflictResolution {
                        choice: suggestion.choice,
                        confidence: suggestion.confidence,
                        explanation: suggestion.explanation,
                        merged_value: suggestion.merged_value,
                    },
                    resolved,
                }
            }
            Ok(suggestion) => {
                warn!(
                    field = %conflict.field,
                    confidence = suggestion.confidence,
                    "AI suggestion malformed; falling back to latest_wins"
                );
                fallback(conflict, "AI suggestion was malformed")
            }
            Err(e) => {
                warn!(
                    field = %conflict.field,
                    error = %e,
                    "AI adjudication failed; falling back to latest_wins"
                );
                fallback(conflict, "AI adjudication failed")
            }
        }
    }
}

/// Resolve by comparing timestamps; the strictly more recent side wins and
/// ties favor external (documented, arbitrary tie-break).
fn latest_wins(conflict: &Conflict, confidence: f64, note: Option<&str>) -> ConflictResolution {
    let (choice, reason) = if conflict.local_updated_at > conflict.external_updated_at {
        (ResolutionChoice::Local, "local value is more recent")
    } else if conflict.external_updated_at > conflict.local_updated_at {
        (ResolutionChoice::External, "external value is more recent")
    } else {
        (
            ResolutionChoice::External,
            "timestamps are equal; tie favors external",
        )
    };

    let explanation = match note {
        Some(note) => format!("{note}; {reason}"),
        None => reason.to_string(),
    };

    ConflictResolution {
        choice,
        confidence,
        explanation,
        merged_value: None,
    }
}

/// Fallback applied when the AI path is unusable.
fn fallback(conflict: &Conflict, reason: &str) -> ResolvedConflict {
    ResolvedConflict {
        conflict: conflict.clone(),
        resolution: latest_wins(conflict, 0.5, Some(reason)),
        resolved: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiSuggestion;
    use crate::error::{SyncError, SyncResult};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn conflict_with_offsets(local_offset_secs: i64, external_offset_secs: i64) -> Conflict {
        let base = Utc::now();
        Conflict {
            field: "title".to_string(),
            local_value: json!("local"),
            external_value: json!("external"),
            local_updated_at: base + Duration::seconds(local_offset_secs),
            external_updated_at: base + Duration::seconds(external_offset_secs),
            external_updated_at_estimated: false,
        }
    }

    struct FixedAdjudicator(AiSuggestion);

    #[async_trait]
    impl ConflictAdjudicator for FixedAdjudicator {
        async fn adjudicate(&self, _question: &ConflictQuestion) -> SyncResult<AiSuggestion> {
            Ok(self.0.clone())
        }
    }

    struct FailingAdjudicator;

    #[async_trait]
    impl ConflictAdjudicator for FailingAdjudicator {
        async fn adjudicate(&self, _question: &ConflictQuestion) -> SyncResult<AiSuggestion> {
            Err(SyncError::ai_resolution("model timed out"))
        }
    }

    #[tokio::test]
    async fn test_external_wins_always_external() {
        let resolver = ConflictResolver::new(ConflictPolicy::ExternalWins);

        for conflict in [
            conflict_with_offsets(60, 0),
            conflict_with_offsets(0, 60),
            conflict_with_offsets(0, 0),
        ] {
            let resolved = resolver.resolve(&conflict).await;
            assert_eq!(resolved.resolution.choice, ResolutionChoice::External);
            assert_eq!(resolved.resolution.confidence, 1.0);
            assert!(resolved.resolved);
        }
    }

    #[tokio::test]
    async fn test_latest_wins_picks_strictly_newer() {
        let resolver = ConflictResolver::new(ConflictPolicy::LatestWins);

        let local_newer = resolver.resolve(&conflict_with_offsets(60, 0)).await;
        assert_eq!(local_newer.resolution.choice, ResolutionChoice::Local);

        let external_newer = resolver.resolve(&conflict_with_offsets(0, 60)).await;
        assert_eq!(external_newer.resolution.choice, ResolutionChoice::External);
    }

    #[tokio::test]
    async fn test_latest_wins_tie_favors_external() {
        let resolver = ConflictResolver::new(ConflictPolicy::LatestWins);
        let resolved = resolver.resolve(&conflict_with_offsets(0, 0)).await;
        assert_eq!(resolved.resolution.choice, ResolutionChoice::External);
        assert!(resolved.resolution.explanation.contains("tie"));
    }

    #[tokio::test]
    async fn test_ai_high_confidence_auto_applies() {
        let resolver =
            ConflictResolver::new(ConflictPolicy::AiSuggest).with_adjudicator(Arc::new(
                FixedAdjudicator(AiSuggestion {
                    choice: ResolutionChoice::External,
                    confidence: 0.95,
                    explanation: "external edit is authoritative".to_string(),
                    merged_value: None,
                }),
            ));

        let resolved = resolver.resolve(&conflict_with_offsets(0, 60)).await;
        assert!(resolved.resolved);
        assert_eq!(resolved.resolution.choice, ResolutionChoice::External);
        assert_eq!(resolved.resolution.confidence, 0.95);
    }

    #[tokio::test]
    async fn test_ai_low_confidence_left_unresolved_with_suggestion() {
        let resolver =
            ConflictResolver::new(ConflictPolicy::AiSuggest).with_adjudicator(Arc::new(
                FixedAdjudicator(AiSuggestion {
                    choice: ResolutionChoice::Local,
                    confidence: 0.4,
                    explanation: "unsure which edit matters".to_string(),
                    merged_value: None,
                }),
            ));

        let resolved = resolver.resolve(&conflict_with_offsets(0, 60)).await;
        assert!(!resolved.resolved);
        assert_eq!(resolved.resolution.confidence, 0.4);
        assert!(resolved
            .resolution
            .explanation
            .contains("unsure which edit matters"));
    }

    #[tokio::test]
    async fn test_ai_failure_falls_back_to_latest_wins() {
        let resolver = ConflictResolver::new(ConflictPolicy::AiSuggest)
            .with_adjudicator(Arc::new(FailingAdjudicator));

        let resolved = resolver.resolve(&conflict_with_offsets(0, 60)).await;
        assert!(resolved.resolved);
        assert_eq!(resolved.resolution.choice, ResolutionChoice::External);
        assert_eq!(resolved.resolution.confidence, 0.5);
        assert!(resolved.resolution.explanation.contains("failed"));
    }

    #[tokio::test]
    async fn test_ai_malformed_suggestion_falls_back() {
        let resolver =
            ConflictResolver::new(ConflictPolicy::AiSuggest).with_adjudicator(Arc::new(
                FixedAdjudicator(AiSuggestion {
                    choice: ResolutionChoice::Merge,
                    confidence: 0.99,
                    explanation: "merge without a value".to_string(),
                    merged_value: None,
                }),
            ));

        let resolved = resolver.resolve(&conflict_with_offsets(60, 0)).await;
        assert!(resolved.resolved);
        assert_eq!(resolved.resolution.confidence, 0.5);
        assert_eq!(resolved.resolution.choice, ResolutionChoice::Local);
    }

    #[tokio::test]
    async fn test_ai_without_adjudicator_falls_back() {
        let resolver = ConflictResolver::new(ConflictPolicy::AiSuggest);
        let resolved = resolver.resolve(&conflict_with_offsets(0, 0)).await;
        assert!(resolved.resolved);
        assert_eq!(resolved.resolution.confidence, 0.5);
        assert_eq!(resolved.resolution.choice, ResolutionChoice::External);
    }
}
