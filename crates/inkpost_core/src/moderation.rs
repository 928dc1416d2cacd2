//! crates/inkpost_core/src/moderation.rs
//!
//! The moderation gate's decision logic: mapping an external classifier
//! verdict onto the persisted content status, plus the uniform policy for
//! when the classifier cannot be reached at all.

use crate::domain::ContentStatus;

/// The three-way classification returned by the external content classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    Flagged { reason: String },
    NeedsReview { reason: String },
}

/// The status and reason the gate computed for a piece of content.
/// Persistence is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationOutcome {
    pub status: ContentStatus,
    pub flagged_reason: Option<String>,
}

/// Maps a classifier verdict onto a content status.
///
/// `Approved` clears any previous reason; `Flagged` and `NeedsReview` carry
/// the classifier's reason through so admins can see why the item was held.
pub fn outcome_for(verdict: Verdict) -> ModerationOutcome {
    match verdict {
        Verdict::Approved => ModerationOutcome {
            status: ContentStatus::Approved,
            flagged_reason: None,
        },
        Verdict::Flagged { reason } => ModerationOutcome {
            status: ContentStatus::Flagged,
            flagged_reason: Some(reason),
        },
        Verdict::NeedsReview { reason } => ModerationOutcome {
            status: ContentStatus::Pending,
            flagged_reason: Some(reason),
        },
    }
}

/// The reason string recorded when the classifier call itself failed.
pub const CLASSIFIER_UNAVAILABLE: &str = "content classifier unavailable";

/// The outcome used when the classifier call fails or times out.
///
/// Submission still succeeds; the item lands in the admin review queue as
/// `pending` rather than being silently auto-approved. This policy applies
/// to blogs and comments alike.
pub fn fallback_outcome() -> ModerationOutcome {
    ModerationOutcome {
        status: ContentStatus::Pending,
        flagged_reason: Some(CLASSIFIER_UNAVAILABLE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approved_verdict_clears_the_reason() {
        let outcome = outcome_for(Verdict::Approved);
        assert_eq!(outcome.status, ContentStatus::Approved);
        assert_eq!(outcome.flagged_reason, None);
    }

    #[test]
    fn flagged_verdict_carries_its_reason() {
        let outcome = outcome_for(Verdict::Flagged {
            reason: "spam".to_string(),
        });
        assert_eq!(outcome.status, ContentStatus::Flagged);
        assert_eq!(outcome.flagged_reason.as_deref(), Some("spam"));
    }

    #[test]
    fn needs_review_verdict_maps_to_pending() {
        let outcome = outcome_for(Verdict::NeedsReview {
            reason: "borderline language".to_string(),
        });
        assert_eq!(outcome.status, ContentStatus::Pending);
        assert_eq!(outcome.flagged_reason.as_deref(), Some("borderline language"));
    }

    #[test]
    fn fallback_is_pending_and_names_the_classifier() {
        let outcome = fallback_outcome();
        assert_eq!(outcome.status, ContentStatus::Pending);
        assert_eq!(outcome.flagged_reason.as_deref(), Some(CLASSIFIER_UNAVAILABLE));
    }
}
