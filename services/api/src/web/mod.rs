pub mod analytics;
pub mod assist;
pub mod auth;
pub mod blogs;
pub mod comments;
pub mod middleware;
pub mod moderation;
pub mod rest;
pub mod state;

pub use middleware::{track_visitor, CurrentUser};

use axum::http::StatusCode;
use inkpost_core::moderation::{self as moderation_core, ModerationOutcome};
use inkpost_core::ports::{ContentClassifier, PortError};
use tracing::{error, warn};

/// Runs submitted text through the external classifier and maps the verdict
/// onto a content status.
///
/// A classifier failure never fails the submission: the error is logged and
/// the uniform fallback outcome (pending, queued for admin review) is used
/// instead.
pub(crate) async fn moderate_text(
    classifier: &dyn ContentClassifier,
    text: &str,
) -> ModerationOutcome {
    match classifier.classify(text).await {
        Ok(verdict) => moderation_core::outcome_for(verdict),
        Err(e) => {
            warn!("content classifier unavailable, holding submission as pending: {}", e);
            moderation_core::fallback_outcome()
        }
    }
}

/// Maps a port error onto the HTTP response pair used by every handler.
pub(crate) fn port_error_response(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
        PortError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(msg) => {
            error!("store operation failed: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
        }
    }
}
