//! services/api/src/web/assist.rs
//!
//! Admin writing-assist endpoints, one per AI adapter: drafting, summaries,
//! tag suggestions, and SEO meta descriptions. Unlike the moderation gate,
//! a failed assist call is surfaced to the caller; there is nothing to fall
//! back to.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use inkpost_core::ports::{DraftService, SeoService, SummaryService, TagSuggestionService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::web::middleware::CurrentUser;
use crate::web::port_error_response;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct DraftRequest {
    pub topic: String,
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DraftResponse {
    pub draft: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SummaryRequest {
    pub text: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Deserialize, ToSchema)]
pub struct TagsRequest {
    pub text: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct SeoRequest {
    pub title: String,
    pub text: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SeoResponse {
    pub description: String,
}

fn require_text(value: &str, what: &str) -> Result<(), (StatusCode, String)> {
    if value.trim().is_empty() {
        Err((StatusCode::BAD_REQUEST, format!("{} is required", what)))
    } else {
        Ok(())
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Generate a post draft for the given topic.
#[utoipa::path(
    post,
    path = "/admin/assist/draft",
    request_body = DraftRequest,
    responses(
        (status = 200, description = "A markdown draft", body = DraftResponse),
        (status = 400, description = "Missing topic"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn draft_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<DraftRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;
    require_text(&req.topic, "topic")?;
    let draft = state
        .draft_adapter
        .generate_draft(req.topic.trim(), req.notes.as_deref())
        .await
        .map_err(port_error_response)?;
    Ok(Json(DraftResponse { draft }))
}

/// Summarize a post body into a preview blurb.
#[utoipa::path(
    post,
    path = "/admin/assist/summary",
    request_body = SummaryRequest,
    responses(
        (status = 200, description = "A short summary", body = SummaryResponse),
        (status = 400, description = "Missing text"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn summary_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<SummaryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;
    require_text(&req.text, "text")?;
    let summary = state
        .summary_adapter
        .summarize(&req.text)
        .await
        .map_err(port_error_response)?;
    Ok(Json(SummaryResponse { summary }))
}

/// Suggest topic tags for a post body.
#[utoipa::path(
    post,
    path = "/admin/assist/tags",
    request_body = TagsRequest,
    responses(
        (status = 200, description = "Suggested tags", body = TagsResponse),
        (status = 400, description = "Missing text"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn tags_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<TagsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;
    require_text(&req.text, "text")?;
    let tags = state
        .tag_adapter
        .suggest_tags(&req.text)
        .await
        .map_err(port_error_response)?;
    Ok(Json(TagsResponse { tags }))
}

/// Write an SEO meta description for a post.
#[utoipa::path(
    post,
    path = "/admin/assist/seo",
    request_body = SeoRequest,
    responses(
        (status = 200, description = "A meta description", body = SeoResponse),
        (status = 400, description = "Missing title or text"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn seo_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<SeoRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;
    require_text(&req.title, "title")?;
    require_text(&req.text, "text")?;
    let description = state
        .seo_adapter
        .meta_description(req.title.trim(), &req.text)
        .await
        .map_err(port_error_response)?;
    Ok(Json(SeoResponse { description }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin_user, json_body, reader_user, test_state, MockClassifier, MockDb};

    #[tokio::test]
    async fn assist_endpoints_are_admin_only() {
        let state = test_state(Arc::new(MockDb::new()), Arc::new(MockClassifier::new()));
        let err = draft_handler(
            State(state.clone()),
            reader_user(),
            Json(DraftRequest {
                topic: "rust".to_string(),
                notes: None,
            }),
        )
        .await
        .err()
        .expect("assist is an admin surface");
        assert_eq!(err.0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn draft_and_tags_round_trip_through_the_adapters() {
        let state = test_state(Arc::new(MockDb::new()), Arc::new(MockClassifier::new()));

        let response = draft_handler(
            State(state.clone()),
            admin_user(),
            Json(DraftRequest {
                topic: "observability".to_string(),
                notes: Some("mention tracing".to_string()),
            }),
        )
        .await
        .unwrap()
        .into_response();
        let draft: DraftResponse = json_body(response).await;
        assert!(!draft.draft.is_empty());

        let response = tags_handler(
            State(state.clone()),
            admin_user(),
            Json(TagsRequest {
                text: "a post about rust and axum".to_string(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        let tags: TagsResponse = json_body(response).await;
        assert!(!tags.tags.is_empty());
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let state = test_state(Arc::new(MockDb::new()), Arc::new(MockClassifier::new()));
        let err = summary_handler(
            State(state.clone()),
            admin_user(),
            Json(SummaryRequest {
                text: "  ".to_string(),
            }),
        )
        .await
        .err()
        .expect("blank text is invalid");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }
}
