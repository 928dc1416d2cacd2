//! services/api/src/web/moderation.rs
//!
//! The admin moderation surface: the review queue of held content, and the
//! status transitions for blogs and comments. Any of the four statuses may
//! be set directly; no transition table is enforced.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use inkpost_core::domain::ContentStatus;
use inkpost_core::ports::DatabaseService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::blogs::BlogResponse;
use crate::web::comments::CommentResponse;
use crate::web::middleware::CurrentUser;
use crate::web::port_error_response;
use crate::web::state::AppState;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of `pending`, `approved`, `rejected`, `flagged`.
    pub status: String,
    pub moderation_notes: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ModerationQueueResponse {
    pub blogs: Vec<BlogResponse>,
    pub comments: Vec<CommentResponse>,
}

fn parse_status(raw: &str) -> Result<ContentStatus, (StatusCode, String)> {
    ContentStatus::parse(raw).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("'{}' is not a valid status", raw),
        )
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Everything awaiting a human decision: pending and flagged blogs and
/// comments, newest first.
#[utoipa::path(
    get,
    path = "/admin/moderation/queue",
    responses(
        (status = 200, description = "Content held for review", body = ModerationQueueResponse),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn moderation_queue_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;

    let mut blogs = Vec::new();
    let mut comments = Vec::new();
    for status in [ContentStatus::Pending, ContentStatus::Flagged] {
        blogs.extend(
            state
                .db
                .list_blogs_by_status(status)
                .await
                .map_err(port_error_response)?,
        );
        comments.extend(
            state
                .db
                .list_comments_by_status(status)
                .await
                .map_err(port_error_response)?,
        );
    }
    blogs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(ModerationQueueResponse {
        blogs: blogs.into_iter().map(BlogResponse::from_domain).collect(),
        comments: comments
            .into_iter()
            .map(CommentResponse::from_domain)
            .collect(),
    }))
}

/// Set a blog's moderation status, with optional notes for the record.
#[utoipa::path(
    put,
    path = "/admin/blogs/{id}/status",
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = BlogResponse),
        (status = 400, description = "Unknown status value"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such blog")
    ),
    params(("id" = Uuid, Path, description = "Blog id"))
)]
pub async fn update_blog_status_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;
    let status = parse_status(&req.status)?;
    let blog = state
        .db
        .update_blog_status(id, status, req.moderation_notes.as_deref())
        .await
        .map_err(port_error_response)?;
    Ok(Json(BlogResponse::from_domain(blog)))
}

/// Set a comment's moderation status, with optional notes for the record.
#[utoipa::path(
    put,
    path = "/admin/comments/{id}/status",
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = CommentResponse),
        (status = 400, description = "Unknown status value"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such comment")
    ),
    params(("id" = Uuid, Path, description = "Comment id"))
)]
pub async fn update_comment_status_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;
    let status = parse_status(&req.status)?;
    let comment = state
        .db
        .update_comment_status(id, status, req.moderation_notes.as_deref())
        .await
        .map_err(port_error_response)?;
    Ok(Json(CommentResponse::from_domain(comment)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        admin_user, json_body, pending_blog, reader_user, test_state, MockClassifier, MockDb,
    };
    use inkpost_core::domain::ContentStatus;

    fn status_req(status: &str, notes: Option<&str>) -> Json<UpdateStatusRequest> {
        Json(UpdateStatusRequest {
            status: status.to_string(),
            moderation_notes: notes.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn admin_can_move_a_pending_blog_to_approved() {
        let db = Arc::new(MockDb::new());
        let blog = pending_blog(&db, "held-post", "needs another look");
        let state = test_state(db.clone(), Arc::new(MockClassifier::new()));

        let response = update_blog_status_handler(
            State(state.clone()),
            admin_user(),
            Path(blog.id),
            status_req("approved", Some("looks fine on review")),
        )
        .await
        .unwrap()
        .into_response();
        let updated: BlogResponse = json_body(response).await;
        assert_eq!(updated.status, "approved");
        assert_eq!(updated.moderation_notes.as_deref(), Some("looks fine on review"));
        assert_eq!(db.blog(blog.id).status, ContentStatus::Approved);
    }

    #[tokio::test]
    async fn non_admin_transition_leaves_the_stored_status_unchanged() {
        let db = Arc::new(MockDb::new());
        let blog = pending_blog(&db, "held-post", "needs another look");
        let state = test_state(db.clone(), Arc::new(MockClassifier::new()));

        let err = update_blog_status_handler(
            State(state.clone()),
            reader_user(),
            Path(blog.id),
            status_req("approved", None),
        )
        .await
        .err()
        .expect("readers must not transition statuses");
        assert_eq!(err.0, StatusCode::FORBIDDEN);
        assert_eq!(db.blog(blog.id).status, ContentStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_status_values_are_rejected() {
        let db = Arc::new(MockDb::new());
        let blog = pending_blog(&db, "held-post", "needs another look");
        let state = test_state(db.clone(), Arc::new(MockClassifier::new()));

        let err = update_blog_status_handler(
            State(state.clone()),
            admin_user(),
            Path(blog.id),
            status_req("banished", None),
        )
        .await
        .err()
        .expect("the status enum is closed");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(db.blog(blog.id).status, ContentStatus::Pending);
    }

    #[tokio::test]
    async fn queue_lists_pending_and_flagged_content_only() {
        let db = Arc::new(MockDb::new());
        let held = pending_blog(&db, "held-post", "unsure");
        let state = test_state(db.clone(), Arc::new(MockClassifier::new()));

        // Approve a second blog; it must not appear in the queue.
        let other = pending_blog(&db, "other-post", "unsure");
        update_blog_status_handler(
            State(state.clone()),
            admin_user(),
            Path(other.id),
            status_req("approved", None),
        )
        .await
        .unwrap();

        let response = moderation_queue_handler(State(state.clone()), admin_user())
            .await
            .unwrap()
            .into_response();
        let queue: ModerationQueueResponse = json_body(response).await;
        assert_eq!(queue.blogs.len(), 1);
        assert_eq!(queue.blogs[0].id, held.id);
        assert!(queue.comments.is_empty());
    }
}
