//! services/api/src/web/comments.rs
//!
//! Reader comments: any signed-in user can comment on a published post;
//! every submission runs through the moderation gate, and only approved
//! comments are publicly listed.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use inkpost_core::domain::{Comment, ContentStatus};
use inkpost_core::ports::{DatabaseService, NewComment};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::middleware::CurrentUser;
use crate::web::state::AppState;
use crate::web::{moderate_text, port_error_response};

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateCommentRequest {
    pub body: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: Uuid,
    pub blog_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub status: String,
    pub flagged_reason: Option<String>,
    pub moderation_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn from_domain(comment: Comment) -> Self {
        Self {
            id: comment.id,
            blog_id: comment.blog_id,
            author_id: comment.author_id,
            body: comment.body,
            status: comment.status.as_str().to_string(),
            flagged_reason: comment.flagged_reason,
            moderation_notes: comment.moderation_notes,
            created_at: comment.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CommentListResponse {
    pub comments: Vec<CommentResponse>,
}

/// Comments attach to publicly visible posts only.
fn publicly_visible(blog: &inkpost_core::domain::Blog) -> bool {
    blog.published && blog.status == ContentStatus::Approved
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Submit a comment on a published post. The body is classified during
/// creation; a flagged or pending comment is stored but stays out of the
/// public listing until an admin acts on it.
#[utoipa::path(
    post,
    path = "/blogs/{slug}/comments",
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment stored with its moderation status", body = CommentResponse),
        (status = 400, description = "Empty comment body"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "No published blog with this slug")
    ),
    params(("slug" = String, Path, description = "Blog slug"))
)]
pub async fn create_comment_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(slug): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let body = req.body.trim().to_string();
    if body.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Comment body is required".to_string(),
        ));
    }

    let blog = state
        .db
        .get_blog_by_slug(&slug)
        .await
        .map_err(port_error_response)?;
    if !publicly_visible(&blog) {
        return Err((StatusCode::NOT_FOUND, format!("blog '{}' not found", slug)));
    }

    let outcome = moderate_text(state.classifier.as_ref(), &body).await;
    let comment = state
        .db
        .create_comment(NewComment {
            blog_id: blog.id,
            author_id: user.user_id,
            body,
            status: outcome.status,
            flagged_reason: outcome.flagged_reason,
        })
        .await
        .map_err(port_error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse::from_domain(comment)),
    ))
}

/// The public comment listing for a post: approved comments only, oldest first.
#[utoipa::path(
    get,
    path = "/blogs/{slug}/comments",
    responses(
        (status = 200, description = "Approved comments for the blog", body = CommentListResponse),
        (status = 404, description = "No published blog with this slug")
    ),
    params(("slug" = String, Path, description = "Blog slug"))
)]
pub async fn list_comments_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let blog = state
        .db
        .get_blog_by_slug(&slug)
        .await
        .map_err(port_error_response)?;
    if !publicly_visible(&blog) {
        return Err((StatusCode::NOT_FOUND, format!("blog '{}' not found", slug)));
    }

    let comments = state
        .db
        .list_comments_for_blog(blog.id, ContentStatus::Approved)
        .await
        .map_err(port_error_response)?;
    Ok(Json(CommentListResponse {
        comments: comments
            .into_iter()
            .map(CommentResponse::from_domain)
            .collect(),
    }))
}

/// Delete a comment outright.
#[utoipa::path(
    delete,
    path = "/admin/comments/{id}",
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such comment")
    ),
    params(("id" = Uuid, Path, description = "Comment id"))
)]
pub async fn delete_comment_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;
    state
        .db
        .delete_comment(id)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        admin_user, json_body, published_blog, reader_user, test_state, MockClassifier, MockDb,
    };
    use inkpost_core::moderation::{Verdict, CLASSIFIER_UNAVAILABLE};

    fn comment_req(body: &str) -> Json<CreateCommentRequest> {
        Json(CreateCommentRequest {
            body: body.to_string(),
        })
    }

    #[tokio::test]
    async fn spam_comment_is_flagged_and_hidden_from_the_public_listing() {
        let db = Arc::new(MockDb::new());
        let blog = published_blog(&db, "launch-notes");
        let classifier = Arc::new(MockClassifier::new().with_verdict(Verdict::Flagged {
            reason: "spam".to_string(),
        }));
        let state = test_state(db.clone(), classifier.clone());

        let response = create_comment_handler(
            State(state.clone()),
            reader_user(),
            Path(blog.slug.clone()),
            comment_req("buy cheap followers now"),
        )
        .await
        .expect("submission still succeeds when the verdict is flagged")
        .into_response();
        let comment: CommentResponse = json_body(response).await;
        assert_eq!(comment.status, "flagged");
        assert_eq!(comment.flagged_reason.as_deref(), Some("spam"));
        assert_eq!(classifier.calls(), vec!["buy cheap followers now"]);

        let response = list_comments_handler(State(state.clone()), Path(blog.slug.clone()))
            .await
            .unwrap()
            .into_response();
        let listing: CommentListResponse = json_body(response).await;
        assert!(listing.comments.is_empty());
    }

    #[tokio::test]
    async fn approved_comment_shows_up_in_the_public_listing() {
        let db = Arc::new(MockDb::new());
        let blog = published_blog(&db, "launch-notes");
        let classifier = Arc::new(MockClassifier::new().with_verdict(Verdict::Approved));
        let state = test_state(db.clone(), classifier);

        create_comment_handler(
            State(state.clone()),
            reader_user(),
            Path(blog.slug.clone()),
            comment_req("Great write-up, thanks!"),
        )
        .await
        .unwrap();

        let response = list_comments_handler(State(state.clone()), Path(blog.slug.clone()))
            .await
            .unwrap()
            .into_response();
        let listing: CommentListResponse = json_body(response).await;
        assert_eq!(listing.comments.len(), 1);
        assert_eq!(listing.comments[0].body, "Great write-up, thanks!");
    }

    #[tokio::test]
    async fn classifier_failure_holds_the_comment_as_pending() {
        // Same fallback as blogs: pending, never silently approved.
        let db = Arc::new(MockDb::new());
        let blog = published_blog(&db, "launch-notes");
        let classifier = Arc::new(MockClassifier::new().with_failure("timeout"));
        let state = test_state(db.clone(), classifier);

        let response = create_comment_handler(
            State(state.clone()),
            reader_user(),
            Path(blog.slug.clone()),
            comment_req("Perfectly normal comment"),
        )
        .await
        .expect("submission must not fail when the classifier is down")
        .into_response();
        let comment: CommentResponse = json_body(response).await;
        assert_eq!(comment.status, "pending");
        assert_eq!(comment.flagged_reason.as_deref(), Some(CLASSIFIER_UNAVAILABLE));
    }

    #[tokio::test]
    async fn empty_comment_is_rejected_before_the_classifier_runs() {
        let db = Arc::new(MockDb::new());
        let blog = published_blog(&db, "launch-notes");
        let classifier = Arc::new(MockClassifier::new());
        let state = test_state(db.clone(), classifier.clone());

        let err = create_comment_handler(
            State(state.clone()),
            reader_user(),
            Path(blog.slug.clone()),
            comment_req("   "),
        )
        .await
        .err()
        .expect("blank comments are invalid");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert!(classifier.calls().is_empty());
    }

    #[tokio::test]
    async fn non_admin_cannot_delete_a_comment() {
        let db = Arc::new(MockDb::new());
        let blog = published_blog(&db, "launch-notes");
        let classifier = Arc::new(MockClassifier::new().with_verdict(Verdict::Approved));
        let state = test_state(db.clone(), classifier);

        let response = create_comment_handler(
            State(state.clone()),
            reader_user(),
            Path(blog.slug.clone()),
            comment_req("keep me"),
        )
        .await
        .unwrap()
        .into_response();
        let comment: CommentResponse = json_body(response).await;

        let err = delete_comment_handler(
            State(state.clone()),
            reader_user(),
            Path(comment.id),
        )
        .await
        .err()
        .expect("readers must not delete comments");
        assert_eq!(err.0, StatusCode::FORBIDDEN);

        // Still there, and an admin can remove it.
        delete_comment_handler(State(state.clone()), admin_user(), Path(comment.id))
            .await
            .expect("admin delete should succeed");
    }
}
