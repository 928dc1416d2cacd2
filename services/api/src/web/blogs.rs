//! services/api/src/web/blogs.rs
//!
//! Blog post handlers: the public listing/read surface and the admin
//! authoring surface. Creation and edits run through the moderation gate;
//! public reads feed the view counter.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use inkpost_core::domain::{slugify, Blog, ContentStatus};
use inkpost_core::ports::{DatabaseService, NewBlog, PortError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::middleware::CurrentUser;
use crate::web::state::AppState;
use crate::web::{moderate_text, port_error_response};

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CreateBlogRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize, IntoParams)]
pub struct ListBlogsQuery {
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Page size (default 10, max 50).
    pub per_page: Option<u32>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct BlogResponse {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub status: String,
    pub flagged_reason: Option<String>,
    pub moderation_notes: Option<String>,
    pub published: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogResponse {
    pub fn from_domain(blog: Blog) -> Self {
        Self {
            id: blog.id,
            slug: blog.slug,
            title: blog.title,
            body: blog.body,
            tags: blog.tags,
            author_id: blog.author_id,
            status: blog.status.as_str().to_string(),
            flagged_reason: blog.flagged_reason,
            moderation_notes: blog.moderation_notes,
            published: blog.published,
            views: blog.views,
            created_at: blog.created_at,
            updated_at: blog.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct BlogListResponse {
    pub blogs: Vec<BlogResponse>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DayViewsEntry {
    pub day: NaiveDate,
    pub views: i64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct BlogStatsResponse {
    pub blog_id: Uuid,
    pub views: i64,
    pub views_by_day: Vec<DayViewsEntry>,
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

//=========================================================================================
// Admin Handlers
//=========================================================================================

/// Create a blog post. The body text is classified synchronously during
/// creation; the post is stored with whatever status the gate computed.
#[utoipa::path(
    post,
    path = "/admin/blogs",
    request_body = CreateBlogRequest,
    responses(
        (status = 201, description = "Blog created with its moderation status", body = BlogResponse),
        (status = 400, description = "Missing title or body"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn create_blog_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<CreateBlogRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;

    let title = req.title.trim().to_string();
    let body = req.body.trim().to_string();
    if title.is_empty() || body.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Title and body are required".to_string(),
        ));
    }

    let outcome = moderate_text(state.classifier.as_ref(), &body).await;
    let slug = slugify(&title);
    let new_blog = NewBlog {
        slug: slug.clone(),
        title,
        body,
        tags: normalize_tags(req.tags),
        author_id: user.user_id,
        status: outcome.status,
        flagged_reason: outcome.flagged_reason,
    };

    let created = match state.db.create_blog(new_blog.clone()).await {
        // Slug taken by an earlier post: retry once with a random suffix.
        Err(PortError::Conflict(_)) => {
            let suffix = Uuid::new_v4().simple().to_string();
            let mut retry = new_blog;
            retry.slug = format!("{}-{}", slug, &suffix[..8]);
            state.db.create_blog(retry).await
        }
        other => other,
    }
    .map_err(port_error_response)?;

    Ok((StatusCode::CREATED, Json(BlogResponse::from_domain(created))))
}

/// Edit a blog's title, body, or tags. A changed body is re-moderated, so
/// the stored status always reflects the text it was computed from.
#[utoipa::path(
    put,
    path = "/admin/blogs/{id}",
    request_body = UpdateBlogRequest,
    responses(
        (status = 200, description = "Blog updated", body = BlogResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such blog")
    ),
    params(("id" = Uuid, Path, description = "Blog id"))
)]
pub async fn update_blog_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBlogRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;

    let current = state.db.get_blog(id).await.map_err(port_error_response)?;

    let title = req
        .title
        .map(|t| t.trim().to_string())
        .unwrap_or(current.title);
    let body_changed = req.body.is_some();
    let body = req
        .body
        .map(|b| b.trim().to_string())
        .unwrap_or(current.body);
    let tags = req.tags.map(normalize_tags).unwrap_or(current.tags);
    if title.is_empty() || body.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Title and body cannot be empty".to_string(),
        ));
    }

    let (status, flagged_reason) = if body_changed {
        let outcome = moderate_text(state.classifier.as_ref(), &body).await;
        (outcome.status, outcome.flagged_reason)
    } else {
        (current.status, current.flagged_reason)
    };

    let updated = state
        .db
        .update_blog_content(id, &title, &body, &tags, status, flagged_reason.as_deref())
        .await
        .map_err(port_error_response)?;
    Ok(Json(BlogResponse::from_domain(updated)))
}

/// Publish a blog. This is a single check-and-set against the stored row:
/// it succeeds only while the blog's status is `approved`.
#[utoipa::path(
    post,
    path = "/admin/blogs/{id}/publish",
    responses(
        (status = 200, description = "Blog is now publicly listed", body = BlogResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such blog"),
        (status = 409, description = "Blog is not approved")
    ),
    params(("id" = Uuid, Path, description = "Blog id"))
)]
pub async fn publish_blog_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;
    let blog = state
        .db
        .publish_blog(id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(BlogResponse::from_domain(blog)))
}

/// Take a blog off the public listing. Unconditional, unlike publish.
#[utoipa::path(
    post,
    path = "/admin/blogs/{id}/unpublish",
    responses(
        (status = 200, description = "Blog withdrawn from the public listing", body = BlogResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such blog")
    ),
    params(("id" = Uuid, Path, description = "Blog id"))
)]
pub async fn unpublish_blog_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;
    let blog = state
        .db
        .unpublish_blog(id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(BlogResponse::from_domain(blog)))
}

/// Delete a blog outright. There is no soft delete or tombstone.
#[utoipa::path(
    delete,
    path = "/admin/blogs/{id}",
    responses(
        (status = 204, description = "Blog deleted"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such blog")
    ),
    params(("id" = Uuid, Path, description = "Blog id"))
)]
pub async fn delete_blog_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;
    state
        .db
        .delete_blog(id)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// A single blog's view counters: the lifetime total and the per-day buckets.
#[utoipa::path(
    get,
    path = "/admin/blogs/{id}/stats",
    responses(
        (status = 200, description = "View counters for the blog", body = BlogStatsResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such blog")
    ),
    params(("id" = Uuid, Path, description = "Blog id"))
)]
pub async fn blog_stats_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;
    let blog = state.db.get_blog(id).await.map_err(port_error_response)?;
    let daily = state
        .db
        .get_blog_daily_views(id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(BlogStatsResponse {
        blog_id: blog.id,
        views: blog.views,
        views_by_day: daily
            .into_iter()
            .map(|d| DayViewsEntry {
                day: d.day,
                views: d.views,
            })
            .collect(),
    }))
}

//=========================================================================================
// Public Handlers
//=========================================================================================

/// The public paginated listing: published, approved posts only.
#[utoipa::path(
    get,
    path = "/blogs",
    responses(
        (status = 200, description = "One page of published blogs", body = BlogListResponse)
    ),
    params(ListBlogsQuery)
)]
pub async fn list_blogs_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBlogsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(10).clamp(1, 50);

    let (blogs, total) = state
        .db
        .list_published_blogs(page, per_page)
        .await
        .map_err(port_error_response)?;

    Ok(Json(BlogListResponse {
        blogs: blogs.into_iter().map(BlogResponse::from_domain).collect(),
        page,
        per_page,
        total,
    }))
}

/// Read one published blog by slug. Each successful read adds one hit to the
/// blog's total and today's bucket; a failed increment is logged and
/// swallowed so it can never break the page.
#[utoipa::path(
    get,
    path = "/blogs/{slug}",
    responses(
        (status = 200, description = "The blog post", body = BlogResponse),
        (status = 404, description = "No published blog with this slug")
    ),
    params(("slug" = String, Path, description = "Blog slug"))
)]
pub async fn get_blog_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let blog = state
        .db
        .get_blog_by_slug(&slug)
        .await
        .map_err(port_error_response)?;

    // Unpublished and unapproved posts are indistinguishable from absent ones.
    if !blog.published || blog.status != ContentStatus::Approved {
        return Err((StatusCode::NOT_FOUND, format!("blog '{}' not found", slug)));
    }

    let today = Local::now().date_naive();
    if let Err(e) = state.db.record_blog_view(blog.id, today).await {
        warn!("View counter increment failed for blog {}: {}", blog.id, e);
    }

    Ok(Json(BlogResponse::from_domain(blog)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin_user, reader_user, test_state, MockClassifier, MockDb};
    use inkpost_core::moderation::{Verdict, CLASSIFIER_UNAVAILABLE};

    fn create_req(title: &str, body: &str) -> Json<CreateBlogRequest> {
        Json(CreateBlogRequest {
            title: title.to_string(),
            body: body.to_string(),
            tags: vec![],
        })
    }

    async fn create_blog_as_admin(
        state: &Arc<AppState>,
        title: &str,
        body: &str,
    ) -> BlogResponse {
        let response = create_blog_handler(
            State(state.clone()),
            admin_user(),
            create_req(title, body),
        )
        .await
        .expect("blog creation should succeed")
        .into_response();
        crate::testing::json_body(response).await
    }

    #[tokio::test]
    async fn approved_blog_is_listed_only_after_publish() {
        let db = Arc::new(MockDb::new());
        let classifier = Arc::new(MockClassifier::new().with_verdict(Verdict::Approved));
        let state = test_state(db.clone(), classifier);

        let blog = create_blog_as_admin(&state, "A quiet morning", "Ordinary prose.").await;
        assert_eq!(blog.status, "approved");
        assert_eq!(blog.flagged_reason, None);

        // Approved but unpublished: the public listing stays empty.
        let listing: BlogListResponse = {
            let response = list_blogs_handler(
                State(state.clone()),
                Query(ListBlogsQuery {
                    page: None,
                    per_page: None,
                }),
            )
            .await
            .unwrap()
            .into_response();
            crate::testing::json_body(response).await
        };
        assert_eq!(listing.total, 0);

        publish_blog_handler(
            State(state.clone()),
            admin_user(),
            Path(blog.id),
        )
        .await
        .expect("publishing an approved blog should succeed");

        let listing: BlogListResponse = {
            let response = list_blogs_handler(
                State(state.clone()),
                Query(ListBlogsQuery {
                    page: None,
                    per_page: None,
                }),
            )
            .await
            .unwrap()
            .into_response();
            crate::testing::json_body(response).await
        };
        assert_eq!(listing.total, 1);
        assert_eq!(listing.blogs[0].slug, "a-quiet-morning");
        assert!(listing.blogs[0].published);
    }

    #[tokio::test]
    async fn publish_is_refused_while_not_approved() {
        let db = Arc::new(MockDb::new());
        let classifier = Arc::new(MockClassifier::new().with_verdict(Verdict::NeedsReview {
            reason: "borderline".to_string(),
        }));
        let state = test_state(db.clone(), classifier);

        let blog = create_blog_as_admin(&state, "Edgy take", "Borderline prose.").await;
        assert_eq!(blog.status, "pending");

        let err = publish_blog_handler(
            State(state.clone()),
            admin_user(),
            Path(blog.id),
        )
        .await
        .err()
        .expect("publishing a pending blog must fail");
        assert_eq!(err.0, StatusCode::CONFLICT);

        // And the flag stayed down.
        assert!(!db.blog(blog.id).published);
    }

    #[tokio::test]
    async fn classifier_failure_falls_back_to_pending() {
        let db = Arc::new(MockDb::new());
        let classifier = Arc::new(MockClassifier::new().with_failure("connection refused"));
        let state = test_state(db.clone(), classifier);

        let blog = create_blog_as_admin(&state, "Unlucky timing", "Fine prose.").await;
        assert_eq!(blog.status, "pending");
        assert_eq!(blog.flagged_reason.as_deref(), Some(CLASSIFIER_UNAVAILABLE));
    }

    #[tokio::test]
    async fn editing_the_body_reruns_the_gate() {
        let db = Arc::new(MockDb::new());
        let classifier = Arc::new(
            MockClassifier::new()
                .with_verdict(Verdict::Approved)
                .with_verdict(Verdict::Flagged {
                    reason: "spam".to_string(),
                }),
        );
        let state = test_state(db.clone(), classifier);

        let blog = create_blog_as_admin(&state, "Clean at first", "Ordinary prose.").await;
        assert_eq!(blog.status, "approved");

        let response = update_blog_handler(
            State(state.clone()),
            admin_user(),
            Path(blog.id),
            Json(UpdateBlogRequest {
                title: None,
                body: Some("buy cheap followers now".to_string()),
                tags: None,
            }),
        )
        .await
        .expect("the edit itself succeeds")
        .into_response();
        let updated: BlogResponse = crate::testing::json_body(response).await;
        assert_eq!(updated.status, "flagged");
        assert_eq!(updated.flagged_reason.as_deref(), Some("spam"));

        // A title-only edit keeps the status the classifier last computed.
        update_blog_handler(
            State(state.clone()),
            admin_user(),
            Path(blog.id),
            Json(UpdateBlogRequest {
                title: Some("Renamed".to_string()),
                body: None,
                tags: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(db.blog(blog.id).status, ContentStatus::Flagged);
    }

    #[tokio::test]
    async fn non_admin_cannot_create_or_delete() {
        let db = Arc::new(MockDb::new());
        let classifier = Arc::new(MockClassifier::new());
        let state = test_state(db.clone(), classifier.clone());

        let err = create_blog_handler(
            State(state.clone()),
            reader_user(),
            create_req("Sneaky", "Not allowed."),
        )
        .await
        .err()
        .expect("readers must not create blogs");
        assert_eq!(err.0, StatusCode::FORBIDDEN);
        // Rejected before any classifier or store call.
        assert!(classifier.calls().is_empty());

        let blog = create_blog_as_admin(&state, "Kept", "Body.").await;
        let err = delete_blog_handler(
            State(state.clone()),
            reader_user(),
            Path(blog.id),
        )
        .await
        .err()
        .expect("readers must not delete blogs");
        assert_eq!(err.0, StatusCode::FORBIDDEN);
        assert_eq!(db.blog(blog.id).id, blog.id);
    }

    #[tokio::test]
    async fn duplicate_titles_get_a_suffixed_slug() {
        let db = Arc::new(MockDb::new());
        let classifier = Arc::new(MockClassifier::new());
        let state = test_state(db.clone(), classifier);

        let first = create_blog_as_admin(&state, "Same Title", "One.").await;
        let second = create_blog_as_admin(&state, "Same Title", "Two.").await;
        assert_eq!(first.slug, "same-title");
        assert!(second.slug.starts_with("same-title-"));
        assert_ne!(first.slug, second.slug);
    }

    #[tokio::test]
    async fn day_buckets_accumulate_independently() {
        let db = Arc::new(MockDb::new());
        let classifier = Arc::new(MockClassifier::new().with_verdict(Verdict::Approved));
        let state = test_state(db.clone(), classifier);

        let blog = create_blog_as_admin(&state, "Counted", "Body.").await;
        let day1: NaiveDate = "2026-08-06".parse().unwrap();
        let day2: NaiveDate = "2026-08-07".parse().unwrap();
        for _ in 0..3 {
            db.record_blog_view(blog.id, day1).await.unwrap();
        }
        for _ in 0..2 {
            db.record_blog_view(blog.id, day2).await.unwrap();
        }

        let stats: BlogStatsResponse = {
            let response = blog_stats_handler(
                State(state.clone()),
                admin_user(),
                Path(blog.id),
            )
            .await
            .unwrap()
            .into_response();
            crate::testing::json_body(response).await
        };
        assert_eq!(stats.views, 5);
        assert_eq!(stats.views_by_day.len(), 2);
        assert_eq!(stats.views_by_day[0].day, day1);
        assert_eq!(stats.views_by_day[0].views, 3);
        assert_eq!(stats.views_by_day[1].day, day2);
        assert_eq!(stats.views_by_day[1].views, 2);
    }

    #[tokio::test]
    async fn concurrent_views_are_never_lost() {
        let db = Arc::new(MockDb::new());
        let classifier = Arc::new(MockClassifier::new().with_verdict(Verdict::Approved));
        let state = test_state(db.clone(), classifier);

        let blog = create_blog_as_admin(&state, "Hot post", "Body.").await;
        let day: NaiveDate = "2026-08-07".parse().unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let db = db.clone();
            let id = blog.id;
            handles.push(tokio::spawn(async move {
                db.record_blog_view(id, day).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = db.blog(blog.id);
        assert_eq!(stored.views, 50);
        assert_eq!(db.daily_views(blog.id, day), 50);
    }

    #[tokio::test]
    async fn public_read_counts_a_view_and_hides_unpublished_posts() {
        let db = Arc::new(MockDb::new());
        let classifier = Arc::new(MockClassifier::new().with_verdict(Verdict::Approved));
        let state = test_state(db.clone(), classifier);

        let blog = create_blog_as_admin(&state, "Readable", "Body.").await;

        // Not published yet: the public read 404s and counts nothing.
        let err = get_blog_handler(State(state.clone()), Path(blog.slug.clone()))
            .await
            .err()
            .expect("unpublished blogs are not publicly readable");
        assert_eq!(err.0, StatusCode::NOT_FOUND);
        assert_eq!(db.blog(blog.id).views, 0);

        publish_blog_handler(
            State(state.clone()),
            admin_user(),
            Path(blog.id),
        )
        .await
        .unwrap();

        for _ in 0..3 {
            get_blog_handler(State(state.clone()), Path(blog.slug.clone()))
                .await
                .expect("published blog should be readable");
        }
        assert_eq!(db.blog(blog.id).views, 3);
    }
}
