//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification. The handlers
//! themselves live in the sibling modules; this collects their annotated
//! paths and schemas into one document.

use utoipa::OpenApi;

use crate::web::analytics::{
    AnalyticsResponse, DayCountEntry, NamedCount, TopContentEntry,
};
use crate::web::assist::{
    DraftRequest, DraftResponse, SeoRequest, SeoResponse, SummaryRequest, SummaryResponse,
    TagsRequest, TagsResponse,
};
use crate::web::auth::{AuthResponse, LoginRequest, SignupRequest};
use crate::web::blogs::{
    BlogListResponse, BlogResponse, BlogStatsResponse, CreateBlogRequest, DayViewsEntry,
    UpdateBlogRequest,
};
use crate::web::comments::{CommentListResponse, CommentResponse, CreateCommentRequest};
use crate::web::moderation::{ModerationQueueResponse, UpdateStatusRequest};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        crate::web::blogs::list_blogs_handler,
        crate::web::blogs::get_blog_handler,
        crate::web::blogs::create_blog_handler,
        crate::web::blogs::update_blog_handler,
        crate::web::blogs::publish_blog_handler,
        crate::web::blogs::unpublish_blog_handler,
        crate::web::blogs::delete_blog_handler,
        crate::web::blogs::blog_stats_handler,
        crate::web::comments::create_comment_handler,
        crate::web::comments::list_comments_handler,
        crate::web::comments::delete_comment_handler,
        crate::web::moderation::moderation_queue_handler,
        crate::web::moderation::update_blog_status_handler,
        crate::web::moderation::update_comment_status_handler,
        crate::web::analytics::get_analytics_handler,
        crate::web::assist::draft_handler,
        crate::web::assist::summary_handler,
        crate::web::assist::tags_handler,
        crate::web::assist::seo_handler,
    ),
    components(
        schemas(
            SignupRequest,
            LoginRequest,
            AuthResponse,
            CreateBlogRequest,
            UpdateBlogRequest,
            BlogResponse,
            BlogListResponse,
            BlogStatsResponse,
            DayViewsEntry,
            CreateCommentRequest,
            CommentResponse,
            CommentListResponse,
            UpdateStatusRequest,
            ModerationQueueResponse,
            AnalyticsResponse,
            DayCountEntry,
            TopContentEntry,
            NamedCount,
            DraftRequest,
            DraftResponse,
            SummaryRequest,
            SummaryResponse,
            TagsRequest,
            TagsResponse,
            SeoRequest,
            SeoResponse,
        )
    ),
    tags(
        (name = "inkpost API", description = "A moderated blog platform: public reading, gated submissions, admin moderation and analytics.")
    )
)]
pub struct ApiDoc;
