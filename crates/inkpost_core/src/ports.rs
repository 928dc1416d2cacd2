//! crates/inkpost_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the platform's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::analytics::{BlogDayViews, BlogViewTotal};
use crate::domain::{
    Blog, BrowserClass, Comment, ContentStatus, DailyViews, DeviceClass, Role, User,
    UserCredentials, VisitorEvent,
};
use crate::moderation::Verdict;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Port Input Types
//=========================================================================================

/// Everything needed to persist a new blog post. The status and reason are
/// computed by the moderation gate before the store is touched.
#[derive(Debug, Clone)]
pub struct NewBlog {
    pub slug: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub status: ContentStatus,
    pub flagged_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub blog_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub status: ContentStatus,
    pub flagged_reason: Option<String>,
}

/// An unrecorded page view, classified at creation time.
#[derive(Debug, Clone)]
pub struct NewVisitorEvent {
    pub ip: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub path: String,
    pub session_id: Option<String>,
    pub device: DeviceClass,
    pub browser: BrowserClass,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Accounts and Auth ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a session id to the user it belongs to, rejecting expired sessions.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<User>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Blogs ---
    async fn create_blog(&self, new_blog: NewBlog) -> PortResult<Blog>;

    async fn get_blog(&self, blog_id: Uuid) -> PortResult<Blog>;

    async fn get_blog_by_slug(&self, slug: &str) -> PortResult<Blog>;

    /// Public listing: published, approved blogs, newest first. Returns the
    /// page of blogs plus the total count of listable blogs.
    async fn list_published_blogs(&self, page: u32, per_page: u32)
        -> PortResult<(Vec<Blog>, i64)>;

    async fn list_blogs_by_status(&self, status: ContentStatus) -> PortResult<Vec<Blog>>;

    /// Replaces the editable fields along with the re-moderated status/reason.
    async fn update_blog_content(
        &self,
        blog_id: Uuid,
        title: &str,
        body: &str,
        tags: &[String],
        status: ContentStatus,
        flagged_reason: Option<&str>,
    ) -> PortResult<Blog>;

    /// The admin state-machine operation: any of the four statuses may be set.
    async fn update_blog_status(
        &self,
        blog_id: Uuid,
        status: ContentStatus,
        moderation_notes: Option<&str>,
    ) -> PortResult<Blog>;

    /// Sets `published = true` only if the blog's current status is
    /// `approved` (a single compare-and-set against the stored row).
    /// Returns `Conflict` when the blog exists but is not approved.
    async fn publish_blog(&self, blog_id: Uuid) -> PortResult<Blog>;

    async fn unpublish_blog(&self, blog_id: Uuid) -> PortResult<Blog>;

    async fn delete_blog(&self, blog_id: Uuid) -> PortResult<()>;

    // --- View Counter ---
    /// Adds one hit to the blog's lifetime counter and to the given day's
    /// bucket. Both increments must be atomic in-store operations, never
    /// read-modify-write.
    async fn record_blog_view(&self, blog_id: Uuid, day: NaiveDate) -> PortResult<()>;

    async fn get_blog_daily_views(&self, blog_id: Uuid) -> PortResult<Vec<DailyViews>>;

    // --- Comments ---
    async fn create_comment(&self, new_comment: NewComment) -> PortResult<Comment>;

    async fn list_comments_for_blog(
        &self,
        blog_id: Uuid,
        status: ContentStatus,
    ) -> PortResult<Vec<Comment>>;

    async fn list_comments_by_status(&self, status: ContentStatus) -> PortResult<Vec<Comment>>;

    async fn update_comment_status(
        &self,
        comment_id: Uuid,
        status: ContentStatus,
        moderation_notes: Option<&str>,
    ) -> PortResult<Comment>;

    async fn delete_comment(&self, comment_id: Uuid) -> PortResult<()>;

    // --- Visitor Events and Analytics Reads ---
    async fn record_visitor_event(&self, event: NewVisitorEvent) -> PortResult<()>;

    /// All visitor events on or after `since` (all of them for `None`).
    async fn visitor_events_since(&self, since: Option<NaiveDate>)
        -> PortResult<Vec<VisitorEvent>>;

    /// Per-blog, per-day view rows on or after `since`.
    async fn daily_views_since(&self, since: Option<NaiveDate>) -> PortResult<Vec<BlogDayViews>>;

    /// Lifetime view totals for every blog.
    async fn blog_view_totals(&self) -> PortResult<Vec<BlogViewTotal>>;
}

/// The external content classifier consumed by the moderation gate.
/// Treated as a black box; no retry or backoff is layered on top.
#[async_trait]
pub trait ContentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> PortResult<Verdict>;
}

#[async_trait]
pub trait DraftService: Send + Sync {
    /// Generates a post draft in markdown for the given topic.
    async fn generate_draft(&self, topic: &str, notes: Option<&str>) -> PortResult<String>;
}

#[async_trait]
pub trait SummaryService: Send + Sync {
    /// Produces a short reader-facing summary of a post body.
    async fn summarize(&self, text: &str) -> PortResult<String>;
}

#[async_trait]
pub trait TagSuggestionService: Send + Sync {
    /// Suggests topic tags for a post body.
    async fn suggest_tags(&self, text: &str) -> PortResult<Vec<String>>;
}

#[async_trait]
pub trait SeoService: Send + Sync {
    /// Writes a search-engine meta description for a post.
    async fn meta_description(&self, title: &str, text: &str) -> PortResult<String>;
}
