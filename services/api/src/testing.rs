//! services/api/src/testing.rs
//!
//! Mock implementations for tests, injected through the same ports the
//! production adapters implement. The mock store keeps everything behind one
//! mutex and performs its counter increments under that lock, so the
//! concurrent-increment tests exercise the same "atomic per document"
//! contract the real store provides.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::Level;
use uuid::Uuid;

use inkpost_core::analytics::{classify_browser, classify_device, BlogDayViews, BlogViewTotal};
use inkpost_core::domain::{
    AuthSession, Blog, Comment, ContentStatus, DailyViews, Role, User, UserCredentials,
    VisitorEvent,
};
use inkpost_core::moderation::Verdict;
use inkpost_core::ports::{
    ContentClassifier, DatabaseService, DraftService, NewBlog, NewComment, NewVisitorEvent,
    PortError, PortResult, SeoService, SummaryService, TagSuggestionService,
};

use crate::config::Config;
use crate::web::middleware::CurrentUser;
use crate::web::state::AppState;

//=========================================================================================
// Mock Database
//=========================================================================================

#[derive(Default)]
struct MockDbState {
    users: HashMap<Uuid, UserCredentials>,
    sessions: HashMap<String, AuthSession>,
    blogs: HashMap<Uuid, Blog>,
    comments: HashMap<Uuid, Comment>,
    daily_views: HashMap<(Uuid, NaiveDate), i64>,
    events: Vec<VisitorEvent>,
    next_event_id: i64,
}

/// An in-memory `DatabaseService` with the same observable behavior as the
/// Postgres adapter: slug/email conflicts, the publish check-and-set, and
/// lost-update-free view increments.
pub struct MockDb {
    state: Mutex<MockDbState>,
}

impl MockDb {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockDbState::default()),
        }
    }

    /// Test accessor: the stored blog, panicking if absent.
    pub fn blog(&self, blog_id: Uuid) -> Blog {
        self.state
            .lock()
            .unwrap()
            .blogs
            .get(&blog_id)
            .expect("blog should exist")
            .clone()
    }

    /// Test accessor: one day bucket's count (0 if the key was never created).
    pub fn daily_views(&self, blog_id: Uuid, day: NaiveDate) -> i64 {
        *self
            .state
            .lock()
            .unwrap()
            .daily_views
            .get(&(blog_id, day))
            .unwrap_or(&0)
    }

    /// Seeds a visitor event with an explicit timestamp, for range tests.
    pub fn seed_event(&self, created_at: DateTime<Utc>, ip: &str, user_agent: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_event_id += 1;
        let event = VisitorEvent {
            id: state.next_event_id,
            ip: ip.to_string(),
            user_agent: user_agent.to_string(),
            referer: None,
            path: "/blogs/some-post".to_string(),
            session_id: None,
            device: classify_device(user_agent),
            browser: classify_browser(user_agent),
            created_at,
        };
        state.events.push(event);
    }

    fn seed_blog(&self, blog: Blog) -> Blog {
        self.state
            .lock()
            .unwrap()
            .blogs
            .insert(blog.id, blog.clone());
        blog
    }
}

#[async_trait]
impl DatabaseService for MockDb {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User> {
        let mut state = self.state.lock().unwrap();
        if state.users.values().any(|u| u.email == email) {
            return Err(PortError::Conflict(format!("user {} already exists", email)));
        }
        let creds = UserCredentials {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            role,
        };
        state.users.insert(creds.user_id, creds.clone());
        Ok(User {
            user_id: creds.user_id,
            email: creds.email,
            role: creds.role,
        })
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.state
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("user {}", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.state.lock().unwrap().sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<User> {
        let state = self.state.lock().unwrap();
        let session = state
            .sessions
            .get(session_id)
            .filter(|s| s.expires_at > Utc::now())
            .ok_or(PortError::Unauthorized)?;
        let creds = state
            .users
            .get(&session.user_id)
            .ok_or(PortError::Unauthorized)?;
        Ok(User {
            user_id: creds.user_id,
            email: creds.email.clone(),
            role: creds.role,
        })
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.state.lock().unwrap().sessions.remove(session_id);
        Ok(())
    }

    async fn create_blog(&self, new_blog: NewBlog) -> PortResult<Blog> {
        let mut state = self.state.lock().unwrap();
        if state.blogs.values().any(|b| b.slug == new_blog.slug) {
            return Err(PortError::Conflict(format!(
                "blog slug '{}' already exists",
                new_blog.slug
            )));
        }
        let now = Utc::now();
        let blog = Blog {
            id: Uuid::new_v4(),
            slug: new_blog.slug,
            title: new_blog.title,
            body: new_blog.body,
            tags: new_blog.tags,
            author_id: new_blog.author_id,
            status: new_blog.status,
            flagged_reason: new_blog.flagged_reason,
            moderation_notes: None,
            published: false,
            views: 0,
            created_at: now,
            updated_at: now,
        };
        state.blogs.insert(blog.id, blog.clone());
        Ok(blog)
    }

    async fn get_blog(&self, blog_id: Uuid) -> PortResult<Blog> {
        self.state
            .lock()
            .unwrap()
            .blogs
            .get(&blog_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("blog {}", blog_id)))
    }

    async fn get_blog_by_slug(&self, slug: &str) -> PortResult<Blog> {
        self.state
            .lock()
            .unwrap()
            .blogs
            .values()
            .find(|b| b.slug == slug)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("blog '{}'", slug)))
    }

    async fn list_published_blogs(
        &self,
        page: u32,
        per_page: u32,
    ) -> PortResult<(Vec<Blog>, i64)> {
        let state = self.state.lock().unwrap();
        let mut listable: Vec<Blog> = state
            .blogs
            .values()
            .filter(|b| b.published && b.status == ContentStatus::Approved)
            .cloned()
            .collect();
        listable.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = listable.len() as i64;
        let offset = (page.saturating_sub(1) as usize) * per_page as usize;
        let blogs = listable
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();
        Ok((blogs, total))
    }

    async fn list_blogs_by_status(&self, status: ContentStatus) -> PortResult<Vec<Blog>> {
        let state = self.state.lock().unwrap();
        let mut blogs: Vec<Blog> = state
            .blogs
            .values()
            .filter(|b| b.status == status)
            .cloned()
            .collect();
        blogs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(blogs)
    }

    async fn update_blog_content(
        &self,
        blog_id: Uuid,
        title: &str,
        body: &str,
        tags: &[String],
        status: ContentStatus,
        flagged_reason: Option<&str>,
    ) -> PortResult<Blog> {
        let mut state = self.state.lock().unwrap();
        let blog = state
            .blogs
            .get_mut(&blog_id)
            .ok_or_else(|| PortError::NotFound(format!("blog {}", blog_id)))?;
        blog.title = title.to_string();
        blog.body = body.to_string();
        blog.tags = tags.to_vec();
        blog.status = status;
        blog.flagged_reason = flagged_reason.map(str::to_string);
        blog.updated_at = Utc::now();
        Ok(blog.clone())
    }

    async fn update_blog_status(
        &self,
        blog_id: Uuid,
        status: ContentStatus,
        moderation_notes: Option<&str>,
    ) -> PortResult<Blog> {
        let mut state = self.state.lock().unwrap();
        let blog = state
            .blogs
            .get_mut(&blog_id)
            .ok_or_else(|| PortError::NotFound(format!("blog {}", blog_id)))?;
        blog.status = status;
        blog.moderation_notes = moderation_notes.map(str::to_string);
        blog.updated_at = Utc::now();
        Ok(blog.clone())
    }

    async fn publish_blog(&self, blog_id: Uuid) -> PortResult<Blog> {
        let mut state = self.state.lock().unwrap();
        let blog = state
            .blogs
            .get_mut(&blog_id)
            .ok_or_else(|| PortError::NotFound(format!("blog {}", blog_id)))?;
        if blog.status != ContentStatus::Approved {
            return Err(PortError::Conflict(format!(
                "blog {} is '{}', only approved blogs can be published",
                blog_id,
                blog.status.as_str()
            )));
        }
        blog.published = true;
        blog.updated_at = Utc::now();
        Ok(blog.clone())
    }

    async fn unpublish_blog(&self, blog_id: Uuid) -> PortResult<Blog> {
        let mut state = self.state.lock().unwrap();
        let blog = state
            .blogs
            .get_mut(&blog_id)
            .ok_or_else(|| PortError::NotFound(format!("blog {}", blog_id)))?;
        blog.published = false;
        blog.updated_at = Utc::now();
        Ok(blog.clone())
    }

    async fn delete_blog(&self, blog_id: Uuid) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .blogs
            .remove(&blog_id)
            .ok_or_else(|| PortError::NotFound(format!("blog {}", blog_id)))?;
        state.comments.retain(|_, c| c.blog_id != blog_id);
        state.daily_views.retain(|(id, _), _| *id != blog_id);
        Ok(())
    }

    async fn record_blog_view(&self, blog_id: Uuid, day: NaiveDate) -> PortResult<()> {
        // Both increments happen under one lock, mirroring the store's
        // atomic-per-document guarantee.
        let mut state = self.state.lock().unwrap();
        let blog = state
            .blogs
            .get_mut(&blog_id)
            .ok_or_else(|| PortError::NotFound(format!("blog {}", blog_id)))?;
        blog.views += 1;
        *state.daily_views.entry((blog_id, day)).or_insert(0) += 1;
        Ok(())
    }

    async fn get_blog_daily_views(&self, blog_id: Uuid) -> PortResult<Vec<DailyViews>> {
        let state = self.state.lock().unwrap();
        let mut daily: Vec<DailyViews> = state
            .daily_views
            .iter()
            .filter(|((id, _), _)| *id == blog_id)
            .map(|((_, day), views)| DailyViews {
                day: *day,
                views: *views,
            })
            .collect();
        daily.sort_by_key(|d| d.day);
        Ok(daily)
    }

    async fn create_comment(&self, new_comment: NewComment) -> PortResult<Comment> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            blog_id: new_comment.blog_id,
            author_id: new_comment.author_id,
            body: new_comment.body,
            status: new_comment.status,
            flagged_reason: new_comment.flagged_reason,
            moderation_notes: None,
            created_at: now,
            updated_at: now,
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn list_comments_for_blog(
        &self,
        blog_id: Uuid,
        status: ContentStatus,
    ) -> PortResult<Vec<Comment>> {
        let state = self.state.lock().unwrap();
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.blog_id == blog_id && c.status == status)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn list_comments_by_status(&self, status: ContentStatus) -> PortResult<Vec<Comment>> {
        let state = self.state.lock().unwrap();
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.status == status)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    async fn update_comment_status(
        &self,
        comment_id: Uuid,
        status: ContentStatus,
        moderation_notes: Option<&str>,
    ) -> PortResult<Comment> {
        let mut state = self.state.lock().unwrap();
        let comment = state
            .comments
            .get_mut(&comment_id)
            .ok_or_else(|| PortError::NotFound(format!("comment {}", comment_id)))?;
        comment.status = status;
        comment.moderation_notes = moderation_notes.map(str::to_string);
        comment.updated_at = Utc::now();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, comment_id: Uuid) -> PortResult<()> {
        self.state
            .lock()
            .unwrap()
            .comments
            .remove(&comment_id)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("comment {}", comment_id)))
    }

    async fn record_visitor_event(&self, event: NewVisitorEvent) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        state.next_event_id += 1;
        let stored = VisitorEvent {
            id: state.next_event_id,
            ip: event.ip,
            user_agent: event.user_agent,
            referer: event.referer,
            path: event.path,
            session_id: event.session_id,
            device: event.device,
            browser: event.browser,
            created_at: Utc::now(),
        };
        state.events.push(stored);
        Ok(())
    }

    async fn visitor_events_since(
        &self,
        since: Option<NaiveDate>,
    ) -> PortResult<Vec<VisitorEvent>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .events
            .iter()
            .filter(|e| since.map_or(true, |s| e.created_at.date_naive() >= s))
            .cloned()
            .collect())
    }

    async fn daily_views_since(&self, since: Option<NaiveDate>) -> PortResult<Vec<BlogDayViews>> {
        let state = self.state.lock().unwrap();
        let mut rows: Vec<BlogDayViews> = state
            .daily_views
            .iter()
            .filter(|((_, day), _)| since.map_or(true, |s| *day >= s))
            .filter_map(|((blog_id, day), views)| {
                state.blogs.get(blog_id).map(|blog| BlogDayViews {
                    blog_id: *blog_id,
                    slug: blog.slug.clone(),
                    title: blog.title.clone(),
                    day: *day,
                    views: *views,
                })
            })
            .collect();
        rows.sort_by_key(|r| r.day);
        Ok(rows)
    }

    async fn blog_view_totals(&self) -> PortResult<Vec<BlogViewTotal>> {
        let state = self.state.lock().unwrap();
        let mut totals: Vec<BlogViewTotal> = state
            .blogs
            .values()
            .map(|b| BlogViewTotal {
                blog_id: b.id,
                slug: b.slug.clone(),
                title: b.title.clone(),
                views: b.views,
            })
            .collect();
        totals.sort_by(|a, b| b.views.cmp(&a.views));
        Ok(totals)
    }
}

//=========================================================================================
// Mock Classifier
//=========================================================================================

/// A `ContentClassifier` with scripted replies and captured calls. Once the
/// script runs dry, everything is approved.
pub struct MockClassifier {
    script: Mutex<VecDeque<Result<Verdict, String>>>,
    calls: Mutex<Vec<String>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_verdict(self, verdict: Verdict) -> Self {
        self.script.lock().unwrap().push_back(Ok(verdict));
        self
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    /// The texts this classifier has been asked about, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentClassifier for MockClassifier {
    async fn classify(&self, text: &str) -> PortResult<Verdict> {
        self.calls.lock().unwrap().push(text.to_string());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(verdict)) => Ok(verdict),
            Some(Err(message)) => Err(PortError::Unexpected(message)),
            None => Ok(Verdict::Approved),
        }
    }
}

//=========================================================================================
// Canned Assist Adapters
//=========================================================================================

/// Stands in for all four writing-assist adapters.
pub struct CannedAssist;

#[async_trait]
impl DraftService for CannedAssist {
    async fn generate_draft(&self, topic: &str, _notes: Option<&str>) -> PortResult<String> {
        Ok(format!("## Draft\n\nA few paragraphs about {}.", topic))
    }
}

#[async_trait]
impl SummaryService for CannedAssist {
    async fn summarize(&self, _text: &str) -> PortResult<String> {
        Ok("A canned summary.".to_string())
    }
}

#[async_trait]
impl TagSuggestionService for CannedAssist {
    async fn suggest_tags(&self, _text: &str) -> PortResult<Vec<String>> {
        Ok(vec!["rust".to_string(), "testing".to_string()])
    }
}

#[async_trait]
impl SeoService for CannedAssist {
    async fn meta_description(&self, title: &str, _text: &str) -> PortResult<String> {
        Ok(format!("Everything about {}.", title))
    }
}

//=========================================================================================
// Shared Test Helpers
//=========================================================================================

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: Level::INFO,
        openai_api_key: None,
        moderation_model: "test-moderation".to_string(),
        assist_model: "test-assist".to_string(),
        moderation_timeout: std::time::Duration::from_secs(5),
        admin_emails: vec!["admin@example.org".to_string()],
        cors_origin: "http://localhost:3000".to_string(),
    }
}

pub fn test_state(db: Arc<MockDb>, classifier: Arc<MockClassifier>) -> Arc<AppState> {
    Arc::new(AppState {
        db,
        config: Arc::new(test_config()),
        classifier,
        draft_adapter: Arc::new(CannedAssist),
        summary_adapter: Arc::new(CannedAssist),
        tag_adapter: Arc::new(CannedAssist),
        seo_adapter: Arc::new(CannedAssist),
    })
}

pub fn admin_user() -> CurrentUser {
    CurrentUser {
        user_id: Uuid::new_v4(),
        email: "admin@example.org".to_string(),
        role: Role::Admin,
    }
}

pub fn reader_user() -> CurrentUser {
    CurrentUser {
        user_id: Uuid::new_v4(),
        email: "reader@example.org".to_string(),
        role: Role::Reader,
    }
}

/// Seeds an approved, published blog the public surface can see.
pub fn published_blog(db: &MockDb, slug: &str) -> Blog {
    let now = Utc::now();
    db.seed_blog(Blog {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        title: slug.replace('-', " "),
        body: "Seeded body.".to_string(),
        tags: vec![],
        author_id: Uuid::new_v4(),
        status: ContentStatus::Approved,
        flagged_reason: None,
        moderation_notes: None,
        published: true,
        views: 0,
        created_at: now,
        updated_at: now,
    })
}

/// Seeds a blog held in the review queue.
pub fn pending_blog(db: &MockDb, slug: &str, reason: &str) -> Blog {
    let now = Utc::now();
    db.seed_blog(Blog {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        title: slug.replace('-', " "),
        body: "Seeded body.".to_string(),
        tags: vec![],
        author_id: Uuid::new_v4(),
        status: ContentStatus::Pending,
        flagged_reason: Some(reason.to_string()),
        moderation_notes: None,
        published: false,
        views: 0,
        created_at: now,
        updated_at: now,
    })
}

/// Deserializes a handler's JSON response body.
pub async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should be readable");
    serde_json::from_slice(&bytes).expect("response body should be valid JSON")
}
