//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use inkpost_core::analytics::{BlogDayViews, BlogViewTotal};
use inkpost_core::domain::{
    Blog, BrowserClass, Comment, ContentStatus, DailyViews, DeviceClass, Role, User,
    UserCredentials, VisitorEvent,
};
use inkpost_core::ports::{
    DatabaseService, NewBlog, NewComment, NewVisitorEvent, PortError, PortResult,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a sqlx error onto the port taxonomy: missing rows become `NotFound`,
/// unique-constraint violations become `Conflict`, the rest is `Unexpected`.
fn store_error(e: sqlx::Error, what: &str) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what.to_string()),
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            PortError::Conflict(format!("{} already exists", what))
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn parse_status(raw: &str) -> PortResult<ContentStatus> {
    ContentStatus::parse(raw)
        .ok_or_else(|| PortError::Unexpected(format!("invalid stored status '{}'", raw)))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: String,
    role: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
            role: Role::parse(&self.role),
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
    role: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
            role: Role::parse(&self.role),
        }
    }
}

#[derive(FromRow)]
struct BlogRecord {
    id: Uuid,
    slug: String,
    title: String,
    body: String,
    tags: Vec<String>,
    author_id: Uuid,
    status: String,
    flagged_reason: Option<String>,
    moderation_notes: Option<String>,
    published: bool,
    views: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl BlogRecord {
    fn to_domain(self) -> PortResult<Blog> {
        Ok(Blog {
            id: self.id,
            slug: self.slug,
            title: self.title,
            body: self.body,
            tags: self.tags,
            author_id: self.author_id,
            status: parse_status(&self.status)?,
            flagged_reason: self.flagged_reason,
            moderation_notes: self.moderation_notes,
            published: self.published,
            views: self.views,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const BLOG_COLUMNS: &str = "id, slug, title, body, tags, author_id, status, flagged_reason, \
                            moderation_notes, published, views, created_at, updated_at";

#[derive(FromRow)]
struct CommentRecord {
    id: Uuid,
    blog_id: Uuid,
    author_id: Uuid,
    body: String,
    status: String,
    flagged_reason: Option<String>,
    moderation_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl CommentRecord {
    fn to_domain(self) -> PortResult<Comment> {
        Ok(Comment {
            id: self.id,
            blog_id: self.blog_id,
            author_id: self.author_id,
            body: self.body,
            status: parse_status(&self.status)?,
            flagged_reason: self.flagged_reason,
            moderation_notes: self.moderation_notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const COMMENT_COLUMNS: &str = "id, blog_id, author_id, body, status, flagged_reason, \
                               moderation_notes, created_at, updated_at";

#[derive(FromRow)]
struct DailyViewsRecord {
    day: NaiveDate,
    views: i64,
}

#[derive(FromRow)]
struct BlogDayViewsRecord {
    blog_id: Uuid,
    slug: String,
    title: String,
    day: NaiveDate,
    views: i64,
}

#[derive(FromRow)]
struct BlogViewTotalRecord {
    blog_id: Uuid,
    slug: String,
    title: String,
    views: i64,
}

#[derive(FromRow)]
struct VisitorEventRecord {
    id: i64,
    ip: String,
    user_agent: String,
    referer: Option<String>,
    path: String,
    session_id: Option<String>,
    device: String,
    browser: String,
    created_at: DateTime<Utc>,
}
impl VisitorEventRecord {
    fn to_domain(self) -> VisitorEvent {
        VisitorEvent {
            id: self.id,
            ip: self.ip,
            user_agent: self.user_agent,
            referer: self.referer,
            path: self.path,
            session_id: self.session_id,
            device: DeviceClass::parse(&self.device),
            browser: BrowserClass::parse(&self.browser),
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "INSERT INTO users (user_id, email, hashed_password, role) \
             VALUES ($1, $2, $3, $4) RETURNING user_id, email, role",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, &format!("user {}", email)))?;
        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT user_id, email, hashed_password, role FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, &format!("user {}", email)))?;
        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, "auth session"))?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT u.user_id, u.email, u.role FROM auth_sessions s \
             JOIN users u ON u.user_id = s.user_id \
             WHERE s.id = $1 AND s.expires_at > now()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| store_error(e, "auth session"))?;
        Ok(())
    }

    async fn create_blog(&self, new_blog: NewBlog) -> PortResult<Blog> {
        let record = sqlx::query_as::<_, BlogRecord>(&format!(
            "INSERT INTO blogs (id, slug, title, body, tags, author_id, status, flagged_reason) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            BLOG_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_blog.slug)
        .bind(&new_blog.title)
        .bind(&new_blog.body)
        .bind(&new_blog.tags)
        .bind(new_blog.author_id)
        .bind(new_blog.status.as_str())
        .bind(&new_blog.flagged_reason)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, &format!("blog slug '{}'", new_blog.slug)))?;
        record.to_domain()
    }

    async fn get_blog(&self, blog_id: Uuid) -> PortResult<Blog> {
        let record = sqlx::query_as::<_, BlogRecord>(&format!(
            "SELECT {} FROM blogs WHERE id = $1",
            BLOG_COLUMNS
        ))
        .bind(blog_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, &format!("blog {}", blog_id)))?;
        record.to_domain()
    }

    async fn get_blog_by_slug(&self, slug: &str) -> PortResult<Blog> {
        let record = sqlx::query_as::<_, BlogRecord>(&format!(
            "SELECT {} FROM blogs WHERE slug = $1",
            BLOG_COLUMNS
        ))
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, &format!("blog '{}'", slug)))?;
        record.to_domain()
    }

    async fn list_published_blogs(
        &self,
        page: u32,
        per_page: u32,
    ) -> PortResult<(Vec<Blog>, i64)> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);
        let records = sqlx::query_as::<_, BlogRecord>(&format!(
            "SELECT {} FROM blogs WHERE published AND status = 'approved' \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            BLOG_COLUMNS
        ))
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM blogs WHERE published AND status = 'approved'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let blogs = records
            .into_iter()
            .map(BlogRecord::to_domain)
            .collect::<PortResult<Vec<_>>>()?;
        Ok((blogs, total))
    }

    async fn list_blogs_by_status(&self, status: ContentStatus) -> PortResult<Vec<Blog>> {
        let records = sqlx::query_as::<_, BlogRecord>(&format!(
            "SELECT {} FROM blogs WHERE status = $1 ORDER BY created_at DESC",
            BLOG_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        records.into_iter().map(BlogRecord::to_domain).collect()
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
        let record = sqlx::query_as::<_, BlogRecord>(&format!(
            "UPDATE blogs SET title = $2, body = $3, tags = $4, status = $5, \
             flagged_reason = $6, updated_at = now() WHERE id = $1 RETURNING {}",
            BLOG_COLUMNS
        ))
        .bind(blog_id)
        .bind(title)
        .bind(body)
        .bind(tags)
        .bind(status.as_str())
        .bind(flagged_reason)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, &format!("blog {}", blog_id)))?;
        record.to_domain()
    }

    async fn update_blog_status(
        &self,
        blog_id: Uuid,
        status: ContentStatus,
        moderation_notes: Option<&str>,
    ) -> PortResult<Blog> {
        let record = sqlx::query_as::<_, BlogRecord>(&format!(
            "UPDATE blogs SET status = $2, moderation_notes = $3, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            BLOG_COLUMNS
        ))
        .bind(blog_id)
        .bind(status.as_str())
        .bind(moderation_notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, &format!("blog {}", blog_id)))?;
        record.to_domain()
    }

    async fn publish_blog(&self, blog_id: Uuid) -> PortResult<Blog> {
        // Single conditional update: the approval check and the flag flip are
        // one statement, so a concurrent status change cannot slip between them.
        let record = sqlx::query_as::<_, BlogRecord>(&format!(
            "UPDATE blogs SET published = TRUE, updated_at = now() \
             WHERE id = $1 AND status = 'approved' RETURNING {}",
            BLOG_COLUMNS
        ))
        .bind(blog_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match record {
            Some(record) => record.to_domain(),
            None => {
                // Distinguish "not approved" from "no such blog".
                let exists: Option<String> =
                    sqlx::query_scalar("SELECT status FROM blogs WHERE id = $1")
                        .bind(blog_id)
                        .fetch_optional(&self.pool)
                        .await
                        .map_err(|e| PortError::Unexpected(e.to_string()))?;
                match exists {
                    Some(status) => Err(PortError::Conflict(format!(
                        "blog {} is '{}', only approved blogs can be published",
                        blog_id, status
                    ))),
                    None => Err(PortError::NotFound(format!("blog {}", blog_id))),
                }
            }
        }
    }

    async fn unpublish_blog(&self, blog_id: Uuid) -> PortResult<Blog> {
        let record = sqlx::query_as::<_, BlogRecord>(&format!(
            "UPDATE blogs SET published = FALSE, updated_at = now() WHERE id = $1 RETURNING {}",
            BLOG_COLUMNS
        ))
        .bind(blog_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, &format!("blog {}", blog_id)))?;
        record.to_domain()
    }

    async fn delete_blog(&self, blog_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(blog_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("blog {}", blog_id)));
        }
        Ok(())
    }

    async fn record_blog_view(&self, blog_id: Uuid, day: NaiveDate) -> PortResult<()> {
        // Both counters are in-database increments; concurrent readers can
        // never lose an update the way a read-modify-write would.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let updated = sqlx::query("UPDATE blogs SET views = views + 1 WHERE id = $1")
            .bind(blog_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if updated.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("blog {}", blog_id)));
        }

        sqlx::query(
            "INSERT INTO blog_daily_views (blog_id, day, views) VALUES ($1, $2, 1) \
             ON CONFLICT (blog_id, day) DO UPDATE SET views = blog_daily_views.views + 1",
        )
        .bind(blog_id)
        .bind(day)
        .execute(&mut *tx)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn get_blog_daily_views(&self, blog_id: Uuid) -> PortResult<Vec<DailyViews>> {
        let records = sqlx::query_as::<_, DailyViewsRecord>(
            "SELECT day, views FROM blog_daily_views WHERE blog_id = $1 ORDER BY day",
        )
        .bind(blog_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records
            .into_iter()
            .map(|r| DailyViews {
                day: r.day,
                views: r.views,
            })
            .collect())
    }

    async fn create_comment(&self, new_comment: NewComment) -> PortResult<Comment> {
        let record = sqlx::query_as::<_, CommentRecord>(&format!(
            "INSERT INTO comments (id, blog_id, author_id, body, status, flagged_reason) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            COMMENT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(new_comment.blog_id)
        .bind(new_comment.author_id)
        .bind(&new_comment.body)
        .bind(new_comment.status.as_str())
        .bind(&new_comment.flagged_reason)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, "comment"))?;
        record.to_domain()
    }

    async fn list_comments_for_blog(
        &self,
        blog_id: Uuid,
        status: ContentStatus,
    ) -> PortResult<Vec<Comment>> {
        let records = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {} FROM comments WHERE blog_id = $1 AND status = $2 ORDER BY created_at ASC",
            COMMENT_COLUMNS
        ))
        .bind(blog_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        records.into_iter().map(CommentRecord::to_domain).collect()
    }

    async fn list_comments_by_status(&self, status: ContentStatus) -> PortResult<Vec<Comment>> {
        let records = sqlx::query_as::<_, CommentRecord>(&format!(
            "SELECT {} FROM comments WHERE status = $1 ORDER BY created_at DESC",
            COMMENT_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        records.into_iter().map(CommentRecord::to_domain).collect()
    }

    async fn update_comment_status(
        &self,
        comment_id: Uuid,
        status: ContentStatus,
        moderation_notes: Option<&str>,
    ) -> PortResult<Comment> {
        let record = sqlx::query_as::<_, CommentRecord>(&format!(
            "UPDATE comments SET status = $2, moderation_notes = $3, updated_at = now() \
             WHERE id = $1 RETURNING {}",
            COMMENT_COLUMNS
        ))
        .bind(comment_id)
        .bind(status.as_str())
        .bind(moderation_notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| store_error(e, &format!("comment {}", comment_id)))?;
        record.to_domain()
    }

    async fn delete_comment(&self, comment_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("comment {}", comment_id)));
        }
        Ok(())
    }

    async fn record_visitor_event(&self, event: NewVisitorEvent) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO visitor_events (ip, user_agent, referer, path, session_id, device, browser) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&event.ip)
        .bind(&event.user_agent)
        .bind(&event.referer)
        .bind(&event.path)
        .bind(&event.session_id)
        .bind(event.device.as_str())
        .bind(event.browser.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn visitor_events_since(
        &self,
        since: Option<NaiveDate>,
    ) -> PortResult<Vec<VisitorEvent>> {
        let records = sqlx::query_as::<_, VisitorEventRecord>(
            "SELECT id, ip, user_agent, referer, path, session_id, device, browser, created_at \
             FROM visitor_events WHERE $1::date IS NULL OR created_at::date >= $1 \
             ORDER BY created_at",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(VisitorEventRecord::to_domain).collect())
    }

    async fn daily_views_since(&self, since: Option<NaiveDate>) -> PortResult<Vec<BlogDayViews>> {
        let records = sqlx::query_as::<_, BlogDayViewsRecord>(
            "SELECT d.blog_id, b.slug, b.title, d.day, d.views \
             FROM blog_daily_views d JOIN blogs b ON b.id = d.blog_id \
             WHERE $1::date IS NULL OR d.day >= $1 ORDER BY d.day",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records
            .into_iter()
            .map(|r| BlogDayViews {
                blog_id: r.blog_id,
                slug: r.slug,
                title: r.title,
                day: r.day,
                views: r.views,
            })
            .collect())
    }

    async fn blog_view_totals(&self) -> PortResult<Vec<BlogViewTotal>> {
        let records = sqlx::query_as::<_, BlogViewTotalRecord>(
            "SELECT id AS blog_id, slug, title, views FROM blogs ORDER BY views DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records
            .into_iter()
            .map(|r| BlogViewTotal {
                blog_id: r.blog_id,
                slug: r.slug,
                title: r.title,
                views: r.views,
            })
            .collect())
    }
}
