//! crates/inkpost_core/src/domain.rs
//!
//! Defines the pure, core data structures for the platform.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

//=========================================================================================
// Accounts
//=========================================================================================

/// The role claim attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Reader,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Reader => "reader",
        }
    }

    /// Parses the persisted role string. Unknown values degrade to `Reader`.
    pub fn parse(s: &str) -> Role {
        match s {
            "admin" => Role::Admin,
            _ => Role::Reader,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Represents a user account - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

// Only used internally for login/signup - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
    pub role: Role,
}

// Represents a browser login session (auth cookie).
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Moderated content
//=========================================================================================

/// The persisted lifecycle state of a piece of content.
///
/// Every blog and comment carries exactly one of these at all times; new
/// content is never created without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStatus {
    Pending,
    Approved,
    Rejected,
    Flagged,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Pending => "pending",
            ContentStatus::Approved => "approved",
            ContentStatus::Rejected => "rejected",
            ContentStatus::Flagged => "flagged",
        }
    }

    pub fn parse(s: &str) -> Option<ContentStatus> {
        match s {
            "pending" => Some(ContentStatus::Pending),
            "approved" => Some(ContentStatus::Approved),
            "rejected" => Some(ContentStatus::Rejected),
            "flagged" => Some(ContentStatus::Flagged),
            _ => None,
        }
    }
}

/// A blog post. `views` is the lifetime hit counter; the per-day buckets
/// live in their own `DailyViews` rows keyed by calendar date.
#[derive(Debug, Clone)]
pub struct Blog {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub status: ContentStatus,
    pub flagged_reason: Option<String>,
    pub moderation_notes: Option<String>,
    pub published: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reader comment attached to a blog post.
#[derive(Debug, Clone)]
pub struct Comment {
    pub id: Uuid,
    pub blog_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub status: ContentStatus,
    pub flagged_reason: Option<String>,
    pub moderation_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One day bucket of a blog's view counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyViews {
    pub day: NaiveDate,
    pub views: i64,
}

//=========================================================================================
// Visitor events
//=========================================================================================

/// Coarse device class, stamped on a visitor event when it is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
        }
    }

    pub fn parse(s: &str) -> DeviceClass {
        match s {
            "mobile" => DeviceClass::Mobile,
            "tablet" => DeviceClass::Tablet,
            _ => DeviceClass::Desktop,
        }
    }
}

/// Coarse browser class, stamped on a visitor event when it is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrowserClass {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Opera,
    Other,
}

impl BrowserClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserClass::Chrome => "chrome",
            BrowserClass::Firefox => "firefox",
            BrowserClass::Safari => "safari",
            BrowserClass::Edge => "edge",
            BrowserClass::Opera => "opera",
            BrowserClass::Other => "other",
        }
    }

    pub fn parse(s: &str) -> BrowserClass {
        match s {
            "chrome" => BrowserClass::Chrome,
            "firefox" => BrowserClass::Firefox,
            "safari" => BrowserClass::Safari,
            "edge" => BrowserClass::Edge,
            "opera" => BrowserClass::Opera,
            _ => BrowserClass::Other,
        }
    }
}

/// One recorded page view. Append-only: never mutated, never deleted.
#[derive(Debug, Clone)]
pub struct VisitorEvent {
    pub id: i64,
    pub ip: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub path: String,
    pub session_id: Option<String>,
    pub device: DeviceClass,
    pub browser: BrowserClass,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Derives a URL slug from a blog title: lowercase, with runs of
/// non-alphanumeric characters collapsed into single hyphens.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "post".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_punctuation_and_whitespace() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust & Axum:  a tour  "), "rust-axum-a-tour");
    }

    #[test]
    fn slugify_never_returns_empty() {
        assert_eq!(slugify("!!!"), "post");
        assert_eq!(slugify(""), "post");
    }

    #[test]
    fn content_status_round_trips_through_storage_form() {
        for status in [
            ContentStatus::Pending,
            ContentStatus::Approved,
            ContentStatus::Rejected,
            ContentStatus::Flagged,
        ] {
            assert_eq!(ContentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ContentStatus::parse("deleted"), None);
    }

    #[test]
    fn unknown_role_degrades_to_reader() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("moderator"), Role::Reader);
    }
}
