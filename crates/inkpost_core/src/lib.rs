pub mod analytics;
pub mod domain;
pub mod moderation;
pub mod ports;

pub use analytics::{AnalyticsRange, AnalyticsReport, BlogDayViews, BlogViewTotal, TopContent};
pub use domain::{
    AuthSession, Blog, BrowserClass, Comment, ContentStatus, DailyViews, DeviceClass, Role, User,
    UserCredentials, VisitorEvent,
};
pub use moderation::{ModerationOutcome, Verdict};
pub use ports::{
    ContentClassifier, DatabaseService, DraftService, NewBlog, NewComment, NewVisitorEvent,
    PortError, PortResult, SeoService, SummaryService, TagSuggestionService,
};
