pub mod db;
pub mod draft_llm;
pub mod moderation_llm;
pub mod seo_llm;
pub mod summary_llm;
pub mod tag_llm;

pub use db::DbAdapter;
pub use draft_llm::OpenAiDraftAdapter;
pub use moderation_llm::OpenAiModerationAdapter;
pub use seo_llm::OpenAiSeoAdapter;
pub use summary_llm::OpenAiSummaryAdapter;
pub use tag_llm::OpenAiTagAdapter;
