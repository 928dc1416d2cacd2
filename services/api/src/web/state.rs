//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use inkpost_core::ports::{
    ContentClassifier, DatabaseService, DraftService, SeoService, SummaryService,
    TagSuggestionService,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub classifier: Arc<dyn ContentClassifier>,
    pub draft_adapter: Arc<dyn DraftService>,
    pub summary_adapter: Arc<dyn SummaryService>,
    pub tag_adapter: Arc<dyn TagSuggestionService>,
    pub seo_adapter: Arc<dyn SeoService>,
}
