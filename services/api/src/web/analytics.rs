//! services/api/src/web/analytics.rs
//!
//! The admin analytics endpoint. Aggregation is recomputed from the visitor
//! event log and the per-day view rows on every request; there is no cache
//! and no rollup store.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Local, NaiveDate};
use inkpost_core::analytics::{aggregate, AnalyticsRange};
use inkpost_core::ports::DatabaseService;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::middleware::CurrentUser;
use crate::web::port_error_response;
use crate::web::state::AppState;

/// How many entries the top-content ranking returns.
const TOP_CONTENT_LIMIT: usize = 5;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, IntoParams)]
pub struct AnalyticsQuery {
    /// One of `7d`, `30d`, `90d`, `lifetime`. Defaults to `7d`.
    pub range: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DayCountEntry {
    pub day: NaiveDate,
    pub views: i64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TopContentEntry {
    pub blog_id: Uuid,
    pub slug: String,
    pub title: String,
    pub views: i64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AnalyticsResponse {
    pub range: String,
    pub total_views: i64,
    pub unique_visitors: u64,
    pub views_by_day: Vec<DayCountEntry>,
    pub top_content: Vec<TopContentEntry>,
    pub device_stats: Vec<NamedCount>,
    pub browser_stats: Vec<NamedCount>,
}

//=========================================================================================
// Handler
//=========================================================================================

/// Recompute the analytics report for the requested range.
#[utoipa::path(
    get,
    path = "/admin/analytics",
    responses(
        (status = 200, description = "Aggregated analytics for the range", body = AnalyticsResponse),
        (status = 400, description = "Unknown range selector"),
        (status = 403, description = "Caller is not an admin")
    ),
    params(AnalyticsQuery)
)]
pub async fn get_analytics_handler(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(query): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    user.require_admin()?;

    let raw_range = query.range.as_deref().unwrap_or("7d");
    let range = AnalyticsRange::parse(raw_range).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("'{}' is not a valid range (7d, 30d, 90d, lifetime)", raw_range),
        )
    })?;

    let today = Local::now().date_naive();
    let since = range.start_date(today);

    let events = state
        .db
        .visitor_events_since(since)
        .await
        .map_err(port_error_response)?;
    let daily = state
        .db
        .daily_views_since(since)
        .await
        .map_err(port_error_response)?;
    let totals = state
        .db
        .blog_view_totals()
        .await
        .map_err(port_error_response)?;

    let report = aggregate(range, today, &events, &daily, &totals, TOP_CONTENT_LIMIT);

    Ok(Json(AnalyticsResponse {
        range: report.range.as_str().to_string(),
        total_views: report.total_views,
        unique_visitors: report.unique_visitors,
        views_by_day: report
            .views_by_day
            .into_iter()
            .map(|d| DayCountEntry {
                day: d.day,
                views: d.views,
            })
            .collect(),
        top_content: report
            .top_content
            .into_iter()
            .map(|t| TopContentEntry {
                blog_id: t.blog_id,
                slug: t.slug,
                title: t.title,
                views: t.views,
            })
            .collect(),
        device_stats: report
            .device_stats
            .into_iter()
            .map(|(device, count)| NamedCount {
                name: device.as_str().to_string(),
                count,
            })
            .collect(),
        browser_stats: report
            .browser_stats
            .into_iter()
            .map(|(browser, count)| NamedCount {
                name: browser.as_str().to_string(),
                count,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        admin_user, json_body, published_blog, reader_user, test_state, MockClassifier, MockDb,
    };
    use chrono::{Duration, Utc};

    const CHROME: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";

    fn range_query(range: &str) -> Query<AnalyticsQuery> {
        Query(AnalyticsQuery {
            range: Some(range.to_string()),
        })
    }

    #[tokio::test]
    async fn seven_day_range_excludes_old_events_and_old_day_buckets() {
        let db = Arc::new(MockDb::new());
        let blog = published_blog(&db, "fresh-post");

        let now = Utc::now();
        db.seed_event(now - Duration::days(1), "10.0.0.1", CHROME);
        db.seed_event(now - Duration::days(1), "10.0.0.1", CHROME);
        db.seed_event(now - Duration::days(30), "10.0.0.2", CHROME);

        let today = Local::now().date_naive();
        db.record_blog_view(blog.id, today - Duration::days(1)).await.unwrap();
        db.record_blog_view(blog.id, today - Duration::days(30)).await.unwrap();

        let state = test_state(db.clone(), Arc::new(MockClassifier::new()));
        let response = get_analytics_handler(
            State(state.clone()),
            admin_user(),
            range_query("7d"),
        )
        .await
        .unwrap()
        .into_response();
        let report: AnalyticsResponse = json_body(response).await;

        assert_eq!(report.range, "7d");
        assert_eq!(report.unique_visitors, 1);
        assert_eq!(report.total_views, 1);
        assert_eq!(report.views_by_day.len(), 1);
        assert_eq!(report.views_by_day[0].views, 2);
        assert_eq!(report.top_content.len(), 1);
        assert_eq!(report.top_content[0].views, 1);
    }

    #[tokio::test]
    async fn lifetime_range_includes_everything() {
        let db = Arc::new(MockDb::new());
        let blog = published_blog(&db, "fresh-post");

        let now = Utc::now();
        db.seed_event(now - Duration::days(1), "10.0.0.1", CHROME);
        db.seed_event(now - Duration::days(30), "10.0.0.2", CHROME);

        let today = Local::now().date_naive();
        db.record_blog_view(blog.id, today - Duration::days(1)).await.unwrap();
        db.record_blog_view(blog.id, today - Duration::days(30)).await.unwrap();

        let state = test_state(db.clone(), Arc::new(MockClassifier::new()));
        let response = get_analytics_handler(
            State(state.clone()),
            admin_user(),
            range_query("lifetime"),
        )
        .await
        .unwrap()
        .into_response();
        let report: AnalyticsResponse = json_body(response).await;

        assert_eq!(report.unique_visitors, 2);
        assert_eq!(report.total_views, 2);
        assert_eq!(report.views_by_day.len(), 2);
        assert_eq!(report.device_stats[0].name, "desktop");
        assert_eq!(report.device_stats[0].count, 2);
        assert_eq!(report.browser_stats[0].name, "chrome");
    }

    #[tokio::test]
    async fn analytics_is_admin_only_and_validates_the_range() {
        let db = Arc::new(MockDb::new());
        let state = test_state(db.clone(), Arc::new(MockClassifier::new()));

        let err = get_analytics_handler(
            State(state.clone()),
            reader_user(),
            range_query("7d"),
        )
        .await
        .err()
        .expect("analytics is an admin surface");
        assert_eq!(err.0, StatusCode::FORBIDDEN);

        let err = get_analytics_handler(
            State(state.clone()),
            admin_user(),
            range_query("14d"),
        )
        .await
        .err()
        .expect("unknown ranges are rejected");
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }
}
