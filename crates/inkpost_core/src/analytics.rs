//! crates/inkpost_core/src/analytics.rs
//!
//! Read-side analytics aggregation. Everything here is a pure computation
//! over visitor events and per-day view rows fetched by the caller; the
//! aggregator holds no state of its own and is recomputed on every request.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::domain::{BrowserClass, DailyViews, DeviceClass, VisitorEvent};

//=========================================================================================
// Range Selection
//=========================================================================================

/// The time-range selector accepted by the analytics endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsRange {
    Last7Days,
    Last30Days,
    Last90Days,
    Lifetime,
}

impl AnalyticsRange {
    pub fn parse(s: &str) -> Option<AnalyticsRange> {
        match s {
            "7d" => Some(AnalyticsRange::Last7Days),
            "30d" => Some(AnalyticsRange::Last30Days),
            "90d" => Some(AnalyticsRange::Last90Days),
            "lifetime" => Some(AnalyticsRange::Lifetime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsRange::Last7Days => "7d",
            AnalyticsRange::Last30Days => "30d",
            AnalyticsRange::Last90Days => "90d",
            AnalyticsRange::Lifetime => "lifetime",
        }
    }

    /// First day inside the window, inclusive. `None` means unbounded.
    ///
    /// A window of N days covers the N calendar days ending at `today`, so
    /// anything older than N days falls outside it.
    pub fn start_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        let days = match self {
            AnalyticsRange::Last7Days => 7,
            AnalyticsRange::Last30Days => 30,
            AnalyticsRange::Last90Days => 90,
            AnalyticsRange::Lifetime => return None,
        };
        Some(today - Duration::days(days - 1))
    }
}

//=========================================================================================
// Read Models
//=========================================================================================

/// One per-blog, per-day view row, as fetched for aggregation.
#[derive(Debug, Clone)]
pub struct BlogDayViews {
    pub blog_id: Uuid,
    pub slug: String,
    pub title: String,
    pub day: NaiveDate,
    pub views: i64,
}

/// A blog's lifetime view total.
#[derive(Debug, Clone)]
pub struct BlogViewTotal {
    pub blog_id: Uuid,
    pub slug: String,
    pub title: String,
    pub views: i64,
}

/// One entry of the top-content ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopContent {
    pub blog_id: Uuid,
    pub slug: String,
    pub title: String,
    pub views: i64,
}

/// The full aggregation output for one analytics request.
#[derive(Debug, Clone)]
pub struct AnalyticsReport {
    pub range: AnalyticsRange,
    pub total_views: i64,
    pub unique_visitors: u64,
    pub views_by_day: Vec<DailyViews>,
    pub top_content: Vec<TopContent>,
    pub device_stats: Vec<(DeviceClass, u64)>,
    pub browser_stats: Vec<(BrowserClass, u64)>,
}

//=========================================================================================
// User-Agent Classification
//=========================================================================================

/// Coarse device classification, computed once when a visitor event is
/// recorded. Plain substring matching; never recomputed retroactively.
pub fn classify_device(user_agent: &str) -> DeviceClass {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("ipad") || ua.contains("tablet") {
        DeviceClass::Tablet
    } else if ua.contains("mobi") || ua.contains("iphone") || ua.contains("android") {
        DeviceClass::Mobile
    } else {
        DeviceClass::Desktop
    }
}

/// Coarse browser classification. Order matters: Edge and Opera embed
/// "Chrome" in their user agents, and Chrome embeds "Safari".
pub fn classify_browser(user_agent: &str) -> BrowserClass {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("edg") {
        BrowserClass::Edge
    } else if ua.contains("opr") || ua.contains("opera") {
        BrowserClass::Opera
    } else if ua.contains("chrome") {
        BrowserClass::Chrome
    } else if ua.contains("firefox") {
        BrowserClass::Firefox
    } else if ua.contains("safari") {
        BrowserClass::Safari
    } else {
        BrowserClass::Other
    }
}

//=========================================================================================
// Aggregation
//=========================================================================================

/// Recomputes the analytics report for one request.
///
/// - `events` is the visitor-event log (already cut down to the range by the
///   store where possible; re-filtered here so the window is authoritative).
/// - `daily` is the per-blog day-bucketed view rows.
/// - `totals` is every blog's lifetime counter, used for `lifetime` ranges.
pub fn aggregate(
    range: AnalyticsRange,
    today: NaiveDate,
    events: &[VisitorEvent],
    daily: &[BlogDayViews],
    totals: &[BlogViewTotal],
    top_n: usize,
) -> AnalyticsReport {
    let start = range.start_date(today);
    let in_window = |day: NaiveDate| start.map_or(true, |s| day >= s);

    // Visitor-event side: unique IPs, per-day page views, device/browser mix.
    let mut unique_ips: HashSet<&str> = HashSet::new();
    let mut page_views: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut devices: HashMap<DeviceClass, u64> = HashMap::new();
    let mut browsers: HashMap<BrowserClass, u64> = HashMap::new();
    for event in events {
        let day = event.created_at.date_naive();
        if !in_window(day) {
            continue;
        }
        unique_ips.insert(event.ip.as_str());
        *page_views.entry(day).or_default() += 1;
        *devices.entry(event.device).or_default() += 1;
        *browsers.entry(event.browser).or_default() += 1;
    }

    // Content side: total views and the top-N ranking.
    let (total_views, top_content) = if matches!(range, AnalyticsRange::Lifetime) {
        let total = totals.iter().map(|t| t.views).sum();
        let ranked = totals
            .iter()
            .map(|t| TopContent {
                blog_id: t.blog_id,
                slug: t.slug.clone(),
                title: t.title.clone(),
                views: t.views,
            })
            .collect();
        (total, ranked_top(ranked, top_n))
    } else {
        let mut per_blog: HashMap<Uuid, TopContent> = HashMap::new();
        let mut total = 0;
        for row in daily.iter().filter(|r| in_window(r.day)) {
            total += row.views;
            per_blog
                .entry(row.blog_id)
                .and_modify(|t| t.views += row.views)
                .or_insert_with(|| TopContent {
                    blog_id: row.blog_id,
                    slug: row.slug.clone(),
                    title: row.title.clone(),
                    views: row.views,
                });
        }
        (total, ranked_top(per_blog.into_values().collect(), top_n))
    };

    AnalyticsReport {
        range,
        total_views,
        unique_visitors: unique_ips.len() as u64,
        views_by_day: page_views
            .into_iter()
            .map(|(day, views)| DailyViews { day, views })
            .collect(),
        top_content,
        device_stats: sorted_counts(devices, DeviceClass::as_str),
        browser_stats: sorted_counts(browsers, BrowserClass::as_str),
    }
}

fn ranked_top(mut entries: Vec<TopContent>, top_n: usize) -> Vec<TopContent> {
    entries.sort_by(|a, b| b.views.cmp(&a.views).then_with(|| a.slug.cmp(&b.slug)));
    entries.truncate(top_n);
    entries
}

fn sorted_counts<K: Copy>(counts: HashMap<K, u64>, name: fn(&K) -> &'static str) -> Vec<(K, u64)> {
    let mut stats: Vec<(K, u64)> = counts.into_iter().collect();
    stats.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| name(&a.0).cmp(name(&b.0))));
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn event_on(date: NaiveDate, ip: &str, user_agent: &str) -> VisitorEvent {
        VisitorEvent {
            id: 0,
            ip: ip.to_string(),
            user_agent: user_agent.to_string(),
            referer: None,
            path: "/blogs/some-post".to_string(),
            session_id: None,
            device: classify_device(user_agent),
            browser: classify_browser(user_agent),
            created_at: Utc
                .from_utc_datetime(&date.and_hms_opt(12, 0, 0).unwrap()),
        }
    }

    const CHROME_DESKTOP: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0 Safari/537.36";
    const SAFARI_IPHONE: &str =
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Version/17.0 Mobile/15E148 Safari/604.1";

    #[test]
    fn range_parsing_accepts_the_four_selectors() {
        assert_eq!(AnalyticsRange::parse("7d"), Some(AnalyticsRange::Last7Days));
        assert_eq!(AnalyticsRange::parse("30d"), Some(AnalyticsRange::Last30Days));
        assert_eq!(AnalyticsRange::parse("90d"), Some(AnalyticsRange::Last90Days));
        assert_eq!(AnalyticsRange::parse("lifetime"), Some(AnalyticsRange::Lifetime));
        assert_eq!(AnalyticsRange::parse("1y"), None);
    }

    #[test]
    fn seven_day_window_covers_the_last_seven_calendar_days() {
        let today = day("2026-08-07");
        assert_eq!(
            AnalyticsRange::Last7Days.start_date(today),
            Some(day("2026-08-01"))
        );
        assert_eq!(AnalyticsRange::Lifetime.start_date(today), None);
    }

    #[test]
    fn device_classification_is_a_substring_match() {
        assert_eq!(classify_device(CHROME_DESKTOP), DeviceClass::Desktop);
        assert_eq!(classify_device(SAFARI_IPHONE), DeviceClass::Mobile);
        assert_eq!(
            classify_device("Mozilla/5.0 (iPad; CPU OS 17_0) Safari/604.1"),
            DeviceClass::Tablet
        );
    }

    #[test]
    fn browser_classification_disambiguates_chromium_family() {
        assert_eq!(classify_browser(CHROME_DESKTOP), BrowserClass::Chrome);
        assert_eq!(
            classify_browser("Mozilla/5.0 (Windows) Chrome/120.0 Safari/537.36 Edg/120.0"),
            BrowserClass::Edge
        );
        assert_eq!(
            classify_browser("Mozilla/5.0 (Windows) Chrome/120.0 Safari/537.36 OPR/106.0"),
            BrowserClass::Opera
        );
        assert_eq!(classify_browser(SAFARI_IPHONE), BrowserClass::Safari);
        assert_eq!(
            classify_browser("Mozilla/5.0 (X11; Linux) Gecko/20100101 Firefox/121.0"),
            BrowserClass::Firefox
        );
        assert_eq!(classify_browser("curl/8.4.0"), BrowserClass::Other);
    }

    #[test]
    fn seven_day_range_excludes_older_events_and_day_rows() {
        let today = day("2026-08-07");
        let blog_id = Uuid::new_v4();
        let events = vec![
            event_on(day("2026-08-06"), "10.0.0.1", CHROME_DESKTOP),
            event_on(day("2026-08-06"), "10.0.0.1", CHROME_DESKTOP),
            event_on(day("2026-07-20"), "10.0.0.2", SAFARI_IPHONE),
        ];
        let daily = vec![
            BlogDayViews {
                blog_id,
                slug: "fresh".into(),
                title: "Fresh".into(),
                day: day("2026-08-06"),
                views: 2,
            },
            BlogDayViews {
                blog_id,
                slug: "fresh".into(),
                title: "Fresh".into(),
                day: day("2026-07-20"),
                views: 40,
            },
        ];
        let totals = vec![BlogViewTotal {
            blog_id,
            slug: "fresh".into(),
            title: "Fresh".into(),
            views: 42,
        }];

        let report = aggregate(AnalyticsRange::Last7Days, today, &events, &daily, &totals, 5);
        assert_eq!(report.total_views, 2);
        assert_eq!(report.unique_visitors, 1);
        assert_eq!(report.views_by_day, vec![DailyViews { day: day("2026-08-06"), views: 2 }]);
        assert_eq!(report.top_content.len(), 1);
        assert_eq!(report.top_content[0].views, 2);
        assert_eq!(report.device_stats, vec![(DeviceClass::Desktop, 2)]);
        assert_eq!(report.browser_stats, vec![(BrowserClass::Chrome, 2)]);
    }

    #[test]
    fn lifetime_range_includes_everything_and_uses_total_counters() {
        let today = day("2026-08-07");
        let blog_id = Uuid::new_v4();
        let events = vec![
            event_on(day("2026-08-06"), "10.0.0.1", CHROME_DESKTOP),
            event_on(day("2026-07-20"), "10.0.0.2", SAFARI_IPHONE),
        ];
        let totals = vec![BlogViewTotal {
            blog_id,
            slug: "fresh".into(),
            title: "Fresh".into(),
            views: 42,
        }];

        let report = aggregate(AnalyticsRange::Lifetime, today, &events, &[], &totals, 5);
        assert_eq!(report.total_views, 42);
        assert_eq!(report.unique_visitors, 2);
        assert_eq!(report.views_by_day.len(), 2);
        assert_eq!(report.top_content[0].views, 42);
    }

    #[test]
    fn top_content_ranks_by_views_within_the_window() {
        let today = day("2026-08-07");
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let daily = vec![
            BlogDayViews {
                blog_id: a,
                slug: "a".into(),
                title: "A".into(),
                day: day("2026-08-05"),
                views: 3,
            },
            BlogDayViews {
                blog_id: b,
                slug: "b".into(),
                title: "B".into(),
                day: day("2026-08-05"),
                views: 7,
            },
            BlogDayViews {
                blog_id: b,
                slug: "b".into(),
                title: "B".into(),
                day: day("2026-08-06"),
                views: 1,
            },
            // Outside the window; must not count toward the ranking.
            BlogDayViews {
                blog_id: a,
                slug: "a".into(),
                title: "A".into(),
                day: day("2026-01-01"),
                views: 100,
            },
        ];

        let report = aggregate(AnalyticsRange::Last7Days, today, &[], &daily, &[], 1);
        assert_eq!(report.top_content.len(), 1);
        assert_eq!(report.top_content[0].slug, "b");
        assert_eq!(report.top_content[0].views, 8);
        assert_eq!(report.total_views, 11);
    }
}
