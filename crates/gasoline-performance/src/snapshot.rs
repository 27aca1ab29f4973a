use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use gasoline_config::Limits;

use crate::entries::{Mark, Measure, MarkMeasureStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    Script,
    Style,
    Image,
    Fetch,
    Font,
    Other,
}

const FONT_EXTENSIONS: &[&str] = &["woff2", "woff", "ttf", "otf", "eot"];

/// Categorizes a resource-timing entry by `initiatorType`, falling back
/// to filename extension for fonts loaded via CSS `@font-face` (which
/// typically report `initiatorType: "css"`).
pub fn categorize(initiator_type: &str, url: &str) -> ResourceCategory {
    if FONT_EXTENSIONS.iter().any(|ext| url.ends_with(ext)) {
        return ResourceCategory::Font;
    }
    match initiator_type {
        "script" => ResourceCategory::Script,
        "link" | "css" => ResourceCategory::Style,
        "img" => ResourceCategory::Image,
        "fetch" | "xmlhttprequest" => ResourceCategory::Fetch,
        _ => ResourceCategory::Other,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAggregate {
    pub count: usize,
    pub total_duration: f64,
    pub total_bytes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowRequest {
    pub url: String,
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTiming {
    pub start_time: f64,
    pub duration: f64,
    pub dom_content_loaded: f64,
    pub load_event_end: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSample {
    pub url: String,
    pub initiator_type: String,
    pub duration: f64,
    pub transfer_size: f64,
}

const URL_TRUNCATE_LEN: usize = 80;

fn truncate_url(url: &str) -> String {
    if url.chars().count() <= URL_TRUNCATE_LEN {
        return url.to_string();
    }
    url.chars().take(URL_TRUNCATE_LEN).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    pub navigation: NavigationTiming,
    pub by_category: HashMap<ResourceCategory, CategoryAggregate>,
    pub top_slowest: Vec<SlowRequest>,
}

/// Builds a point-in-time performance snapshot (spec.md §4.11):
/// resource timing aggregated by category, plus the 3 slowest requests
/// with truncated URLs. Returns `None` when there is no navigation
/// entry to anchor the snapshot on.
pub fn capture_performance_snapshot(
    navigation: Option<NavigationTiming>,
    resources: &[ResourceSample],
) -> Option<PerformanceSnapshot> {
    let navigation = navigation?;

    let mut by_category: HashMap<ResourceCategory, CategoryAggregate> = HashMap::new();
    for r in resources {
        let cat = categorize(&r.initiator_type, &r.url);
        let agg = by_category.entry(cat).or_default();
        agg.count += 1;
        agg.total_duration += r.duration;
        agg.total_bytes += r.transfer_size;
    }

    let mut sorted: Vec<&ResourceSample> = resources.iter().collect();
    sorted.sort_by(|a, b| b.duration.partial_cmp(&a.duration).unwrap_or(std::cmp::Ordering::Equal));
    let top_slowest = sorted
        .into_iter()
        .take(3)
        .map(|r| SlowRequest {
            url: truncate_url(&r.url),
            duration: r.duration,
        })
        .collect();

    Some(PerformanceSnapshot {
        navigation,
        by_category,
        top_slowest,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPerformanceSnapshot {
    pub ts: String,
    pub marks: Vec<Mark>,
    pub measures: Vec<Measure>,
    pub navigation: Option<NavigationTiming>,
}

/// Error-time bounded snapshot: marks/measures from the last
/// `performance_window_ms` plus navigation timing, tagged with the
/// error's own `ts` (spec.md §4.11). `None` when disabled.
pub fn get_performance_snapshot_for_error(
    enabled: bool,
    error_ts: &str,
    now_ms: u64,
    store: &MarkMeasureStore,
    navigation: Option<NavigationTiming>,
    limits: &Limits,
) -> Option<ErrorPerformanceSnapshot> {
    if !enabled {
        return None;
    }
    let since = now_ms.saturating_sub(limits.performance_window_ms);
    Some(ErrorPerformanceSnapshot {
        ts: error_ts.to_string(),
        marks: store.marks_since(since),
        measures: store.measures_since(since),
        navigation,
    })
}
