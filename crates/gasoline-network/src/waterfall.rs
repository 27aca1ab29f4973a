use serde::{Deserialize, Serialize};

use gasoline_config::Limits;

/// Host-agnostic projection of a `PerformanceResourceTiming` entry. The
/// `gasoline-web` crate builds these from `performance.getEntriesByType("resource")`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTimingEntry {
    pub name: String,
    pub initiator_type: String,
    pub start_time: f64,
    pub duration: f64,
    pub domain_lookup_start: f64,
    pub domain_lookup_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub secure_connection_start: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub response_end: f64,
    pub transfer_size: f64,
    pub encoded_body_size: f64,
    pub decoded_body_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phases {
    pub dns: f64,
    pub connect: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<f64>,
    pub ttfb: f64,
    pub download: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallEntry {
    pub url: String,
    pub initiator_type: String,
    pub start_time: f64,
    pub duration: f64,
    pub phases: Phases,
    pub transfer_size: f64,
    pub encoded_body_size: f64,
    pub decoded_body_size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

fn non_negative(v: f64) -> f64 {
    v.max(0.0)
}

/// Projects a single resource-timing entry into a [`WaterfallEntry`]
/// (spec.md §4.8). `tls` is only computed when `secureConnectionStart >
/// 0`; the cache-hit heuristic is `transferSize == 0 && encodedBodySize
/// > 0` (documented as occasionally wrong for service-worker-served
/// resources — spec.md §9 — and accepted as-is).
pub fn parse_resource_timing(entry: &ResourceTimingEntry) -> WaterfallEntry {
    let dns = non_negative(entry.domain_lookup_end - entry.domain_lookup_start);
    let connect = non_negative(entry.connect_end - entry.connect_start);
    let tls = if entry.secure_connection_start > 0.0 {
        Some(non_negative(entry.connect_end - entry.secure_connection_start))
    } else {
        None
    };
    let ttfb = non_negative(entry.response_start - entry.request_start);
    let download = non_negative(entry.response_end - entry.response_start);

    let cached = if entry.transfer_size == 0.0 && entry.encoded_body_size > 0.0 {
        Some(true)
    } else {
        None
    };

    WaterfallEntry {
        url: entry.name.clone(),
        initiator_type: entry.initiator_type.clone(),
        start_time: entry.start_time,
        duration: entry.duration,
        phases: Phases {
            dns,
            connect,
            tls,
            ttfb,
            download,
        },
        transfer_size: entry.transfer_size,
        encoded_body_size: entry.encoded_body_size,
        decoded_body_size: entry.decoded_body_size,
        cached,
    }
}

#[derive(Debug, Clone, Default)]
pub struct WaterfallQuery<'a> {
    pub since: Option<f64>,
    pub initiator_types: Option<&'a [String]>,
}

/// Reads, filters, sorts and caps resource-timing entries into a
/// waterfall snapshot (spec.md §4.8). Guarded to be fail-open: a
/// malformed entry is simply skipped rather than aborting the whole
/// snapshot (there is no host exception to catch in this host-agnostic
/// form, but the discipline is preserved for parity with the JS source).
pub fn get_network_waterfall(
    entries: &[ResourceTimingEntry],
    query: &WaterfallQuery,
    limits: &Limits,
) -> Vec<WaterfallEntry> {
    let mut filtered: Vec<&ResourceTimingEntry> = entries
        .iter()
        .filter(|e| !e.name.starts_with("data:"))
        .filter(|e| query.since.map_or(true, |since| e.start_time >= since))
        .filter(|e| {
            query
                .initiator_types
                .map_or(true, |types| types.iter().any(|t| t == &e.initiator_type))
        })
        .collect();

    filtered.sort_by(|a, b| a.start_time.partial_cmp(&b.start_time).unwrap_or(std::cmp::Ordering::Equal));

    let start = filtered.len().saturating_sub(limits.waterfall_cap);
    filtered[start..].iter().map(|e| parse_resource_timing(e)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    fn entry(name: &str, start_time: f64) -> ResourceTimingEntry {
        ResourceTimingEntry {
            name: name.to_string(),
            initiator_type: "fetch".to_string(),
            start_time,
            duration: 10.0,
            domain_lookup_start: 0.0,
            domain_lookup_end: 1.0,
            connect_start: 1.0,
            connect_end: 2.0,
            secure_connection_start: 0.0,
            request_start: 2.0,
            response_start: 3.0,
            response_end: 4.0,
            transfer_size: 100.0,
            encoded_body_size: 80.0,
            decoded_body_size: 80.0,
        }
    }

    #[test]
    fn tls_phase_only_present_when_secure_connection_started() {
        let mut e = entry("https://a", 0.0);
        let wf = parse_resource_timing(&e);
        assert_eq!(wf.phases.tls, None);
        e.secure_connection_start = 1.5;
        let wf = parse_resource_timing(&e);
        assert!(wf.phases.tls.is_some());
    }

    #[test]
    fn cache_hit_heuristic() {
        let mut e = entry("https://a", 0.0);
        e.transfer_size = 0.0;
        e.encoded_body_size = 80.0;
        assert_eq!(parse_resource_timing(&e).cached, Some(true));

        e.encoded_body_size = 0.0;
        assert_eq!(parse_resource_timing(&e).cached, None);
    }

    #[test]
    fn data_urls_are_dropped() {
        let entries = vec![entry("data:text/plain;base64,aGk=", 0.0), entry("https://a", 1.0)];
        let out = get_network_waterfall(&entries, &WaterfallQuery::default(), &limits());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn results_sorted_ascending_and_capped_to_most_recent() {
        let limits = Limits {
            waterfall_cap: 2,
            ..limits()
        };
        let entries: Vec<ResourceTimingEntry> = (0..5).map(|i| entry("https://a", i as f64)).collect();
        let out = get_network_waterfall(&entries, &WaterfallQuery::default(), &limits);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].start_time, 3.0);
        assert_eq!(out[1].start_time, 4.0);
    }

    #[test]
    fn since_and_initiator_type_filters() {
        let entries = vec![entry("https://a", 0.0), entry("https://b", 10.0)];
        let out = get_network_waterfall(
            &entries,
            &WaterfallQuery {
                since: Some(5.0),
                initiator_types: None,
            },
            &limits(),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://b");
    }
}
