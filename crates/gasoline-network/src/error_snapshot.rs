use serde::{Deserialize, Serialize};

use gasoline_config::Limits;

use crate::pending::PendingRequest;
use crate::waterfall::{get_network_waterfall, ResourceTimingEntry, WaterfallEntry, WaterfallQuery};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkWaterfallSnapshot {
    pub ts: String,
    pub entries: Vec<WaterfallEntry>,
    pub pending: Vec<PendingRequest>,
}

/// Builds the error-time waterfall snapshot (spec.md §4.8): the last
/// `waterfall_window_ms` of resource entries plus every still-pending
/// request, tagged with the error's own timestamp. Returns `None` when
/// the feature is disabled.
pub fn get_network_waterfall_for_error(
    enabled: bool,
    error_ts: &str,
    now_ms: f64,
    resource_entries: &[ResourceTimingEntry],
    pending: &[PendingRequest],
    limits: &Limits,
) -> Option<NetworkWaterfallSnapshot> {
    if !enabled {
        return None;
    }
    let since = now_ms - limits.waterfall_window_ms as f64;
    let query = WaterfallQuery {
        since: Some(since),
        initiator_types: None,
    };
    Some(NetworkWaterfallSnapshot {
        ts: error_ts.to_string(),
        entries: get_network_waterfall(resource_entries, &query, limits),
        pending: pending.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::PendingRequests;
    use crate::waterfall::ResourceTimingEntry;

    fn limits() -> Limits {
        Limits::default()
    }

    fn entry(start_time: f64) -> ResourceTimingEntry {
        ResourceTimingEntry {
            name: "https://a".to_string(),
            initiator_type: "fetch".to_string(),
            start_time,
            duration: 1.0,
            domain_lookup_start: 0.0,
            domain_lookup_end: 0.0,
            connect_start: 0.0,
            connect_end: 0.0,
            secure_connection_start: 0.0,
            request_start: 0.0,
            response_start: 0.0,
            response_end: 0.0,
            transfer_size: 10.0,
            encoded_body_size: 10.0,
            decoded_body_size: 10.0,
        }
    }

    #[test]
    fn disabled_returns_none() {
        assert_eq!(
            get_network_waterfall_for_error(false, "2024-01-01T00:00:00Z", 1000.0, &[], &[], &limits()),
            None
        );
    }

    #[test]
    fn includes_window_and_pending() {
        let mut pending = PendingRequests::new();
        pending.register("https://pending".to_string(), "GET".to_string(), 900.0);
        let entries = vec![entry(500.0), entry(50_000.0)];
        let snap = get_network_waterfall_for_error(
            true,
            "2024-01-01T00:00:00Z",
            31_000.0,
            &entries,
            &pending.snapshot(),
            &limits(),
        )
        .unwrap();
        assert_eq!(snap.entries.len(), 1);
        assert_eq!(snap.pending.len(), 1);
    }
}
