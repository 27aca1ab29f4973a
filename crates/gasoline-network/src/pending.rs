use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub id: String,
    pub url: String,
    pub method: String,
    pub start_time: f64,
}

/// Tracks in-flight requests by a monotonic `req_N` id, so an error that
/// fires mid-request can still be correlated with it (spec.md §4.8).
#[derive(Debug, Default)]
pub struct PendingRequests {
    next_id: u64,
    entries: HashMap<String, PendingRequest>,
}

impl PendingRequests {
    pub fn new() -> Self {
        PendingRequests::default()
    }

    pub fn register(&mut self, url: String, method: String, start_time: f64) -> String {
        let id = format!("req_{}", self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id.clone(),
            PendingRequest {
                id: id.clone(),
                url,
                method,
                start_time,
            },
        );
        id
    }

    pub fn complete(&mut self, id: &str) {
        self.entries.remove(id);
    }

    pub fn snapshot(&self) -> Vec<PendingRequest> {
        self.entries.values().cloned().collect()
    }

    pub fn reset_for_testing(&mut self) {
        self.entries.clear();
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_prefixed() {
        let mut pending = PendingRequests::new();
        let a = pending.register("https://a".to_string(), "GET".to_string(), 0.0);
        let b = pending.register("https://b".to_string(), "GET".to_string(), 1.0);
        assert_eq!(a, "req_0");
        assert_eq!(b, "req_1");
        assert_eq!(pending.snapshot().len(), 2);
        pending.complete(&a);
        assert_eq!(pending.snapshot().len(), 1);
    }
}
