use std::collections::HashMap;

use gasoline_config::CaptureMode;

use crate::tracker::ConnectionTracker;

/// Owns every live connection's tracker, keyed by `connectionId`. Mirrors
/// the per-module state-ownership rule (spec.md §5): only this registry
/// mutates trackers, and only the owning connection's lifecycle taps
/// remove them.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<String, ConnectionTracker>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        ConnectionRegistry::default()
    }

    pub fn open(&mut self, url: String, capture_mode: CaptureMode) -> String {
        let tracker = ConnectionTracker::new(url, capture_mode);
        let id = tracker.id.clone();
        self.connections.insert(id.clone(), tracker);
        id
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ConnectionTracker> {
        self.connections.get_mut(id)
    }

    pub fn get(&self, id: &str) -> Option<&ConnectionTracker> {
        self.connections.get(id)
    }

    pub fn close(&mut self, id: &str) {
        self.connections.remove(id);
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn reset_for_testing(&mut self) {
        self.connections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_and_close_lifecycle() {
        let mut reg = ConnectionRegistry::new();
        let id = reg.open("wss://a".to_string(), CaptureMode::All);
        assert!(reg.get(&id).is_some());
        reg.close(&id);
        assert!(reg.get(&id).is_none());
        assert!(reg.is_empty());
    }
}
