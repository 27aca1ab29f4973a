use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gasoline_config::{CaptureMode, Limits};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirStats {
    pub count: u64,
    pub bytes: u64,
    pub last_preview: Option<String>,
    pub last_at: Option<u64>,
}

impl DirStats {
    fn record(&mut self, byte_len: usize, preview: &str, now_ms: u64) {
        self.count += 1;
        self.bytes += byte_len as u64;
        self.last_preview = Some(preview.to_string());
        self.last_at = Some(now_ms);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSnapshot {
    pub schema_keys: Vec<String>,
    pub schema_variants: HashMap<String, u32>,
    pub schema_consistent: bool,
    pub schema_detected: bool,
}

fn sorted_joined_keys(keys: &[String]) -> String {
    let mut sorted: Vec<&str> = keys.iter().map(|s| s.as_str()).collect();
    sorted.sort_unstable();
    sorted.join(",")
}

/// Per-connection state (spec.md §3 ConnectionTracker, §4.10). Owns
/// direction stats, the adaptive-sampling counter/window, and the
/// schema-inference state machine. Monotonic once `schema_detected`
/// flips, matching the `bootstrapping`→`detected` state machine (§4.14).
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    pub id: String,
    pub url: String,
    pub message_count: u64,
    pub incoming: DirStats,
    pub outgoing: DirStats,
    schema_keys: Vec<String>,
    schema_variants: HashMap<String, u32>,
    schema_consistent: bool,
    schema_detected: bool,
    message_timestamps: VecDeque<u64>,
    sample_counter: u64,
    capture_mode: CaptureMode,
}

impl ConnectionTracker {
    pub fn new(url: String, capture_mode: CaptureMode) -> Self {
        ConnectionTracker {
            id: Uuid::new_v4().to_string(),
            url,
            message_count: 0,
            incoming: DirStats::default(),
            outgoing: DirStats::default(),
            schema_keys: Vec::new(),
            schema_variants: HashMap::new(),
            schema_consistent: false,
            schema_detected: false,
            message_timestamps: VecDeque::new(),
            sample_counter: 0,
            capture_mode,
        }
    }

    fn prune_window(&mut self, now_ms: u64, window_ms: u64) {
        while let Some(&front) = self.message_timestamps.front() {
            if now_ms.saturating_sub(front) > window_ms {
                self.message_timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Messages/second observed in the trailing window (spec.md §4.10).
    pub fn message_rate(&mut self, now_ms: u64, limits: &Limits) -> f64 {
        self.prune_window(now_ms, limits.ws_rate_window_ms);
        self.message_timestamps.len() as f64 / (limits.ws_rate_window_ms as f64 / 1000.0)
    }

    /// Records one message in `direction` and returns whether it should
    /// be sampled (posted). Always records stats regardless of sampling.
    pub fn record_message(
        &mut self,
        direction: Direction,
        byte_len: usize,
        preview: &str,
        now_ms: u64,
        limits: &Limits,
    ) -> bool {
        match direction {
            Direction::Incoming => self.incoming.record(byte_len, preview, now_ms),
            Direction::Outgoing => self.outgoing.record(byte_len, preview, now_ms),
        }
        self.message_count += 1;
        self.sample_counter += 1;
        self.message_timestamps.push_back(now_ms);
        self.should_sample(now_ms, limits)
    }

    fn should_sample(&mut self, now_ms: u64, limits: &Limits) -> bool {
        if self.capture_mode.target_rate().is_none() {
            return true;
        }
        if self.sample_counter <= limits.ws_always_sample_first as u64 {
            return true;
        }
        let target = self.capture_mode.target_rate().unwrap() as f64;
        let rate = self.message_rate(now_ms, limits);
        if rate <= target {
            return true;
        }
        let every_nth = (rate / target).ceil() as u64;
        every_nth > 0 && self.sample_counter % every_nth == 0
    }

    /// Feeds an incoming JSON object's key set into schema inference
    /// (spec.md §4.10 phases 1-3). No-op for non-object payloads, which
    /// callers should simply not invoke this for.
    pub fn record_schema(&mut self, keys: &[String], limits: &Limits) {
        let joined = sorted_joined_keys(keys);
        if !self.schema_detected {
            if self.schema_keys.len() < limits.ws_schema_keys_cap {
                self.schema_keys.push(joined.clone());
            }
            *self.schema_variants.entry(joined).or_insert(0) += 1;
            if self.schema_keys.len() >= 2 {
                self.schema_consistent = self
                    .schema_keys
                    .iter()
                    .all(|k| k == &self.schema_keys[0]);
            }
            if self.schema_keys.len() >= limits.ws_schema_keys_cap {
                self.schema_detected = true;
            }
        } else if let Some(count) = self.schema_variants.get_mut(&joined) {
            *count += 1;
        } else if self.schema_variants.len() < limits.ws_schema_variants_cap {
            self.schema_variants.insert(joined, 1);
        }
    }

    /// True if, post-detection, this key set wasn't among the first 5
    /// recorded (spec.md §4.10 `isSchemaChange`).
    pub fn is_schema_change(&self, keys: &[String]) -> bool {
        if !self.schema_detected {
            return false;
        }
        let joined = sorted_joined_keys(keys);
        !self.schema_keys.contains(&joined)
    }

    pub fn schema_snapshot(&self) -> SchemaSnapshot {
        SchemaSnapshot {
            schema_keys: self.schema_keys.clone(),
            schema_variants: self.schema_variants.clone(),
            schema_consistent: self.schema_consistent,
            schema_detected: self.schema_detected,
        }
    }
}
