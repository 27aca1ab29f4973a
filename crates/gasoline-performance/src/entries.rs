use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use gasoline_config::Limits;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    pub name: String,
    pub start_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    pub captured_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub name: String,
    pub start_time: f64,
    pub duration: f64,
    pub captured_at: u64,
}

fn push_capped<T>(buf: &mut VecDeque<T>, item: T, cap: usize) {
    if buf.len() >= cap {
        buf.pop_front();
    }
    buf.push_back(item);
}

/// Ring buffers for `performance.mark`/`performance.measure`, plus the
/// observer-backfill dedup (spec.md §4.11). The wrapper installed over
/// `mark`/`measure` calls `record_mark`/`record_measure` directly; an
/// observer callback (when available) calls the `backfill_*` variants
/// for entries created outside the wrapper.
#[derive(Debug, Default)]
pub struct MarkMeasureStore {
    marks: VecDeque<Mark>,
    measures: VecDeque<Measure>,
}

impl MarkMeasureStore {
    pub fn new() -> Self {
        MarkMeasureStore::default()
    }

    pub fn record_mark(&mut self, name: String, start_time: f64, detail: Option<Value>, now_ms: u64, limits: &Limits) {
        push_capped(
            &mut self.marks,
            Mark {
                name,
                start_time,
                detail,
                captured_at: now_ms,
            },
            limits.performance_entries_cap,
        );
    }

    pub fn record_measure(&mut self, name: String, start_time: f64, duration: f64, now_ms: u64, limits: &Limits) {
        push_capped(
            &mut self.measures,
            Measure {
                name,
                start_time,
                duration,
                captured_at: now_ms,
            },
            limits.performance_entries_cap,
        );
    }

    fn mark_exists(&self, name: &str, start_time: f64) -> bool {
        self.marks.iter().any(|m| m.name == name && m.start_time == start_time)
    }

    fn measure_exists(&self, name: &str, start_time: f64) -> bool {
        self.measures
            .iter()
            .any(|m| m.name == name && m.start_time == start_time)
    }

    /// Backfills a mark observed by the `PerformanceObserver` rather than
    /// through the wrapped call. Deduped on `(name, startTime)`.
    pub fn backfill_mark(&mut self, name: String, start_time: f64, now_ms: u64, limits: &Limits) {
        if !self.mark_exists(&name, start_time) {
            self.record_mark(name, start_time, None, now_ms, limits);
        }
    }

    pub fn backfill_measure(&mut self, name: String, start_time: f64, duration: f64, now_ms: u64, limits: &Limits) {
        if !self.measure_exists(&name, start_time) {
            self.record_measure(name, start_time, duration, now_ms, limits);
        }
    }

    pub fn marks(&self) -> Vec<Mark> {
        self.marks.iter().cloned().collect()
    }

    pub fn measures(&self) -> Vec<Measure> {
        self.measures.iter().cloned().collect()
    }

    pub fn marks_since(&self, since_ms: u64) -> Vec<Mark> {
        self.marks.iter().filter(|m| m.captured_at >= since_ms).cloned().collect()
    }

    pub fn measures_since(&self, since_ms: u64) -> Vec<Measure> {
        self.measures
            .iter()
            .filter(|m| m.captured_at >= since_ms)
            .cloned()
            .collect()
    }

    pub fn reset_for_testing(&mut self) {
        self.marks.clear();
        self.measures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits {
            performance_entries_cap: 2,
            ..Limits::default()
        }
    }

    #[test]
    fn ring_buffer_caps_and_overwrites_fifo() {
        let mut store = MarkMeasureStore::new();
        store.record_mark("a".to_string(), 1.0, None, 1, &limits());
        store.record_mark("b".to_string(), 2.0, None, 2, &limits());
        store.record_mark("c".to_string(), 3.0, None, 3, &limits());
        let marks = store.marks();
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[0].name, "b");
    }

    #[test]
    fn backfill_dedupes_on_name_and_start_time() {
        let mut store = MarkMeasureStore::new();
        store.record_mark("a".to_string(), 1.0, None, 1, &limits());
        store.backfill_mark("a".to_string(), 1.0, 2, &limits());
        assert_eq!(store.marks().len(), 1);
        store.backfill_mark("a".to_string(), 2.0, 3, &limits());
        assert_eq!(store.marks().len(), 2);
    }
}
