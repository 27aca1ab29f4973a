use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use gasoline_config::Limits;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTask {
    pub start_time: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongTaskMetrics {
    pub count: usize,
    pub total_blocking_time: f64,
    pub longest: f64,
}

/// Accumulates long tasks and Core-Web-Vitals-adjacent signals observed
/// by a separate snapshot `PerformanceObserver` (spec.md §4.11): long
/// tasks, FCP, LCP (last entry wins), CLS (summed, ignoring
/// `hadRecentInput`), and INP (max interaction duration ≥ 40ms).
#[derive(Debug, Default)]
pub struct VitalsTracker {
    long_tasks: VecDeque<LongTask>,
    fcp: Option<f64>,
    lcp: Option<f64>,
    cls: f64,
    inp: f64,
}

impl VitalsTracker {
    pub fn new() -> Self {
        VitalsTracker::default()
    }

    pub fn record_long_task(&mut self, start_time: f64, duration: f64, limits: &Limits) {
        if self.long_tasks.len() >= limits.long_task_cap {
            self.long_tasks.pop_front();
        }
        self.long_tasks.push_back(LongTask { start_time, duration });
    }

    pub fn record_fcp(&mut self, value: f64) {
        self.fcp = Some(value);
    }

    /// LCP candidates keep arriving as the page paints larger content;
    /// the most recent observation wins.
    pub fn record_lcp(&mut self, value: f64) {
        self.lcp = Some(value);
    }

    pub fn record_layout_shift(&mut self, value: f64, had_recent_input: bool) {
        if !had_recent_input {
            self.cls += value;
        }
    }

    pub fn record_interaction(&mut self, duration: f64) {
        if duration >= 40.0 && duration > self.inp {
            self.inp = duration;
        }
    }

    pub fn long_task_metrics(&self) -> LongTaskMetrics {
        let count = self.long_tasks.len();
        let total_blocking_time: f64 = self
            .long_tasks
            .iter()
            .map(|t| (t.duration - 50.0).max(0.0))
            .sum();
        let longest = self.long_tasks.iter().map(|t| t.duration).fold(0.0, f64::max);
        LongTaskMetrics {
            count,
            total_blocking_time,
            longest,
        }
    }

    pub fn fcp(&self) -> Option<f64> {
        self.fcp
    }

    pub fn lcp(&self) -> Option<f64> {
        self.lcp
    }

    pub fn cls(&self) -> f64 {
        self.cls
    }

    pub fn inp(&self) -> f64 {
        self.inp
    }

    pub fn reset_for_testing(&mut self) {
        self.long_tasks.clear();
        self.fcp = None;
        self.lcp = None;
        self.cls = 0.0;
        self.inp = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn long_task_metrics_aggregate_correctly() {
        let mut v = VitalsTracker::new();
        v.record_long_task(0.0, 60.0, &limits());
        v.record_long_task(100.0, 120.0, &limits());
        let m = v.long_task_metrics();
        assert_eq!(m.count, 2);
        assert_eq!(m.total_blocking_time, 10.0 + 70.0);
        assert_eq!(m.longest, 120.0);
    }

    #[test]
    fn lcp_keeps_last_value() {
        let mut v = VitalsTracker::new();
        v.record_lcp(1000.0);
        v.record_lcp(1500.0);
        assert_eq!(v.lcp(), Some(1500.0));
    }

    #[test]
    fn cls_ignores_recent_input_shifts() {
        let mut v = VitalsTracker::new();
        v.record_layout_shift(0.1, false);
        v.record_layout_shift(0.2, true);
        v.record_layout_shift(0.05, false);
        assert!((v.cls() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn inp_is_max_interaction_duration_over_threshold() {
        let mut v = VitalsTracker::new();
        v.record_interaction(20.0);
        v.record_interaction(80.0);
        v.record_interaction(50.0);
        assert_eq!(v.inp(), 80.0);
    }
}
