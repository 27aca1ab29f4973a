//! Marks/measures capture, long-task and web-vitals aggregation, and
//! point-in-time / error-time performance snapshots (spec.md §4.11).

mod entries;
mod snapshot;
mod vitals;

pub use entries::{Mark, Measure, MarkMeasureStore};
pub use snapshot::{
    capture_performance_snapshot, categorize, get_performance_snapshot_for_error,
    CategoryAggregate, ErrorPerformanceSnapshot, NavigationTiming, PerformanceSnapshot,
    ResourceCategory, ResourceSample, SlowRequest,
};
pub use vitals::{LongTask, LongTaskMetrics, VitalsTracker};
