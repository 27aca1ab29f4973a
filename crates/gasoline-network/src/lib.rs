//! Network waterfall projection and fetch request/response body capture
//! (spec.md §4.8-4.9). Host-agnostic: the `gasoline-web` crate feeds
//! [`ResourceTimingEntry`] values read from `performance.getEntriesByType`
//! and [`RawBody`] values read from a wrapped `fetch`.

mod body_capture;
mod error_snapshot;
mod pending;
mod waterfall;

pub use body_capture::{
    capture_exchange, is_excluded_url, BodyCapture, CapturedRequest, CapturedResponse, Headers,
    RawBody,
};
pub use error_snapshot::{get_network_waterfall_for_error, NetworkWaterfallSnapshot};
pub use pending::{PendingRequest, PendingRequests};
pub use waterfall::{
    get_network_waterfall, parse_resource_timing, Phases, ResourceTimingEntry, WaterfallEntry,
    WaterfallQuery,
};
