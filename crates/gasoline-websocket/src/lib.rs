//! Per-connection WebSocket tracking: adaptive message sampling and
//! incremental schema inference (spec.md §4.10). Host-agnostic: the
//! `gasoline-web` crate owns the actual constructor wrap and feeds raw
//! payload bytes/text in here.

mod payload;
mod registry;
mod tracker;

pub use payload::{format_blob, format_payload, FormattedPayload, RawPayload};
pub use registry::ConnectionRegistry;
pub use tracker::{ConnectionTracker, DirStats, Direction, SchemaSnapshot};
