//! Orchestrator for the page-load capture core: the generic
//! `{uninstalled, installed}` interceptor state machine (spec.md §4.14),
//! console/exception event construction over the safe serializer and
//! the AI enrichment pipeline, and the `Orchestrator` struct that
//! aggregates every module's bounded state plus a `reset_all_for_testing`
//! entry point. `gasoline-web` is the only crate that calls host APIs;
//! everything here is pure over data and the capability traits those
//! other crates already define.

mod console;
mod exception;
mod interceptor;
mod network;
mod orchestrator;

pub use console::build_console_payload;
pub use exception::{build_exception_payload, enrich_exception_payload, ExceptionInput, ExceptionKind};
pub use interceptor::{Interceptor, InterceptorError};
pub use network::build_network_payload;
pub use orchestrator::Orchestrator;
