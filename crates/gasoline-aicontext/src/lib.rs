//! Stack-frame parsing, source-map-aware snippet extraction, framework
//! and Redux-state introspection, and the timeout-guarded AI
//! error-enrichment pipeline (spec.md §4.12). Host-agnostic: DOM/React
//! internals are reached only through the [`HostContext`] capability
//! trait, which `gasoline-web` implements for real.

mod framework;
mod pipeline;
mod snippet;
mod sourcemap;
mod stack;
mod state;
mod summary;

pub use framework::{
    detect_framework, get_react_component_ancestry, ComponentAncestryEntry, FiberNode, Framework,
    FrameworkDetection,
};
pub use pipeline::{enrich_error_with_ai_context, AiContextData, ComponentAncestry, HostContext};
pub use snippet::{extract_snippet, extract_source_snippets, SnippetLine, SourceSnippet};
pub use sourcemap::{parse_source_map, ParsedSourceMap, SourceMapCache};
pub use stack::{parse_stack_frames, StackFrame};
pub use state::{capture_state_snapshot, KeyType, StateSnapshot};
pub use summary::{generate_ai_summary, AiSummaryInput};
