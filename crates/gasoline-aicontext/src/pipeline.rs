use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use gasoline_config::Limits;

use crate::framework::{detect_framework, get_react_component_ancestry, ComponentAncestryEntry, FiberNode, Framework};
use crate::snippet::{extract_source_snippets, SourceSnippet};
use crate::sourcemap::{parse_source_map, SourceMapCache};
use crate::stack::parse_stack_frames;
use crate::state::{capture_state_snapshot, StateSnapshot};
use crate::summary::{generate_ai_summary, AiSummaryInput};

/// Capability boundary for the host APIs the enrichment pipeline needs
/// to read (spec.md §9: "model host APIs as capability objects passed
/// by the orchestrator so unit tests can substitute a faithful double").
/// `gasoline-web` implements this against real DOM/React internals; unit
/// tests substitute a fixed-response double.
pub trait HostContext {
    /// A `data:` source-map URL for the given script URL, if the host
    /// can resolve one (e.g. via a trailing `//# sourceMappingURL=` comment).
    fn source_map_data_url(&self, script_url: &str) -> Option<String>;
    /// Own-property keys of the currently focused DOM element.
    fn focused_element_property_keys(&self) -> Option<Vec<String>>;
    /// Walks the `return` chain starting from the fiber stored under
    /// `fiber_key` on the focused element, nearest component first.
    fn react_fiber_chain(&self, fiber_key: &str) -> Option<Vec<FiberNode>>;
    /// A snapshot of the page's Redux-shaped store, if exposed.
    fn redux_state(&self) -> Option<Value>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentAncestry {
    pub framework: String,
    pub components: Vec<ComponentAncestryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiContextData {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_snippets: Option<Vec<SourceSnippet>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_ancestry: Option<ComponentAncestry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_snapshot: Option<StateSnapshot>,
}

fn fallback_summary(error_message: &str) -> String {
    if error_message.trim().is_empty() {
        "Unknown error".to_string()
    } else {
        error_message.to_string()
    }
}

fn build_ai_context(
    error_message: &str,
    stack: Option<&str>,
    host: &dyn HostContext,
    cache: &mut SourceMapCache,
    capture_state_enabled: bool,
    limits: &Limits,
) -> AiContextData {
    let frames = stack.map(parse_stack_frames).unwrap_or_default();

    let Some(top_frame) = frames.first().cloned() else {
        return AiContextData {
            summary: fallback_summary(error_message),
            source_snippets: None,
            component_ancestry: None,
            state_snapshot: None,
        };
    };

    if cache.get(&top_frame.filename).is_none() {
        if let Some(data_url) = host.source_map_data_url(&top_frame.filename) {
            if let Some(map) = parse_source_map(&data_url) {
                cache.insert(top_frame.filename.clone(), map);
            }
        }
    }

    let snippets = extract_source_snippets(&frames, cache, limits);
    let source_snippets = if snippets.is_empty() { None } else { Some(snippets) };

    let component_ancestry = host.focused_element_property_keys().and_then(|keys| {
        let detection = detect_framework(&keys)?;
        if detection.framework != Framework::React {
            return None;
        }
        let fiber_key = detection.key?;
        let fibers = host.react_fiber_chain(&fiber_key)?;
        Some(ComponentAncestry {
            framework: "react".to_string(),
            components: get_react_component_ancestry(&fibers, limits),
        })
    });

    let state_snapshot = if capture_state_enabled {
        capture_state_snapshot(error_message, host.redux_state().as_ref(), limits)
    } else {
        None
    };

    let empty_components: Vec<ComponentAncestryEntry> = Vec::new();
    let empty_slice: HashMap<String, Value> = HashMap::new();
    let summary = generate_ai_summary(&AiSummaryInput {
        error_message,
        top_frame: Some(&top_frame),
        component_ancestry: component_ancestry
            .as_ref()
            .map(|a| a.components.as_slice())
            .unwrap_or(empty_components.as_slice()),
        relevant_slice: state_snapshot
            .as_ref()
            .map(|s| &s.relevant_slice)
            .unwrap_or(&empty_slice),
    });

    AiContextData {
        summary,
        source_snippets,
        component_ancestry,
        state_snapshot,
    }
}

/// Runs the enrichment build, raced against `timeout` (spec.md §4.12).
/// `None` means the feature is disabled (pass the error through
/// unchanged); `Some` always carries at least a `summary`, falling back
/// to a bare one when frames can't be parsed or the timeout wins.
pub async fn enrich_error_with_ai_context<S>(
    enabled: bool,
    error_message: &str,
    stack: Option<&str>,
    host: &dyn HostContext,
    cache: &mut SourceMapCache,
    capture_state_enabled: bool,
    limits: &Limits,
    timeout: S,
) -> Option<AiContextData>
where
    S: Future<Output = ()> + Unpin,
{
    if !enabled {
        return None;
    }
    let bundle = build_ai_context(error_message, stack, host, cache, capture_state_enabled, limits);
    let fallback = AiContextData {
        summary: fallback_summary(error_message),
        source_snippets: None,
        component_ancestry: None,
        state_snapshot: None,
    };
    Some(gasoline_timers::race_with_timeout(std::future::ready(bundle), timeout, fallback).await)
}
