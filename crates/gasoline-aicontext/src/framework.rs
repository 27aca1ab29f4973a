use serde::{Deserialize, Serialize};

use gasoline_config::Limits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    React,
    Vue,
    Svelte,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkDetection {
    pub framework: Framework,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

const REACT_FIBER_PREFIXES: &[&str] = &["__reactFiber$", "__reactInternalInstance$"];
const VUE_KEYS: &[&str] = &["__vueParentComponent", "__vue_app__"];
const SVELTE_KEYS: &[&str] = &["__svelte_meta"];

/// Identifies which component framework, if any, owns a DOM element, by
/// the well-known expando property keys each framework stamps onto
/// nodes (spec.md §4.12). React's matched key is returned so the caller
/// can read the fiber off that property.
pub fn detect_framework(property_keys: &[String]) -> Option<FrameworkDetection> {
    for key in property_keys {
        if REACT_FIBER_PREFIXES.iter().any(|p| key.starts_with(p)) {
            return Some(FrameworkDetection {
                framework: Framework::React,
                key: Some(key.clone()),
            });
        }
    }
    if property_keys.iter().any(|k| VUE_KEYS.contains(&k.as_str())) {
        return Some(FrameworkDetection {
            framework: Framework::Vue,
            key: None,
        });
    }
    if property_keys.iter().any(|k| SVELTE_KEYS.contains(&k.as_str())) {
        return Some(FrameworkDetection {
            framework: Framework::Svelte,
            key: None,
        });
    }
    None
}

/// Host-collected snapshot of one fiber on the `return` chain, nearest
/// component first. The host (gasoline-web) walks live React internals
/// and produces this sequence; this crate never touches a fiber object
/// directly.
#[derive(Debug, Clone, PartialEq)]
pub struct FiberNode {
    pub type_is_string: bool,
    pub display_name: Option<String>,
    pub name: Option<String>,
    pub prop_keys: Vec<String>,
    pub has_state: bool,
    pub state_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentAncestryEntry {
    pub name: String,
    pub prop_keys: Vec<String>,
    pub has_state: bool,
    pub state_keys: Vec<String>,
}

/// Walks the `return` chain up to `ai_ancestry_depth`, skipping host
/// fibers (`type` is a string), and reverses to root-first order
/// (spec.md §4.12).
pub fn get_react_component_ancestry(fibers: &[FiberNode], limits: &Limits) -> Vec<ComponentAncestryEntry> {
    let mut entries: Vec<ComponentAncestryEntry> = fibers
        .iter()
        .take(limits.ai_ancestry_depth)
        .filter(|f| !f.type_is_string)
        .map(|f| {
            let name = f
                .display_name
                .clone()
                .or_else(|| f.name.clone())
                .unwrap_or_else(|| "Anonymous".to_string());
            let prop_keys: Vec<String> = f
                .prop_keys
                .iter()
                .filter(|k| k.as_str() != "children")
                .take(limits.ai_prop_keys_cap)
                .cloned()
                .collect();
            let state_keys: Vec<String> = f.state_keys.iter().take(limits.ai_state_keys_cap).cloned().collect();
            ComponentAncestryEntry {
                name,
                prop_keys,
                has_state: f.has_state,
                state_keys,
            }
        })
        .collect();
    entries.reverse();
    entries
}
