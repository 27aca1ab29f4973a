use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use gasoline_config::Limits;

const RELEVANT_SUBKEY_PATTERNS: &[&str] = &["error", "loading", "status", "failed"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyType {
    #[serde(rename = "type")]
    pub type_tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub source: String,
    pub keys: std::collections::HashMap<String, KeyType>,
    pub relevant_slice: std::collections::HashMap<String, Value>,
}

fn type_tag(v: &Value) -> &'static str {
    match v {
        Value::Array(_) => "array",
        Value::Null => "null",
        Value::Object(_) => "object",
        Value::String(_) => "string",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
    }
}

fn words_from_message(message: &str) -> HashSet<String> {
    message
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_string())
        .collect()
}

fn truncate_value(v: &Value, cap: usize) -> Value {
    match v {
        Value::String(s) if s.chars().count() > cap => {
            Value::String(s.chars().take(cap).collect())
        }
        other => other.clone(),
    }
}

/// Builds a bounded Redux state snapshot (spec.md §4.12). `None` when no
/// store is exposed on the host's well-known slot. `relevantSlice` keys
/// are dotted `top.sub` form; sub-entries are included either because
/// their own key looks error/status-shaped or because the top-level key
/// matches a word in the error message.
pub fn capture_state_snapshot(error_message: &str, state: Option<&Value>, limits: &Limits) -> Option<StateSnapshot> {
    let state = state?;
    let obj = state.as_object()?;

    let keys = obj
        .iter()
        .map(|(k, v)| (k.clone(), KeyType { type_tag: type_tag(v).to_string() }))
        .collect();

    let message_words = words_from_message(error_message);
    let mut relevant_slice = std::collections::HashMap::new();

    for (top_key, top_val) in obj {
        let Some(sub_obj) = top_val.as_object() else {
            continue;
        };
        let top_key_matches = message_words.contains(&top_key.to_lowercase());
        let mut count = 0;
        for (sub_key, sub_val) in sub_obj {
            if count >= limits.ai_relevant_slice_cap {
                break;
            }
            let sub_key_lower = sub_key.to_lowercase();
            let sub_matches = RELEVANT_SUBKEY_PATTERNS.iter().any(|p| sub_key_lower.contains(p));
            if sub_matches || top_key_matches {
                relevant_slice.insert(
                    format!("{}.{}", top_key, sub_key),
                    truncate_value(sub_val, limits.ai_value_len),
                );
                count += 1;
            }
        }
    }

    Some(StateSnapshot {
        source: "redux".to_string(),
        keys,
        relevant_slice,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn no_store_yields_none() {
        assert_eq!(capture_state_snapshot("boom", None, &limits()), None);
    }

    #[test]
    fn type_tags_cover_each_json_kind() {
        let state = json!({
            "a": [1,2],
            "b": null,
            "c": {"x":1},
            "d": "s",
            "e": 1,
            "f": true,
        });
        let snap = capture_state_snapshot("boom", Some(&state), &limits()).unwrap();
        assert_eq!(snap.keys["a"].type_tag, "array");
        assert_eq!(snap.keys["b"].type_tag, "null");
        assert_eq!(snap.keys["c"].type_tag, "object");
        assert_eq!(snap.keys["d"].type_tag, "string");
        assert_eq!(snap.keys["e"].type_tag, "number");
        assert_eq!(snap.keys["f"].type_tag, "boolean");
    }

    #[test]
    fn relevant_slice_matches_error_shaped_subkeys() {
        let state = json!({
            "auth": {"status": "pending", "token": "abc"},
            "ui": {"theme": "dark"},
        });
        let snap = capture_state_snapshot("network failed", Some(&state), &limits()).unwrap();
        assert!(snap.relevant_slice.contains_key("auth.status"));
        assert!(!snap.relevant_slice.contains_key("ui.theme"));
    }

    #[test]
    fn relevant_slice_matches_top_key_against_message_words() {
        let state = json!({
            "checkout": {"total": 42, "items": 3},
        });
        let snap = capture_state_snapshot("checkout failed unexpectedly", Some(&state), &limits()).unwrap();
        assert!(snap.relevant_slice.contains_key("checkout.total"));
        assert!(snap.relevant_slice.contains_key("checkout.items"));
    }

    #[test]
    fn string_values_are_truncated() {
        let long = "x".repeat(300);
        let state = json!({ "auth": { "error": long } });
        let small_limits = Limits { ai_value_len: 5, ..limits() };
        let snap = capture_state_snapshot("boom", Some(&state), &small_limits).unwrap();
        assert_eq!(snap.relevant_slice["auth.error"], json!("xxxxx"));
    }
}
