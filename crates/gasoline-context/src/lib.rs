//! Bounded key/value annotation store attached to error events (spec.md
//! §4.7). Callers are expected to have already run arbitrary values
//! through [`gasoline_serialize::serialize`] before calling [`ContextAnnotations::set`];
//! this module only enforces the bounds and refuses quota violations.

use std::collections::HashMap;

use gasoline_config::Limits;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("annotation key must be a non-empty string of at most {max} chars")]
    InvalidKey { max: usize },
    #[error("context annotation quota of {max} keys reached")]
    QuotaExceeded { max: usize },
    #[error("serialized annotation value exceeds {max} bytes; stored placeholder instead")]
    ValueTooLarge { max: usize },
}

#[derive(Debug, Default)]
pub struct ContextAnnotations {
    entries: HashMap<String, serde_json::Value>,
}

impl ContextAnnotations {
    pub fn new() -> Self {
        ContextAnnotations::default()
    }

    /// Sets `key` to the already-serialized `value`. Returns `Ok(())` on a
    /// clean write. On a bound violation the map is still left in a
    /// consistent state (either unchanged, or holding the documented
    /// placeholder) and `Err` describes what happened.
    pub fn set(
        &mut self,
        key: &str,
        value: serde_json::Value,
        limits: &Limits,
    ) -> Result<(), ContextError> {
        if key.is_empty() || key.chars().count() > limits.max_context_key_len {
            return Err(ContextError::InvalidKey {
                max: limits.max_context_key_len,
            });
        }
        if !self.entries.contains_key(key) && self.entries.len() >= limits.max_context_keys {
            return Err(ContextError::QuotaExceeded {
                max: limits.max_context_keys,
            });
        }

        let serialized_len = serde_json::to_string(&value)
            .map(|s| s.len())
            .unwrap_or(usize::MAX);
        if serialized_len > limits.max_context_value_bytes {
            self.entries.insert(
                key.to_string(),
                serde_json::Value::String("[Value too large]".to_string()),
            );
            return Err(ContextError::ValueTooLarge {
                max: limits.max_context_value_bytes,
            });
        }

        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A copy of the current annotations, or `None` if the store is empty.
    /// This is what `_context` on an error event is built from.
    pub fn snapshot(&self) -> Option<serde_json::Value> {
        if self.entries.is_empty() {
            return None;
        }
        let map: serde_json::Map<String, serde_json::Value> =
            self.entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        Some(serde_json::Value::Object(map))
    }

    /// Test-reset surface entry point (spec.md §2 misc glue line item).
    pub fn reset_for_testing(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn empty_store_snapshot_is_none() {
        let ctx = ContextAnnotations::new();
        assert_eq!(ctx.snapshot(), None);
    }

    #[test]
    fn set_get_remove_roundtrip() {
        let mut ctx = ContextAnnotations::new();
        ctx.set("userId", json!(42), &limits()).unwrap();
        let snap = ctx.snapshot().unwrap();
        assert_eq!(snap["userId"], json!(42));
        assert!(ctx.remove("userId"));
        assert_eq!(ctx.snapshot(), None);
    }

    #[test]
    fn fifty_first_annotation_is_refused_but_updates_still_work() {
        let mut ctx = ContextAnnotations::new();
        let limits = limits();
        for i in 0..limits.max_context_keys {
            ctx.set(&format!("k{i}"), json!(i), &limits).unwrap();
        }
        assert_eq!(ctx.len(), limits.max_context_keys);

        let err = ctx.set("one-too-many", json!(1), &limits).unwrap_err();
        assert_eq!(
            err,
            ContextError::QuotaExceeded {
                max: limits.max_context_keys
            }
        );
        assert_eq!(ctx.len(), limits.max_context_keys);

        // existing keys remain updatable even at quota.
        ctx.set("k0", json!("updated"), &limits).unwrap();
        assert_eq!(ctx.snapshot().unwrap()["k0"], json!("updated"));
    }

    #[test]
    fn oversized_value_is_replaced_with_placeholder_and_signals_failure() {
        let mut ctx = ContextAnnotations::new();
        let limits = limits();
        let huge = json!("x".repeat(limits.max_context_value_bytes + 10));
        let err = ctx.set("big", huge, &limits).unwrap_err();
        assert_eq!(
            err,
            ContextError::ValueTooLarge {
                max: limits.max_context_value_bytes
            }
        );
        assert_eq!(
            ctx.snapshot().unwrap()["big"],
            json!("[Value too large]")
        );
    }

    #[test]
    fn key_length_is_enforced() {
        let mut ctx = ContextAnnotations::new();
        let limits = limits();
        let long_key = "k".repeat(limits.max_context_key_len + 1);
        assert!(matches!(
            ctx.set(&long_key, json!(1), &limits),
            Err(ContextError::InvalidKey { .. })
        ));
    }
}
