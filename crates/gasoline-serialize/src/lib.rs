//! A JSON-safe projection of arbitrary, possibly-cyclic "JS-like" values.
//!
//! The host language this system instruments is dynamically typed and
//! allows arbitrary object graphs (including cycles) to reach a
//! `console.log` call or an error payload. We can't represent that with
//! `serde_json::Value` directly (it's a tree, and has no notion of
//! identity), so inputs live in an [`Arena`] addressed by [`NodeId`], and
//! cycle detection walks the arena using node identity rather than
//! structural equality.

use std::collections::HashSet;

use gasoline_config::Limits;

pub type NodeId = usize;

/// Sentinel id that never resolves; used to model a key whose getter
/// would have thrown in the host language. Serializing it always yields
/// `"[Unserializable]"`.
pub const UNSERIALIZABLE: NodeId = usize::MAX;

/// A single node in the value graph being serialized.
#[derive(Debug, Clone)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Function {
        name: Option<String>,
    },
    Error {
        name: String,
        message: String,
        stack: String,
    },
    /// A DOM node, projected to its tag/id/class identity only.
    DomNode {
        tag: String,
        id: Option<String>,
        classes: Vec<String>,
    },
    Array(Vec<NodeId>),
    /// Insertion-ordered key/value pairs.
    Object(Vec<(String, NodeId)>),
}

/// Owns every node reachable from a serialize call. `NodeId` is the
/// node's index, which doubles as its identity for cycle detection.
#[derive(Debug, Default, Clone)]
pub struct Arena {
    nodes: Vec<RawValue>,
}

impl Arena {
    pub fn new() -> Self {
        Arena { nodes: Vec::new() }
    }

    pub fn insert(&mut self, value: RawValue) -> NodeId {
        self.nodes.push(value);
        self.nodes.len() - 1
    }

    pub fn get(&self, id: NodeId) -> Option<&RawValue> {
        self.nodes.get(id)
    }

    /// Overwrites an already-inserted node. Lets a host binding reserve
    /// an id (via a placeholder `insert`) before it knows a node's final
    /// contents, so a value that references itself can point back at
    /// its own id instead of staging a fresh, infinitely-recursing copy.
    pub fn set(&mut self, id: NodeId, value: RawValue) {
        self.nodes[id] = value;
    }
}

/// Serializes the node at `root` into a JSON-safe `serde_json::Value`,
/// applying every bound in `limits`.
pub fn serialize(arena: &Arena, root: NodeId, limits: &Limits) -> serde_json::Value {
    let mut path = Vec::new();
    serialize_at(arena, root, 0, &mut path, limits)
}

fn serialize_at(
    arena: &Arena,
    id: NodeId,
    depth: usize,
    path: &mut Vec<NodeId>,
    limits: &Limits,
) -> serde_json::Value {
    let value = match arena.get(id) {
        None => return serde_json::Value::String("[Unserializable]".to_string()),
        Some(v) => v,
    };

    match value {
        RawValue::Null => serde_json::Value::Null,
        RawValue::Bool(b) => serde_json::Value::Bool(*b),
        RawValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        RawValue::String(s) => serde_json::Value::String(truncate_string(s, limits)),
        RawValue::Function { name } => serde_json::Value::String(format!(
            "[Function: {}]",
            name.as_deref().unwrap_or("anonymous")
        )),
        RawValue::Error {
            name,
            message,
            stack,
        } => {
            let mut map = serde_json::Map::new();
            map.insert(
                "name".to_string(),
                serde_json::Value::String(truncate_string(name, limits)),
            );
            map.insert(
                "message".to_string(),
                serde_json::Value::String(truncate_string(message, limits)),
            );
            map.insert(
                "stack".to_string(),
                serde_json::Value::String(truncate_string(stack, limits)),
            );
            serde_json::Value::Object(map)
        }
        RawValue::DomNode { tag, id, classes } => {
            serde_json::Value::String(format_dom_node(tag, id.as_deref(), classes))
        }
        RawValue::Array(items) => {
            if depth >= limits.max_serialize_depth {
                return serde_json::Value::String("[Max depth exceeded]".to_string());
            }
            if path.contains(&id) {
                return serde_json::Value::String("[Circular]".to_string());
            }
            path.push(id);
            let out = items
                .iter()
                .take(limits.max_array_len)
                .map(|child| serialize_at(arena, *child, depth + 1, path, limits))
                .collect();
            path.pop();
            serde_json::Value::Array(out)
        }
        RawValue::Object(entries) => {
            if depth >= limits.max_serialize_depth {
                return serde_json::Value::String("[Max depth exceeded]".to_string());
            }
            if path.contains(&id) {
                return serde_json::Value::String("[Circular]".to_string());
            }
            path.push(id);
            let mut map = serde_json::Map::new();
            for (key, child) in entries.iter().take(limits.max_object_keys) {
                map.insert(key.clone(), serialize_at(arena, *child, depth + 1, path, limits));
            }
            path.pop();
            serde_json::Value::Object(map)
        }
    }
}

fn truncate_string(s: &str, limits: &Limits) -> String {
    let char_count = s.chars().count();
    if char_count <= limits.max_string_len {
        return s.to_string();
    }
    let truncated: String = s.chars().take(limits.max_string_len).collect();
    format!("{truncated}... [truncated]")
}

/// Projects a DOM node to `"[tag#id.classes]"`, joining space-separated
/// classes with `.`.
fn format_dom_node(tag: &str, id: Option<&str>, classes: &[String]) -> String {
    let mut out = format!("[{tag}");
    if let Some(id) = id {
        out.push('#');
        out.push_str(id);
    }
    if !classes.is_empty() {
        out.push('.');
        out.push_str(&classes.join("."));
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn strings_longer_than_cap_are_truncated() {
        let mut arena = Arena::new();
        let limits = Limits {
            max_string_len: 5,
            ..limits()
        };
        let id = arena.insert(RawValue::String("abcdefghij".to_string()));
        let out = serialize(&arena, id, &limits);
        assert_eq!(out, serde_json::Value::String("abcde... [truncated]".to_string()));
    }

    #[test]
    fn cyclic_object_graph_terminates_with_circular_marker() {
        let mut arena = Arena::new();
        // placeholder, patched below to create a self-reference
        let obj_id = arena.insert(RawValue::Object(vec![]));
        arena.set(obj_id, RawValue::Object(vec![("self".to_string(), obj_id)]));
        let out = serialize(&arena, obj_id, &limits());
        let serialized = out.to_string();
        assert!(serialized.contains("[Circular]"));
    }

    #[test]
    fn depth_cap_is_enforced() {
        let limits = Limits {
            max_serialize_depth: 1,
            ..limits()
        };
        let mut arena = Arena::new();
        let leaf = arena.insert(RawValue::Number(1.0));
        let inner = arena.insert(RawValue::Array(vec![leaf]));
        let outer = arena.insert(RawValue::Array(vec![inner]));
        let out = serialize(&arena, outer, &limits);
        // outer is depth 0 (allowed), inner is depth 1 (== cap, rejected)
        assert_eq!(out, serde_json::Value::Array(vec![serde_json::Value::String(
            "[Max depth exceeded]".to_string()
        )]));
    }

    #[test]
    fn arrays_are_capped_at_max_len() {
        let limits = Limits {
            max_array_len: 3,
            ..limits()
        };
        let mut arena = Arena::new();
        let items: Vec<NodeId> = (0..10).map(|i| arena.insert(RawValue::Number(i as f64))).collect();
        let arr = arena.insert(RawValue::Array(items));
        let out = serialize(&arena, arr, &limits);
        assert_eq!(out.as_array().unwrap().len(), 3);
    }

    #[test]
    fn objects_keep_insertion_order_and_cap_keys() {
        let limits = Limits {
            max_object_keys: 2,
            ..limits()
        };
        let mut arena = Arena::new();
        let a = arena.insert(RawValue::Number(1.0));
        let b = arena.insert(RawValue::Number(2.0));
        let c = arena.insert(RawValue::Number(3.0));
        let obj = arena.insert(RawValue::Object(vec![
            ("a".to_string(), a),
            ("b".to_string(), b),
            ("c".to_string(), c),
        ]));
        let out = serialize(&arena, obj, &limits);
        let map = out.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert!(map.contains_key("a") && map.contains_key("b"));
        assert!(!map.contains_key("c"));
    }

    #[test]
    fn dom_node_formatting() {
        let mut arena = Arena::new();
        let id = arena.insert(RawValue::DomNode {
            tag: "div".to_string(),
            id: Some("main".to_string()),
            classes: vec!["a".to_string(), "b".to_string()],
        });
        let out = serialize(&arena, id, &limits());
        assert_eq!(out, serde_json::Value::String("[div#main.a.b]".to_string()));
    }

    #[test]
    fn error_instances_project_name_message_stack() {
        let mut arena = Arena::new();
        let id = arena.insert(RawValue::Error {
            name: "TypeError".to_string(),
            message: "x is undefined".to_string(),
            stack: "at foo (bundle.js:1:1)".to_string(),
        });
        let out = serialize(&arena, id, &limits());
        assert_eq!(out["name"], "TypeError");
        assert_eq!(out["message"], "x is undefined");
    }

    #[test]
    fn missing_node_is_unserializable() {
        let arena = Arena::new();
        let out = serialize(&arena, UNSERIALIZABLE, &limits());
        assert_eq!(out, serde_json::Value::String("[Unserializable]".to_string()));
    }

    #[test]
    fn reserialization_is_stable() {
        let mut arena = Arena::new();
        let id = arena.insert(RawValue::String("hello".to_string()));
        let once = serialize(&arena, id, &limits());
        // re-serializing the already-JSON value through the same pipeline
        // (by re-inserting it as a plain string) must be a no-op.
        let mut arena2 = Arena::new();
        let id2 = arena2.insert(RawValue::String(once.as_str().unwrap().to_string()));
        let twice = serialize(&arena2, id2, &limits());
        assert_eq!(once, twice);
    }
}
