use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Click,
    Input,
    Scroll,
    Keydown,
    Change,
}

/// The basic action record kept in the raw 20-entry ring buffer
/// (spec.md §3 `ActionRecord`). `key` is not named in spec.md's field
/// list but is required to represent a `keydown` entry at all; it is a
/// direct, minimal supplement (see DESIGN.md).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub ts: u64,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_x: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_y: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ActionRecord {
    fn base(ts: u64, kind: ActionKind, target: String) -> Self {
        ActionRecord {
            ts,
            kind,
            target,
            x: None,
            y: None,
            text: None,
            input_type: None,
            value: None,
            length: None,
            scroll_x: None,
            scroll_y: None,
            key: None,
        }
    }

    pub fn click(ts: u64, target: String, x: f64, y: f64, text: Option<String>) -> Self {
        ActionRecord {
            x: Some(x),
            y: Some(y),
            text,
            ..ActionRecord::base(ts, ActionKind::Click, target)
        }
    }

    pub fn input(
        ts: u64,
        target: String,
        input_type: Option<String>,
        value: String,
        length: usize,
    ) -> Self {
        ActionRecord {
            input_type,
            value: Some(value),
            length: Some(length),
            ..ActionRecord::base(ts, ActionKind::Input, target)
        }
    }

    pub fn scroll(ts: u64, target: String, scroll_x: i64, scroll_y: i64) -> Self {
        ActionRecord {
            scroll_x: Some(scroll_x),
            scroll_y: Some(scroll_y),
            ..ActionRecord::base(ts, ActionKind::Scroll, target)
        }
    }

    pub fn keydown(ts: u64, target: String, key: String) -> Self {
        ActionRecord {
            key: Some(key),
            ..ActionRecord::base(ts, ActionKind::Keydown, target)
        }
    }

    pub fn change(ts: u64, target: String, value: String, text: String) -> Self {
        ActionRecord {
            value: Some(value),
            text: Some(text),
            ..ActionRecord::base(ts, ActionKind::Change, target)
        }
    }
}
