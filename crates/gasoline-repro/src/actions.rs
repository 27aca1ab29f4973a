use serde::{Deserialize, Serialize};

use crate::selectors::SelectorStrategies;

/// An action record enriched with selector strategies, suitable for
/// reproduction-script generation (spec.md §3 `EnhancedActionRecord`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EnhancedAction {
    Click {
        timestamp: u64,
        url: String,
        selectors: SelectorStrategies,
    },
    Input {
        timestamp: u64,
        url: String,
        selectors: SelectorStrategies,
        value: String,
        redacted: bool,
    },
    Keypress {
        timestamp: u64,
        url: String,
        selectors: SelectorStrategies,
        key: String,
    },
    Navigate {
        timestamp: u64,
        url: String,
        from_url: String,
        to_url: String,
    },
    Select {
        timestamp: u64,
        url: String,
        selectors: SelectorStrategies,
        value: String,
        text: String,
    },
    Scroll {
        timestamp: u64,
        url: String,
        x: i64,
        y: i64,
    },
}

impl EnhancedAction {
    pub fn timestamp(&self) -> u64 {
        match self {
            EnhancedAction::Click { timestamp, .. }
            | EnhancedAction::Input { timestamp, .. }
            | EnhancedAction::Keypress { timestamp, .. }
            | EnhancedAction::Navigate { timestamp, .. }
            | EnhancedAction::Select { timestamp, .. }
            | EnhancedAction::Scroll { timestamp, .. } => *timestamp,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            EnhancedAction::Click { url, .. }
            | EnhancedAction::Input { url, .. }
            | EnhancedAction::Keypress { url, .. }
            | EnhancedAction::Navigate { url, .. }
            | EnhancedAction::Select { url, .. }
            | EnhancedAction::Scroll { url, .. } => url,
        }
    }

    pub fn selectors(&self) -> Option<&SelectorStrategies> {
        match self {
            EnhancedAction::Click { selectors, .. }
            | EnhancedAction::Input { selectors, .. }
            | EnhancedAction::Keypress { selectors, .. }
            | EnhancedAction::Select { selectors, .. } => Some(selectors),
            EnhancedAction::Navigate { .. } | EnhancedAction::Scroll { .. } => None,
        }
    }
}
