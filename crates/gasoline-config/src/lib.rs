//! Single source of truth for every bound, toggle and sensitive-data
//! pattern used by the capture modules. Nothing in this crate touches a
//! host API; it is pure data.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Hard numeric bounds. Every other crate imports these rather than
/// hard-coding a number, so the whole system has one dial per concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_string_len: usize,
    pub max_serialize_depth: usize,
    pub max_array_len: usize,
    pub max_object_keys: usize,

    pub max_context_keys: usize,
    pub max_context_value_bytes: usize,
    pub max_context_key_len: usize,

    pub action_buffer_cap: usize,
    pub enhanced_action_buffer_cap: usize,
    pub scroll_throttle_ms: u64,
    pub click_text_len: usize,

    pub waterfall_cap: usize,
    pub waterfall_window_ms: u64,

    pub performance_entries_cap: usize,
    pub performance_window_ms: u64,
    pub long_task_cap: usize,

    pub ws_max_body_bytes: usize,
    pub ws_preview_len: usize,
    pub ws_schema_keys_cap: usize,
    pub ws_schema_variants_cap: usize,
    pub ws_always_sample_first: usize,
    pub ws_rate_window_ms: u64,

    pub request_body_cap: usize,
    pub response_body_cap: usize,
    pub body_read_timeout_ms: u64,

    pub dom_query_max_elements: usize,
    pub dom_query_max_text: usize,
    pub dom_query_max_depth: usize,
    pub dom_query_max_html: usize,

    pub ai_snippet_radius_lines: usize,
    pub ai_snippet_line_len: usize,
    pub ai_snippets_total_bytes: usize,
    pub ai_ancestry_depth: usize,
    pub ai_prop_keys_cap: usize,
    pub ai_state_keys_cap: usize,
    pub ai_relevant_slice_cap: usize,
    pub ai_value_len: usize,
    pub ai_source_map_cache_cap: usize,
    pub ai_pipeline_timeout_ms: u64,
    pub ai_top_frames: usize,

    pub selector_text_len: usize,
    pub css_path_max_hops: usize,
    pub css_path_max_classes: usize,
    pub repro_script_max_bytes: usize,
    pub repro_pause_gap_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_string_len: 10 * 1024,
            max_serialize_depth: 10,
            max_array_len: 100,
            max_object_keys: 50,

            max_context_keys: 50,
            max_context_value_bytes: 4 * 1024,
            max_context_key_len: 100,

            action_buffer_cap: 20,
            enhanced_action_buffer_cap: 50,
            scroll_throttle_ms: 250,
            click_text_len: 50,

            waterfall_cap: 50,
            waterfall_window_ms: 30_000,

            performance_entries_cap: 50,
            performance_window_ms: 60_000,
            long_task_cap: 50,

            ws_max_body_bytes: 4 * 1024,
            ws_preview_len: 200,
            ws_schema_keys_cap: 5,
            ws_schema_variants_cap: 50,
            ws_always_sample_first: 5,
            ws_rate_window_ms: 5_000,

            request_body_cap: 8 * 1024,
            response_body_cap: 16 * 1024,
            body_read_timeout_ms: 5,

            dom_query_max_elements: 50,
            dom_query_max_text: 500,
            dom_query_max_depth: 5,
            dom_query_max_html: 200,

            ai_snippet_radius_lines: 5,
            ai_snippet_line_len: 200,
            ai_snippets_total_bytes: 10 * 1024,
            ai_ancestry_depth: 10,
            ai_prop_keys_cap: 20,
            ai_state_keys_cap: 10,
            ai_relevant_slice_cap: 10,
            ai_value_len: 200,
            ai_source_map_cache_cap: 20,
            ai_pipeline_timeout_ms: 3_000,
            ai_top_frames: 3,

            selector_text_len: 50,
            css_path_max_hops: 5,
            css_path_max_classes: 2,
            repro_script_max_bytes: 50 * 1024,
            repro_pause_gap_ms: 2_000,
        }
    }
}

/// WebSocket capture sampling policy. `All` disables sampling entirely;
/// the others pick a target messages/second rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    All,
    High,
    Medium,
    Low,
}

impl CaptureMode {
    /// Target sampling rate in messages/second. `None` for `All`, which
    /// means "don't sample, never rate-limit".
    pub fn target_rate(self) -> Option<u32> {
        match self {
            CaptureMode::All => None,
            CaptureMode::High => Some(10),
            CaptureMode::Medium => Some(5),
            CaptureMode::Low => Some(2),
        }
    }
}

impl Default for CaptureMode {
    fn default() -> Self {
        CaptureMode::Medium
    }
}

/// Recognized runtime toggles, as received from the JS `install(opts)` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub ai_context_enabled: bool,
    pub ai_context_state_snapshot_enabled: bool,
    pub action_capture_enabled: bool,
    pub network_waterfall_enabled: bool,
    pub network_body_capture_enabled: bool,
    pub web_socket_capture_enabled: bool,
    pub web_socket_capture_mode: CaptureMode,
    pub performance_marks_enabled: bool,
    pub perf_snapshot_enabled: bool,
    pub server_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ai_context_enabled: true,
            ai_context_state_snapshot_enabled: false,
            action_capture_enabled: true,
            network_waterfall_enabled: true,
            network_body_capture_enabled: true,
            web_socket_capture_enabled: true,
            web_socket_capture_mode: CaptureMode::default(),
            performance_marks_enabled: true,
            perf_snapshot_enabled: true,
            server_url: None,
        }
    }
}

/// Clickable tags that make "text content" a viable selector strategy.
pub const CLICKABLE_TAGS: &[&str] = &["BUTTON", "A", "SUMMARY"];

/// Allow-listed `keydown` keys that action capture records.
pub const ACTIONABLE_KEYS: &[&str] = &[
    "Enter",
    "Escape",
    "Tab",
    "ArrowUp",
    "ArrowDown",
    "ArrowLeft",
    "ArrowRight",
    "Backspace",
    "Delete",
];

/// Lowercased HTML `<input type=...>` values considered sensitive outright.
pub const SENSITIVE_INPUT_TYPES: &[&str] = &["password"];

/// Substrings of `autocomplete` that mark an input sensitive.
pub const SENSITIVE_AUTOCOMPLETE_PATTERNS: &[&str] = &["password", "cc-", "credit-card"];

/// Substrings of `name` that mark an input sensitive.
pub const SENSITIVE_NAME_PATTERNS: &[&str] = &[
    "password", "passwd", "secret", "token", "credit", "card", "cvv", "cvc", "ssn",
];

/// Default fallback dev-server host:port, used by the network body wrapper
/// when no `serverUrl` toggle is configured.
pub const DEFAULT_DEV_SERVER_HOSTS: &[&str] = &["localhost:7890", "127.0.0.1:7890"];

pub static SENSITIVE_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(authorization|cookie|set-cookie|x-api-key|x-auth-token|proxy-authorization)$")
        .expect("static regex is valid")
});

pub static SENSITIVE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)/(auth|login|signin|signup|token|oauth|session|api[_-]?key|password|register)")
        .expect("static regex is valid")
});

pub static BINARY_CONTENT_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(image|video|audio|font)/|^application/(wasm|octet-stream|zip|gzip|pdf)")
        .expect("static regex is valid")
});

/// Dynamic CSS class detection used by the reproduction engine's CSS-path
/// fallback: `css-`/`sc-`/`emotion-`/`styled-`/`chakra-` prefixes, or any
/// bare 5-8 lowercase-letter token (hashed-class heuristic).
pub static DYNAMIC_CLASS_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(css|sc|emotion|styled|chakra)-").expect("static regex is valid"));

pub static DYNAMIC_CLASS_HASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{5,8}$").expect("static regex is valid"));

/// `true` if an input's lowercased `type`, `autocomplete`, or `name`
/// attribute marks the field sensitive (spec.md §4.5).
pub fn is_sensitive_input(
    input_type: Option<&str>,
    autocomplete: Option<&str>,
    name: Option<&str>,
) -> bool {
    if let Some(t) = input_type {
        let t = t.to_lowercase();
        if SENSITIVE_INPUT_TYPES.iter().any(|s| *s == t) {
            return true;
        }
    }
    if let Some(a) = autocomplete {
        let a = a.to_lowercase();
        if SENSITIVE_AUTOCOMPLETE_PATTERNS
            .iter()
            .any(|p| a.contains(p))
        {
            return true;
        }
    }
    if let Some(n) = name {
        let n = n.to_lowercase();
        if SENSITIVE_NAME_PATTERNS.iter().any(|p| n.contains(p)) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensitive_input_detection() {
        assert!(is_sensitive_input(Some("PASSWORD"), None, None));
        assert!(is_sensitive_input(None, Some("cc-number"), None));
        assert!(is_sensitive_input(None, None, Some("user_ssn")));
        assert!(!is_sensitive_input(Some("text"), None, Some("username")));
    }

    #[test]
    fn capture_mode_rates() {
        assert_eq!(CaptureMode::All.target_rate(), None);
        assert_eq!(CaptureMode::High.target_rate(), Some(10));
        assert_eq!(CaptureMode::Low.target_rate(), Some(2));
    }

    #[test]
    fn config_defaults_enable_capture() {
        let cfg = Config::default();
        assert!(cfg.action_capture_enabled);
        assert!(cfg.ai_context_enabled);
        assert!(!cfg.ai_context_state_snapshot_enabled);
    }

    #[test]
    fn dynamic_class_detection() {
        assert!(DYNAMIC_CLASS_PREFIX_RE.is_match("css-1x2y3z"));
        assert!(DYNAMIC_CLASS_HASH_RE.is_match("abcde"));
        assert!(!DYNAMIC_CLASS_HASH_RE.is_match("container"));
    }
}
