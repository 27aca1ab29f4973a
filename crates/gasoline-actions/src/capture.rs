use gasoline_config::{is_sensitive_input, Limits, ACTIONABLE_KEYS};
use gasoline_repro::{compute_selectors, ElementDescriptor, EnhancedAction};
use gasoline_timers::Throttle;

use crate::record::ActionRecord;
use crate::ring_buffer::RingBuffer;

const REDACTED: &str = "[redacted]";

/// Owns the raw and enhanced action ring buffers plus the scroll
/// throttle. A single `enabled` toggle gates both buffers (spec.md
/// §4.5): disabling clears them; listeners stay attached regardless
/// (that wiring lives in `gasoline-core`/`gasoline-web`).
pub struct ActionCapture {
    enabled: bool,
    actions: RingBuffer<ActionRecord>,
    enhanced: RingBuffer<EnhancedAction>,
    scroll_throttle: Throttle,
}

impl ActionCapture {
    pub fn new(limits: &Limits) -> Self {
        ActionCapture {
            enabled: true,
            actions: RingBuffer::new(limits.action_buffer_cap),
            enhanced: RingBuffer::new(limits.enhanced_action_buffer_cap),
            scroll_throttle: Throttle::new(limits.scroll_throttle_ms),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.actions.clear();
            self.enhanced.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn action_buffer(&self) -> Vec<ActionRecord> {
        self.actions.snapshot()
    }

    pub fn enhanced_buffer(&self) -> Vec<EnhancedAction> {
        self.enhanced.snapshot()
    }

    pub fn reset_for_testing(&mut self) {
        self.actions.clear();
        self.enhanced.clear();
        self.scroll_throttle.reset();
        self.enabled = true;
    }

    pub fn on_click(
        &mut self,
        target: &ElementDescriptor,
        ancestors: &[ElementDescriptor],
        x: f64,
        y: f64,
        url: &str,
        ts: u64,
        limits: &Limits,
    ) {
        if !self.enabled {
            return;
        }
        let selectors = compute_selectors(target, ancestors, limits);
        let text = trimmed_truncated(target.text_content.as_deref(), limits.click_text_len);
        self.actions
            .push(ActionRecord::click(ts, selectors.css_path.clone(), x, y, text));
        self.enhanced.push(EnhancedAction::Click {
            timestamp: ts,
            url: url.to_string(),
            selectors,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn on_input(
        &mut self,
        target: &ElementDescriptor,
        ancestors: &[ElementDescriptor],
        input_type: Option<&str>,
        name: Option<&str>,
        autocomplete: Option<&str>,
        raw_value: &str,
        url: &str,
        ts: u64,
        limits: &Limits,
    ) {
        if !self.enabled {
            return;
        }
        let selectors = compute_selectors(target, ancestors, limits);
        let sensitive = is_sensitive_input(input_type, autocomplete, name);
        let length = raw_value.chars().count();

        let stored_value = if sensitive {
            REDACTED.to_string()
        } else {
            raw_value.to_string()
        };
        self.actions.push(ActionRecord::input(
            ts,
            selectors.css_path.clone(),
            input_type.map(str::to_string),
            stored_value,
            length,
        ));
        self.enhanced.push(EnhancedAction::Input {
            timestamp: ts,
            url: url.to_string(),
            selectors,
            value: if sensitive {
                String::new()
            } else {
                raw_value.to_string()
            },
            redacted: sensitive,
        });
    }

    pub fn on_scroll(&mut self, url: &str, scroll_x: i64, scroll_y: i64, now_ms: u64) {
        if !self.enabled || !self.scroll_throttle.should_fire(now_ms) {
            return;
        }
        self.actions
            .push(ActionRecord::scroll(now_ms, "window".to_string(), scroll_x, scroll_y));
        self.enhanced.push(EnhancedAction::Scroll {
            timestamp: now_ms,
            url: url.to_string(),
            x: scroll_x,
            y: scroll_y,
        });
    }

    pub fn on_keydown(
        &mut self,
        target: &ElementDescriptor,
        ancestors: &[ElementDescriptor],
        key: &str,
        url: &str,
        ts: u64,
        limits: &Limits,
    ) {
        if !self.enabled || !ACTIONABLE_KEYS.contains(&key) {
            return;
        }
        let selectors = compute_selectors(target, ancestors, limits);
        self.actions
            .push(ActionRecord::keydown(ts, selectors.css_path.clone(), key.to_string()));
        self.enhanced.push(EnhancedAction::Keypress {
            timestamp: ts,
            url: url.to_string(),
            selectors,
            key: key.to_string(),
        });
    }

    /// `change` is only meaningful for `<select>` elements; the caller
    /// is responsible for filtering to that tag before calling this.
    pub fn on_select_change(
        &mut self,
        target: &ElementDescriptor,
        ancestors: &[ElementDescriptor],
        value: &str,
        text: &str,
        url: &str,
        ts: u64,
        limits: &Limits,
    ) {
        if !self.enabled {
            return;
        }
        let selectors = compute_selectors(target, ancestors, limits);
        self.actions.push(ActionRecord::change(
            ts,
            selectors.css_path.clone(),
            value.to_string(),
            text.to_string(),
        ));
        self.enhanced.push(EnhancedAction::Select {
            timestamp: ts,
            url: url.to_string(),
            selectors,
            value: value.to_string(),
            text: text.to_string(),
        });
    }

    /// History `pushState`/`replaceState`/`popstate` navigation, always
    /// recorded as an enhanced-only action (there is no basic
    /// `ActionRecord` variant for navigation).
    pub fn on_navigate(&mut self, from_url: &str, to_url: &str, ts: u64) {
        if !self.enabled {
            return;
        }
        self.enhanced.push(EnhancedAction::Navigate {
            timestamp: ts,
            url: to_url.to_string(),
            from_url: from_url.to_string(),
            to_url: to_url.to_string(),
        });
    }
}

fn trimmed_truncated(s: Option<&str>, max_chars: usize) -> Option<String> {
    let trimmed = s.map(str::trim).filter(|s| !s.is_empty())?;
    Some(trimmed.chars().take(max_chars).collect())
}
