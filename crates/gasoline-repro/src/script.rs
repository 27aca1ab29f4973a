use serde::{Deserialize, Serialize};

use gasoline_config::Limits;

use crate::actions::EnhancedAction;
use crate::selectors::SelectorStrategies;

const TEST_NAME_ERROR_CAP: usize = 80;
const REDACTED_PLACEHOLDER: &str = "[user-provided]";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptOptions {
    /// Rebase the first action's URL onto this origin, preserving its
    /// pathname, when generating `startUrl`.
    pub base_url: Option<String>,
    /// If present, included (truncated) in the generated test's name.
    pub error_message: Option<String>,
    /// If present, only the last `window` actions are scripted.
    pub window: Option<usize>,
}

/// Escapes a string for embedding inside a single-quoted JS string
/// literal in the generated script.
fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '`' => out.push_str("\\`"),
            _ => out.push(c),
        }
    }
    out
}

/// Picks the best available selector strategy and renders it as a
/// Playwright locator expression, e.g. `page.getByTestId('X')`.
fn best_locator(selectors: &SelectorStrategies) -> String {
    if let Some(test_id) = &selectors.test_id {
        return format!("page.getByTestId('{}')", escape_js_string(test_id));
    }
    if let Some(aria_label) = &selectors.aria_label {
        return format!(
            "page.locator('[aria-label=\"{}\"]')",
            escape_js_string(aria_label)
        );
    }
    if let Some(role) = &selectors.role {
        return match &role.name {
            Some(name) => format!(
                "page.getByRole('{}', {{ name: '{}' }})",
                escape_js_string(&role.role),
                escape_js_string(name)
            ),
            None => format!("page.getByRole('{}')", escape_js_string(&role.role)),
        };
    }
    if let Some(id) = &selectors.id {
        return format!("page.locator('#{}')", escape_js_string(id));
    }
    if let Some(text) = &selectors.text {
        return format!("page.getByText('{}')", escape_js_string(text));
    }
    format!("page.locator('{}')", escape_js_string(&selectors.css_path))
}

/// Rebases `first_url` onto `base_url`, keeping `first_url`'s pathname.
fn rebase_start_url(first_url: &str, base_url: Option<&str>) -> String {
    let Some(base_url) = base_url else {
        return first_url.to_string();
    };
    let (Ok(base), Ok(original)) = (url::Url::parse(base_url), url::Url::parse(first_url)) else {
        return first_url.to_string();
    };
    let mut rebased = base;
    rebased.set_path(original.path());
    rebased.set_query(original.query());
    rebased.to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Emits one action as a line (or small block) of Playwright test code.
fn emit_action(action: &EnhancedAction) -> String {
    match action {
        EnhancedAction::Click { selectors, .. } => {
            format!("  await {}.click();", best_locator(selectors))
        }
        EnhancedAction::Input {
            selectors,
            value,
            redacted,
            ..
        } => {
            let value = if *redacted {
                REDACTED_PLACEHOLDER.to_string()
            } else {
                escape_js_string(value)
            };
            format!("  await {}.fill('{}');", best_locator(selectors), value)
        }
        EnhancedAction::Keypress { selectors, key, .. } => format!(
            "  await {}.press('{}');",
            best_locator(selectors),
            escape_js_string(key)
        ),
        EnhancedAction::Navigate { to_url, .. } => {
            format!("  await page.goto('{}');", escape_js_string(to_url))
        }
        EnhancedAction::Select {
            selectors, value, ..
        } => format!(
            "  await {}.selectOption('{}');",
            best_locator(selectors),
            escape_js_string(value)
        ),
        EnhancedAction::Scroll { x, y, .. } => {
            format!("  await page.mouse.wheel({x}, {y});")
        }
    }
}

/// Generates a single Playwright-style test reproducing `actions`, in
/// order. Gaps longer than `limits.repro_pause_gap_ms` between
/// consecutive actions get a `// [Ks pause]` comment. The result is
/// truncated at `limits.repro_script_max_bytes`.
pub fn generate_script(actions: &[EnhancedAction], opts: &ScriptOptions, limits: &Limits) -> String {
    let windowed: &[EnhancedAction] = match opts.window {
        Some(n) if n < actions.len() => &actions[actions.len() - n..],
        _ => actions,
    };

    let start_url = windowed
        .first()
        .map(|a| rebase_start_url(a.url(), opts.base_url.as_deref()))
        .unwrap_or_default();

    let test_name = match &opts.error_message {
        Some(msg) => format!(
            "reproduces: {}",
            truncate_chars(msg, TEST_NAME_ERROR_CAP)
        ),
        None => "reproduces captured session".to_string(),
    };

    let mut body = String::new();
    body.push_str(&format!(
        "test('{}', async ({{ page }}) => {{\n",
        escape_js_string(&test_name)
    ));
    body.push_str(&format!("  await page.goto('{}');\n", escape_js_string(&start_url)));

    let mut prev_ts: Option<u64> = None;
    for action in windowed {
        if let Some(prev) = prev_ts {
            let gap_ms = action.timestamp().saturating_sub(prev);
            if gap_ms > limits.repro_pause_gap_ms {
                body.push_str(&format!("  // [{}s pause]\n", gap_ms / 1000));
            }
        }
        body.push_str(&emit_action(action));
        body.push('\n');
        prev_ts = Some(action.timestamp());
    }
    body.push_str("});\n");

    truncate_bytes(&body, limits.repro_script_max_bytes)
}

fn truncate_bytes(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::RoleName;

    fn limits() -> Limits {
        Limits::default()
    }

    fn click(ts: u64, url: &str) -> EnhancedAction {
        EnhancedAction::Click {
            timestamp: ts,
            url: url.to_string(),
            selectors: SelectorStrategies {
                test_id: Some("submit-btn".to_string()),
                css_path: "#submit-btn".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn script_includes_goto_and_click() {
        let actions = vec![click(0, "https://app.example.com/checkout")];
        let script = generate_script(&actions, &ScriptOptions::default(), &limits());
        assert!(script.contains("await page.goto('https://app.example.com/checkout');"));
        assert!(script.contains("page.getByTestId('submit-btn').click()"));
    }

    #[test]
    fn gap_over_threshold_gets_pause_comment() {
        let actions = vec![click(0, "https://a"), click(5_000, "https://a")];
        let script = generate_script(&actions, &ScriptOptions::default(), &limits());
        assert!(script.contains("// [5s pause]"));
    }

    #[test]
    fn gap_under_threshold_has_no_comment() {
        let actions = vec![click(0, "https://a"), click(1_000, "https://a")];
        let script = generate_script(&actions, &ScriptOptions::default(), &limits());
        assert!(!script.contains("pause"));
    }

    #[test]
    fn redacted_input_uses_placeholder() {
        let action = EnhancedAction::Input {
            timestamp: 0,
            url: "https://a".to_string(),
            selectors: SelectorStrategies {
                id: Some("password".to_string()),
                css_path: "#password".to_string(),
                ..Default::default()
            },
            value: "hunter2".to_string(),
            redacted: true,
        };
        let script = generate_script(&[action], &ScriptOptions::default(), &limits());
        assert!(script.contains("'[user-provided]'"));
        assert!(!script.contains("hunter2"));
    }

    #[test]
    fn base_url_rebases_preserving_pathname() {
        let actions = vec![click(0, "https://dev.example.com/cart/checkout?x=1")];
        let opts = ScriptOptions {
            base_url: Some("https://staging.example.com".to_string()),
            ..Default::default()
        };
        let script = generate_script(&actions, &opts, &limits());
        assert!(script.contains("https://staging.example.com/cart/checkout?x=1"));
    }

    #[test]
    fn error_message_appears_truncated_in_test_name() {
        let actions = vec![click(0, "https://a")];
        let opts = ScriptOptions {
            error_message: Some("x".repeat(200)),
            ..Default::default()
        };
        let script = generate_script(&actions, &opts, &limits());
        let name_line = script.lines().next().unwrap();
        assert!(name_line.len() < 200);
    }

    #[test]
    fn full_script_shape_is_exact() {
        let actions = vec![click(0, "https://app.example.com/")];
        let script = generate_script(&actions, &ScriptOptions::default(), &limits());
        assert_eq!(
            script,
            "test('reproduces captured session', async ({ page }) => {\n\
             \x20 await page.goto('https://app.example.com/');\n\
             \x20 await page.getByTestId('submit-btn').click();\n\
             });\n"
        );
    }

    #[test]
    fn script_is_truncated_at_byte_cap() {
        let actions: Vec<EnhancedAction> = (0..5000).map(|i| click(i, "https://a")).collect();
        let limits = Limits {
            repro_script_max_bytes: 1024,
            ..limits()
        };
        let script = generate_script(&actions, &ScriptOptions::default(), &limits);
        assert!(script.len() <= 1024);
    }

    #[test]
    fn locator_priority_prefers_role_over_id() {
        let selectors = SelectorStrategies {
            role: Some(RoleName {
                role: "button".to_string(),
                name: Some("Submit".to_string()),
            }),
            id: Some("submit".to_string()),
            css_path: "#submit".to_string(),
            ..Default::default()
        };
        assert_eq!(
            best_locator(&selectors),
            "page.getByRole('button', { name: 'Submit' })"
        );
    }

    #[test]
    fn string_escaping_covers_all_required_characters() {
        let raw = "back\\slash 'quote' \nnewline\rcr\ttab `backtick`";
        let escaped = escape_js_string(raw);
        assert!(escaped.contains("\\\\"));
        assert!(escaped.contains("\\'"));
        assert!(escaped.contains("\\n"));
        assert!(escaped.contains("\\r"));
        assert!(escaped.contains("\\t"));
        assert!(escaped.contains("\\`"));
    }
}
