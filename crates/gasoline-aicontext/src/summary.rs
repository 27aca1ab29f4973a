use std::collections::HashMap;

use serde_json::Value;

use crate::framework::ComponentAncestryEntry;
use crate::stack::StackFrame;

pub struct AiSummaryInput<'a> {
    pub error_message: &'a str,
    pub top_frame: Option<&'a StackFrame>,
    pub component_ancestry: &'a [ComponentAncestryEntry],
    pub relevant_slice: &'a HashMap<String, Value>,
}

/// Builds the one-line AI summary (spec.md §4.12): error type + location,
/// a `>`-joined component path, and a compact `k=JSON(v)` listing of the
/// relevant state slice. The "type" is everything before the first `:`
/// in the error message, taken literally even when that reads oddly for
/// colon-free messages (the whole message becomes the "type").
pub fn generate_ai_summary(input: &AiSummaryInput) -> String {
    let error_type = input
        .error_message
        .splitn(2, ':')
        .next()
        .unwrap_or(input.error_message)
        .trim();

    let location = match input.top_frame {
        Some(f) => format!("{}:{}:{}", f.filename, f.lineno, f.colno),
        None => "unknown location".to_string(),
    };

    let mut summary = format!("{} at {}", error_type, location);

    if !input.component_ancestry.is_empty() {
        let path = input
            .component_ancestry
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(">");
        summary.push_str(&format!(" in {}", path));
    }

    if !input.relevant_slice.is_empty() {
        let mut keys: Vec<&String> = input.relevant_slice.keys().collect();
        keys.sort();
        let listing = keys
            .iter()
            .map(|k| format!("{}={}", k, input.relevant_slice[*k]))
            .collect::<Vec<_>>()
            .join(", ");
        summary.push_str(&format!(" | state: {}", listing));
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn colon_split_takes_literal_first_segment_as_type() {
        let input = AiSummaryInput {
            error_message: "TypeError: cannot read property 'x' of undefined",
            top_frame: None,
            component_ancestry: &[],
            relevant_slice: &HashMap::new(),
        };
        assert_eq!(generate_ai_summary(&input), "TypeError at unknown location");
    }

    #[test]
    fn no_colon_uses_whole_message_as_type() {
        let input = AiSummaryInput {
            error_message: "boom",
            top_frame: None,
            component_ancestry: &[],
            relevant_slice: &HashMap::new(),
        };
        assert_eq!(generate_ai_summary(&input), "boom at unknown location");
    }

    #[test]
    fn includes_location_path_and_state() {
        let frame = StackFrame {
            function_name: None,
            filename: "app.js".to_string(),
            lineno: 10,
            colno: 2,
        };
        let ancestry = vec![
            ComponentAncestryEntry {
                name: "App".to_string(),
                prop_keys: vec![],
                has_state: false,
                state_keys: vec![],
            },
            ComponentAncestryEntry {
                name: "Button".to_string(),
                prop_keys: vec![],
                has_state: false,
                state_keys: vec![],
            },
        ];
        let mut slice = HashMap::new();
        slice.insert("auth.status".to_string(), json!("pending"));
        let input = AiSummaryInput {
            error_message: "NetworkError: fetch failed",
            top_frame: Some(&frame),
            component_ancestry: &ancestry,
            relevant_slice: &slice,
        };
        assert_eq!(
            generate_ai_summary(&input),
            "NetworkError at app.js:10:2 in App>Button | state: auth.status=\"pending\""
        );
    }
}
