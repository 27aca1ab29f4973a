use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    pub filename: String,
    pub lineno: u32,
    pub colno: u32,
}

static CHROME_FRAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^at\s+(?:(.+?)\s+\()?(.+?):(\d+):(\d+)\)?$").expect("static regex is valid"));

static FIREFOX_FRAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)@(.+?):(\d+):(\d+)$").expect("static regex is valid"));

fn parse_line(line: &str) -> Option<StackFrame> {
    let line = line.trim();
    if let Some(caps) = CHROME_FRAME_RE.captures(line) {
        let function_name = caps.get(1).map(|m| m.as_str().to_string());
        let filename = caps.get(2)?.as_str().to_string();
        let lineno: u32 = caps.get(3)?.as_str().parse().ok()?;
        let colno: u32 = caps.get(4)?.as_str().parse().ok()?;
        return Some(StackFrame {
            function_name,
            filename,
            lineno,
            colno,
        });
    }
    if let Some(caps) = FIREFOX_FRAME_RE.captures(line) {
        let function_name = caps.get(1).map(|m| m.as_str().to_string()).filter(|s| !s.is_empty());
        let filename = caps.get(2)?.as_str().to_string();
        let lineno: u32 = caps.get(3)?.as_str().parse().ok()?;
        let colno: u32 = caps.get(4)?.as_str().parse().ok()?;
        return Some(StackFrame {
            function_name,
            filename,
            lineno,
            colno,
        });
    }
    None
}

/// Parses an `Error.stack` string into ordered frames (spec.md §4.12).
/// Tries the Chrome frame shape, then Firefox's; frames with an empty or
/// `<anonymous>` filename are dropped.
pub fn parse_stack_frames(stack: &str) -> Vec<StackFrame> {
    stack
        .lines()
        .filter_map(parse_line)
        .filter(|f| !f.filename.is_empty() && !f.filename.contains("<anonymous>"))
        .collect()
}
