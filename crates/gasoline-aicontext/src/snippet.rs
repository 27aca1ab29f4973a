use serde::{Deserialize, Serialize};

use gasoline_config::Limits;

use crate::sourcemap::{ParsedSourceMap, SourceMapCache};
use crate::stack::StackFrame;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetLine {
    pub lineno: u32,
    pub text: String,
    pub is_error_line: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSnippet {
    pub filename: String,
    pub lines: Vec<SnippetLine>,
}

fn truncate_line(line: &str, cap: usize) -> String {
    if line.chars().count() <= cap {
        return line.to_string();
    }
    line.chars().take(cap).collect()
}

/// Extracts ±`ai_snippet_radius_lines` around the 1-based `line`,
/// truncating each line (spec.md §4.12).
pub fn extract_snippet(source: &str, line: u32, limits: &Limits) -> Vec<SnippetLine> {
    let all_lines: Vec<&str> = source.lines().collect();
    if line == 0 || line as usize > all_lines.len() {
        return Vec::new();
    }
    let radius = limits.ai_snippet_radius_lines as u32;
    let start = line.saturating_sub(radius).max(1);
    let end = (line + radius).min(all_lines.len() as u32);
    (start..=end)
        .map(|lineno| SnippetLine {
            lineno,
            text: truncate_line(all_lines[(lineno - 1) as usize], limits.ai_snippet_line_len),
            is_error_line: lineno == line,
        })
        .collect()
}

/// Consults at most the top 3 frames against the source-map cache and
/// accumulates snippets until the serialized total would exceed the
/// snippets byte cap (spec.md §4.12).
pub fn extract_source_snippets(
    frames: &[StackFrame],
    cache: &SourceMapCache,
    limits: &Limits,
) -> Vec<SourceSnippet> {
    let mut snippets = Vec::new();
    let mut total_bytes = 0usize;

    for frame in frames.iter().take(limits.ai_top_frames) {
        let Some(map): Option<&ParsedSourceMap> = cache.get(&frame.filename) else {
            continue;
        };
        let Some(source) = map.sources_content.first() else {
            continue;
        };
        let lines = extract_snippet(source, frame.lineno, limits);
        if lines.is_empty() {
            continue;
        }
        let snippet = SourceSnippet {
            filename: frame.filename.clone(),
            lines,
        };
        let size = serde_json::to_string(&snippet).map(|s| s.len()).unwrap_or(0);
        if total_bytes + size > limits.ai_snippets_total_bytes {
            break;
        }
        total_bytes += size;
        snippets.push(snippet);
    }

    snippets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    fn source() -> String {
        (1..=20).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn extracts_radius_around_error_line() {
        let lines = extract_snippet(&source(), 10, &limits());
        assert_eq!(lines.first().unwrap().lineno, 5);
        assert_eq!(lines.last().unwrap().lineno, 15);
        assert!(lines.iter().find(|l| l.lineno == 10).unwrap().is_error_line);
    }

    #[test]
    fn clamps_radius_at_file_boundaries() {
        let lines = extract_snippet(&source(), 1, &limits());
        assert_eq!(lines.first().unwrap().lineno, 1);
    }

    #[test]
    fn out_of_range_line_yields_nothing() {
        assert!(extract_snippet(&source(), 999, &limits()).is_empty());
    }

    #[test]
    fn extract_source_snippets_uses_top_frames_and_cache() {
        let mut cache = SourceMapCache::new(20);
        cache.insert(
            "https://app.example.com/main.js".to_string(),
            ParsedSourceMap {
                sources_content: vec![source()],
            },
        );
        let frames = vec![StackFrame {
            function_name: None,
            filename: "https://app.example.com/main.js".to_string(),
            lineno: 10,
            colno: 1,
        }];
        let snippets = extract_source_snippets(&frames, &cache, &limits());
        assert_eq!(snippets.len(), 1);
        assert_eq!(snippets[0].filename, "https://app.example.com/main.js");
    }

    #[test]
    fn frames_without_a_cached_map_are_skipped() {
        let cache = SourceMapCache::new(20);
        let frames = vec![StackFrame {
            function_name: None,
            filename: "https://app.example.com/missing.js".to_string(),
            lineno: 1,
            colno: 1,
        }];
        assert!(extract_source_snippets(&frames, &cache, &limits()).is_empty());
    }
}
