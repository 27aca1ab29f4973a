use std::collections::{HashMap, VecDeque};

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSourceMap {
    pub sources_content: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSourceMap {
    #[serde(rename = "sourcesContent")]
    sources_content: Option<Vec<Option<String>>>,
}

/// Parses a `data:` URL source map (spec.md §4.12). Only `data:` URLs
/// with a `;base64,` tail are accepted; the payload must base64-decode,
/// JSON-parse, and carry a non-empty `sourcesContent`. Anything else
/// yields `None` (fail-open, no panics on malformed maps).
pub fn parse_source_map(data_url: &str) -> Option<ParsedSourceMap> {
    if !data_url.starts_with("data:") {
        return None;
    }
    let (_, payload) = data_url.split_once(";base64,")?;
    let bytes = base64::decode(payload).ok()?;
    let raw: RawSourceMap = serde_json::from_slice(&bytes).ok()?;
    let sources_content: Vec<String> = raw.sources_content?.into_iter().flatten().collect();
    if sources_content.is_empty() {
        return None;
    }
    Some(ParsedSourceMap { sources_content })
}

/// LRU cache of parsed source maps keyed by URL, capacity-bounded
/// (spec.md §3, §4.12). Recency bumps on insert, including overwrite of
/// an existing key; eviction drops the least-recently-inserted entry.
#[derive(Debug)]
pub struct SourceMapCache {
    capacity: usize,
    order: VecDeque<String>,
    entries: HashMap<String, ParsedSourceMap>,
}

impl SourceMapCache {
    pub fn new(capacity: usize) -> Self {
        SourceMapCache {
            capacity,
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, url: &str) -> Option<&ParsedSourceMap> {
        self.entries.get(url)
    }

    pub fn insert(&mut self, url: String, map: ParsedSourceMap) {
        if self.entries.contains_key(&url) {
            self.order.retain(|k| k != &url);
        } else if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(url.clone());
        self.entries.insert(url, map);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset_for_testing(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_map(sources_content: &[&str]) -> String {
        let json = serde_json::json!({ "sourcesContent": sources_content });
        let encoded = base64::encode(json.to_string());
        format!("data:application/json;base64,{}", encoded)
    }

    #[test]
    fn parses_valid_data_url() {
        let url = encode_map(&["const x = 1;"]);
        let map = parse_source_map(&url).unwrap();
        assert_eq!(map.sources_content, vec!["const x = 1;".to_string()]);
    }

    #[test]
    fn rejects_non_data_urls() {
        assert_eq!(parse_source_map("https://example.com/map.js.map"), None);
    }

    #[test]
    fn rejects_empty_sources_content() {
        let json = serde_json::json!({ "sourcesContent": [] });
        let encoded = base64::encode(json.to_string());
        let url = format!("data:application/json;base64,{}", encoded);
        assert_eq!(parse_source_map(&url), None);
    }

    #[test]
    fn lru_evicts_least_recently_inserted() {
        let mut cache = SourceMapCache::new(2);
        cache.insert("a".to_string(), ParsedSourceMap { sources_content: vec!["a".into()] });
        cache.insert("b".to_string(), ParsedSourceMap { sources_content: vec!["b".into()] });
        cache.insert("c".to_string(), ParsedSourceMap { sources_content: vec!["c".into()] });
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn reinsert_bumps_recency() {
        let mut cache = SourceMapCache::new(2);
        cache.insert("a".to_string(), ParsedSourceMap { sources_content: vec!["a".into()] });
        cache.insert("b".to_string(), ParsedSourceMap { sources_content: vec!["b".into()] });
        cache.insert("a".to_string(), ParsedSourceMap { sources_content: vec!["a2".into()] });
        cache.insert("c".to_string(), ParsedSourceMap { sources_content: vec!["c".into()] });
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
    }
}
