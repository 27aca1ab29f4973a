//! The single chokepoint every emitter posts through (spec.md §4.13).
//! `post_log` resolves `ts`/`url`/`source`, attaches error-level
//! enrichments (context annotations, action buffer), and hands the
//! envelope to a [`PostSink`] — which must always target the page's own
//! origin. Cross-origin posting is never supported; there is no `'*'`
//! fallback anywhere in this crate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use gasoline_actions::ActionCapture;
use gasoline_context::ContextAnnotations;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl Level {
    pub fn is_error(self) -> bool {
        matches!(self, Level::Error)
    }
}

/// What a caller hands the bridge before it becomes a posted [`Event`].
/// `fields` carries every payload-specific key (e.g. `args` for console,
/// `stack`/`filename`/`lineno` for exceptions) merged flat into the
/// final event.
pub struct LogPayload {
    pub level: Level,
    pub event_type: String,
    pub message: Option<String>,
    pub error_message: Option<String>,
    pub first_serialized_arg: Option<Value>,
    pub source: Option<String>,
    pub fields: Map<String, Value>,
    /// Enrichment tags the caller already resolved before handing the
    /// payload to the bridge (e.g. `"aiContext"` once the exception
    /// interceptor's enrichment pipeline has run). `post_log` appends
    /// `"context"`/`"actions"` to this list as it discovers them.
    pub extra_enrichments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub ts: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub level: Level,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", rename = "_enrichments")]
    pub enrichments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "_context")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "_actions")]
    pub actions: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub envelope_type: String,
    pub payload: Event,
}

/// Anything that can deliver the final envelope to the page bus. The
/// implementation (`gasoline-web`) is responsible for calling
/// `window.postMessage(envelope, origin)` with exactly this `origin`.
pub trait PostSink {
    fn post(&self, envelope: &Envelope, origin: &str);
    /// Posts an envelope whose `payload` isn't an [`Event`] — every
    /// non-log emitter (§6: `GASOLINE_WS`, `GASOLINE_NETWORK_BODY`,
    /// `GASOLINE_ENHANCED_ACTION`, `GASOLINE_PERFORMANCE_SNAPSHOT`) goes
    /// through this instead of `post`.
    fn post_value(&self, envelope_type: &str, payload: Value, origin: &str);
}

/// A WebSocket lifecycle/message event (§4.10, §6 `GASOLINE_WS`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub event: String,
    pub id: String,
    pub url: String,
    pub ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
}

/// Posts a `GASOLINE_WS` envelope (§4.10, §6).
pub fn post_ws_event(event: WsEvent, sink: &dyn PostSink, page_origin: &str) {
    let value = serde_json::to_value(&event).unwrap_or(Value::Null);
    sink.post_value("GASOLINE_WS", value, page_origin);
}

/// A captured fetch exchange's body-only event (§4.9, §6
/// `GASOLINE_NETWORK_BODY`), distinct from the informational waterfall
/// entry `gasolineGetNetworkWaterfall` returns on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkBodyEvent {
    pub url: String,
    pub method: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_truncated: Option<bool>,
    pub duration: f64,
}

/// Posts a `GASOLINE_NETWORK_BODY` envelope (§4.9, §6).
pub fn post_network_body(event: NetworkBodyEvent, sink: &dyn PostSink, page_origin: &str) {
    let value = serde_json::to_value(&event).unwrap_or(Value::Null);
    sink.post_value("GASOLINE_NETWORK_BODY", value, page_origin);
}

fn resolve_message(payload: &LogPayload) -> Option<String> {
    payload
        .message
        .clone()
        .or_else(|| payload.error_message.clone())
        .or_else(|| payload.first_serialized_arg.as_ref().map(|v| v.to_string()))
}

/// Builds and posts one event (spec.md §4.13). `now_iso` and `url` are
/// supplied by the caller (the only place that reads the real clock and
/// page location); `page_origin` is always used verbatim as the
/// `postMessage` target, never `'*'`.
pub fn post_log(
    now_iso: String,
    url: String,
    payload: LogPayload,
    context: Option<&ContextAnnotations>,
    actions: Option<&ActionCapture>,
    sink: &dyn PostSink,
    page_origin: &str,
) -> Event {
    let message = resolve_message(&payload);

    let mut enrichments = payload.extra_enrichments.clone();
    let mut context_snapshot = None;
    let mut actions_snapshot = None;

    if payload.level.is_error() {
        if let Some(ctx) = context {
            if let Some(snap) = ctx.snapshot() {
                context_snapshot = Some(snap);
                enrichments.push("context".to_string());
            }
        }
        if let Some(actions) = actions {
            let buffer = actions.action_buffer();
            if !buffer.is_empty() {
                actions_snapshot = Some(serde_json::to_value(buffer).unwrap_or(Value::Null));
                enrichments.push("actions".to_string());
            }
        }
    }

    let event = Event {
        ts: now_iso,
        url,
        source: payload.source,
        level: payload.level,
        event_type: payload.event_type,
        message,
        fields: payload.fields,
        enrichments,
        context: context_snapshot,
        actions: actions_snapshot,
    };

    let envelope = Envelope {
        envelope_type: "GASOLINE_LOG".to_string(),
        payload: event.clone(),
    };
    sink.post(&envelope, page_origin);
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasoline_config::Limits;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        posted: RefCell<Vec<(Envelope, String)>>,
        posted_raw: RefCell<Vec<(String, Value, String)>>,
    }

    impl PostSink for RecordingSink {
        fn post(&self, envelope: &Envelope, origin: &str) {
            self.posted.borrow_mut().push((envelope.clone(), origin.to_string()));
        }

        fn post_value(&self, envelope_type: &str, payload: Value, origin: &str) {
            self.posted_raw
                .borrow_mut()
                .push((envelope_type.to_string(), payload, origin.to_string()));
        }
    }

    fn console_payload(message: &str) -> LogPayload {
        LogPayload {
            level: Level::Log,
            event_type: "console".to_string(),
            message: Some(message.to_string()),
            error_message: None,
            first_serialized_arg: None,
            source: None,
            fields: Map::new(),
            extra_enrichments: Vec::new(),
        }
    }

    #[test]
    fn posts_to_the_given_origin_only() {
        let sink = RecordingSink::default();
        post_log(
            "2024-01-01T00:00:00Z".to_string(),
            "https://app.example.com/".to_string(),
            console_payload("hi"),
            None,
            None,
            &sink,
            "https://app.example.com",
        );
        let posted = sink.posted.borrow();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].1, "https://app.example.com");
        assert_eq!(posted[0].0.envelope_type, "GASOLINE_LOG");
    }

    #[test]
    fn non_error_events_carry_no_enrichments() {
        let mut context = ContextAnnotations::new();
        context.set("userId", Value::String("u1".to_string()), &Limits::default()).unwrap();
        let sink = RecordingSink::default();
        let event = post_log(
            "ts".to_string(),
            "url".to_string(),
            console_payload("hi"),
            Some(&context),
            None,
            &sink,
            "https://app.example.com",
        );
        assert!(event.enrichments.is_empty());
        assert_eq!(event.context, None);
    }

    #[test]
    fn error_events_attach_context_and_actions() {
        let mut context = ContextAnnotations::new();
        context.set("userId", Value::String("u1".to_string()), &Limits::default()).unwrap();
        let mut actions = ActionCapture::new(&Limits::default());
        actions.on_scroll("https://a", 0, 100, 0);

        let sink = RecordingSink::default();
        let payload = LogPayload {
            level: Level::Error,
            event_type: "exception".to_string(),
            message: None,
            error_message: Some("boom".to_string()),
            first_serialized_arg: None,
            source: Some("app.js:1:1".to_string()),
            fields: Map::new(),
            extra_enrichments: Vec::new(),
        };
        let event = post_log(
            "ts".to_string(),
            "url".to_string(),
            payload,
            Some(&context),
            Some(&actions),
            &sink,
            "https://app.example.com",
        );
        assert_eq!(event.message.as_deref(), Some("boom"));
        assert!(event.enrichments.contains(&"context".to_string()));
        assert!(event.enrichments.contains(&"actions".to_string()));
        assert!(event.context.is_some());
        assert!(event.actions.is_some());
    }

    #[test]
    fn message_falls_back_to_first_serialized_arg() {
        let payload = LogPayload {
            level: Level::Log,
            event_type: "console".to_string(),
            message: None,
            error_message: None,
            first_serialized_arg: Some(Value::String("first".to_string())),
            source: None,
            fields: Map::new(),
            extra_enrichments: Vec::new(),
        };
        let sink = RecordingSink::default();
        let event = post_log("ts".to_string(), "url".to_string(), payload, None, None, &sink, "o");
        assert_eq!(event.message.as_deref(), Some("\"first\""));
    }

    #[test]
    fn ws_event_posts_under_its_own_tag() {
        let sink = RecordingSink::default();
        post_ws_event(
            WsEvent {
                kind: "websocket".to_string(),
                event: "open".to_string(),
                id: "conn-1".to_string(),
                url: "wss://a".to_string(),
                ts: "ts".to_string(),
                code: None,
                reason: None,
                direction: None,
                data: None,
                size: None,
                truncated: None,
            },
            &sink,
            "https://app.example.com",
        );
        let posted = sink.posted_raw.borrow();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, "GASOLINE_WS");
        assert_eq!(posted[0].1["event"], "open");
    }

    #[test]
    fn network_body_event_posts_under_its_own_tag() {
        let sink = RecordingSink::default();
        post_network_body(
            NetworkBodyEvent {
                url: "https://api.example.com/login".to_string(),
                method: "POST".to_string(),
                status: 200,
                content_type: Some("application/json".to_string()),
                request_body: Some("[REDACTED: auth endpoint]".to_string()),
                response_body: Some("[REDACTED: auth endpoint]".to_string()),
                response_truncated: Some(false),
                duration: 12.5,
            },
            &sink,
            "https://app.example.com",
        );
        let posted = sink.posted_raw.borrow();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, "GASOLINE_NETWORK_BODY");
        assert_eq!(posted[0].1["requestBody"], "[REDACTED: auth endpoint]");
    }
}
