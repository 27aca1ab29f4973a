use std::future::Future;

use serde_json::{Map, Value};

use gasoline_aicontext::{enrich_error_with_ai_context, HostContext, SourceMapCache};
use gasoline_bridge::{Level, LogPayload};
use gasoline_config::Limits;

/// Which global tap produced the event (spec.md §4.4). Rejection
/// messages get the `"Unhandled Promise Rejection: "` prefix; everything
/// else about the two taps is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    GlobalError,
    UnhandledRejection,
}

#[derive(Debug, Clone, Default)]
pub struct ExceptionInput {
    pub message: String,
    pub filename: Option<String>,
    pub lineno: Option<u32>,
    pub colno: Option<u32>,
    pub stack: Option<String>,
}

fn resolved_source(filename: Option<&str>, lineno: Option<u32>) -> Option<String> {
    match (filename, lineno) {
        (Some(f), Some(l)) => Some(format!("{f}:{l}")),
        (Some(f), None) => Some(f.to_string()),
        (None, _) => None,
    }
}

/// Builds the bare exception payload, before AI enrichment (spec.md
/// §4.4). Always succeeds; enrichment is a separate, fallible step so a
/// slow or failing enrichment pipeline never blocks posting the entry.
pub fn build_exception_payload(kind: ExceptionKind, input: ExceptionInput) -> LogPayload {
    let message = match kind {
        ExceptionKind::GlobalError => input.message,
        ExceptionKind::UnhandledRejection => format!("Unhandled Promise Rejection: {}", input.message),
    };

    let mut fields = Map::new();
    if let Some(filename) = &input.filename {
        fields.insert("filename".to_string(), Value::String(filename.clone()));
    }
    if let Some(lineno) = input.lineno {
        fields.insert("lineno".to_string(), Value::Number(lineno.into()));
    }
    if let Some(colno) = input.colno {
        fields.insert("colno".to_string(), Value::Number(colno.into()));
    }
    if let Some(stack) = &input.stack {
        fields.insert("stack".to_string(), Value::String(stack.clone()));
    }

    LogPayload {
        level: Level::Error,
        event_type: "exception".to_string(),
        message: Some(message.clone()),
        error_message: Some(message),
        first_serialized_arg: None,
        source: resolved_source(input.filename.as_deref(), input.lineno),
        fields,
        extra_enrichments: Vec::new(),
    }
}

/// Runs AI enrichment (spec.md §4.12) against an already-built exception
/// payload and, on success, attaches `_aiContext` to `fields` and
/// appends `"aiContext"` to `extra_enrichments`. A disabled pipeline or
/// a losing race against `timeout` leave the payload exactly as built by
/// [`build_exception_payload`] (fail-open, spec.md §4.15).
#[allow(clippy::too_many_arguments)]
pub async fn enrich_exception_payload<S>(
    payload: &mut LogPayload,
    enabled: bool,
    capture_state_enabled: bool,
    host: &dyn HostContext,
    cache: &mut SourceMapCache,
    limits: &Limits,
    timeout: S,
) where
    S: Future<Output = ()> + Unpin,
{
    let stack = payload.fields.get("stack").and_then(Value::as_str);
    let error_message = payload.error_message.clone().unwrap_or_default();

    if let Some(ai_context) = enrich_error_with_ai_context(
        enabled,
        &error_message,
        stack,
        host,
        cache,
        capture_state_enabled,
        limits,
        timeout,
    )
    .await
    {
        if let Ok(value) = serde_json::to_value(&ai_context) {
            payload.fields.insert("_aiContext".to_string(), value);
            payload.extra_enrichments.push("aiContext".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasoline_aicontext::FiberNode;
    use std::pin::Pin;
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn noop_waker() -> Waker {
        fn clone(_: *const ()) -> RawWaker {
            raw()
        }
        fn noop(_: *const ()) {}
        fn raw() -> RawWaker {
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        unsafe { Waker::from_raw(raw()) }
    }

    fn block_on<F: Future>(mut f: F) -> F::Output {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut f = unsafe { Pin::new_unchecked(&mut f) };
        match f.as_mut().poll(&mut cx) {
            Poll::Ready(v) => v,
            Poll::Pending => panic!("future did not resolve on first poll"),
        }
    }

    struct NoopHost;
    impl HostContext for NoopHost {
        fn source_map_data_url(&self, _script_url: &str) -> Option<String> {
            None
        }
        fn focused_element_property_keys(&self) -> Option<Vec<String>> {
            None
        }
        fn react_fiber_chain(&self, _fiber_key: &str) -> Option<Vec<FiberNode>> {
            None
        }
        fn redux_state(&self) -> Option<Value> {
            None
        }
    }

    #[test]
    fn rejection_messages_get_prefixed() {
        let payload = build_exception_payload(
            ExceptionKind::UnhandledRejection,
            ExceptionInput {
                message: "boom".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(payload.message.as_deref(), Some("Unhandled Promise Rejection: boom"));
    }

    #[test]
    fn source_combines_filename_and_lineno() {
        let payload = build_exception_payload(
            ExceptionKind::GlobalError,
            ExceptionInput {
                message: "boom".to_string(),
                filename: Some("app.js".to_string()),
                lineno: Some(10),
                ..Default::default()
            },
        );
        assert_eq!(payload.source.as_deref(), Some("app.js:10"));
    }

    #[test]
    fn disabled_enrichment_leaves_payload_untouched() {
        let mut payload = build_exception_payload(
            ExceptionKind::GlobalError,
            ExceptionInput {
                message: "boom".to_string(),
                ..Default::default()
            },
        );
        let mut cache = SourceMapCache::new(20);
        let host = NoopHost;
        block_on(enrich_exception_payload(
            &mut payload,
            false,
            false,
            &host,
            &mut cache,
            &Limits::default(),
            std::future::ready(()),
        ));
        assert!(payload.fields.get("_aiContext").is_none());
        assert!(payload.extra_enrichments.is_empty());
    }

    #[test]
    fn enabled_enrichment_attaches_ai_context_and_tag() {
        let mut payload = build_exception_payload(
            ExceptionKind::GlobalError,
            ExceptionInput {
                message: "TypeError: boom".to_string(),
                stack: Some("at foo (app.js:1:1)".to_string()),
                ..Default::default()
            },
        );
        let mut cache = SourceMapCache::new(20);
        let host = NoopHost;
        block_on(enrich_exception_payload(
            &mut payload,
            true,
            false,
            &host,
            &mut cache,
            &Limits::default(),
            std::future::ready(()),
        ));
        assert!(payload.fields.get("_aiContext").is_some());
        assert_eq!(payload.extra_enrichments, vec!["aiContext".to_string()]);
    }
}
