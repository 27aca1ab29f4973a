//! Wraps the global `WebSocket` constructor (spec.md §4.10). A
//! constructor function built via `new Function` can return an
//! arbitrary object to stand in for `this`, which lets the shim hand
//! back the real native `WebSocket` instance while still observing every
//! connection's lifecycle and traffic.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CloseEvent, Event as DomEvent, MessageEvent, WebSocket};

use gasoline_bridge::{post_ws_event, PostSink, WsEvent};
use gasoline_config::{CaptureMode, Limits};
use gasoline_core::{Interceptor, InterceptorError};
use gasoline_websocket::{format_payload, ConnectionRegistry, Direction, RawPayload};

use crate::clock::{iso_from_ms, now_iso, now_ms, page_origin};

/// The early-patch protocol's well-known slots (spec.md §4.10, §6): a
/// tiny inline script loaded before this module may have already
/// wrapped `WebSocket` to avoid missing connections opened during
/// module load. Both are read once, then deleted.
const EARLY_ORIGINAL_KEY: &str = "__GASOLINE_ORIGINAL_WS__";
const EARLY_BUFFER_KEY: &str = "__GASOLINE_EARLY_WS__";

const RUNTIME_ORIGINAL_KEY: &str = "__gasoline_ws_runtime_original__";
const ATTACH_KEY: &str = "__gasoline_ws_attach__";

#[allow(clippy::too_many_arguments)]
fn emit_ws_event(
    id: &str,
    url: &str,
    event: &str,
    ts: String,
    code: Option<u16>,
    reason: Option<String>,
    direction: Option<&str>,
    data: Option<String>,
    size: Option<usize>,
    truncated: Option<bool>,
    post: &dyn PostSink,
    origin: &str,
) {
    post_ws_event(
        WsEvent {
            kind: "websocket".to_string(),
            event: event.to_string(),
            id: id.to_string(),
            url: url.to_string(),
            ts,
            code,
            reason,
            direction: direction.map(|d| d.to_string()),
            data,
            size,
            truncated,
        },
        post,
        origin,
    );
}

fn wrap_send(ws: &WebSocket, registry: Rc<RefCell<ConnectionRegistry>>, connection_id: String, url: String, post: Rc<dyn PostSink>, limits: Limits, origin: String) {
    let Ok(original_send) = Reflect::get(ws.unchecked_ref(), &JsValue::from_str("send")) else {
        return;
    };
    let Ok(original_send) = original_send.dyn_into::<js_sys::Function>() else {
        return;
    };
    let ws_for_call = ws.clone();

    let closure: Closure<dyn FnMut(JsValue) -> JsValue> = Closure::wrap(Box::new(move |data: JsValue| {
        let mut registry = registry.borrow_mut();
        if let Some(tracker) = registry.get_mut(&connection_id) {
            let text = data.as_string();
            let preview = text.as_deref().unwrap_or("[non-text payload]");
            let formatted = match &text {
                Some(s) => format_payload(&RawPayload::Text(s), &limits),
                None => format_payload(&RawPayload::Text(preview), &limits),
            };
            let byte_len = formatted.body.len();
            let sampled = tracker.record_message(Direction::Outgoing, byte_len, &formatted.body, now_ms(), &limits);
            if sampled {
                emit_ws_event(
                    &connection_id,
                    &url,
                    "message",
                    now_iso(),
                    None,
                    None,
                    Some("outgoing"),
                    Some(formatted.body),
                    Some(byte_len),
                    Some(formatted.truncated),
                    post.as_ref(),
                    &origin,
                );
            }
        }
        let args = js_sys::Array::new();
        args.push(&data);
        original_send.apply(&ws_for_call, &args).unwrap_or(JsValue::UNDEFINED)
    }) as Box<dyn FnMut(JsValue) -> JsValue>);

    if Reflect::set(ws.unchecked_ref(), &JsValue::from_str("send"), closure.as_ref().unchecked_ref()).is_ok() {
        closure.forget();
    }
}

fn attach_message_listener(ws: &WebSocket, registry: Rc<RefCell<ConnectionRegistry>>, connection_id: String, url: String, post: Rc<dyn PostSink>, limits: Limits, origin: String) {
    let closure: Closure<dyn FnMut(MessageEvent)> = Closure::wrap(Box::new(move |event: MessageEvent| {
        let mut registry = registry.borrow_mut();
        let Some(tracker) = registry.get_mut(&connection_id) else { return };
        let text = event.data().as_string();
        let formatted = match &text {
            Some(s) => format_payload(&RawPayload::Text(s), &limits),
            None => format_payload(&RawPayload::Text("[binary]"), &limits),
        };
        if let Ok(parsed) = js_sys::JSON::parse(text.as_deref().unwrap_or("")) {
            if parsed.is_object() && !js_sys::Array::is_array(&parsed) {
                let keys: Vec<String> = Object::keys(parsed.unchecked_ref())
                    .iter()
                    .filter_map(|k| k.as_string())
                    .collect();
                tracker.record_schema(&keys, &limits);
            }
        }
        let byte_len = formatted.body.len();
        let sampled = tracker.record_message(Direction::Incoming, byte_len, &formatted.body, now_ms(), &limits);
        if sampled {
            emit_ws_event(
                &connection_id,
                &url,
                "message",
                now_iso(),
                None,
                None,
                Some("incoming"),
                Some(formatted.body),
                Some(byte_len),
                Some(formatted.truncated),
                post.as_ref(),
                &origin,
            );
        }
    }) as Box<dyn FnMut(MessageEvent)>);
    let _ = ws.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref());
    closure.forget();
}

fn attach_close_listener(ws: &WebSocket, registry: Rc<RefCell<ConnectionRegistry>>, connection_id: String, url: String, post: Rc<dyn PostSink>, origin: String) {
    let closure: Closure<dyn FnMut(CloseEvent)> = Closure::wrap(Box::new(move |event: CloseEvent| {
        registry.borrow_mut().close(&connection_id);
        emit_ws_event(
            &connection_id,
            &url,
            "close",
            now_iso(),
            Some(event.code()),
            Some(event.reason()),
            None,
            None,
            None,
            None,
            post.as_ref(),
            &origin,
        );
    }) as Box<dyn FnMut(CloseEvent)>);
    let _ = ws.add_event_listener_with_callback("close", closure.as_ref().unchecked_ref());
    closure.forget();
}

fn attach_error_listener(ws: &WebSocket, connection_id: String, url: String, post: Rc<dyn PostSink>, origin: String) {
    let closure: Closure<dyn FnMut(DomEvent)> = Closure::wrap(Box::new(move |_event: DomEvent| {
        emit_ws_event(&connection_id, &url, "error", now_iso(), None, None, None, None, None, None, post.as_ref(), &origin);
    }) as Box<dyn FnMut(DomEvent)>);
    let _ = ws.add_event_listener_with_callback("error", closure.as_ref().unchecked_ref());
    closure.forget();
}

fn wire_taps(ws: &WebSocket, connection_id: String, url: String, registry: Rc<RefCell<ConnectionRegistry>>, post: Rc<dyn PostSink>, limits: Limits, origin: String) {
    wrap_send(ws, registry.clone(), connection_id.clone(), url.clone(), post.clone(), limits, origin.clone());
    attach_message_listener(ws, registry.clone(), connection_id.clone(), url.clone(), post.clone(), limits, origin.clone());
    attach_close_listener(ws, registry, connection_id.clone(), url.clone(), post.clone(), origin.clone());
    attach_error_listener(ws, connection_id, url, post, origin);
}

fn attach(ws: &WebSocket, registry: Rc<RefCell<ConnectionRegistry>>, post: Rc<dyn PostSink>, limits: Limits, capture_mode: CaptureMode, origin: String) {
    let url = ws.url();
    let connection_id = registry.borrow_mut().open(url.clone(), capture_mode);
    emit_ws_event(&connection_id, &url, "open", now_iso(), None, None, None, None, None, None, post.as_ref(), &origin);
    wire_taps(ws, connection_id, url, registry, post, limits, origin);
}

fn events_contain(events: &Array, kind: &str) -> bool {
    events.iter().any(|e| {
        Reflect::get(&e, &JsValue::from_str("type"))
            .ok()
            .and_then(|v| v.as_string())
            .as_deref()
            == Some(kind)
    })
}

fn buffered_open_ts(events: &Array) -> Option<f64> {
    events.iter().find_map(|e| {
        let kind = Reflect::get(&e, &JsValue::from_str("type")).ok()?.as_string()?;
        if kind != "open" {
            return None;
        }
        Reflect::get(&e, &JsValue::from_str("ts")).ok()?.as_f64()
    })
}

/// Adopts connections an early-patch script buffered before this module
/// finished loading (spec.md §4.10): for each non-closed entry, opens a
/// tracker, emits a synthetic `open` using the buffered timestamp, then
/// wires the same taps a freshly-constructed connection gets.
fn adopt_early_connections(window: &web_sys::Window, registry: Rc<RefCell<ConnectionRegistry>>, post: Rc<dyn PostSink>, limits: Limits, capture_mode: CaptureMode, origin: String) {
    let Ok(buffer) = Reflect::get(window, &JsValue::from_str(EARLY_BUFFER_KEY)) else {
        return;
    };
    if buffer.is_undefined() || buffer.is_null() {
        return;
    }
    let Ok(entries) = buffer.dyn_into::<Array>() else {
        return;
    };

    for entry in entries.iter() {
        let Ok(ws) = Reflect::get(&entry, &JsValue::from_str("ws")).and_then(|v| v.dyn_into::<WebSocket>()) else {
            continue;
        };
        let url = Reflect::get(&entry, &JsValue::from_str("url"))
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_else(|| ws.url());
        let events: Array = Reflect::get(&entry, &JsValue::from_str("events"))
            .ok()
            .and_then(|v| v.dyn_into::<Array>().ok())
            .unwrap_or_else(Array::new);

        if events_contain(&events, "close") {
            continue;
        }

        let connection_id = registry.borrow_mut().open(url.clone(), capture_mode);
        let ts = buffered_open_ts(&events).map(iso_from_ms).unwrap_or_else(now_iso);
        emit_ws_event(&connection_id, &url, "open", ts, None, None, None, None, None, None, post.as_ref(), &origin);
        wire_taps(&ws, connection_id, url, registry.clone(), post.clone(), limits, origin.clone());
    }
}

#[derive(Default)]
pub struct WebSocketTap {
    interceptor: Interceptor<JsValue>,
    attach_closure: Option<Closure<dyn FnMut(JsValue)>>,
}

impl WebSocketTap {
    pub fn new() -> Self {
        WebSocketTap::default()
    }

    pub fn is_installed(&self) -> bool {
        self.interceptor.is_installed()
    }

    pub fn install(
        &mut self,
        registry: Rc<RefCell<ConnectionRegistry>>,
        post: Rc<dyn PostSink>,
        limits: Limits,
        capture_mode: CaptureMode,
    ) -> Result<(), InterceptorError> {
        if self.interceptor.is_installed() {
            return Err(InterceptorError::AlreadyInstalled);
        }
        let Some(window) = web_sys::window() else {
            return Ok(());
        };
        let origin = page_origin();

        let early_original = Reflect::get(&window, &JsValue::from_str(EARLY_ORIGINAL_KEY)).ok();
        let original = match early_original {
            Some(v) if !v.is_undefined() && !v.is_null() => v,
            _ => match Reflect::get(&window, &JsValue::from_str("WebSocket")) {
                Ok(v) => v,
                Err(_) => return Ok(()),
            },
        };
        let Ok(original_fn) = original.clone().dyn_into::<js_sys::Function>() else {
            return Ok(());
        };

        adopt_early_connections(&window, registry.clone(), post.clone(), limits, capture_mode, origin.clone());
        let _ = Reflect::delete_property(&window, &JsValue::from_str(EARLY_ORIGINAL_KEY));
        let _ = Reflect::delete_property(&window, &JsValue::from_str(EARLY_BUFFER_KEY));

        let attach_closure: Closure<dyn FnMut(JsValue)> = Closure::wrap(Box::new(move |value: JsValue| {
            if let Ok(ws) = value.dyn_into::<WebSocket>() {
                attach(&ws, registry.clone(), post.clone(), limits, capture_mode, origin.clone());
            }
        }) as Box<dyn FnMut(JsValue)>);

        if Reflect::set(&window, &JsValue::from_str(RUNTIME_ORIGINAL_KEY), &original).is_err() {
            return Ok(());
        }
        if Reflect::set(&window, &JsValue::from_str(ATTACH_KEY), attach_closure.as_ref().unchecked_ref()).is_err() {
            return Ok(());
        }

        let body = format!(
            "var ws = new window[{RUNTIME_ORIGINAL_KEY:?}](...arguments); window[{ATTACH_KEY:?}](ws); return ws;"
        );
        let shim = js_sys::Function::new_with_args("", &body);

        if let Ok(proto) = Reflect::get(&original_fn, &JsValue::from_str("prototype")) {
            let _ = Reflect::set(&shim, &JsValue::from_str("prototype"), &proto);
        }
        for key in ["CONNECTING", "OPEN", "CLOSING", "CLOSED"] {
            if let Ok(v) = Reflect::get(&original_fn, &JsValue::from_str(key)) {
                let _ = Reflect::set(&shim, &JsValue::from_str(key), &v);
            }
        }

        if Reflect::set(&window, &JsValue::from_str("WebSocket"), &shim).is_ok() {
            self.interceptor.install(original).ok();
        }
        self.attach_closure = Some(attach_closure);
        Ok(())
    }

    pub fn uninstall(&mut self) -> Result<(), InterceptorError> {
        let Some(window) = web_sys::window() else {
            self.attach_closure = None;
            return Ok(());
        };
        if let Ok(original) = self.interceptor.uninstall() {
            let _ = Reflect::set(&window, &JsValue::from_str("WebSocket"), &original);
        }
        let _ = Reflect::delete_property(&window, &JsValue::from_str(RUNTIME_ORIGINAL_KEY));
        let _ = Reflect::delete_property(&window, &JsValue::from_str(ATTACH_KEY));
        self.attach_closure = None;
        Ok(())
    }
}
