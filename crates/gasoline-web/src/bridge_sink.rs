//! The real [`PostSink`]: `window.postMessage(envelope, origin)`, with
//! the same-origin rule enforced by `gasoline-bridge` upstream of this
//! (spec.md §4.13) — this file only has to get the envelope onto the
//! wire.

use serde_json::Value;

use gasoline_bridge::{Envelope, PostSink};

pub struct WindowPostSink;

impl PostSink for WindowPostSink {
    fn post(&self, envelope: &Envelope, origin: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Ok(js_envelope) = serde_wasm_bindgen::to_value(envelope) else {
            return;
        };
        let _ = window.post_message(&js_envelope, origin);
    }

    fn post_value(&self, envelope_type: &str, payload: Value, origin: &str) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let envelope = serde_json::json!({ "type": envelope_type, "payload": payload });
        let Ok(js_envelope) = serde_wasm_bindgen::to_value(&envelope) else {
            return;
        };
        let _ = window.post_message(&js_envelope, origin);
    }
}
