//! Reads `performance.getEntriesByType("resource")` on demand and feeds
//! it through [`get_network_waterfall_for_error`] (spec.md §4.8). Unlike
//! the other taps this isn't an interceptor: the browser already records
//! every resource fetch, so the waterfall is a snapshot read rather than
//! a standing capture.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};

use gasoline_config::Limits;
use gasoline_network::{get_network_waterfall_for_error, NetworkWaterfallSnapshot, PendingRequests, ResourceTimingEntry};

use crate::clock::now_iso;

fn get_f64(entry: &JsValue, key: &str) -> f64 {
    Reflect::get(entry, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

fn get_string(entry: &JsValue, key: &str) -> String {
    Reflect::get(entry, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_default()
}

fn to_resource_timing(entry: &JsValue) -> ResourceTimingEntry {
    ResourceTimingEntry {
        name: get_string(entry, "name"),
        initiator_type: get_string(entry, "initiatorType"),
        start_time: get_f64(entry, "startTime"),
        duration: get_f64(entry, "duration"),
        domain_lookup_start: get_f64(entry, "domainLookupStart"),
        domain_lookup_end: get_f64(entry, "domainLookupEnd"),
        connect_start: get_f64(entry, "connectStart"),
        connect_end: get_f64(entry, "connectEnd"),
        secure_connection_start: get_f64(entry, "secureConnectionStart"),
        request_start: get_f64(entry, "requestStart"),
        response_start: get_f64(entry, "responseStart"),
        response_end: get_f64(entry, "responseEnd"),
        transfer_size: get_f64(entry, "transferSize"),
        encoded_body_size: get_f64(entry, "encodedBodySize"),
        decoded_body_size: get_f64(entry, "decodedBodySize"),
    }
}

fn resource_entries() -> Vec<ResourceTimingEntry> {
    let Some(window) = web_sys::window() else {
        return Vec::new();
    };
    let Some(performance) = window.performance() else {
        return Vec::new();
    };
    let Ok(get_entries) = Reflect::get(&performance, &JsValue::from_str("getEntriesByType")) else {
        return Vec::new();
    };
    let Ok(get_entries) = get_entries.dyn_into::<Function>() else {
        return Vec::new();
    };
    let Ok(entries) = get_entries.call1(&performance, &JsValue::from_str("resource")) else {
        return Vec::new();
    };
    let entries: Array = entries.unchecked_into();
    entries.iter().map(|entry| to_resource_timing(&entry)).collect()
}

/// The waterfall + still-pending-requests snapshot as of right now.
/// `None` when `enabled` is `false` (spec.md §4.8 toggle).
pub fn snapshot(enabled: bool, now_ms: f64, pending: &Rc<RefCell<PendingRequests>>, limits: &Limits) -> Option<NetworkWaterfallSnapshot> {
    let entries = resource_entries();
    let pending_snapshot = pending.borrow().snapshot();
    get_network_waterfall_for_error(enabled, &now_iso(), now_ms, &entries, &pending_snapshot, limits)
}
