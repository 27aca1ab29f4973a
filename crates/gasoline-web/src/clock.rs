//! The only place real wall-clock/page-location reads happen; every
//! other crate takes `now_ms`/`now_iso`/`url` as plain parameters so it
//! stays host-agnostic and testable without a DOM.

pub fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

pub fn now_iso() -> String {
    let date = js_sys::Date::new_0();
    date.to_iso_string().as_string().unwrap_or_default()
}

pub fn page_url() -> String {
    web_sys::window()
        .and_then(|w| w.location().href().ok())
        .unwrap_or_default()
}

pub fn page_origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default()
}

/// Converts an epoch-millisecond timestamp (as buffered by an
/// early-patch script, before this module's own clock is running) into
/// the same ISO-8601 shape `now_iso` produces.
pub fn iso_from_ms(ms: f64) -> String {
    js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(ms))
        .to_iso_string()
        .as_string()
        .unwrap_or_default()
}
