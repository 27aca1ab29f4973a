//! The only real `setTimeout`-backed timer: a [`gasoline_timers::DeferredFuture`]
//! resolved from a `window.setTimeout` callback, used as the `timer` half
//! of `race_with_timeout` everywhere this crate needs a bounded wait
//! (spec.md §4.12's AI-enrichment timeout, §4.9's body-read timeout).

use gasoline_timers::{Deferred, DeferredFuture};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

pub fn sleep_ms(ms: i32) -> DeferredFuture<()> {
    let (deferred, future) = Deferred::<()>::new();
    let closure = Closure::once(move || deferred.resolve(()));
    let function: &js_sys::Function = closure.as_ref().unchecked_ref();

    match web_sys::window() {
        Some(window) => {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(function, ms);
        }
        None => {
            // No window (e.g. a worker without one); resolve immediately
            // rather than hang forever on a timer that can never fire.
            let _ = function.call0(&wasm_bindgen::JsValue::UNDEFINED);
        }
    }
    closure.forget();
    future
}
