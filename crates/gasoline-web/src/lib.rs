//! wasm-bindgen entry point (spec.md §4.1, §4.14): binds every
//! host-agnostic capture module onto real browser globals behind a
//! single `gasolineInstall`/`gasolineUninstall` pair, and exposes the
//! JS-facing context-annotation and reproduction-script surface. This is
//! the only crate in the workspace that is allowed to touch `window`.

mod actions_dom;
mod bridge_sink;
mod clock;
mod console;
mod element;
mod exception;
mod host_context;
mod js_value;
mod network;
mod performance;
mod sleep;
mod waterfall;
mod websocket;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use wasm_bindgen::prelude::*;

use gasoline_actions::ActionCapture;
use gasoline_aicontext::SourceMapCache;
use gasoline_bridge::PostSink;
use gasoline_config::{Config, Limits};
use gasoline_context::ContextAnnotations;
use gasoline_network::PendingRequests;
use gasoline_performance::{MarkMeasureStore, VitalsTracker};
use gasoline_repro::{generate_script, ScriptOptions};
use gasoline_serialize::serialize;
use gasoline_websocket::ConnectionRegistry;

use actions_dom::ActionTaps;
use bridge_sink::WindowPostSink;
use clock::{now_ms, page_origin};
use console::ConsoleTaps;
use exception::ExceptionTaps;
use js_value::stage_root;
use network::FetchTap;
use performance::PerformanceTap;
use websocket::WebSocketTap;

struct GasolineState {
    config: Config,
    limits: Limits,
    post: Rc<dyn PostSink>,
    context: Rc<RefCell<ContextAnnotations>>,
    actions: Rc<RefCell<ActionCapture>>,
    pending: Rc<RefCell<PendingRequests>>,
    connections: Rc<RefCell<ConnectionRegistry>>,
    perf_store: Rc<RefCell<MarkMeasureStore>>,
    vitals: Rc<RefCell<VitalsTracker>>,
    source_maps: Rc<RefCell<SourceMapCache>>,
    console: ConsoleTaps,
    exception: ExceptionTaps,
    actions_dom: ActionTaps,
    fetch: FetchTap,
    websocket: WebSocketTap,
    performance: PerformanceTap,
}

thread_local! {
    static STATE: RefCell<Option<GasolineState>> = const { RefCell::new(None) };
}

fn js_err(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

fn init_panic_hook_and_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    });
}

/// `gasolineInstall(opts)`: the one entry point a page calls to turn on
/// capture. `opts` may be `undefined`/`{}` for defaults. Refuses a second
/// install without an intervening `gasolineUninstall()`.
#[wasm_bindgen(js_name = gasolineInstall)]
pub fn install(opts: JsValue) -> Result<(), JsValue> {
    init_panic_hook_and_tracing();

    if STATE.with(|s| s.borrow().is_some()) {
        return Err(js_err("gasoline is already installed"));
    }

    let config: Config = if opts.is_undefined() || opts.is_null() {
        Config::default()
    } else {
        serde_wasm_bindgen::from_value(opts).map_err(js_err)?
    };
    let limits = Limits::default();
    let origin = page_origin();

    let mut state = GasolineState {
        post: Rc::new(WindowPostSink),
        context: Rc::new(RefCell::new(ContextAnnotations::new())),
        actions: Rc::new(RefCell::new(ActionCapture::new(&limits))),
        pending: Rc::new(RefCell::new(PendingRequests::new())),
        connections: Rc::new(RefCell::new(ConnectionRegistry::new())),
        perf_store: Rc::new(RefCell::new(MarkMeasureStore::new())),
        vitals: Rc::new(RefCell::new(VitalsTracker::new())),
        source_maps: Rc::new(RefCell::new(SourceMapCache::new(limits.ai_source_map_cache_cap))),
        console: ConsoleTaps::new(),
        exception: ExceptionTaps::new(),
        actions_dom: ActionTaps::new(),
        fetch: FetchTap::new(),
        websocket: WebSocketTap::new(),
        performance: PerformanceTap::new(),
        config,
        limits,
    };

    state
        .console
        .install(
            state.post.clone(),
            state.context.clone(),
            state.actions.clone(),
            state.limits,
            origin.clone(),
        )
        .map_err(js_err)?;

    state
        .exception
        .install(
            state.post.clone(),
            state.source_maps.clone(),
            state.context.clone(),
            state.actions.clone(),
            state.limits,
            origin.clone(),
            state.config.ai_context_enabled,
            state.config.ai_context_state_snapshot_enabled,
        )
        .map_err(js_err)?;

    if state.config.action_capture_enabled {
        state
            .actions_dom
            .install(state.actions.clone(), state.limits)
            .map_err(js_err)?;
    }

    if state.config.network_waterfall_enabled {
        state
            .fetch
            .install(
                state.post.clone(),
                state.pending.clone(),
                state.limits,
                state.config.network_body_capture_enabled,
                state.config.server_url.clone(),
            )
            .map_err(js_err)?;
    }

    if state.config.web_socket_capture_enabled {
        state
            .websocket
            .install(
                state.connections.clone(),
                state.post.clone(),
                state.limits,
                state.config.web_socket_capture_mode,
            )
            .map_err(js_err)?;
    }

    if state.config.performance_marks_enabled {
        state
            .performance
            .install(state.perf_store.clone(), state.vitals.clone(), state.limits)
            .map_err(js_err)?;
    }

    STATE.with(|s| *s.borrow_mut() = Some(state));
    Ok(())
}

/// Tears down every wrapped global and drops all buffered state. Safe to
/// call when nothing is installed.
#[wasm_bindgen(js_name = gasolineUninstall)]
pub fn uninstall() -> Result<(), JsValue> {
    STATE.with(|s| {
        let Some(mut state) = s.borrow_mut().take() else {
            return Ok(());
        };
        state.console.uninstall().map_err(js_err)?;
        state.exception.uninstall().map_err(js_err)?;
        state.actions_dom.uninstall().map_err(js_err)?;
        state.fetch.uninstall().map_err(js_err)?;
        state.websocket.uninstall().map_err(js_err)?;
        state.performance.uninstall().map_err(js_err)?;
        Ok(())
    })
}

/// Stages and stores a context annotation (spec.md §4.7). `value` may be
/// any structured-cloneable JS value; it goes through the same safe
/// serializer console capture uses before it ever reaches
/// [`ContextAnnotations::set`].
#[wasm_bindgen(js_name = gasolineSetContext)]
pub fn set_context(key: String, value: JsValue) -> Result<(), JsValue> {
    STATE.with(|s| {
        let borrow = s.borrow();
        let Some(state) = borrow.as_ref() else {
            return Err(js_err("gasoline is not installed"));
        };
        let (arena, id) = stage_root(&value);
        let serialized = serialize(&arena, id, &state.limits);
        state
            .context
            .borrow_mut()
            .set(&key, serialized, &state.limits)
            .map_err(js_err)
    })
}

/// Removes a single context annotation. Returns `false` if it wasn't set.
#[wasm_bindgen(js_name = gasolineRemoveContext)]
pub fn remove_context(key: String) -> bool {
    STATE.with(|s| {
        s.borrow()
            .as_ref()
            .map(|state| state.context.borrow_mut().remove(&key))
            .unwrap_or(false)
    })
}

/// Clears every context annotation.
#[wasm_bindgen(js_name = gasolineClearContext)]
pub fn clear_context() {
    STATE.with(|s| {
        if let Some(state) = s.borrow().as_ref() {
            state.context.borrow_mut().clear();
        }
    });
}

/// Generates a Playwright-style reproduction script from the captured
/// action buffer (spec.md §4.6). `opts` is an optional
/// `{baseUrl, errorMessage, window}` object.
#[wasm_bindgen(js_name = gasolineGetReproductionScript)]
pub fn get_reproduction_script(opts: JsValue) -> Result<String, JsValue> {
    STATE.with(|s| {
        let borrow = s.borrow();
        let Some(state) = borrow.as_ref() else {
            return Err(js_err("gasoline is not installed"));
        };
        let script_opts: ScriptOptions = if opts.is_undefined() || opts.is_null() {
            ScriptOptions::default()
        } else {
            serde_wasm_bindgen::from_value(opts).map_err(js_err)?
        };
        let actions = state.actions.borrow().enhanced_buffer();
        Ok(generate_script(&actions, &script_opts, &state.limits))
    })
}

/// Snapshots marks/measures recorded since `sinceMs` (defaults to the
/// whole buffer) plus Core Web Vitals (spec.md §4.11).
#[wasm_bindgen(js_name = gasolineGetPerformanceSnapshot)]
pub fn get_performance_snapshot(since_ms: Option<f64>) -> Result<JsValue, JsValue> {
    STATE.with(|s| {
        let borrow = s.borrow();
        let Some(state) = borrow.as_ref() else {
            return Err(js_err("gasoline is not installed"));
        };
        let store = state.perf_store.borrow();
        let vitals = state.vitals.borrow();
        let (marks, measures) = match since_ms {
            Some(since) => (store.marks_since(since as u64), store.measures_since(since as u64)),
            None => (store.marks(), store.measures()),
        };
        let snapshot = serde_json::json!({
            "marks": marks,
            "measures": measures,
            "longTasks": vitals.long_task_metrics(),
            "fcp": vitals.fcp(),
            "lcp": vitals.lcp(),
            "cls": vitals.cls(),
            "inp": vitals.inp(),
        });
        serde_wasm_bindgen::to_value(&snapshot).map_err(js_err)
    })
}

/// The last `waterfallWindowMs` of network activity plus anything still
/// in flight, in the same shape attached to error events (spec.md §4.8).
#[wasm_bindgen(js_name = gasolineGetNetworkWaterfall)]
pub fn get_network_waterfall() -> Result<JsValue, JsValue> {
    STATE.with(|s| {
        let borrow = s.borrow();
        let Some(state) = borrow.as_ref() else {
            return Err(js_err("gasoline is not installed"));
        };
        let snapshot = waterfall::snapshot(
            state.config.network_waterfall_enabled,
            now_ms() as f64,
            &state.pending,
            &state.limits,
        );
        serde_wasm_bindgen::to_value(&snapshot).map_err(js_err)
    })
}

/// `true` once `gasolineInstall` has run and hasn't been undone yet.
#[wasm_bindgen(js_name = gasolineIsInstalled)]
pub fn is_installed() -> bool {
    STATE.with(|s| s.borrow().is_some())
}
