//! Wraps `performance.mark`/`performance.measure` and runs a single
//! `PerformanceObserver` across marks, measures, long tasks and the
//! paint/LCP/CLS/event-timing entry types that feed [`VitalsTracker`]
//! (spec.md §4.11). Entries the observer reports that the wrapped calls
//! already recorded are deduped via `backfill_*`'s `(name, startTime)`
//! check.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{PerformanceObserver, PerformanceObserverInit};

use gasoline_config::Limits;
use gasoline_core::{Interceptor, InterceptorError};
use gasoline_performance::{MarkMeasureStore, VitalsTracker};

use crate::clock::now_ms;

const ENTRY_TYPES: &[&str] = &[
    "mark",
    "measure",
    "longtask",
    "paint",
    "largest-contentful-paint",
    "layout-shift",
    "event",
];

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

fn get_bool(entry: &JsValue, key: &str) -> bool {
    Reflect::get(entry, &JsValue::from_str(key))
        .ok()
        .map(|v| v.is_truthy())
        .unwrap_or(false)
}

fn dispatch_entry(entry: &JsValue, store: &mut MarkMeasureStore, vitals: &mut VitalsTracker, limits: &Limits) {
    let entry_type = get_string(entry, "entryType");
    let name = get_string(entry, "name");
    let start_time = get_f64(entry, "startTime");
    let duration = get_f64(entry, "duration");

    match entry_type.as_str() {
        "mark" => store.backfill_mark(name, start_time, now_ms(), limits),
        "measure" => store.backfill_measure(name, start_time, duration, now_ms(), limits),
        "longtask" => vitals.record_long_task(start_time, duration, limits),
        "paint" if name == "first-contentful-paint" => vitals.record_fcp(start_time),
        "largest-contentful-paint" => vitals.record_lcp(start_time),
        "layout-shift" => {
            let value = get_f64(entry, "value");
            let had_recent_input = get_bool(entry, "hadRecentInput");
            vitals.record_layout_shift(value, had_recent_input);
        }
        "event" => vitals.record_interaction(duration),
        _ => {}
    }
}

fn install_observer(store: Rc<RefCell<MarkMeasureStore>>, vitals: Rc<RefCell<VitalsTracker>>, limits: Limits) -> Option<PerformanceObserver> {
    let closure: Closure<dyn FnMut(JsValue, JsValue)> = Closure::wrap(Box::new(move |list: JsValue, _observer: JsValue| {
        let Ok(get_entries) = Reflect::get(&list, &JsValue::from_str("getEntries")) else { return };
        let Ok(get_entries) = get_entries.dyn_into::<Function>() else { return };
        let Ok(entries) = get_entries.call0(&list) else { return };
        let entries: Array = entries.unchecked_into();
        let mut store = store.borrow_mut();
        let mut vitals = vitals.borrow_mut();
        for entry in entries.iter() {
            dispatch_entry(&entry, &mut store, &mut vitals, &limits);
        }
    }) as Box<dyn FnMut(JsValue, JsValue)>);

    let observer = PerformanceObserver::new(closure.as_ref().unchecked_ref()).ok()?;
    closure.forget();

    let types = Array::new();
    for entry_type in ENTRY_TYPES {
        types.push(&JsValue::from_str(entry_type));
    }
    let init = PerformanceObserverInit::new();
    init.set_entry_types(&types);
    // `buffered: true` lets the observer backfill entries recorded
    // before it was attached, not just ones from this point forward.
    let _ = Reflect::set(init.unchecked_ref(), &JsValue::from_str("buffered"), &JsValue::TRUE);
    let _ = observer.observe_with_performance_observer_init(&init);

    Some(observer)
}

#[derive(Default)]
pub struct PerformanceTap {
    interceptor: Interceptor<(Function, Function)>,
    mark_closure: Option<Closure<dyn FnMut(JsValue, JsValue) -> JsValue>>,
    measure_closure: Option<Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>>,
    observer: Option<PerformanceObserver>,
}

impl PerformanceTap {
    pub fn new() -> Self {
        PerformanceTap::default()
    }

    pub fn is_installed(&self) -> bool {
        self.interceptor.is_installed()
    }

    pub fn install(
        &mut self,
        store: Rc<RefCell<MarkMeasureStore>>,
        vitals: Rc<RefCell<VitalsTracker>>,
        limits: Limits,
    ) -> Result<(), InterceptorError> {
        if self.interceptor.is_installed() {
            return Err(InterceptorError::AlreadyInstalled);
        }
        let Some(window) = web_sys::window() else {
            return Ok(());
        };
        let Some(performance) = window.performance() else {
            return Ok(());
        };

        let Ok(original_mark) = Reflect::get(&performance, &JsValue::from_str("mark")) else {
            return Ok(());
        };
        let Ok(original_mark) = original_mark.dyn_into::<Function>() else {
            return Ok(());
        };
        let Ok(original_measure) = Reflect::get(&performance, &JsValue::from_str("measure")) else {
            return Ok(());
        };
        let Ok(original_measure) = original_measure.dyn_into::<Function>() else {
            return Ok(());
        };

        {
            let performance = performance.clone();
            let original = original_mark.clone();
            let store = store.clone();
            let limits = limits;
            let closure: Closure<dyn FnMut(JsValue, JsValue) -> JsValue> =
                Closure::wrap(Box::new(move |name: JsValue, options: JsValue| -> JsValue {
                    let args = Array::new();
                    args.push(&name);
                    if !options.is_undefined() {
                        args.push(&options);
                    }
                    let result = original.apply(&performance, &args);
                    if let Some(name_str) = name.as_string() {
                        let detail = if options.is_object() {
                            Reflect::get(&options, &JsValue::from_str("detail"))
                                .ok()
                                .and_then(|v| serde_wasm_bindgen::from_value(v).ok())
                        } else {
                            None
                        };
                        let start_time = performance.now();
                        store.borrow_mut().record_mark(name_str, start_time, detail, now_ms(), &limits);
                    }
                    result.unwrap_or(JsValue::UNDEFINED)
                }) as Box<dyn FnMut(JsValue, JsValue) -> JsValue>);
            self.mark_closure = Some(closure);
        }

        {
            let performance = performance.clone();
            let original = original_measure.clone();
            let store = store.clone();
            let limits = limits;
            let closure: Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue> =
                Closure::wrap(Box::new(move |name: JsValue, start: JsValue, end: JsValue| -> JsValue {
                    let args = Array::new();
                    args.push(&name);
                    if !start.is_undefined() {
                        args.push(&start);
                    }
                    if !end.is_undefined() {
                        args.push(&end);
                    }
                    let result = original.apply(&performance, &args);
                    if let (Some(name_str), Ok(entries)) = (
                        name.as_string(),
                        Reflect::get(&performance, &JsValue::from_str("getEntriesByName")),
                    ) {
                        if let Ok(entries) = entries.dyn_into::<Function>() {
                            if let Ok(list) = entries.call2(&performance, &JsValue::from_str(&name_str), &JsValue::from_str("measure")) {
                                let list: Array = list.unchecked_into();
                                if let Some(last) = list.iter().last() {
                                    let start_time = get_f64(&last, "startTime");
                                    let duration = get_f64(&last, "duration");
                                    store.borrow_mut().record_measure(name_str, start_time, duration, now_ms(), &limits);
                                }
                            }
                        }
                    }
                    result.unwrap_or(JsValue::UNDEFINED)
                }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);
            self.measure_closure = Some(closure);
        }

        let mark_ok = Reflect::set(
            &performance,
            &JsValue::from_str("mark"),
            self.mark_closure.as_ref().unwrap().as_ref().unchecked_ref(),
        )
        .is_ok();
        let measure_ok = Reflect::set(
            &performance,
            &JsValue::from_str("measure"),
            self.measure_closure.as_ref().unwrap().as_ref().unchecked_ref(),
        )
        .is_ok();

        if mark_ok && measure_ok {
            self.interceptor.install((original_mark, original_measure)).ok();
        }

        self.observer = install_observer(store, vitals, limits);

        Ok(())
    }

    pub fn uninstall(&mut self) -> Result<(), InterceptorError> {
        if let Some(window) = web_sys::window() {
            if let Some(performance) = window.performance() {
                if let Ok((original_mark, original_measure)) = self.interceptor.uninstall() {
                    let _ = Reflect::set(&performance, &JsValue::from_str("mark"), &original_mark);
                    let _ = Reflect::set(&performance, &JsValue::from_str("measure"), &original_measure);
                }
            }
        }
        self.mark_closure = None;
        self.measure_closure = None;
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        Ok(())
    }
}
