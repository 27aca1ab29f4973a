//! Wraps `window.onerror` and the `unhandledrejection` listener (spec.md
//! §4.4), builds the bare payload synchronously, then enriches and posts
//! it from a spawned local future so the page is never blocked on the AI
//! pipeline's timeout (spec.md §4.12, §4.15 fail-open).

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::PromiseRejectionEvent;

use gasoline_actions::ActionCapture;
use gasoline_aicontext::SourceMapCache;
use gasoline_bridge::{post_log, PostSink};
use gasoline_config::Limits;
use gasoline_context::ContextAnnotations;
use gasoline_core::{
    build_exception_payload, enrich_exception_payload, ExceptionInput, ExceptionKind, Interceptor,
    InterceptorError,
};

use crate::clock::{now_iso, page_url};
use crate::host_context::WebHostContext;
use crate::sleep::sleep_ms;

fn jsvalue_to_u32(value: &JsValue) -> Option<u32> {
    value.as_f64().map(|n| n as u32)
}

fn error_stack(error: &JsValue) -> Option<String> {
    Reflect::get(error, &JsValue::from_str("stack"))
        .ok()
        .and_then(|v| v.as_string())
}

#[derive(Default)]
pub struct ExceptionTaps {
    onerror: Interceptor<JsValue>,
    error_closure: Option<Closure<dyn FnMut(JsValue, JsValue, JsValue, JsValue, JsValue) -> JsValue>>,
    rejection: Interceptor<()>,
    rejection_closure: Option<Closure<dyn FnMut(PromiseRejectionEvent)>>,
}

impl ExceptionTaps {
    pub fn new() -> Self {
        ExceptionTaps::default()
    }

    pub fn is_installed(&self) -> bool {
        self.onerror.is_installed()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn install(
        &mut self,
        post: Rc<dyn PostSink>,
        cache: Rc<RefCell<SourceMapCache>>,
        context: Rc<RefCell<ContextAnnotations>>,
        actions: Rc<RefCell<ActionCapture>>,
        limits: Limits,
        origin: String,
        ai_context_enabled: bool,
        ai_context_state_snapshot_enabled: bool,
    ) -> Result<(), InterceptorError> {
        if self.onerror.is_installed() {
            return Err(InterceptorError::AlreadyInstalled);
        }
        let Some(window) = web_sys::window() else {
            return Ok(());
        };

        let original_onerror =
            Reflect::get(&window, &JsValue::from_str("onerror")).unwrap_or(JsValue::UNDEFINED);

        {
            let post = post.clone();
            let cache = cache.clone();
            let context = context.clone();
            let actions = actions.clone();
            let limits = limits;
            let origin = origin.clone();

            let closure: Closure<dyn FnMut(JsValue, JsValue, JsValue, JsValue, JsValue) -> JsValue> =
                Closure::wrap(Box::new(move |message: JsValue, source: JsValue, lineno: JsValue, colno: JsValue, error: JsValue| {
                    let input = ExceptionInput {
                        message: message.as_string().unwrap_or_default(),
                        filename: source.as_string(),
                        lineno: jsvalue_to_u32(&lineno),
                        colno: jsvalue_to_u32(&colno),
                        stack: if error.is_undefined() || error.is_null() {
                            None
                        } else {
                            error_stack(&error)
                        },
                    };
                    let mut payload = build_exception_payload(ExceptionKind::GlobalError, input);

                    let post = post.clone();
                    let cache = cache.clone();
                    let context = context.clone();
                    let actions = actions.clone();
                    let limits = limits;
                    let origin = origin.clone();
                    wasm_bindgen_futures::spawn_local(async move {
                        let host = WebHostContext;
                        let timeout_ms = limits.ai_pipeline_timeout_ms as i32;
                        enrich_exception_payload(
                            &mut payload,
                            ai_context_enabled,
                            ai_context_state_snapshot_enabled,
                            &host,
                            &mut cache.borrow_mut(),
                            &limits,
                            sleep_ms(timeout_ms),
                        )
                        .await;
                        post_log(
                            now_iso(),
                            page_url(),
                            payload,
                            Some(&context.borrow()),
                            Some(&actions.borrow()),
                            post.as_ref(),
                            &origin,
                        );
                    });

                    JsValue::FALSE
                }) as Box<dyn FnMut(JsValue, JsValue, JsValue, JsValue, JsValue) -> JsValue>);

            if Reflect::set(
                &window,
                &JsValue::from_str("onerror"),
                closure.as_ref().unchecked_ref(),
            )
            .is_ok()
            {
                self.onerror.install(original_onerror).ok();
            }
            self.error_closure = Some(closure);
        }

        {
            let post = post.clone();
            let cache = cache.clone();
            let context = context.clone();
            let actions = actions.clone();
            let limits = limits;
            let origin = origin.clone();

            let closure: Closure<dyn FnMut(PromiseRejectionEvent)> =
                Closure::wrap(Box::new(move |event: PromiseRejectionEvent| {
                    let reason = event.reason();
                    let message = if let Some(s) = reason.as_string() {
                        s
                    } else {
                        Reflect::get(&reason, &JsValue::from_str("message"))
                            .ok()
                            .and_then(|v| v.as_string())
                            .unwrap_or_else(|| "(non-error rejection)".to_string())
                    };
                    let stack = error_stack(&reason);
                    let input = ExceptionInput {
                        message,
                        stack,
                        ..Default::default()
                    };
                    let mut payload = build_exception_payload(ExceptionKind::UnhandledRejection, input);

                    let post = post.clone();
                    let cache = cache.clone();
                    let context = context.clone();
                    let actions = actions.clone();
                    let limits = limits;
                    let origin = origin.clone();
                    wasm_bindgen_futures::spawn_local(async move {
                        let host = WebHostContext;
                        let timeout_ms = limits.ai_pipeline_timeout_ms as i32;
                        enrich_exception_payload(
                            &mut payload,
                            ai_context_enabled,
                            ai_context_state_snapshot_enabled,
                            &host,
                            &mut cache.borrow_mut(),
                            &limits,
                            sleep_ms(timeout_ms),
                        )
                        .await;
                        post_log(
                            now_iso(),
                            page_url(),
                            payload,
                            Some(&context.borrow()),
                            Some(&actions.borrow()),
                            post.as_ref(),
                            &origin,
                        );
                    });
                }) as Box<dyn FnMut(PromiseRejectionEvent)>);

            if window
                .add_event_listener_with_callback("unhandledrejection", closure.as_ref().unchecked_ref())
                .is_ok()
            {
                self.rejection.install(()).ok();
            }
            self.rejection_closure = Some(closure);
        }

        Ok(())
    }

    pub fn uninstall(&mut self) -> Result<(), InterceptorError> {
        let Some(window) = web_sys::window() else {
            self.error_closure = None;
            self.rejection_closure = None;
            return Ok(());
        };

        if let Ok(original) = self.onerror.uninstall() {
            let _ = Reflect::set(&window, &JsValue::from_str("onerror"), &original);
        }
        self.error_closure = None;

        if let Some(closure) = self.rejection_closure.take() {
            let _ = window
                .remove_event_listener_with_callback("unhandledrejection", closure.as_ref().unchecked_ref());
        }
        self.rejection.uninstall().ok();

        Ok(())
    }
}
