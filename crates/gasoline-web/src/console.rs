//! Wraps the five console levels (spec.md §4.3) over real `console.*`
//! functions, using [`crate::js_value::variadic_shim`] to see every
//! argument a caller passes rather than a fixed positional prefix.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use gasoline_actions::ActionCapture;
use gasoline_bridge::{post_log, Level, PostSink};
use gasoline_config::Limits;
use gasoline_context::ContextAnnotations;
use gasoline_core::{build_console_payload, Interceptor, InterceptorError};

use crate::clock::{now_iso, page_url};
use crate::js_value::{stage_args, variadic_shim};

const LEVELS: [(&str, Level); 5] = [
    ("log", Level::Log),
    ("warn", Level::Warn),
    ("error", Level::Error),
    ("info", Level::Info),
    ("debug", Level::Debug),
];

#[derive(Default)]
pub struct ConsoleTaps {
    log: Interceptor<Function>,
    warn: Interceptor<Function>,
    error: Interceptor<Function>,
    info: Interceptor<Function>,
    debug: Interceptor<Function>,
    closures: Vec<Closure<dyn FnMut(Array)>>,
}

impl ConsoleTaps {
    pub fn new() -> Self {
        ConsoleTaps::default()
    }

    fn slot(&mut self, name: &str) -> &mut Interceptor<Function> {
        match name {
            "log" => &mut self.log,
            "warn" => &mut self.warn,
            "error" => &mut self.error,
            "info" => &mut self.info,
            _ => &mut self.debug,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.log.is_installed()
    }

    pub fn install(
        &mut self,
        post: Rc<dyn PostSink>,
        context: Rc<RefCell<ContextAnnotations>>,
        actions: Rc<RefCell<ActionCapture>>,
        limits: Limits,
        origin: String,
    ) -> Result<(), InterceptorError> {
        let Some(window) = web_sys::window() else {
            return Ok(());
        };
        let Ok(console) = Reflect::get(&window, &JsValue::from_str("console")) else {
            return Ok(());
        };

        for (name, level) in LEVELS {
            if self.slot(name).is_installed() {
                return Err(InterceptorError::AlreadyInstalled);
            }
            let Ok(original) = Reflect::get(&console, &JsValue::from_str(name)) else {
                continue;
            };
            let Ok(original_fn) = original.dyn_into::<Function>() else {
                continue;
            };

            let console_for_original = console.clone();
            let original_for_closure = original_fn.clone();
            let post = post.clone();
            let context = context.clone();
            let actions = actions.clone();
            let limits = limits;
            let origin = origin.clone();

            let closure = Closure::wrap(Box::new(move |args: Array| {
                let args_vec: Vec<JsValue> = args.iter().collect();
                let (arena, roots) = stage_args(&args_vec);
                let payload = build_console_payload(level, &arena, &roots, &limits);
                let _ = post_log(
                    now_iso(),
                    page_url(),
                    payload,
                    Some(&context.borrow()),
                    Some(&actions.borrow()),
                    post.as_ref(),
                    &origin,
                );
                let _ = original_for_closure.apply(&console_for_original, &args);
            }) as Box<dyn FnMut(Array)>);

            let key = format!("__gasoline_console_{name}");
            if let Some(shim) = variadic_shim(&key, &closure) {
                if Reflect::set(&console, &JsValue::from_str(name), &shim).is_ok() {
                    self.slot(name).install(original_fn).ok();
                }
            }
            self.closures.push(closure);
        }
        Ok(())
    }

    pub fn uninstall(&mut self) -> Result<(), InterceptorError> {
        let Some(window) = web_sys::window() else {
            self.closures.clear();
            return Ok(());
        };
        let Ok(console) = Reflect::get(&window, &JsValue::from_str("console")) else {
            self.closures.clear();
            return Ok(());
        };
        for (name, _) in LEVELS {
            if let Ok(original) = self.slot(name).uninstall() {
                let _ = Reflect::set(&console, &JsValue::from_str(name), &original);
            }
        }
        self.closures.clear();
        Ok(())
    }
}
