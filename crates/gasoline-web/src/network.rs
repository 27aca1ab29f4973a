//! Wraps the global `fetch` (spec.md §4.9): registers the request in
//! [`PendingRequests`], races a clone of the response body against a
//! short timeout, and posts the captured exchange without ever delaying
//! the `Response` the page's own caller is waiting on — the original
//! promise resolves exactly when it always would have.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Promise, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Response, Window};

use gasoline_bridge::{post_network_body, NetworkBodyEvent, PostSink};
use gasoline_config::Limits;
use gasoline_core::{Interceptor, InterceptorError};
use gasoline_network::{capture_exchange, is_excluded_url, PendingRequests, RawBody};

use crate::clock::{now_ms, page_origin};
use crate::sleep::sleep_ms;

fn header_pairs(headers: &Headers) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Ok(iter) = js_sys::try_iter(headers.unchecked_ref()) {
        if let Some(iter) = iter {
            for entry in iter.flatten() {
                let entry: Array = entry.unchecked_into();
                let key = entry.get(0).as_string().unwrap_or_default();
                let value = entry.get(1).as_string().unwrap_or_default();
                pairs.push((key, value));
            }
        }
    }
    pairs
}

/// Normalizes whatever `init.headers`/a `Request`'s headers looked like
/// (a `Headers` instance, a plain object, or an array of pairs) into
/// pairs, by round-tripping it through the real `Headers` constructor.
fn request_header_pairs(window: &Window, headers_like: &JsValue) -> Vec<(String, String)> {
    if headers_like.is_undefined() || headers_like.is_null() {
        return Vec::new();
    }
    let Ok(ctor) = Reflect::get(window, &JsValue::from_str("Headers")) else {
        return Vec::new();
    };
    let Ok(ctor) = ctor.dyn_into::<js_sys::Function>() else {
        return Vec::new();
    };
    let args = Array::new();
    args.push(headers_like);
    let Ok(built) = Reflect::construct(&ctor, &args) else {
        return Vec::new();
    };
    let Ok(built) = built.dyn_into::<Headers>() else {
        return Vec::new();
    };
    header_pairs(&built)
}

fn request_body_text(init: &JsValue) -> Option<String> {
    if init.is_undefined() {
        return None;
    }
    Reflect::get(init, &JsValue::from_str("body")).ok().and_then(|v| v.as_string())
}

fn content_type_of(headers: &[(String, String)]) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .map(|(_, v)| v.clone())
}

async fn read_body_raced(response: &Response, timeout_ms: i32) -> RawBody {
    let Ok(promise) = response.text() else {
        return RawBody::TimedOut;
    };
    let read = async move {
        match JsFuture::from(promise).await {
            Ok(value) => RawBody::Text(value.as_string().unwrap_or_default()),
            Err(_) => RawBody::TimedOut,
        }
    };
    gasoline_timers::race_with_timeout(Box::pin(read), sleep_ms(timeout_ms), RawBody::TimedOut).await
}

#[derive(Default)]
pub struct FetchTap {
    interceptor: Interceptor<js_sys::Function>,
    closure: Option<Closure<dyn FnMut(JsValue, JsValue) -> Promise>>,
}

impl FetchTap {
    pub fn new() -> Self {
        FetchTap::default()
    }

    pub fn is_installed(&self) -> bool {
        self.interceptor.is_installed()
    }

    pub fn install(
        &mut self,
        post: Rc<dyn PostSink>,
        pending: Rc<RefCell<PendingRequests>>,
        limits: Limits,
        body_capture_enabled: bool,
        server_url: Option<String>,
    ) -> Result<(), InterceptorError> {
        if self.interceptor.is_installed() {
            return Err(InterceptorError::AlreadyInstalled);
        }
        let Some(window) = web_sys::window() else {
            return Ok(());
        };
        let Ok(original) = Reflect::get(&window, &JsValue::from_str("fetch")) else {
            return Ok(());
        };
        let Ok(original_fn) = original.dyn_into::<js_sys::Function>() else {
            return Ok(());
        };
        let original_for_closure = original_fn.clone();
        let window_for_call = window.clone();

        let closure: Closure<dyn FnMut(JsValue, JsValue) -> Promise> =
            Closure::wrap(Box::new(move |input: JsValue, init: JsValue| -> Promise {
                let url = input
                    .as_string()
                    .or_else(|| Reflect::get(&input, &JsValue::from_str("url")).ok().and_then(|v| v.as_string()))
                    .unwrap_or_default();
                let method = if init.is_undefined() {
                    "GET".to_string()
                } else {
                    Reflect::get(&init, &JsValue::from_str("method"))
                        .ok()
                        .and_then(|v| v.as_string())
                        .unwrap_or_else(|| "GET".to_string())
                };

                let request_headers = Reflect::get(&init, &JsValue::from_str("headers"))
                    .map(|h| request_header_pairs(&window_for_call, &h))
                    .unwrap_or_default();
                let request_body = request_body_text(&init).map(RawBody::Text);

                let args = Array::new();
                args.push(&input);
                if !init.is_undefined() {
                    args.push(&init);
                }
                let result = original_for_closure.apply(&window_for_call, &args);

                let Ok(result) = result else {
                    return Promise::resolve(&JsValue::UNDEFINED);
                };
                let Ok(real_promise) = result.dyn_into::<Promise>() else {
                    return Promise::resolve(&JsValue::UNDEFINED);
                };

                if is_excluded_url(&url, server_url.as_deref()) {
                    return real_promise;
                }

                let start_ms = now_ms();
                let request_id = pending.borrow_mut().register(url.clone(), method.clone(), start_ms as f64);

                let post = post.clone();
                let pending = pending.clone();
                let limits = limits;
                let url_for_then = url.clone();
                let method_for_then = method.clone();
                let request_id_for_then = request_id.clone();

                let on_fulfilled: Closure<dyn FnMut(JsValue) -> JsValue> =
                    Closure::once(move |response: JsValue| -> JsValue {
                        pending.borrow_mut().complete(&request_id_for_then);
                        let Ok(response) = response.dyn_into::<Response>() else {
                            return JsValue::UNDEFINED;
                        };
                        let status = response.status();
                        let response_headers = header_pairs(&response.headers());
                        let Ok(clone) = response.clone() else {
                            return response.into();
                        };

                        let post = post.clone();
                        let limits = limits;
                        let url_for_then = url_for_then.clone();
                        let method_for_then = method_for_then.clone();
                        wasm_bindgen_futures::spawn_local(async move {
                            let response_body = if body_capture_enabled {
                                Some(read_body_raced(&clone, limits.body_read_timeout_ms as i32).await)
                            } else {
                                None
                            };
                            let (request, response) = capture_exchange(
                                &url_for_then,
                                &method_for_then,
                                &request_headers,
                                request_body.as_ref(),
                                status,
                                &response_headers,
                                response_body.as_ref(),
                                &limits,
                            );
                            let content_type = content_type_of(&response_headers);
                            let duration = (now_ms() - start_ms) as f64;
                            post_network_body(
                                NetworkBodyEvent {
                                    url: url_for_then.clone(),
                                    method: method_for_then.clone(),
                                    status,
                                    content_type,
                                    request_body: request.body.map(|b| b.body),
                                    response_body: response.body.as_ref().map(|b| b.body.clone()),
                                    response_truncated: response.body.as_ref().map(|b| b.truncated),
                                    duration,
                                },
                                post.as_ref(),
                                &page_origin(),
                            );
                        });

                        response.into()
                    });

                let chained = real_promise.then(&on_fulfilled);
                on_fulfilled.forget();
                chained
            }) as Box<dyn FnMut(JsValue, JsValue) -> Promise>);

        if Reflect::set(&window, &JsValue::from_str("fetch"), closure.as_ref().unchecked_ref()).is_ok() {
            self.interceptor.install(original_fn).ok();
        }
        self.closure = Some(closure);
        Ok(())
    }

    pub fn uninstall(&mut self) -> Result<(), InterceptorError> {
        let Some(window) = web_sys::window() else {
            self.closure = None;
            return Ok(());
        };
        if let Ok(original) = self.interceptor.uninstall() {
            let _ = Reflect::set(&window, &JsValue::from_str("fetch"), &original);
        }
        self.closure = None;
        Ok(())
    }
}
