//! Attaches the real click/input/scroll/keydown/change listeners and the
//! `history.pushState`/`replaceState`/`popstate` navigation taps (spec.md
//! §4.5), translating DOM events into [`ActionCapture`] calls. Every
//! listener is attached once at install and removed at uninstall; the
//! `enabled` toggle inside `ActionCapture` itself decides whether a given
//! event actually gets recorded.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Event, HtmlInputElement, HtmlSelectElement, KeyboardEvent, MouseEvent};

use gasoline_actions::ActionCapture;
use gasoline_config::Limits;
use gasoline_core::{Interceptor, InterceptorError};

use crate::clock::{now_ms, page_url};
use crate::element::{as_element, describe, describe_ancestors};

type ListenerClosure = Closure<dyn FnMut(Event)>;

#[derive(Default)]
pub struct ActionTaps {
    click: Option<ListenerClosure>,
    input: Option<ListenerClosure>,
    scroll: Option<ListenerClosure>,
    keydown: Option<ListenerClosure>,
    change: Option<ListenerClosure>,
    navigation: NavigationTaps,
}

#[derive(Default)]
struct NavigationTaps {
    push_state: Interceptor<JsValue>,
    replace_state: Interceptor<JsValue>,
    push_state_closure: Option<Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>>,
    replace_state_closure: Option<Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>>,
    popstate_closure: Option<Closure<dyn FnMut(Event)>>,
    popstate_installed: bool,
}

fn add_listener(target: &web_sys::EventTarget, kind: &str, closure: &ListenerClosure) {
    let _ = target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
}

fn remove_listener(target: &web_sys::EventTarget, kind: &str, closure: &ListenerClosure) {
    let _ = target.remove_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
}

impl ActionTaps {
    pub fn new() -> Self {
        ActionTaps::default()
    }

    pub fn is_installed(&self) -> bool {
        self.click.is_some()
    }

    pub fn install(&mut self, actions: Rc<RefCell<ActionCapture>>, limits: Limits) -> Result<(), InterceptorError> {
        if self.is_installed() {
            return Err(InterceptorError::AlreadyInstalled);
        }
        let Some(window) = web_sys::window() else {
            return Ok(());
        };
        let Some(document) = window.document() else {
            return Ok(());
        };

        {
            let actions = actions.clone();
            let closure: ListenerClosure = Closure::wrap(Box::new(move |event: Event| {
                let Some(mouse) = event.dyn_ref::<MouseEvent>() else { return };
                let Some(target) = event.target().and_then(|t| as_element(&t.into())) else { return };
                let ancestors = describe_ancestors(&target, &limits);
                let descriptor = describe(&target);
                actions.borrow_mut().on_click(
                    &descriptor,
                    &ancestors,
                    mouse.client_x() as f64,
                    mouse.client_y() as f64,
                    &page_url(),
                    now_ms(),
                    &limits,
                );
            }) as Box<dyn FnMut(Event)>);
            add_listener(&document, "click", &closure);
            self.click = Some(closure);
        }

        {
            let actions = actions.clone();
            let closure: ListenerClosure = Closure::wrap(Box::new(move |event: Event| {
                let Some(target) = event.target().and_then(|t| as_element(&t.into())) else { return };
                let ancestors = describe_ancestors(&target, &limits);
                let descriptor = describe(&target);

                let (value, input_type, name, autocomplete) =
                    if let Some(input) = target.dyn_ref::<HtmlInputElement>() {
                        (
                            input.value(),
                            Some(input.type_()),
                            Some(input.name()),
                            Some(input.autocomplete()),
                        )
                    } else {
                        (descriptor.text_content.clone().unwrap_or_default(), None, None, None)
                    };

                actions.borrow_mut().on_input(
                    &descriptor,
                    &ancestors,
                    input_type.as_deref(),
                    name.as_deref(),
                    autocomplete.as_deref(),
                    &value,
                    &page_url(),
                    now_ms(),
                    &limits,
                );
            }) as Box<dyn FnMut(Event)>);
            add_listener(&document, "input", &closure);
            self.input = Some(closure);
        }

        {
            let actions = actions.clone();
            let window_for_scroll = window.clone();
            let closure: ListenerClosure = Closure::wrap(Box::new(move |_event: Event| {
                let scroll_x = window_for_scroll.scroll_x().unwrap_or(0.0) as i64;
                let scroll_y = window_for_scroll.scroll_y().unwrap_or(0.0) as i64;
                actions.borrow_mut().on_scroll(&page_url(), scroll_x, scroll_y, now_ms());
            }) as Box<dyn FnMut(Event)>);
            add_listener(&window, "scroll", &closure);
            self.scroll = Some(closure);
        }

        {
            let actions = actions.clone();
            let closure: ListenerClosure = Closure::wrap(Box::new(move |event: Event| {
                let Some(keyboard) = event.dyn_ref::<KeyboardEvent>() else { return };
                let Some(target) = event.target().and_then(|t| as_element(&t.into())) else { return };
                let ancestors = describe_ancestors(&target, &limits);
                let descriptor = describe(&target);
                actions.borrow_mut().on_keydown(
                    &descriptor,
                    &ancestors,
                    &keyboard.key(),
                    &page_url(),
                    now_ms(),
                    &limits,
                );
            }) as Box<dyn FnMut(Event)>);
            add_listener(&document, "keydown", &closure);
            self.keydown = Some(closure);
        }

        {
            let actions = actions.clone();
            let closure: ListenerClosure = Closure::wrap(Box::new(move |event: Event| {
                let Some(target) = event.target().and_then(|t| as_element(&t.into())) else { return };
                let Some(select) = target.dyn_ref::<HtmlSelectElement>() else { return };
                let ancestors = describe_ancestors(&target, &limits);
                let descriptor = describe(&target);
                let value = select.value();
                // `<option>` text would need the `HtmlOptionsCollection`/
                // `HtmlOptionElement` typed API; the selected value reads
                // close enough for reproduction purposes.
                let text = value.clone();
                actions.borrow_mut().on_select_change(
                    &descriptor,
                    &ancestors,
                    &value,
                    &text,
                    &page_url(),
                    now_ms(),
                    &limits,
                );
            }) as Box<dyn FnMut(Event)>);
            add_listener(&document, "change", &closure);
            self.change = Some(closure);
        }

        self.navigation.install(actions)?;

        Ok(())
    }

    pub fn uninstall(&mut self) -> Result<(), InterceptorError> {
        if let Some(window) = web_sys::window() {
            if let Some(document) = window.document() {
                if let Some(closure) = self.click.take() {
                    remove_listener(&document, "click", &closure);
                }
                if let Some(closure) = self.input.take() {
                    remove_listener(&document, "input", &closure);
                }
                if let Some(closure) = self.keydown.take() {
                    remove_listener(&document, "keydown", &closure);
                }
                if let Some(closure) = self.change.take() {
                    remove_listener(&document, "change", &closure);
                }
            }
            if let Some(closure) = self.scroll.take() {
                remove_listener(&window, "scroll", &closure);
            }
        } else {
            self.click = None;
            self.input = None;
            self.keydown = None;
            self.change = None;
            self.scroll = None;
        }
        self.navigation.uninstall()
    }
}

impl NavigationTaps {
    fn install(&mut self, actions: Rc<RefCell<ActionCapture>>) -> Result<(), InterceptorError> {
        let Some(window) = web_sys::window() else {
            return Ok(());
        };
        let history = window.history().map_err(|_| InterceptorError::NotInstalled)?;
        let Ok(original_push) = Reflect::get(&history, &JsValue::from_str("pushState")) else {
            return Ok(());
        };
        let Ok(original_replace) = Reflect::get(&history, &JsValue::from_str("replaceState")) else {
            return Ok(());
        };

        for (name, original, slot, closure_slot) in [
            ("pushState", original_push.clone(), 0u8, 0u8),
            ("replaceState", original_replace.clone(), 1u8, 1u8),
        ] {
            let _ = (slot, closure_slot);
            let actions = actions.clone();
            let history_for_original = history.clone();
            let original_fn: js_sys::Function = original.unchecked_into();
            let original_for_closure = original_fn.clone();

            let closure: Closure<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue> =
                Closure::wrap(Box::new(move |state: JsValue, title: JsValue, url: JsValue| {
                    let from_url = page_url();
                    let args = js_sys::Array::new();
                    args.push(&state);
                    args.push(&title);
                    args.push(&url);
                    let result = original_for_closure.apply(&history_for_original, &args);
                    let to_url = url.as_string().unwrap_or_else(page_url);
                    actions.borrow_mut().on_navigate(&from_url, &to_url, now_ms());
                    result.unwrap_or(JsValue::UNDEFINED)
                }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);

            if Reflect::set(&history, &JsValue::from_str(name), closure.as_ref().unchecked_ref()).is_ok() {
                if name == "pushState" {
                    self.push_state.install(original_fn.into()).ok();
                    self.push_state_closure = Some(closure);
                } else {
                    self.replace_state.install(original_fn.into()).ok();
                    self.replace_state_closure = Some(closure);
                }
            }
        }

        {
            let actions = actions.clone();
            let closure: Closure<dyn FnMut(Event)> = Closure::wrap(Box::new(move |_event: Event| {
                let url = page_url();
                actions.borrow_mut().on_navigate(&url, &url, now_ms());
            }) as Box<dyn FnMut(Event)>);
            if window
                .add_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref())
                .is_ok()
            {
                self.popstate_installed = true;
            }
            self.popstate_closure = Some(closure);
        }

        Ok(())
    }

    fn uninstall(&mut self) -> Result<(), InterceptorError> {
        let Some(window) = web_sys::window() else {
            self.push_state_closure = None;
            self.replace_state_closure = None;
            self.popstate_closure = None;
            return Ok(());
        };
        if let Ok(history) = window.history() {
            if let Ok(original) = self.push_state.uninstall() {
                let _ = Reflect::set(&history, &JsValue::from_str("pushState"), &original);
            }
            if let Ok(original) = self.replace_state.uninstall() {
                let _ = Reflect::set(&history, &JsValue::from_str("replaceState"), &original);
            }
        }
        self.push_state_closure = None;
        self.replace_state_closure = None;
        if let Some(closure) = self.popstate_closure.take() {
            if self.popstate_installed {
                let _ = window.remove_event_listener_with_callback("popstate", closure.as_ref().unchecked_ref());
            }
        }
        self.popstate_installed = false;
        Ok(())
    }
}
