//! Stages an arbitrary `JsValue` into a [`gasoline_serialize::Arena`] so
//! it can go through the safe serializer (spec.md §4.2). Any DOM-ness,
//! cyclic references and typeof distinctions have to be resolved here,
//! against the real JS value, before the rest of the system can treat
//! the result as plain data.

use js_sys::{Array, Function, Object, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use web_sys::Element;

use gasoline_serialize::{Arena, NodeId, RawValue};

/// Ancestors currently being staged, so a value that references one of
/// them (a true cycle) can point back at its existing node instead of
/// recursing forever.
struct Ancestors(Vec<(JsValue, NodeId)>);

impl Ancestors {
    fn find(&self, value: &JsValue) -> Option<NodeId> {
        self.0
            .iter()
            .find(|(v, _)| v.eq(value))
            .map(|(_, id)| *id)
    }
}

/// Entry point: stages `value` as the root of a fresh arena.
pub fn stage_root(value: &JsValue) -> (Arena, NodeId) {
    let mut arena = Arena::new();
    let mut ancestors = Ancestors(Vec::new());
    let id = stage(&mut arena, value, &mut ancestors);
    (arena, id)
}

/// Stages every element of `args` into one shared arena, each as its own
/// root (spec.md §4.3's `args.map(serialize)`). A fresh ancestor stack is
/// used per argument: two arguments that happen to be the same object
/// reference are staged independently rather than treated as a cycle.
pub fn stage_args(args: &[JsValue]) -> (Arena, Vec<NodeId>) {
    let mut arena = Arena::new();
    let roots = args
        .iter()
        .map(|arg| {
            let mut ancestors = Ancestors(Vec::new());
            stage(&mut arena, arg, &mut ancestors)
        })
        .collect();
    (arena, roots)
}

/// Builds a replacement JS function that, when called with any number of
/// arguments, invokes `closure` once with those arguments collected into
/// a [`js_sys::Array`]. `Closure<dyn FnMut(Array)>` has no variadic JS
/// arity of its own, so the returned shim stashes the closure on
/// `window` under a private key and has a plain `Function` constructed
/// via `new Function` look it up and forward `arguments` at call time —
/// this is what lets a console/exception tap see every argument a real
/// caller passes, not just a fixed positional prefix.
pub fn variadic_shim(key: &str, closure: &Closure<dyn FnMut(Array)>) -> Option<Function> {
    let window = web_sys::window()?;
    Reflect::set(&window, &JsValue::from_str(key), closure.as_ref().unchecked_ref()).ok()?;
    let body = format!("return window[{key:?}](Array.prototype.slice.call(arguments));");
    Some(Function::new_with_args("", &body))
}

fn stage(arena: &mut Arena, value: &JsValue, ancestors: &mut Ancestors) -> NodeId {
    if let Some(id) = ancestors.find(value) {
        return id;
    }

    if value.is_null() || value.is_undefined() {
        return arena.insert(RawValue::Null);
    }
    if let Some(b) = value.as_bool() {
        return arena.insert(RawValue::Bool(b));
    }
    if let Some(n) = value.as_f64() {
        return arena.insert(RawValue::Number(n));
    }
    if let Some(s) = value.as_string() {
        return arena.insert(RawValue::String(s));
    }
    if let Some(function) = value.dyn_ref::<Function>() {
        let name = function.name();
        let name = name.as_string().filter(|n| !n.is_empty());
        return arena.insert(RawValue::Function { name });
    }
    if is_error(value) {
        let name = Reflect::get(value, &JsValue::from_str("name"))
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_else(|| "Error".to_string());
        let message = Reflect::get(value, &JsValue::from_str("message"))
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        let stack = Reflect::get(value, &JsValue::from_str("stack"))
            .ok()
            .and_then(|v| v.as_string())
            .unwrap_or_default();
        return arena.insert(RawValue::Error { name, message, stack });
    }
    if let Some(element) = value.dyn_ref::<Element>() {
        return arena.insert(dom_node(element));
    }
    if Array::is_array(value) {
        let placeholder = arena.insert(RawValue::Array(Vec::new()));
        ancestors.0.push((value.clone(), placeholder));
        let arr: &Array = value.unchecked_ref();
        let items: Vec<NodeId> = arr.iter().map(|item| stage(arena, &item, ancestors)).collect();
        ancestors.0.pop();
        arena.set(placeholder, RawValue::Array(items));
        return placeholder;
    }
    if value.is_object() {
        let placeholder = arena.insert(RawValue::Object(Vec::new()));
        ancestors.0.push((value.clone(), placeholder));
        let keys = Object::keys(value.unchecked_ref());
        let mut entries = Vec::with_capacity(keys.length() as usize);
        for key in keys.iter() {
            let key_str = key.as_string().unwrap_or_default();
            let child_id = match Reflect::get(value, &key) {
                Ok(child) => stage(arena, &child, ancestors),
                Err(_) => arena.insert(RawValue::String("[Unserializable]".to_string())),
            };
            entries.push((key_str, child_id));
        }
        ancestors.0.pop();
        arena.set(placeholder, RawValue::Object(entries));
        return placeholder;
    }

    arena.insert(RawValue::String(format!("{value:?}")))
}

fn is_error(value: &JsValue) -> bool {
    Reflect::get(value, &JsValue::from_str("stack")).is_ok()
        && Reflect::get(value, &JsValue::from_str("message")).is_ok()
        && js_sys::Error::instanceof(value)
}

fn dom_node(element: &Element) -> RawValue {
    let tag = element.tag_name();
    let id = element.id();
    let id = if id.is_empty() { None } else { Some(id) };
    let class_name = element.class_name();
    let classes: Vec<String> = class_name
        .split_whitespace()
        .map(str::to_string)
        .collect();
    RawValue::DomNode { tag, id, classes }
}
