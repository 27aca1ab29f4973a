//! The real [`HostContext`]: reads the focused element's own property
//! keys, walks a React fiber chain stashed on that element, and reads a
//! Redux-shaped store and source-map data URLs from well-known `window`
//! slots (spec.md §4.12). Every method degrades to `None` rather than
//! panicking — AI enrichment is one more fail-open subsystem.

use js_sys::{Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};

use gasoline_aicontext::{FiberNode, HostContext};

/// `window.__GASOLINE_SOURCE_MAPS__[scriptUrl]`: a build step is
/// expected to populate this with each bundle's `data:` source-map URL,
/// since there is no portable way to re-fetch a script's own source text
/// from inside the page that loaded it.
const SOURCE_MAPS_SLOT: &str = "__GASOLINE_SOURCE_MAPS__";
/// `window.__GASOLINE_REDUX_STORE__`, a `{getState(): any}`-shaped
/// object the host page opts into exposing.
const REDUX_STORE_SLOT: &str = "__GASOLINE_REDUX_STORE__";

pub struct WebHostContext;

impl WebHostContext {
    fn window_slot(&self, key: &str) -> Option<JsValue> {
        let window = web_sys::window()?;
        Reflect::get(&window, &JsValue::from_str(key)).ok().filter(|v| !v.is_undefined())
    }

    fn focused_element(&self) -> Option<web_sys::Element> {
        web_sys::window()?.document()?.active_element()
    }
}

impl HostContext for WebHostContext {
    fn source_map_data_url(&self, script_url: &str) -> Option<String> {
        let maps = self.window_slot(SOURCE_MAPS_SLOT)?;
        Reflect::get(&maps, &JsValue::from_str(script_url))
            .ok()
            .and_then(|v| v.as_string())
    }

    fn focused_element_property_keys(&self) -> Option<Vec<String>> {
        let element = self.focused_element()?;
        let keys = Object::get_own_property_names(element.unchecked_ref());
        Some(
            keys.iter()
                .filter_map(|k| k.as_string())
                .collect(),
        )
    }

    fn react_fiber_chain(&self, fiber_key: &str) -> Option<Vec<FiberNode>> {
        let element = self.focused_element()?;
        let mut fiber = Reflect::get(element.unchecked_ref(), &JsValue::from_str(fiber_key)).ok()?;
        let mut chain = Vec::new();
        let mut depth = 0;
        while !fiber.is_undefined() && !fiber.is_null() && depth < 64 {
            chain.push(fiber_to_node(&fiber));
            fiber = Reflect::get(&fiber, &JsValue::from_str("return")).unwrap_or(JsValue::UNDEFINED);
            depth += 1;
        }
        Some(chain)
    }

    fn redux_state(&self) -> Option<JsValue> {
        let store = self.window_slot(REDUX_STORE_SLOT)?;
        let get_state = Reflect::get(&store, &JsValue::from_str("getState")).ok()?;
        let get_state: js_sys::Function = get_state.dyn_into().ok()?;
        let state = get_state.call0(&store).ok()?;
        serde_wasm_bindgen::from_value(state).ok()
    }
}

fn fiber_to_node(fiber: &JsValue) -> FiberNode {
    let get_str = |key: &str| -> Option<String> {
        Reflect::get(fiber, &JsValue::from_str(key)).ok().and_then(|v| v.as_string())
    };
    let fiber_type = Reflect::get(fiber, &JsValue::from_str("type")).unwrap_or(JsValue::UNDEFINED);
    let type_is_string = fiber_type.as_string().is_some();
    let display_name = get_str("displayName").or_else(|| {
        Reflect::get(&fiber_type, &JsValue::from_str("displayName"))
            .ok()
            .and_then(|v| v.as_string())
    });
    let name = get_str("name").or_else(|| {
        Reflect::get(&fiber_type, &JsValue::from_str("name"))
            .ok()
            .and_then(|v| v.as_string())
    });

    let memoized_props = Reflect::get(fiber, &JsValue::from_str("memoizedProps")).unwrap_or(JsValue::UNDEFINED);
    let prop_keys = if memoized_props.is_object() {
        Object::keys(memoized_props.unchecked_ref())
            .iter()
            .filter_map(|k| k.as_string())
            .collect()
    } else {
        Vec::new()
    };

    let memoized_state = Reflect::get(fiber, &JsValue::from_str("memoizedState")).unwrap_or(JsValue::UNDEFINED);
    let has_state = memoized_state.is_object() && !js_sys::Array::is_array(&memoized_state);
    let state_keys = if has_state {
        Object::keys(memoized_state.unchecked_ref())
            .iter()
            .filter_map(|k| k.as_string())
            .collect()
    } else {
        Vec::new()
    };

    FiberNode {
        type_is_string,
        display_name,
        name,
        prop_keys,
        has_state,
        state_keys,
    }
}
