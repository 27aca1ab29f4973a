//! Builds [`ElementDescriptor`] snapshots from real `web_sys::Element`s
//! for the action capture / reproduction engine (spec.md §4.5-4.6),
//! which never touch the DOM directly.

use wasm_bindgen::JsCast;
use web_sys::Element;

use gasoline_config::Limits;
use gasoline_repro::ElementDescriptor;

pub fn describe(element: &Element) -> ElementDescriptor {
    let mut descriptor = ElementDescriptor::new(element.tag_name());

    let attributes = element.attributes();
    for i in 0..attributes.length() {
        if let Some(attr) = attributes.item(i) {
            descriptor = descriptor.with_attr(attr.name(), attr.value());
        }
    }

    let class_list = element.class_name();
    if !class_list.is_empty() {
        descriptor = descriptor.with_classes(class_list.split_whitespace());
    }

    if let Some(text) = element.text_content() {
        descriptor = descriptor.with_text(text);
    }

    descriptor
}

/// Walks `element`'s ancestor chain, nearest first, up to
/// `limits.css_path_max_hops` hops — the most the CSS-path strategy can
/// ever use (spec.md §4.6).
pub fn describe_ancestors(element: &Element, limits: &Limits) -> Vec<ElementDescriptor> {
    let mut ancestors = Vec::new();
    let mut current = element.parent_element();
    while let Some(el) = current {
        if ancestors.len() >= limits.css_path_max_hops {
            break;
        }
        ancestors.push(describe(&el));
        current = el.parent_element();
    }
    ancestors
}

pub fn as_element(target: &wasm_bindgen::JsValue) -> Option<Element> {
    target.clone().dyn_into::<Element>().ok()
}
