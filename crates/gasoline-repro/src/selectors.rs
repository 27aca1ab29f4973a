use gasoline_config::{Limits, CLICKABLE_TAGS, DYNAMIC_CLASS_HASH_RE, DYNAMIC_CLASS_PREFIX_RE};
use serde::{Deserialize, Serialize};

use crate::element::ElementDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleName {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Every selector strategy the reproduction engine can compute for an
/// element, ranked by priority (spec.md §4.6). `css_path` is the only
/// field guaranteed to be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorStrategies {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub css_path: String,
}

fn is_dynamic_class(class: &str) -> bool {
    DYNAMIC_CLASS_PREFIX_RE.is_match(class) || DYNAMIC_CLASS_HASH_RE.is_match(class)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}

/// The implicit ARIA role for `tag`, consulting `type`/`href` for
/// elements whose role depends on an attribute. `None` means "no
/// implicit role" (an explicit `role` attribute always wins over this).
fn implicit_role(el: &ElementDescriptor) -> Option<&'static str> {
    match el.tag.to_uppercase().as_str() {
        "BUTTON" | "SUMMARY" => Some("button"),
        "A" => el.attr("href").map(|_| "link"),
        "INPUT" => {
            let ty = el.attr("type").map(|t| t.to_lowercase());
            Some(match ty.as_deref() {
                Some("checkbox") => "checkbox",
                Some("radio") => "radio",
                Some("button") | Some("submit") | Some("reset") => "button",
                _ => "textbox",
            })
        }
        "TEXTAREA" => Some("textbox"),
        "SELECT" => Some("combobox"),
        "IMG" => Some("img"),
        "NAV" => Some("navigation"),
        _ => None,
    }
}

fn accessible_name(el: &ElementDescriptor, limits: &Limits) -> Option<String> {
    if let Some(label) = trimmed_non_empty(el.attr("aria-label")) {
        return Some(truncate(&label, limits.selector_text_len));
    }
    trimmed_non_empty(el.text_content.as_deref()).map(|t| truncate(&t, limits.selector_text_len))
}

fn trimmed_non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Computes every selector strategy for `target`. `ancestors` lists
/// `target`'s ancestor chain nearest-parent-first (NOT including
/// `target` itself); it is consulted only for the CSS-path fallback.
pub fn compute_selectors(
    target: &ElementDescriptor,
    ancestors: &[ElementDescriptor],
    limits: &Limits,
) -> SelectorStrategies {
    let test_id = ["data-testid", "data-test-id", "data-cy"]
        .iter()
        .find_map(|attr| trimmed_non_empty(target.attr(attr)));

    let aria_label = trimmed_non_empty(target.attr("aria-label"));

    let role = {
        let role_name = target
            .attr("role")
            .map(str::to_string)
            .or_else(|| implicit_role(target).map(str::to_string));
        role_name.map(|role| RoleName {
            role,
            name: accessible_name(target, limits),
        })
    };

    let id = target.id().map(str::to_string);

    let is_clickable = CLICKABLE_TAGS.contains(&target.tag.to_uppercase().as_str())
        || target.attr("role") == Some("button");
    let text = if is_clickable {
        trimmed_non_empty(target.text_content.as_deref()).map(|t| truncate(&t, limits.selector_text_len))
    } else {
        None
    };

    let css_path = compute_css_path(target, ancestors, limits);

    SelectorStrategies {
        test_id,
        aria_label,
        role,
        id,
        text,
        css_path,
    }
}

/// Walks `target` then up to `limits.css_path_max_hops - 1` ancestors,
/// stopping early (and emitting only `#id`) at the first node that has
/// an id. Dynamic (framework-generated) classes are filtered out before
/// the remaining non-dynamic classes are capped and joined.
fn compute_css_path(
    target: &ElementDescriptor,
    ancestors: &[ElementDescriptor],
    limits: &Limits,
) -> String {
    let mut hops = Vec::new();
    let chain = std::iter::once(target).chain(ancestors.iter());

    for node in chain.take(limits.css_path_max_hops) {
        if let Some(id) = node.id() {
            hops.push(format!("#{id}"));
            break;
        }
        let tag = node.tag.to_lowercase();
        let classes: Vec<&str> = node
            .classes
            .iter()
            .map(String::as_str)
            .filter(|c| !is_dynamic_class(c))
            .take(limits.css_path_max_classes)
            .collect();
        if classes.is_empty() {
            hops.push(tag);
        } else {
            hops.push(format!("{tag}.{}", classes.join(".")));
        }
    }

    hops.reverse();
    hops.join(" > ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn priority_example_from_spec() {
        let button = ElementDescriptor::new("BUTTON")
            .with_attr("data-testid", "X")
            .with_attr("id", "Y")
            .with_attr("aria-label", "Z")
            .with_text("Click");
        let strategies = compute_selectors(&button, &[], &limits());
        assert_eq!(strategies.test_id, Some("X".to_string()));
        assert_eq!(strategies.aria_label, Some("Z".to_string()));
        assert_eq!(
            strategies.role,
            Some(RoleName {
                role: "button".to_string(),
                name: Some("Z".to_string()),
            })
        );
        assert_eq!(strategies.id, Some("Y".to_string()));
        assert_eq!(strategies.text, Some("Click".to_string()));
        assert_eq!(strategies.css_path, "#Y");
    }

    #[test]
    fn anchor_only_gets_link_role_with_href() {
        let a = ElementDescriptor::new("A").with_text("Home");
        assert_eq!(implicit_role(&a), None);
        let a_href = ElementDescriptor::new("A")
            .with_attr("href", "/")
            .with_text("Home");
        assert_eq!(implicit_role(&a_href), Some("link"));
    }

    #[test]
    fn css_path_stops_at_first_ancestor_with_id() {
        let target = ElementDescriptor::new("SPAN").with_classes(["label"]);
        let parent = ElementDescriptor::new("DIV").with_attr("id", "card");
        let grandparent = ElementDescriptor::new("SECTION");
        let path = compute_css_path(&target, &[parent, grandparent], &limits());
        assert_eq!(path, "#card > span.label");
    }

    #[test]
    fn dynamic_classes_are_filtered_from_css_path() {
        let target = ElementDescriptor::new("DIV").with_classes(["css-1x2y3z", "card", "active"]);
        let path = compute_css_path(&target, &[], &limits());
        assert_eq!(path, "div.card.active");
    }

    #[test]
    fn css_path_caps_hops_at_five() {
        let target = ElementDescriptor::new("SPAN");
        let ancestors: Vec<ElementDescriptor> = (0..10)
            .map(|i| ElementDescriptor::new(format!("DIV{i}")))
            .collect();
        let path = compute_css_path(&target, &ancestors, &limits());
        assert_eq!(path.split(" > ").count(), limits().css_path_max_hops);
    }

    #[test]
    fn text_strategy_only_applies_to_clickable_tags() {
        let div = ElementDescriptor::new("DIV").with_text("hello");
        let strategies = compute_selectors(&div, &[], &limits());
        assert_eq!(strategies.text, None);

        let button_role_div = ElementDescriptor::new("DIV")
            .with_attr("role", "button")
            .with_text("hello");
        let strategies = compute_selectors(&button_role_div, &[], &limits());
        assert_eq!(strategies.text, Some("hello".to_string()));
    }
}
