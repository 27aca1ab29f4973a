//! Reproduction engine: deterministic multi-strategy selector computation
//! for a DOM element, and Playwright-style script generation from a
//! sequence of enhanced actions (spec.md §4.6).

mod actions;
mod element;
mod script;
mod selectors;

pub use actions::EnhancedAction;
pub use element::ElementDescriptor;
pub use script::{generate_script, ScriptOptions};
pub use selectors::{compute_selectors, RoleName, SelectorStrategies};
