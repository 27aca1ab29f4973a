use std::collections::HashMap;

/// A host-agnostic snapshot of a DOM element's identity-relevant
/// attributes. The real DOM walk lives in `gasoline-web`; this crate only
/// ever sees already-extracted descriptors, which keeps selector
/// computation trivially unit-testable.
#[derive(Debug, Clone, Default)]
pub struct ElementDescriptor {
    /// Upper-case tag name, as `Element.tagName` reports it.
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub text_content: Option<String>,
    pub classes: Vec<String>,
}

impl ElementDescriptor {
    pub fn new(tag: impl Into<String>) -> Self {
        ElementDescriptor {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    pub fn with_classes(mut self, classes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|s| !s.trim().is_empty())
    }
}
