use serde::{Deserialize, Serialize};

/// Handle to a node in a [`Document`](crate::Document) arena.
///
/// Handles are plain arena indices: they stay valid for the lifetime of the
/// document that issued them, whether or not the node is currently attached
/// to the tree. Code holding a handle across other mutations must check
/// attachment at point of use rather than assume tree membership.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NodeId(pub(crate) u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

/// Tag name plus ordered attribute list of an element node.
///
/// Tag and attribute names are normalized to ASCII lowercase; attribute
/// order is preserved for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.attributes
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((name, value.to_string())),
        }
    }

    /// Returns whether the attribute was present
    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let before = self.attributes.len();
        self.attributes.retain(|(n, _)| *n != name);
        self.attributes.len() != before
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Elements that never have children and serialize without a closing tag
pub(crate) fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose content is raw text, neither parsed nor escaped
pub(crate) fn is_raw_text(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_names_are_case_insensitive() {
        let mut data = ElementData::new("DIV");
        data.set_attribute("Class", "hero");

        assert_eq!(data.tag(), "div");
        assert_eq!(data.attribute("class"), Some("hero"));
        assert_eq!(data.attribute("CLASS"), Some("hero"));
    }

    #[test]
    fn set_attribute_replaces_in_place() {
        let mut data = ElementData::new("div");
        data.set_attribute("id", "a");
        data.set_attribute("class", "x");
        data.set_attribute("id", "b");

        let attrs: Vec<_> = data.attributes().collect();
        assert_eq!(attrs, vec![("id", "b"), ("class", "x")]);

        assert!(data.remove_attribute("id"));
        assert!(!data.remove_attribute("id"));
    }
}
