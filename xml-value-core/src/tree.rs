use std::collections::BTreeMap;

use serde::Serialize;

/// A generic XML element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct XmlNode {
    /// Element tag name.
    pub tag: String,
    /// XML attributes keyed by name.
    pub attributes: BTreeMap<String, String>,
    /// Child elements in document order.
    pub children: Vec<XmlNode>,
    /// Concatenated non-whitespace text content, untrimmed.
    pub text: Option<String>,
}

impl XmlNode {
    /// Create a new XML node with no attributes, children, or text.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Return the first child with the provided tag.
    pub fn get_child(&self, tag: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// Walk a nested child path and return terminal node text if found.
    pub fn get_text<'a>(&'a self, path: &[&str]) -> Option<&'a str> {
        let mut current = self;
        for segment in path {
            current = current.get_child(segment)?;
        }
        current.text.as_deref()
    }

    /// Trimmed text of this node, empty when the node has none.
    pub fn trimmed_text(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or("")
    }

    /// Trimmed text of the first direct child with `tag`, if that child exists.
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.get_child(tag).map(XmlNode::trimmed_text)
    }

    /// Attribute value by name.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// True when the node has neither child elements nor non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.children.is_empty() && self.trimmed_text().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::XmlNode;
    use crate::parse;

    #[test]
    fn get_text_walks_nested_path() {
        let root = parse(b"<FirewallRule><After><Name>Rule0</Name></After></FirewallRule>").expect("parse");

        assert_eq!(root.get_text(&["After", "Name"]), Some("Rule0"));
        assert_eq!(root.get_text(&["Before", "Name"]), None);
    }

    #[test]
    fn child_text_is_trimmed_and_blank_detection_ignores_whitespace() {
        let mut root = parse(b"<IPHost><Name>  Srv1 </Name><Description/></IPHost>").expect("parse");
        root.children.push(XmlNode::new("Comment"));

        assert_eq!(root.child_text("Name"), Some("Srv1"));
        assert_eq!(root.child_text("Description"), Some(""));
        assert!(root.get_child("Description").is_some_and(XmlNode::is_blank));
        assert!(root.get_child("Comment").is_some_and(XmlNode::is_blank));
        assert!(!root.is_blank());
    }
}
