//! Schema-less value inference over XML elements.
//!
//! Every element is classified from instance data alone into a scalar, an
//! array (when sibling tags repeat) or an object (mixed child tags). The
//! resulting [`FieldValue`] is the one in-memory representation shared by
//! extraction, diffing and display.

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::tree::XmlNode;

/// An inferred XML value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    /// Trimmed text of a childless element.
    Scalar(String),
    /// Repeated sibling tags, or a key that recurred inside an object.
    Array(Vec<FieldValue>),
    /// Child tag -> value, in document order.
    Object(FieldMap),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&FieldMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }

    /// True for an empty scalar, an empty array, or an object whose values
    /// are all empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scalar(s) => s.is_empty(),
            Self::Array(items) => items.iter().all(FieldValue::is_empty),
            Self::Object(map) => map.values().all(FieldValue::is_empty),
        }
    }

    /// Every scalar reachable from this value, depth first.
    pub fn scalars(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_scalars(self, &mut out);
        out
    }
}

fn collect_scalars<'a>(value: &'a FieldValue, out: &mut Vec<&'a str>) {
    match value {
        FieldValue::Scalar(s) => out.push(s.as_str()),
        FieldValue::Array(items) => {
            for item in items {
                collect_scalars(item, out);
            }
        }
        FieldValue::Object(map) => {
            for item in map.values() {
                collect_scalars(item, out);
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Array(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Object(map) => {
                write!(f, "{{")?;
                for (idx, (key, item)) in map.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => map.serialize(serializer),
        }
    }
}

/// Insertion-ordered string -> [`FieldValue`] mapping.
///
/// Keys are unique. Consumers rely on document order, so this is a vector of
/// pairs rather than a hash or sorted map; field lists are short.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldMap {
    entries: Vec<(String, FieldValue)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut FieldValue> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

impl FromIterator<(String, FieldValue)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Accumulates object entries, promoting a key to an array when its tag
/// recurs among siblings.
#[derive(Default)]
struct ObjectBuilder {
    map: FieldMap,
    promoted: Vec<String>,
}

impl ObjectBuilder {
    fn push(&mut self, key: &str, value: FieldValue) {
        if self.promoted.iter().any(|k| k == key) {
            if let Some(FieldValue::Array(items)) = self.map.slot_mut(key) {
                items.push(value);
            }
            return;
        }
        match self.map.slot_mut(key) {
            Some(slot) => {
                let first = std::mem::replace(slot, FieldValue::Array(Vec::new()));
                *slot = FieldValue::Array(vec![first, value]);
                self.promoted.push(key.to_string());
            }
            None => self.map.insert(key, value),
        }
    }

    fn finish(self) -> FieldMap {
        self.map
    }
}

/// Classify `element` into a [`FieldValue`].
///
/// - no child elements: trimmed text
/// - more than one child, all sharing one tag: array (of text when every
///   child is childless, otherwise of per-child values)
/// - anything else: object keyed by child tag
pub fn parse_value(element: &XmlNode) -> FieldValue {
    if element.children.is_empty() {
        return FieldValue::Scalar(element.trimmed_text().to_string());
    }

    if is_homogeneous_list(element) {
        if element.children.iter().all(|child| child.children.is_empty()) {
            return FieldValue::Array(
                element
                    .children
                    .iter()
                    .map(|child| FieldValue::Scalar(child.trimmed_text().to_string()))
                    .collect(),
            );
        }
        return FieldValue::Array(element.children.iter().map(array_item).collect());
    }

    FieldValue::Object(parse_object(element))
}

/// Map each direct child of `element` to its value, in document order.
///
/// A tag that appears more than once becomes an array in order of
/// occurrence; the first occurrence's position is kept.
pub fn parse_object(element: &XmlNode) -> FieldMap {
    parse_children(element.children.iter())
}

/// Like [`parse_object`] but over an arbitrary run of sibling elements.
pub fn parse_children<'a>(children: impl IntoIterator<Item = &'a XmlNode>) -> FieldMap {
    let mut builder = ObjectBuilder::default();
    for child in children {
        builder.push(&child.tag, parse_value(child));
    }
    builder.finish()
}

fn array_item(child: &XmlNode) -> FieldValue {
    if child.children.is_empty() {
        FieldValue::Scalar(child.trimmed_text().to_string())
    } else {
        FieldValue::Object(parse_object(child))
    }
}

fn is_homogeneous_list(element: &XmlNode) -> bool {
    let Some(first) = element.children.first() else {
        return false;
    };
    element.children.len() > 1 && element.children.iter().all(|c| c.tag == first.tag)
}
