//! Canonical entity records and the entity-boundary predicate.
//!
//! [`entity_mark`] is the single test for "is this element an entity". Both
//! extraction and reference resolution go through it so they never disagree.

use serde::Serialize;
use xml_value_core::{parse_children, to_xml_string, DocumentIndex, FieldMap, NodeId, WriteError};

use crate::policy::EntityPolicy;
use crate::tag_format::format_tag_name;

/// Child element holding an entity's name.
pub const NAME_TAG: &str = "Name";
/// Attribute holding an entity's transaction id.
pub const TRANSACTION_ID_ATTR: &str = "transactionid";

/// A named or transactional configuration object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub tag: String,
    /// Direct `Name` child text, or the formatted tag when there is none.
    pub name: String,
    /// `transactionid` attribute, empty when absent.
    pub transaction_id: String,
    /// Every direct child except `Name`, in document order.
    pub fields: FieldMap,
    /// Serialized source subtree.
    pub raw_xml: String,
}

impl Entity {
    /// Diff identity: `tag:name`.
    pub fn identity_key(&self) -> String {
        format!("{}:{}", self.tag, self.name)
    }

    /// Extraction dedupe key: `tag|transactionId|name`.
    pub fn dedupe_key(&self) -> String {
        format!("{}|{}|{}", self.tag, self.transaction_id, self.name)
    }

    /// False when the name is only the tag fallback.
    pub fn has_real_name(&self) -> bool {
        self.name != format_tag_name(&self.tag)
    }

    /// An entity must carry a real name, a non-empty field, or a transaction id.
    pub fn carries_information(&self) -> bool {
        self.has_real_name()
            || !self.transaction_id.is_empty()
            || self.fields.values().any(|value| !value.is_empty())
    }
}

/// Why an element qualifies as an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityMark {
    /// Has a direct `Name` child with non-empty text.
    Named,
    /// No usable name, but carries a `transactionid` attribute.
    Transactional,
}

/// Classify the element at `id`, or `None` when it is not an entity.
///
/// Root containers and pure wrappers of known entity tags never qualify.
/// A container tag nested under an unwrap parent (for example each
/// `Configuration` inside `VPNIPSecConnection`) is not a root container.
pub fn entity_mark(doc: &DocumentIndex<'_>, id: NodeId, policy: &EntityPolicy) -> Option<EntityMark> {
    let node = doc.node(id);
    let mark = if direct_name(doc, id).is_some() {
        EntityMark::Named
    } else if node.attribute(TRANSACTION_ID_ATTR).is_some() {
        EntityMark::Transactional
    } else {
        return None;
    };

    if is_root_container(doc, id, policy)
        || is_known_wrapper(doc, id, policy)
        || has_unwrap_children(doc, id, policy)
    {
        return None;
    }
    Some(mark)
}

/// Children of `id` that are unwrapped into entities of their own.
pub fn unwrap_children<'d>(
    doc: &'d DocumentIndex<'_>,
    id: NodeId,
    policy: &'d EntityPolicy,
) -> impl Iterator<Item = NodeId> + 'd {
    let child_tag = policy.unwrap_child(doc.tag(id));
    doc.children(id)
        .iter()
        .copied()
        .filter(move |child| child_tag == Some(doc.tag(*child)))
}

fn has_unwrap_children(doc: &DocumentIndex<'_>, id: NodeId, policy: &EntityPolicy) -> bool {
    unwrap_children(doc, id, policy).next().is_some()
}

/// Non-empty trimmed text of the direct `Name` child.
pub fn direct_name<'a>(doc: &DocumentIndex<'a>, id: NodeId) -> Option<&'a str> {
    doc.node(id)
        .child_text(NAME_TAG)
        .filter(|name| !name.is_empty())
}

/// Tag an entity is reported under: the unwrap parent's tag for unwrapped children.
pub fn reported_tag<'a>(doc: &DocumentIndex<'a>, id: NodeId, policy: &EntityPolicy) -> &'a str {
    unwrap_parent(doc, id, policy).map_or_else(|| doc.tag(id), |parent| doc.tag(parent))
}

/// Transaction id, inherited from the unwrap parent for unwrapped children.
pub fn transaction_id<'a>(doc: &DocumentIndex<'a>, id: NodeId, policy: &EntityPolicy) -> &'a str {
    let owner = unwrap_parent(doc, id, policy).unwrap_or(id);
    doc.node(owner).attribute(TRANSACTION_ID_ATTR).unwrap_or("")
}

/// Build the canonical record for the element at `id`, stored under `tag`.
pub fn build_entity(
    doc: &DocumentIndex<'_>,
    id: NodeId,
    tag: &str,
    policy: &EntityPolicy,
) -> Result<Entity, WriteError> {
    let node = doc.node(id);
    let fields = parse_children(node.children.iter().filter(|c| c.tag != NAME_TAG));

    let name = match direct_name(doc, id) {
        Some(name) => name.to_string(),
        None => variant_name(&fields).unwrap_or_else(|| format_tag_name(tag)),
    };

    Ok(Entity {
        tag: tag.to_string(),
        name,
        transaction_id: transaction_id(doc, id, policy).to_string(),
        fields,
        raw_xml: to_xml_string(node)?,
    })
}

// A differently cased `name` child still names the entity.
fn variant_name(fields: &FieldMap) -> Option<String> {
    fields
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(NAME_TAG))
        .and_then(|(_, value)| value.as_scalar())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn unwrap_parent(doc: &DocumentIndex<'_>, id: NodeId, policy: &EntityPolicy) -> Option<NodeId> {
    let parent = doc.parent(id)?;
    (policy.unwrap_child(doc.tag(parent)) == Some(doc.tag(id))).then_some(parent)
}

fn is_root_container(doc: &DocumentIndex<'_>, id: NodeId, policy: &EntityPolicy) -> bool {
    policy.is_container_tag(doc.tag(id)) && unwrap_parent(doc, id, policy).is_none()
}

// Every child is a known entity selector. Applies to transaction-only
// elements too: a `Name` child is never a selector, so named elements pass.
fn is_known_wrapper(doc: &DocumentIndex<'_>, id: NodeId, policy: &EntityPolicy) -> bool {
    let children = doc.children(id);
    !children.is_empty()
        && children
            .iter()
            .all(|child| policy.is_known_selector(doc.tag(*child)))
}
