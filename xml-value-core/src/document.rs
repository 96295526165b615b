//! Flat, document-ordered view over an [`XmlNode`] tree.
//!
//! [`XmlNode`] owns its children and has no parent links. Entity discovery and
//! reference resolution both need to walk upwards, so this module flattens the
//! tree once into an arena of [`NodeId`]s with parent pointers.

use std::collections::HashMap;

use crate::tree::XmlNode;

/// Position of an element in [`DocumentIndex`] preorder.
pub type NodeId = usize;

#[derive(Debug, Clone)]
struct Slot<'a> {
    node: &'a XmlNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena of every element in a document, in preorder (document order).
#[derive(Debug, Clone)]
pub struct DocumentIndex<'a> {
    slots: Vec<Slot<'a>>,
}

impl<'a> DocumentIndex<'a> {
    /// Index `root` and all of its descendants. `root` gets id `0`.
    pub fn build(root: &'a XmlNode) -> Self {
        let mut slots = Vec::new();
        // (node, parent) pairs; children pushed in reverse to pop in order.
        let mut pending: Vec<(&'a XmlNode, Option<NodeId>)> = vec![(root, None)];
        while let Some((node, parent)) = pending.pop() {
            let id = slots.len();
            slots.push(Slot {
                node,
                parent,
                children: Vec::with_capacity(node.children.len()),
            });
            if let Some(parent) = parent {
                slots[parent].children.push(id);
            }
            for child in node.children.iter().rev() {
                pending.push((child, Some(id)));
            }
        }
        Self { slots }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Element behind `id`.
    ///
    /// # Panics
    ///
    /// Panics when `id` did not come from this index.
    pub fn node(&self, id: NodeId) -> &'a XmlNode {
        self.slots[id].node
    }

    pub fn tag(&self, id: NodeId) -> &'a str {
        self.slots[id].node.tag.as_str()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id].parent
    }

    /// Direct child ids of `id`, in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slots[id].children
    }

    /// All ids in document order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        0..self.slots.len()
    }

    /// Ids of every element with `tag`, in document order.
    pub fn with_tag<'s>(&'s self, tag: &'s str) -> impl Iterator<Item = NodeId> + 's {
        self.ids().filter(move |id| self.tag(*id) == tag)
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_, 'a> {
        Ancestors {
            index: self,
            next: self.parent(id),
        }
    }

    /// Tags from the root down to `id`, inclusive.
    pub fn tag_path(&self, id: NodeId) -> Vec<&'a str> {
        let mut path: Vec<&'a str> = self.ancestors(id).map(|a| self.tag(a)).collect();
        path.reverse();
        path.push(self.tag(id));
        path
    }

    /// Map every non-empty trimmed text value to the elements that carry it.
    ///
    /// Built in one pass so lookups by value never re-walk the tree.
    pub fn text_index(&self) -> HashMap<&'a str, Vec<NodeId>> {
        let mut out: HashMap<&'a str, Vec<NodeId>> = HashMap::new();
        for id in self.ids() {
            let text = self.node(id).trimmed_text();
            if !text.is_empty() {
                out.entry(text).or_default().push(id);
            }
        }
        out
    }
}

/// Iterator returned by [`DocumentIndex::ancestors`].
pub struct Ancestors<'i, 'a> {
    index: &'i DocumentIndex<'a>,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_, '_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.index.parent(current);
        Some(current)
    }
}
