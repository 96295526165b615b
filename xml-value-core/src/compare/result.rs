use serde::Serialize;

use crate::value::FieldValue;

/// Outcome of comparing an old and a new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueDiff {
    /// Both sides hold the same content.
    Unchanged,
    /// Value only on the new side.
    Added { value: FieldValue },
    /// Value only on the old side.
    Removed { value: FieldValue },
    /// Scalars that differ, or values of incompatible shape.
    Modified { old: FieldValue, new: FieldValue },
    /// Element-level breakdown of two arrays.
    Array(ArrayDiff),
    /// Key-level breakdown of two objects.
    Object(ObjectDiff),
}

impl ValueDiff {
    /// True unless the two sides compared equal.
    pub fn is_changed(&self) -> bool {
        match self {
            Self::Unchanged => false,
            Self::Added { .. } | Self::Removed { .. } | Self::Modified { .. } => true,
            Self::Array(diff) => diff.is_changed(),
            Self::Object(diff) => diff.is_changed(),
        }
    }
}

/// Array comparison grouped by outcome.
///
/// `unchanged` holds values present on both sides; for object arrays these
/// were matched by content signature regardless of position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArrayDiff {
    pub added: Vec<FieldValue>,
    pub removed: Vec<FieldValue>,
    pub unchanged: Vec<FieldValue>,
    pub modified: Vec<ElementChange>,
}

impl ArrayDiff {
    pub fn is_changed(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty())
    }
}

/// Two array elements at the same position judged to be the same record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementChange {
    pub index: usize,
    pub old: FieldValue,
    pub new: FieldValue,
    pub diff: Box<ValueDiff>,
}

/// Per-key comparison of two objects, old keys first then new-only keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObjectDiff {
    pub entries: Vec<(String, ValueDiff)>,
}

impl ObjectDiff {
    pub fn is_changed(&self) -> bool {
        self.entries.iter().any(|(_, diff)| diff.is_changed())
    }

    /// Only the keys whose values differ.
    pub fn changed(&self) -> impl Iterator<Item = (&str, &ValueDiff)> {
        self.entries
            .iter()
            .filter(|(_, diff)| diff.is_changed())
            .map(|(key, diff)| (key.as_str(), diff))
    }
}
