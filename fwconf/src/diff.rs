//! Entity-level diff between two configuration snapshots.
//!
//! Entities are matched by `tag:name`. Transaction ids are ignored because
//! independently exported snapshots do not keep them stable. When a key
//! occurs more than once on one side, the first occurrence is compared and
//! the rest collapse into it.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;
use xml_value_core::{deep_compare_with_options, map_signature, CompareOptions, FieldValue, ValueDiff};

use crate::entity::Entity;
use crate::extract::ConfigurationModel;

/// One differing top-level field of a modified entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<FieldValue>,
    pub new_value: Option<FieldValue>,
    /// Structured breakdown, e.g. which array members were added.
    pub diff: ValueDiff,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffItem {
    pub tag: String,
    pub name: String,
    pub key: String,
    /// Source XML of an added or removed entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_xml: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_raw_xml: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_raw_xml: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<FieldChange>,
}

impl DiffItem {
    fn single(entity: &Entity, key: String) -> Self {
        Self {
            tag: entity.tag.clone(),
            name: entity.name.clone(),
            key,
            raw_xml: Some(entity.raw_xml.clone()),
            old_raw_xml: None,
            new_raw_xml: None,
            changes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffResult {
    pub added: Vec<DiffItem>,
    pub removed: Vec<DiffItem>,
    pub modified: Vec<DiffItem>,
    /// Keys of entities present and equal on both sides.
    pub unchanged: Vec<String>,
    pub summary: DiffSummary,
}

impl DiffResult {
    fn new(added: Vec<DiffItem>, removed: Vec<DiffItem>, modified: Vec<DiffItem>, unchanged: Vec<String>) -> Self {
        let summary = DiffSummary {
            added: added.len(),
            removed: removed.len(),
            modified: modified.len(),
            unchanged: unchanged.len(),
        };
        Self {
            added,
            removed,
            modified,
            unchanged,
            summary,
        }
    }

    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty())
    }
}

pub fn diff_configurations(old: &ConfigurationModel, new: &ConfigurationModel) -> DiffResult {
    diff_configurations_with_options(old, new, &CompareOptions::default())
}

pub fn diff_configurations_with_options(
    old: &ConfigurationModel,
    new: &ConfigurationModel,
    opts: &CompareOptions,
) -> DiffResult {
    diff_entities(old.entities(), new.entities(), opts)
}

/// Diff two entity sequences by `tag:name` identity.
///
/// Output lists follow first appearance: old-side keys, then new-only keys.
pub fn diff_entities<'a>(
    old: impl IntoIterator<Item = &'a Entity>,
    new: impl IntoIterator<Item = &'a Entity>,
    opts: &CompareOptions,
) -> DiffResult {
    let old = KeyedEntities::collect(old);
    let new = KeyedEntities::collect(new);

    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut modified = Vec::new();
    let mut unchanged = Vec::new();

    for key in &old.order {
        let before = old.by_key[key];
        match new.by_key.get(key) {
            None => removed.push(DiffItem::single(before, key.clone())),
            Some(after) => match field_changes(before, after, opts) {
                None => unchanged.push(key.clone()),
                Some(changes) => modified.push(DiffItem {
                    tag: before.tag.clone(),
                    name: before.name.clone(),
                    key: key.clone(),
                    raw_xml: None,
                    old_raw_xml: Some(before.raw_xml.clone()),
                    new_raw_xml: Some(after.raw_xml.clone()),
                    changes,
                }),
            },
        }
    }
    for key in new.order.iter().filter(|k| !old.by_key.contains_key(*k)) {
        added.push(DiffItem::single(new.by_key[key], key.clone()));
    }

    let result = DiffResult::new(added, removed, modified, unchanged);
    debug!(
        added = result.summary.added,
        removed = result.summary.removed,
        modified = result.summary.modified,
        unchanged = result.summary.unchanged,
        "diffed configurations"
    );
    result
}

struct KeyedEntities<'a> {
    order: Vec<String>,
    by_key: HashMap<String, &'a Entity>,
}

impl<'a> KeyedEntities<'a> {
    fn collect(entities: impl IntoIterator<Item = &'a Entity>) -> Self {
        let mut order = Vec::new();
        let mut by_key = HashMap::new();
        for entity in entities {
            let key = entity.identity_key();
            if !by_key.contains_key(&key) {
                order.push(key.clone());
                by_key.insert(key, entity);
            }
        }
        Self { order, by_key }
    }
}

// `None` when the entities are equivalent. Identical signatures short-cut the
// field walk; differing signatures can still be equivalent when only the
// order of primitive array members moved.
fn field_changes(old: &Entity, new: &Entity, opts: &CompareOptions) -> Option<Vec<FieldChange>> {
    if map_signature(&old.fields) == map_signature(&new.fields) {
        return None;
    }

    let fields = old
        .fields
        .keys()
        .chain(new.fields.keys().filter(|k| !old.fields.contains_key(k)));
    let changes: Vec<FieldChange> = fields
        .filter_map(|field| {
            let before = old.fields.get(field);
            let after = new.fields.get(field);
            let diff = deep_compare_with_options(before, after, opts);
            diff.is_changed().then(|| FieldChange {
                field: field.to_string(),
                old_value: before.cloned(),
                new_value: after.cloned(),
                diff,
            })
        })
        .collect();

    (!changes.is_empty()).then_some(changes)
}
