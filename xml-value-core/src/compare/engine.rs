use std::collections::HashSet;

use crate::compare::result::{ArrayDiff, ElementChange, ObjectDiff, ValueDiff};
use crate::compare::signature::content_signature;
use crate::value::{FieldMap, FieldValue};

/// Configures deep comparison behavior.
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Minimum number of shared keys for two unmatched objects at the same
    /// array position to count as one modified record instead of a removal
    /// plus an addition.
    ///
    /// This is a heuristic: unrelated record shapes that happen to share a
    /// field name still pair up at the default of `1`, and `0` pairs every
    /// leftover same-index pair of objects.
    pub min_shared_keys: usize,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self { min_shared_keys: 1 }
    }
}

/// Compare two optional values with default options.
pub fn deep_compare(old: Option<&FieldValue>, new: Option<&FieldValue>) -> ValueDiff {
    deep_compare_with_options(old, new, &CompareOptions::default())
}

/// Compare two optional values. `None` means the value is absent on that side.
pub fn deep_compare_with_options(
    old: Option<&FieldValue>,
    new: Option<&FieldValue>,
    opts: &CompareOptions,
) -> ValueDiff {
    match (old, new) {
        (None, None) => ValueDiff::Unchanged,
        (None, Some(new)) => ValueDiff::Added { value: new.clone() },
        (Some(old), None) => ValueDiff::Removed { value: old.clone() },
        (Some(old), Some(new)) => compare_values(old, new, opts),
    }
}

fn compare_values(old: &FieldValue, new: &FieldValue, opts: &CompareOptions) -> ValueDiff {
    match (old, new) {
        (FieldValue::Scalar(a), FieldValue::Scalar(b)) => {
            if a == b {
                ValueDiff::Unchanged
            } else {
                modified(old, new)
            }
        }
        (FieldValue::Array(a), FieldValue::Array(b)) => compare_arrays(a, b, opts),
        (FieldValue::Object(a), FieldValue::Object(b)) => {
            let diff = compare_objects(a, b, opts);
            if diff.is_changed() {
                ValueDiff::Object(diff)
            } else {
                ValueDiff::Unchanged
            }
        }
        // A repeated tag is promoted to an array; one occurrence stays scalar.
        (FieldValue::Scalar(_), FieldValue::Array(b)) if all_scalars(b) => {
            compare_arrays(std::slice::from_ref(old), b, opts)
        }
        (FieldValue::Array(a), FieldValue::Scalar(_)) if all_scalars(a) => {
            compare_arrays(a, std::slice::from_ref(new), opts)
        }
        _ => modified(old, new),
    }
}

fn modified(old: &FieldValue, new: &FieldValue) -> ValueDiff {
    ValueDiff::Modified {
        old: old.clone(),
        new: new.clone(),
    }
}

fn all_scalars(items: &[FieldValue]) -> bool {
    items.iter().all(FieldValue::is_scalar)
}

fn compare_arrays(old: &[FieldValue], new: &[FieldValue], opts: &CompareOptions) -> ValueDiff {
    let diff = if all_scalars(old) && all_scalars(new) {
        compare_scalar_sets(old, new)
    } else {
        align_records(old, new, opts)
    };

    if diff.is_changed() {
        ValueDiff::Array(diff)
    } else {
        ValueDiff::Unchanged
    }
}

/// Primitive arrays are sets: order changes alone are not a modification.
fn compare_scalar_sets(old: &[FieldValue], new: &[FieldValue]) -> ArrayDiff {
    let old_set: HashSet<&FieldValue> = old.iter().collect();
    let new_set: HashSet<&FieldValue> = new.iter().collect();

    let mut diff = ArrayDiff::default();
    let mut seen = HashSet::new();
    for value in old {
        if !seen.insert(value) {
            continue;
        }
        if new_set.contains(value) {
            diff.unchanged.push(value.clone());
        } else {
            diff.removed.push(value.clone());
        }
    }
    let mut seen = HashSet::new();
    for value in new {
        if seen.insert(value) && !old_set.contains(value) {
            diff.added.push(value.clone());
        }
    }
    diff
}

/// Align record arrays in three passes:
///
/// 1. exact content-signature matches, regardless of position
/// 2. leftover pairs at the same index sharing enough keys are one modified record
/// 3. anything still unmatched is removed (old) or added (new)
fn align_records(old: &[FieldValue], new: &[FieldValue], opts: &CompareOptions) -> ArrayDiff {
    let mut old_matched = vec![false; old.len()];
    let mut new_matched = vec![false; new.len()];
    let mut diff = ArrayDiff::default();

    match_by_signature(old, new, &mut old_matched, &mut new_matched, &mut diff);
    match_by_position(old, new, &mut old_matched, &mut new_matched, &mut diff, opts);

    for (idx, value) in old.iter().enumerate() {
        if !old_matched[idx] {
            diff.removed.push(value.clone());
        }
    }
    for (idx, value) in new.iter().enumerate() {
        if !new_matched[idx] {
            diff.added.push(value.clone());
        }
    }
    diff
}

fn match_by_signature(
    old: &[FieldValue],
    new: &[FieldValue],
    old_matched: &mut [bool],
    new_matched: &mut [bool],
    diff: &mut ArrayDiff,
) {
    let new_signatures: Vec<String> = new.iter().map(content_signature).collect();
    for (old_idx, value) in old.iter().enumerate() {
        let signature = content_signature(value);
        let found = new_signatures
            .iter()
            .enumerate()
            .find(|(new_idx, candidate)| !new_matched[*new_idx] && **candidate == signature)
            .map(|(new_idx, _)| new_idx);
        if let Some(new_idx) = found {
            old_matched[old_idx] = true;
            new_matched[new_idx] = true;
            diff.unchanged.push(value.clone());
        }
    }
}

fn match_by_position(
    old: &[FieldValue],
    new: &[FieldValue],
    old_matched: &mut [bool],
    new_matched: &mut [bool],
    diff: &mut ArrayDiff,
    opts: &CompareOptions,
) {
    for idx in 0..old.len().min(new.len()) {
        if old_matched[idx] || new_matched[idx] {
            continue;
        }
        let (FieldValue::Object(a), FieldValue::Object(b)) = (&old[idx], &new[idx]) else {
            continue;
        };
        if shared_keys(a, b) < opts.min_shared_keys {
            continue;
        }
        old_matched[idx] = true;
        new_matched[idx] = true;
        diff.modified.push(ElementChange {
            index: idx,
            old: old[idx].clone(),
            new: new[idx].clone(),
            diff: Box::new(ValueDiff::Object(compare_objects(a, b, opts))),
        });
    }
}

fn shared_keys(a: &FieldMap, b: &FieldMap) -> usize {
    a.keys().filter(|key| b.contains_key(key)).count()
}

fn compare_objects(old: &FieldMap, new: &FieldMap, opts: &CompareOptions) -> ObjectDiff {
    let mut entries = Vec::new();
    for (key, value) in old.iter() {
        let diff = deep_compare_with_options(Some(value), new.get(key), opts);
        entries.push((key.to_string(), diff));
    }
    for (key, value) in new.iter() {
        if !old.contains_key(key) {
            entries.push((key.to_string(), ValueDiff::Added { value: value.clone() }));
        }
    }
    ObjectDiff { entries }
}
