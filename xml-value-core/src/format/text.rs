use crate::compare::{ArrayDiff, ValueDiff};

/// Format a value diff as `+`/`-`/`~` prefixed lines under `label`.
///
/// Unchanged values produce no lines.
pub fn format_diff_lines(label: &str, diff: &ValueDiff) -> Vec<String> {
    let mut lines = Vec::new();
    push_lines(label, diff, 0, &mut lines);
    lines
}

fn push_lines(label: &str, diff: &ValueDiff, depth: usize, out: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    match diff {
        ValueDiff::Unchanged => {}
        ValueDiff::Added { value } => out.push(format!("{indent}+ {label}: {value}")),
        ValueDiff::Removed { value } => out.push(format!("{indent}- {label}: {value}")),
        ValueDiff::Modified { old, new } => out.push(format!("{indent}~ {label}: {old} -> {new}")),
        ValueDiff::Array(array) => push_array(label, array, depth, out),
        ValueDiff::Object(object) => {
            out.push(format!("{indent}~ {label}"));
            for (key, child) in object.changed() {
                push_lines(key, child, depth + 1, out);
            }
        }
    }
}

fn push_array(label: &str, array: &ArrayDiff, depth: usize, out: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let inner = "  ".repeat(depth + 1);
    out.push(format!(
        "{indent}~ {label} (unchanged={})",
        array.unchanged.len()
    ));
    for value in &array.removed {
        out.push(format!("{inner}- {value}"));
    }
    for value in &array.added {
        out.push(format!("{inner}+ {value}"));
    }
    for change in &array.modified {
        push_lines(&format!("[{}]", change.index), &change.diff, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::format_diff_lines;
    use crate::compare::deep_compare;
    use crate::FieldValue;

    fn arr(values: &[&str]) -> FieldValue {
        FieldValue::Array(values.iter().map(|v| FieldValue::Scalar(v.to_string())).collect())
    }

    #[test]
    fn array_changes_list_removed_then_added() {
        let diff = deep_compare(Some(&arr(&["A", "B"])), Some(&arr(&["B", "C"])));
        assert_eq!(
            format_diff_lines("SourceZones", &diff),
            vec!["~ SourceZones (unchanged=1)", "  - A", "  + C"]
        );
    }

    #[test]
    fn unchanged_renders_nothing() {
        let diff = deep_compare(Some(&arr(&["A"])), Some(&arr(&["A"])));
        assert!(format_diff_lines("Zones", &diff).is_empty());
    }

    #[test]
    fn scalar_change_shows_both_sides() {
        let old = FieldValue::Scalar("10.0.0.1".to_string());
        let new = FieldValue::Scalar("10.0.0.2".to_string());
        assert_eq!(
            format_diff_lines("IPAddress", &deep_compare(Some(&old), Some(&new))),
            vec!["~ IPAddress: 10.0.0.1 -> 10.0.0.2"]
        );
    }
}
