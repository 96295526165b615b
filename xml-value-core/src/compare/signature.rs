use serde_json::{Map, Value};

use crate::value::{FieldMap, FieldValue};

/// Canonical serialized form of `value`: JSON with object keys sorted.
///
/// Two values have equal signatures exactly when they are structurally
/// equal ignoring object key order. Array order is significant here; callers
/// that want order-independent arrays use [`crate::deep_compare`].
pub fn content_signature(value: &FieldValue) -> String {
    canonical(value).to_string()
}

/// [`content_signature`] of a whole field mapping.
pub fn map_signature(map: &FieldMap) -> String {
    canonical_map(map).to_string()
}

fn canonical(value: &FieldValue) -> Value {
    match value {
        FieldValue::Scalar(s) => Value::String(s.clone()),
        FieldValue::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        FieldValue::Object(map) => canonical_map(map),
    }
}

fn canonical_map(map: &FieldMap) -> Value {
    let mut entries: Vec<(&str, &FieldValue)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let mut out = Map::new();
    for (key, value) in entries {
        out.insert(key.to_string(), canonical(value));
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::{content_signature, map_signature};
    use crate::{parse, parse_object, parse_value};

    #[test]
    fn key_order_does_not_change_signature() {
        let a = parse(b"<S><Port>80</Port><Proto>TCP</Proto></S>").expect("parse");
        let b = parse(b"<S><Proto>TCP</Proto><Port>80</Port></S>").expect("parse");
        assert_eq!(content_signature(&parse_value(&a)), content_signature(&parse_value(&b)));
        assert_eq!(map_signature(&parse_object(&a)), r#"{"Port":"80","Proto":"TCP"}"#);
    }

    #[test]
    fn scalar_and_single_element_array_differ() {
        let a = parse(b"<S><Zone>LAN</Zone></S>").expect("parse");
        let b = parse(b"<S><Zone>LAN</Zone><Zone>LAN</Zone></S>").expect("parse");
        assert_ne!(content_signature(&parse_value(&a)), content_signature(&parse_value(&b)));
    }
}
