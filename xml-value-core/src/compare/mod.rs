//! Content-aware comparison of [`FieldValue`](crate::FieldValue)s.

pub mod engine;
pub mod result;
pub mod signature;

pub use engine::{deep_compare, deep_compare_with_options, CompareOptions};
pub use result::{ArrayDiff, ElementChange, ObjectDiff, ValueDiff};
pub use signature::{content_signature, map_signature};
