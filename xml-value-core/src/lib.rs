//! Generic XML parsing, schema-less value inference and content-aware
//! comparison primitives used by higher-level tools.

pub mod compare;
pub mod document;
pub mod format;
pub mod parser;
pub mod tree;
pub mod value;
pub mod writer;

pub use compare::{
    content_signature, deep_compare, deep_compare_with_options, map_signature, ArrayDiff,
    CompareOptions, ElementChange, ObjectDiff, ValueDiff,
};
pub use document::{DocumentIndex, NodeId};
pub use format::format_diff_lines;
pub use parser::{parse, parse_file, ParseError};
pub use tree::XmlNode;
pub use value::{parse_children, parse_object, parse_value, FieldMap, FieldValue};
pub use writer::{to_xml_string, WriteError};
