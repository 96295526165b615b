//! Comparison output formatters.

pub mod text;

pub use text::format_diff_lines;
