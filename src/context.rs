//! Context blob construction.
//!
//! The ingestion layer hands over a map of relative path to file content;
//! backends see one concatenated string with a header and separator per file.

use std::collections::BTreeMap;

/// Rendered in place of an empty source map.
pub const EMPTY_SOURCE: &str = "Source empty.";

const FILE_SEPARATOR: &str = "====================";

/// Concatenate files in path order, each truncated to `per_file_chars`.
pub fn build_context(files: &BTreeMap<String, String>, per_file_chars: usize) -> String {
    if files.is_empty() {
        return EMPTY_SOURCE.to_string();
    }
    files
        .iter()
        .map(|(path, content)| {
            format!(
                "FILE: {}\n{}\n{}",
                path,
                truncate_chars(content, per_file_chars),
                FILE_SEPARATOR
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The first `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
