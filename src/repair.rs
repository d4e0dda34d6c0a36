//! Structured output repair.
//!
//! Backends are asked for strict JSON but routinely return it wrapped in
//! markdown fences, surrounded by prose, or cut off mid-record when they hit
//! their output-token limit. Recovery is an ordered chain of strategies; the
//! first one that decodes wins. Every strategy is total: it returns `None`
//! instead of failing, and so does the chain as a whole.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// One recovery strategy: raw text in, decoded JSON out (or nothing).
pub type RepairStrategy = fn(&str) -> Option<Value>;

/// Strategies in the order they are attempted.
pub const REPAIR_CHAIN: &[(&str, RepairStrategy)] = &[
    ("direct", decode_direct),
    ("strip_fences", decode_without_fences),
    ("first_object", decode_first_object),
    ("balance", decode_balanced),
];

/// Separator between two complete records inside the `test_cases` array.
const RECORD_SEPARATOR: &str = "},";

/// Cut points tried by [`decode_balanced`], counted back from the end.
const MAX_RECORD_CUTS: usize = 8;

static FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)```(?:(?:json|python3?|py|javascript|js|typescript|ts|bash|sh|text)\b)?")
        .expect("valid regex")
});
static FIRST_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Recover the record collection from raw backend text. Never fails; an
/// unrecoverable response yields an empty collection.
pub fn repair(raw: &str) -> Vec<Value> {
    repair_value(raw).map(extract_records).unwrap_or_default()
}

/// Run the strategy chain and return the first decoded document.
pub fn repair_value(raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    REPAIR_CHAIN.iter().find_map(|(name, strategy)| {
        let value = strategy(raw)?;
        debug!(strategy = name, "structured output recovered");
        Some(value)
    })
}

/// Pull the draft records out of a decoded document: the `test_cases` array of
/// an object, or the elements of a bare array.
pub fn extract_records(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("test_cases") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Remove markdown fence markers, including a recognised language tag.
pub fn strip_fences(text: &str) -> String {
    FENCE.replace_all(text, "").trim().to_string()
}

pub fn decode_direct(raw: &str) -> Option<Value> {
    serde_json::from_str(raw.trim()).ok()
}

pub fn decode_without_fences(raw: &str) -> Option<Value> {
    serde_json::from_str(&strip_fences(raw)).ok()
}

/// Decode the span from the first `{` to the last `}`.
pub fn decode_first_object(raw: &str) -> Option<Value> {
    let found = FIRST_OBJECT.find(raw)?;
    serde_json::from_str(found.as_str()).ok()
}

/// Close whatever the text left open; failing that, cut back to the last
/// complete record and close around it. Only the last [`MAX_RECORD_CUTS`]
/// separators are tried, so a reply made of many broken records costs a
/// bounded number of decodes.
pub fn decode_balanced(raw: &str) -> Option<Value> {
    let stripped = strip_fences(raw);
    let start = stripped.find(['{', '['])?;
    let body = stripped[start..].trim_end();

    if let Ok(value) = serde_json::from_str(&close_unbalanced(body)) {
        return Some(value);
    }

    body.rmatch_indices(RECORD_SEPARATOR)
        .take(MAX_RECORD_CUTS)
        .find_map(|(idx, _)| {
            let prefix = &body[..=idx];
            serde_json::from_str(&close_unbalanced(prefix)).ok()
        })
}

/// Append the closers needed to balance `text`.
///
/// Brackets inside string literals are ignored. An unterminated string is
/// closed first, and a dangling comma is dropped before closing containers.
pub fn close_unbalanced(text: &str) -> String {
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' if closers.last() == Some(&ch) => {
                closers.pop();
            }
            _ => {}
        }
    }

    let mut repaired = text.to_string();
    if in_string {
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    } else {
        let trimmed_len = repaired.trim_end().trim_end_matches(',').len();
        repaired.truncate(trimmed_len);
    }
    repaired.extend(closers.iter().rev());
    repaired
}
