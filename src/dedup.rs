//! Cross-backend deduplication.
//!
//! Two backends asked about the same code tend to propose the same scenarios
//! under slightly different names. Records are compared by the token-set
//! Jaccard similarity of their names; the higher-confidence record of a
//! near-duplicate pair is the one kept.

use crate::record::TestCaseRecord;
use std::collections::HashSet;

/// Similarity above which two names are considered the same scenario.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.80;

/// Collapse near-duplicate records.
///
/// Records are visited in descending confidence order (stable, so ties keep
/// arrival order). A record is dropped when its name's similarity to any
/// already accepted name is strictly greater than `threshold`. Returns the
/// accepted records and the number dropped; the two always sum to the input
/// length.
pub fn deduplicate(mut records: Vec<TestCaseRecord>, threshold: f64) -> (Vec<TestCaseRecord>, usize) {
    records.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut accepted_names: Vec<HashSet<String>> = Vec::new();
    let mut unique = Vec::with_capacity(records.len());
    let mut duplicates = 0;

    for record in records {
        let tokens = name_tokens(&record.name);
        if accepted_names
            .iter()
            .any(|seen| jaccard(&tokens, seen) > threshold)
        {
            duplicates += 1;
            continue;
        }
        accepted_names.push(tokens);
        unique.push(record);
    }

    (unique, duplicates)
}

/// Token-set Jaccard similarity of two names, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    jaccard(&name_tokens(a), &name_tokens(b))
}

fn name_tokens(name: &str) -> HashSet<String> {
    name.split_whitespace().map(str::to_lowercase).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
