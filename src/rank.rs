//! Priority ranking of merged records.

use crate::record::TestCaseRecord;
use std::cmp::Ordering;

/// Order records by priority severity (Critical first), then confidence
/// descending. The sort is stable: records equal on both keys keep their
/// input order.
pub fn rank(mut records: Vec<TestCaseRecord>) -> Vec<TestCaseRecord> {
    records.sort_by(compare);
    records
}

fn compare(a: &TestCaseRecord, b: &TestCaseRecord) -> Ordering {
    a.priority
        .severity()
        .cmp(&b.priority.severity())
        .then_with(|| b.confidence.total_cmp(&a.confidence))
}
