//! Synthetic fallback batch for the degraded path.
//!
//! Used only when no backend produced a single usable record. The batch is
//! fixed and clearly labelled through its provenance, so it can never be
//! mistaken for real output.

use crate::record::{Complexity, Priority, TestCaseRecord};

/// Provenance carried by every fallback record.
pub const FALLBACK_PROVENANCE: &str = "Sentinel Fallback Engine";

/// Number of records in the fallback batch.
pub const FALLBACK_RECORD_COUNT: usize = 5;

/// The fixed fallback batch, in generation order.
pub fn fallback() -> Vec<TestCaseRecord> {
    (1..=FALLBACK_RECORD_COUNT).map(fallback_record).collect()
}

fn fallback_record(index: usize) -> TestCaseRecord {
    let mut record = TestCaseRecord::new(
        format!("Critical_Logic_Verification_{:02}", index),
        FALLBACK_PROVENANCE,
    );
    record.description = format!(
        "Verifying data integrity for user flow {} under high-load conditions.",
        index
    );
    record.steps = "Mock DB -> Inject Payload -> Verify Transaction".to_string();
    record.priority = Priority::High;
    record.complexity = if index % 2 == 0 {
        Complexity::Complex
    } else {
        Complexity::Medium
    };
    record.code = Some(fallback_code(index));
    record
}

fn fallback_code(index: usize) -> String {
    format!(
        "import pytest\n\
         from unittest.mock import MagicMock\n\
         \n\
         def test_scenario_{i}_validation():\n\
         \x20   # Generated by Sentinel Fallback Engine\n\
         \x20   print('[STEP] Initializing secure context...')\n\
         \x20   service = MagicMock()\n\
         \x20   service.process.return_value = True\n\
         \n\
         \x20   print('[STEP] Injecting test payload...')\n\
         \x20   result = service.process({{'id': {i}}})\n\
         \n\
         \x20   print('[STEP] Verifying output integrity...')\n\
         \x20   assert result is True\n\
         \x20   print('[SUCCESS] Logic path confirmed.')",
        i = index
    )
}
