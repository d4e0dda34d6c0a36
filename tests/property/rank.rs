//! Ranking is a stable total order

use proptest::prelude::*;
use sentinel::rank::rank;
use sentinel::record::{Priority, TestCaseRecord};

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Critical),
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low),
    ]
}

/// Few distinct confidences so ties are common
fn records() -> impl Strategy<Value = Vec<TestCaseRecord>> {
    prop::collection::vec((priority(), 0u8..4), 0..30).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (priority, c))| {
                let mut record = TestCaseRecord::new(format!("case {}", i), "prop");
                record.priority = priority;
                record.confidence = f64::from(c) / 4.0;
                record
            })
            .collect()
    })
}

/// Arrival index encoded in the name by `records()`
fn index(record: &TestCaseRecord) -> usize {
    record.name["case ".len()..].parse().unwrap()
}

proptest! {
    #[test]
    fn ranked_output_is_ordered_and_stable(input in records()) {
        let ranked = rank(input.clone());
        prop_assert_eq!(ranked.len(), input.len());

        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.priority.severity() <= b.priority.severity());
            if a.priority == b.priority {
                prop_assert!(a.confidence >= b.confidence);
                if a.confidence == b.confidence {
                    prop_assert!(index(a) < index(b));
                }
            }
        }
    }

    #[test]
    fn ranking_is_deterministic(input in records()) {
        prop_assert_eq!(rank(input.clone()), rank(input));
    }
}
