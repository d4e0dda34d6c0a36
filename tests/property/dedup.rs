//! Deduplication conserves records and never grows the set

use proptest::prelude::*;
use sentinel::dedup::{deduplicate, similarity};
use sentinel::record::TestCaseRecord;

fn record_strategy() -> impl Strategy<Value = TestCaseRecord> {
    ("[a-d]{1,3}( [a-d]{1,3}){0,4}", 0.0f64..=1.0).prop_map(|(name, confidence)| {
        let mut record = TestCaseRecord::new(name, "prop");
        record.confidence = confidence;
        record
    })
}

proptest! {
    #[test]
    fn unique_plus_duplicates_equals_input(
        records in prop::collection::vec(record_strategy(), 0..24),
        threshold in 0.05f64..=1.0,
    ) {
        let input = records.len();
        let (unique, duplicates) = deduplicate(records, threshold);
        prop_assert!(unique.len() <= input);
        prop_assert_eq!(unique.len() + duplicates, input);
    }

    #[test]
    fn survivors_are_pairwise_dissimilar(
        records in prop::collection::vec(record_strategy(), 0..24),
    ) {
        let (unique, _) = deduplicate(records, 0.8);
        for (i, a) in unique.iter().enumerate() {
            for b in &unique[i + 1..] {
                prop_assert!(similarity(&a.name, &b.name) <= 0.8);
            }
        }
    }

    #[test]
    fn deduplication_is_stable_under_repetition(
        records in prop::collection::vec(record_strategy(), 0..24),
    ) {
        let (once, _) = deduplicate(records, 0.8);
        let (twice, removed) = deduplicate(once.clone(), 0.8);
        prop_assert_eq!(removed, 0);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn similarity_is_symmetric_and_bounded(a in "[a-c ]{0,12}", b in "[a-c ]{0,12}") {
        let ab = similarity(&a, &b);
        prop_assert_eq!(ab, similarity(&b, &a));
        prop_assert!((0.0..=1.0).contains(&ab));
    }
}
