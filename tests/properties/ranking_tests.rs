use std::collections::HashMap;

use proptest::prelude::*;

use campus_search::search::hybrid::score;
use campus_search::search::{HybridWeights, ScoreSet};

fn score_set() -> impl Strategy<Value = ScoreSet> {
    proptest::collection::hash_map("[a-h]{1,2}", -50.0f64..50.0, 0..12)
}

proptest! {
    #[test]
    fn fused_scores_are_bounded_and_sorted(
        ft in score_set(),
        sem in score_set(),
        w in 0.0f32..=1.0,
    ) {
        prop_assume!(!ft.is_empty() || !sem.is_empty());
        let weights = HybridWeights::normalized(w, 1.0 - w);
        let results = score(&ft, &sem, weights).unwrap();

        let expected: std::collections::BTreeSet<_> = ft.keys().chain(sem.keys()).collect();
        prop_assert_eq!(results.len(), expected.len());

        for r in &results {
            prop_assert!(r.score >= -1e-9 && r.score <= 1.0 + 1e-9, "{:?}", r);
        }
        for pair in results.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.score > b.score || (a.score == b.score && a.id < b.id));
        }
    }

    #[test]
    fn scoring_is_deterministic(ft in score_set(), sem in score_set()) {
        prop_assume!(!ft.is_empty() || !sem.is_empty());
        let first = score(&ft, &sem, HybridWeights::EQUAL).unwrap();
        // Rebuild the maps so iteration order differs.
        let ft2: HashMap<_, _> = ft.into_iter().collect();
        let sem2: HashMap<_, _> = sem.into_iter().collect();
        let second = score(&ft2, &sem2, HybridWeights::EQUAL).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn full_text_only_ranks_by_raw_score(ft in score_set()) {
        prop_assume!(!ft.is_empty());
        let results = score(&ft, &ScoreSet::new(), HybridWeights::FULL_TEXT_ONLY).unwrap();
        for pair in results.windows(2) {
            let (a, b) = (ft[&pair[0].id], ft[&pair[1].id]);
            prop_assert!(a > b || (a == b && pair[0].id < pair[1].id));
        }
    }
}
