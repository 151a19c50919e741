use campus_search::CsError;
use campus_search::search::hybrid::{min_max_normalize, score};
use campus_search::search::{HybridWeights, ScoreSet};
use campus_search::test_utils::{TestCase, run_table_tests};

fn set(pairs: &[(&str, f64)]) -> ScoreSet {
    pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
}

type Scores = Vec<(&'static str, f64)>;

fn ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}

#[test]
fn fusion_order_table() -> Result<(), String> {
    let cases: Vec<TestCase<(Scores, Scores, (f32, f32)), Vec<String>>> = vec![
        TestCase {
            name: "missing_semantic_ties_break_by_id",
            input: (vec![("a", 1.0), ("b", 2.0)], vec![("a", 5.0)], (0.5, 0.5)),
            expected: ids(&["a", "b"]),
            should_panic: false,
        },
        TestCase {
            name: "full_text_only_weights_follow_bm25",
            input: (
                vec![("x", 3.0), ("y", 9.0), ("z", 6.0)],
                vec![("x", 0.99)],
                (1.0, 0.0),
            ),
            expected: ids(&["y", "z", "x"]),
            should_panic: false,
        },
        TestCase {
            name: "semantic_heavy_promotes_vector_match",
            input: (
                vec![("x", 3.0), ("y", 9.0)],
                vec![("x", 0.9), ("y", 0.1)],
                (0.2, 0.8),
            ),
            expected: ids(&["x", "y"]),
            should_panic: false,
        },
        TestCase {
            name: "equal_scores_all_tie",
            input: (vec![("c", 4.0), ("a", 4.0), ("b", 4.0)], vec![], (0.5, 0.5)),
            expected: ids(&["a", "b", "c"]),
            should_panic: false,
        },
    ];

    run_table_tests(cases, |(full_text, semantic, (ft, sem))| {
        let weights = HybridWeights {
            full_text: ft,
            semantic: sem,
        };
        score(&set(&full_text), &set(&semantic), weights)
            .expect("score")
            .into_iter()
            .map(|r| r.id)
            .collect()
    })?;
    Ok(())
}

#[test]
fn worked_example_scores() {
    let results = score(
        &set(&[("a", 1.0), ("b", 2.0)]),
        &set(&[("a", 5.0)]),
        HybridWeights::EQUAL,
    )
    .unwrap();
    assert_eq!(results.len(), 2);
    for r in &results {
        assert!((r.score - 0.5).abs() < 1e-9, "{r:?}");
    }
    assert_eq!(results[0].full_text, Some(0.0));
    assert_eq!(results[0].semantic, Some(1.0));
    assert_eq!(results[1].semantic, None);
}

#[test]
fn normalization_bounds() {
    let normalized = min_max_normalize(&set(&[("a", -2.0), ("b", 0.0), ("c", 8.0)]));
    assert_eq!(normalized["a"], 0.0);
    assert!((normalized["b"] - 0.2).abs() < 1e-9);
    assert_eq!(normalized["c"], 1.0);

    let flat = min_max_normalize(&set(&[("a", 0.3), ("b", 0.3)]));
    assert!(flat.values().all(|v| (*v - 1.0).abs() < f64::EPSILON));
}

#[test]
fn no_candidates_is_empty_result() {
    assert!(matches!(
        score(&ScoreSet::new(), &ScoreSet::new(), HybridWeights::EQUAL),
        Err(CsError::EmptyResult)
    ));
}
