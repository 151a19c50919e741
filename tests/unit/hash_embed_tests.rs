use campus_search::CsError;
use campus_search::search::{Embedder, HashEmbedder};
use campus_search::test_utils::{TestCase, run_table_tests};

#[test]
fn hash_embedding_dimensions_table() -> Result<(), String> {
    let cases = vec![
        TestCase {
            name: "dims_32",
            input: (32usize, "desk lamp"),
            expected: 32usize,
            should_panic: false,
        },
        TestCase {
            name: "dims_1536",
            input: (1536usize, "graphing calculator, barely used"),
            expected: 1536usize,
            should_panic: false,
        },
        TestCase {
            name: "dims_zero_clamps_to_one",
            input: (0usize, "bike"),
            expected: 1usize,
            should_panic: false,
        },
    ];

    run_table_tests(cases, |(dim, text)| {
        let embedder = HashEmbedder::new(dim);
        embedder.embed(text).expect("embed").embedding.len()
    })?;
    Ok(())
}

#[test]
fn hash_embedding_is_unit_length_and_case_insensitive() {
    let embedder = HashEmbedder::new(128);
    let lower = embedder.embed("desk lamp").unwrap();
    let upper = embedder.embed("DESK   Lamp\n").unwrap();
    assert_eq!(lower.embedding, upper.embedding);
    assert_eq!(lower.model, "fnv1a-hash");

    let norm: f32 = lower.embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-5);
}

#[test]
fn related_titles_are_closer_than_unrelated() {
    let embedder = HashEmbedder::new(256);
    let lamp = embedder.embed_text("desk lamp led");
    let other_lamp = embedder.embed_text("floor lamp led");
    let bike = embedder.embed_text("bike lock");
    assert!(embedder.similarity(&lamp, &other_lamp) > embedder.similarity(&lamp, &bike));
}

#[test]
fn blank_input_is_rejected() {
    let embedder = HashEmbedder::new(16);
    assert!(matches!(
        embedder.embed(" \n\t "),
        Err(CsError::ValidationFailed(_))
    ));

    let err = embedder
        .embed_batch(&["ok".to_string(), String::new(), "fine".to_string(), "  ".to_string()])
        .unwrap_err();
    assert!(matches!(err, CsError::ValidationFailed(ref msg) if msg.contains("[1, 3]")));
}

#[test]
fn empty_batch_is_empty() {
    let embedder = HashEmbedder::new(16);
    assert!(embedder.embed_batch(&[]).unwrap().is_empty());
}
