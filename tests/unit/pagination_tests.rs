use campus_search::search::pagination::paginate;
use campus_search::test_utils::{TestCase, run_table_tests};

#[test]
fn pagination_table() -> Result<(), String> {
    let cases = vec![
        TestCase {
            name: "first_page",
            input: (7usize, 1i64, 3i64),
            expected: (vec![0, 1, 2], 7u64, 3u64),
            should_panic: false,
        },
        TestCase {
            name: "last_partial_page",
            input: (7, 3, 3),
            expected: (vec![6], 7, 3),
            should_panic: false,
        },
        TestCase {
            name: "past_the_end",
            input: (7, 4, 3),
            expected: (vec![], 7, 3),
            should_panic: false,
        },
        TestCase {
            name: "exact_multiple",
            input: (6, 2, 3),
            expected: (vec![3, 4, 5], 6, 2),
            should_panic: false,
        },
        TestCase {
            name: "clamped_page_and_limit",
            input: (4, 0, -1),
            expected: (vec![0], 4, 4),
            should_panic: false,
        },
        TestCase {
            name: "empty_ranking",
            input: (0, 1, 20),
            expected: (vec![], 0, 0),
            should_panic: false,
        },
    ];

    run_table_tests(cases, |(total, page, limit)| {
        let ranked: Vec<usize> = (0..total).collect();
        let result = paginate(&ranked, page, limit);
        (
            result.data,
            result.pagination.total,
            result.pagination.total_pages,
        )
    })?;
    Ok(())
}

#[test]
fn metadata_echoes_clamped_request() {
    let page = paginate(&["a", "b"], -3, 0);
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.pagination.limit, 1);
    assert_eq!(page.data, vec!["a"]);
}

#[test]
fn huge_page_does_not_overflow() {
    let page = paginate(&[1, 2, 3], i64::MAX, i64::MAX);
    assert!(page.data.is_empty());
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.total_pages, 1);
}
