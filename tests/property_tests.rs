mod common;

use catalogdb::tree::{PathExpression, Segment};
use catalogdb::{ErrorKind, QueryRequest};
use proptest::prelude::*;
use std::sync::LazyLock;

static CATALOG: LazyLock<catalogdb::Catalog> = LazyLock::new(common::seeded_catalog);

fn segment() -> impl Strategy<Value = Segment> {
    ("[a-zA-Z_][a-zA-Z0-9_]{0,10}", proptest::option::of(1usize..1000)).prop_map(|(name, index)| Segment {
        name,
        index,
    })
}

proptest! {
    #[test]
    fn printed_paths_parse_back(segments in proptest::collection::vec(segment(), 1..6)) {
        let path = PathExpression::from_segments(segments.clone()).unwrap();
        let parsed: PathExpression = path.to_string().parse().unwrap();
        prop_assert_eq!(parsed.segments(), segments.as_slice());
    }

    #[test]
    fn zero_index_never_parses(prefix in proptest::collection::vec(segment(), 0..3), name in "[a-z]{1,8}") {
        let mut text: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
        text.push(format!("{}[0]", name));
        let err = PathExpression::parse(&text.join("/")).unwrap_err();
        prop_assert_eq!(err.kind, ErrorKind::PathSyntax);
    }

    #[test]
    fn paging_arithmetic(start in 1usize..14, max in 1usize..12) {
        let matched: usize = 9;
        let result = CATALOG.query(&QueryRequest::new().page(start, max)).unwrap();

        let expected = matched.saturating_sub(start - 1).min(max);
        prop_assert_eq!(result.matched, matched);
        prop_assert_eq!(result.returned, expected);

        let next = start - 1 + expected;
        let expected_next = if next < matched { next + 1 } else { 0 };
        prop_assert_eq!(result.next_record, expected_next);
    }
}
