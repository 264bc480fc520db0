use chrono::{DateTime, Utc};

use crate::index::entry::{IndexEntry, IndexValue};
use crate::query::ast::{CompareOp, Predicate};

/// Evaluates predicates against the indexed values of one record.
///
/// Leaf predicates are existential over multi-valued properties: a record
/// matches when any of its values satisfies the test. `<>` is the
/// exception and requires at least one value, none of them equal.
pub struct PredicateMatcher;

impl PredicateMatcher {
    pub fn new() -> Self {
        PredicateMatcher
    }

    pub fn matches(&self, entry: &IndexEntry, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::All => true,

            Predicate::Compare { property, op, literal } => {
                self.matches_compare(entry.values(property), *op, literal)
            }

            Predicate::Like { property, pattern } => entry
                .values(property)
                .iter()
                .filter_map(IndexValue::as_text)
                .any(|text| pattern.matches(text)),

            Predicate::Between { property, lower, upper } => entry.values(property).iter().any(|value| {
                matches!(value, IndexValue::Number(n) if *lower <= *n && *n <= *upper)
            }),

            Predicate::BBox { property, envelope } => entry.values(property).iter().any(|value| {
                matches!(value, IndexValue::Envelope(e) if e.intersects(envelope))
            }),

            Predicate::TemporalAfter { property, instant } => {
                self.any_instant(entry, property, |t| t >= *instant)
            }

            Predicate::TemporalBefore { property, instant } => {
                self.any_instant(entry, property, |t| t <= *instant)
            }

            Predicate::TemporalBetween { property, start, end } => {
                self.any_instant(entry, property, |t| *start <= t && t <= *end)
            }

            Predicate::IsNull { property } => entry.values(property).is_empty(),

            Predicate::And(children) => children.iter().all(|child| self.matches(entry, child)),
            Predicate::Or(children) => children.iter().any(|child| self.matches(entry, child)),
            Predicate::Not(child) => !self.matches(entry, child),
        }
    }

    fn matches_compare(&self, values: &[IndexValue], op: CompareOp, literal: &IndexValue) -> bool {
        if op == CompareOp::NotEq {
            let mut comparable = values.iter().filter_map(|value| value.compare(literal)).peekable();
            return comparable.peek().is_some() && comparable.all(|ordering| ordering.is_ne());
        }
        values
            .iter()
            .filter_map(|value| value.compare(literal))
            .any(|ordering| op.accepts(ordering))
    }

    fn any_instant(&self, entry: &IndexEntry, property: &str, test: impl Fn(DateTime<Utc>) -> bool) -> bool {
        entry.values(property).iter().any(|value| match value {
            IndexValue::Instant(t) => test(*t),
            _ => false,
        })
    }
}

impl Default for PredicateMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SchemaKind;
    use crate::index::entry::Envelope;
    use crate::query::ast::LikePattern;
    use crate::tree::node::parse_instant;
    use std::collections::HashMap;

    fn entry() -> IndexEntry {
        let mut values = HashMap::new();
        values.insert("Subject".to_string(), vec![IndexValue::Text("sea".into()), IndexValue::Text("floor".into())]);
        values.insert("Depth".to_string(), vec![IndexValue::Number(120.0)]);
        values.insert(
            "Modified".to_string(),
            vec![IndexValue::Instant(parse_instant("2009-01-01T00:00:00Z").unwrap())],
        );
        values.insert("BoundingBox".to_string(), vec![IndexValue::Envelope(Envelope::new(0.0, 40.0, 5.0, 45.0))]);
        IndexEntry {
            identifier: "rec".into(),
            kind: SchemaKind::Iso,
            values,
        }
    }

    fn compare(property: &str, op: CompareOp, literal: IndexValue) -> Predicate {
        Predicate::Compare {
            property: property.into(),
            op,
            literal,
        }
    }

    #[test]
    fn comparisons_are_existential() {
        let matcher = PredicateMatcher::new();
        let entry = entry();
        assert!(matcher.matches(&entry, &compare("Subject", CompareOp::Eq, IndexValue::Text("floor".into()))));
        assert!(matcher.matches(&entry, &compare("Depth", CompareOp::Gt, IndexValue::Number(100.0))));
        assert!(!matcher.matches(&entry, &compare("Depth", CompareOp::Lt, IndexValue::Number(100.0))));
    }

    #[test]
    fn not_equal_needs_a_value_and_no_match() {
        let matcher = PredicateMatcher::new();
        let entry = entry();
        assert!(!matcher.matches(&entry, &compare("Subject", CompareOp::NotEq, IndexValue::Text("sea".into()))));
        assert!(matcher.matches(&entry, &compare("Subject", CompareOp::NotEq, IndexValue::Text("land".into()))));
        assert!(!matcher.matches(&entry, &compare("Title", CompareOp::NotEq, IndexValue::Text("x".into()))));
    }

    #[test]
    fn temporal_bounds_are_inclusive() {
        let matcher = PredicateMatcher::new();
        let entry = entry();
        let instant = parse_instant("2009-01-01T00:00:00Z").unwrap();
        let after = Predicate::TemporalAfter { property: "Modified".into(), instant };
        let before = Predicate::TemporalBefore { property: "Modified".into(), instant };
        assert!(matcher.matches(&entry, &after));
        assert!(matcher.matches(&entry, &before));
    }

    #[test]
    fn combinators_and_null_tests() {
        let matcher = PredicateMatcher::new();
        let entry = entry();
        let like = Predicate::Like {
            property: "Subject".into(),
            pattern: LikePattern::new("fl%", true).unwrap(),
        };
        let bbox = Predicate::BBox {
            property: "BoundingBox".into(),
            envelope: Envelope::new(5.0, 45.0, 10.0, 50.0),
        };
        assert!(matcher.matches(&entry, &Predicate::And(vec![like.clone(), bbox])));
        assert!(!matcher.matches(&entry, &Predicate::Not(Box::new(like))));
        assert!(matcher.matches(&entry, &Predicate::IsNull { property: "Abstract".into() }));
    }
}
