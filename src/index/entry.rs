use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::core::types::SchemaKind;
use crate::query::queryable::{QueryableRegistry, QueryableType, ANY_TEXT};
use crate::tree::extract;
use crate::tree::node::{parse_instant, Node, Structure, TypedValue};
use crate::tree::record::RecordTree;

/// Axis-aligned bounding box in lon/lat order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Envelope { min_x, min_y, max_x, max_y }
    }

    /// Boxes sharing an edge or a corner intersect.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x && other.min_x <= self.max_x && self.min_y <= other.max_y && other.min_y <= self.max_y
    }

    /// Reads either ISO bound names or `minx/miny/maxx/maxy`.
    pub fn from_structure(structure: &Structure) -> Option<Envelope> {
        let number = |name: &str| match structure.children_of(name).first() {
            Some(Node::Scalar(TypedValue::Numeric(n))) => Some(*n),
            Some(Node::Scalar(TypedValue::Text(s))) => s.trim().parse().ok(),
            _ => None,
        };
        let iso = (
            number("westBoundLongitude"),
            number("southBoundLatitude"),
            number("eastBoundLongitude"),
            number("northBoundLatitude"),
        );
        let corners = match iso {
            (Some(w), Some(s), Some(e), Some(n)) => (w, s, e, n),
            _ => (number("minx")?, number("miny")?, number("maxx")?, number("maxy")?),
        };
        Some(Envelope::new(corners.0, corners.1, corners.2, corners.3))
    }
}

/// A scalar as seen by the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexValue {
    Text(String),
    Number(f64),
    Instant(DateTime<Utc>),
    Envelope(Envelope),
}

impl IndexValue {
    /// Order between values of the same kind; `None` across kinds and for envelopes.
    pub fn compare(&self, other: &IndexValue) -> Option<Ordering> {
        match (self, other) {
            (IndexValue::Text(a), IndexValue::Text(b)) => Some(a.cmp(b)),
            (IndexValue::Number(a), IndexValue::Number(b)) => a.partial_cmp(b),
            (IndexValue::Instant(a), IndexValue::Instant(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used for sorting and domains: by kind first, then value.
    pub fn total_cmp(&self, other: &IndexValue) -> Ordering {
        match (self, other) {
            (IndexValue::Number(a), IndexValue::Number(b)) => a.total_cmp(b),
            (IndexValue::Envelope(a), IndexValue::Envelope(b)) => a
                .min_x
                .total_cmp(&b.min_x)
                .then(a.min_y.total_cmp(&b.min_y))
                .then(a.max_x.total_cmp(&b.max_x))
                .then(a.max_y.total_cmp(&b.max_y)),
            _ => self
                .compare(other)
                .unwrap_or_else(|| self.rank().cmp(&other.rank())),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            IndexValue::Text(_) => 0,
            IndexValue::Number(_) => 1,
            IndexValue::Instant(_) => 2,
            IndexValue::Envelope(_) => 3,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            IndexValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a tree node into the value type of a queryable. Text leaves
    /// are parsed when the queryable is numeric or temporal.
    pub fn from_node(node: &Node, value_type: QueryableType) -> Option<IndexValue> {
        match (value_type, node) {
            (QueryableType::Text, Node::Scalar(TypedValue::Text(s))) => Some(IndexValue::Text(s.clone())),
            (QueryableType::Numeric, Node::Scalar(TypedValue::Numeric(n))) => Some(IndexValue::Number(*n)),
            (QueryableType::Numeric, Node::Scalar(TypedValue::Text(s))) => {
                s.trim().parse().ok().map(IndexValue::Number)
            }
            (QueryableType::DateTime, Node::Scalar(TypedValue::DateTime(dt))) => Some(IndexValue::Instant(*dt)),
            (QueryableType::DateTime, Node::Scalar(TypedValue::Text(s))) => parse_instant(s).map(IndexValue::Instant),
            (QueryableType::Envelope, Node::Structure(s)) => Envelope::from_structure(s).map(IndexValue::Envelope),
            _ => None,
        }
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IndexValue::Text(s) => f.write_str(s),
            IndexValue::Number(n) => write!(f, "{}", n),
            IndexValue::Instant(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            IndexValue::Envelope(e) => write!(f, "{} {} {} {}", e.min_x, e.min_y, e.max_x, e.max_y),
        }
    }
}

/// Indexed values of one record, keyed by queryable name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub identifier: String,
    pub kind: SchemaKind,
    pub values: HashMap<String, Vec<IndexValue>>,
}

impl IndexEntry {
    /// Run the schema's extraction table over the tree. Properties with no
    /// value are left out, which is what `IS NULL` tests for.
    pub fn derive(identifier: &str, tree: &dyn RecordTree, registry: &QueryableRegistry) -> IndexEntry {
        let profile = tree.profile();
        let mut values: HashMap<String, Vec<IndexValue>> = HashMap::new();

        for (name, paths) in profile.extraction() {
            let Ok(queryable) = registry.get(name) else {
                continue;
            };
            let mut found = Vec::new();
            for path in paths {
                for node in extract::collect(tree.root(), path) {
                    if let Some(value) = IndexValue::from_node(node, queryable.value_type) {
                        push_unique(&mut found, value);
                    }
                }
            }
            if !found.is_empty() {
                values.insert(name.to_string(), found);
            }
        }

        if registry.contains(ANY_TEXT) {
            let mut texts = Vec::new();
            tree.root().visit_scalars(&mut |scalar| {
                if let Some(text) = scalar.as_text() {
                    push_unique(&mut texts, IndexValue::Text(text.to_string()));
                }
            });
            if !texts.is_empty() {
                values.insert(ANY_TEXT.to_string(), texts);
            }
        }

        IndexEntry {
            identifier: identifier.to_string(),
            kind: profile.kind,
            values,
        }
    }

    pub fn values(&self, property: &str) -> &[IndexValue] {
        self.values.get(property).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Smallest value of the property, used for ascending sorts.
    pub fn min_value(&self, property: &str) -> Option<&IndexValue> {
        self.values(property).iter().min_by(|a, b| a.total_cmp(b))
    }

    pub fn max_value(&self, property: &str) -> Option<&IndexValue> {
        self.values(property).iter().max_by(|a, b| a.total_cmp(b))
    }
}

fn push_unique(values: &mut Vec<IndexValue>, value: IndexValue) {
    if !values.contains(&value) {
        values.push(value);
    }
}
