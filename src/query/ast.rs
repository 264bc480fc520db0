use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::core::error::Result;
use crate::index::entry::{Envelope, IndexValue};

/// Constraint as received from a client, before any validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    Cql(String),        // textual constraint language
    Filter(FilterExpr), // structured filter tree
}

impl Constraint {
    pub fn cql(text: impl Into<String>) -> Self {
        Constraint::Cql(text.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Whether `value <op> literal` holds given `value.cmp(literal)`.
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

/// Unvalidated filter tree. Property names and literals are kept as the
/// client wrote them; the translator checks them against the queryables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterExpr {
    Comparison { property: String, op: CompareOp, literal: String },
    Like { property: String, pattern: String, match_case: bool },
    Between { property: String, lower: String, upper: String },
    BBox { property: String, coordinates: [String; 4], crs: Option<String> },
    After { property: String, instant: String },
    Before { property: String, instant: String },
    During { property: String, start: String, end: String },
    IsNull { property: String },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn equals(property: impl Into<String>, literal: impl Into<String>) -> Self {
        FilterExpr::Comparison {
            property: property.into(),
            op: CompareOp::Eq,
            literal: literal.into(),
        }
    }

    pub fn compare(property: impl Into<String>, op: CompareOp, literal: impl Into<String>) -> Self {
        FilterExpr::Comparison {
            property: property.into(),
            op,
            literal: literal.into(),
        }
    }

    pub fn like(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        FilterExpr::Like {
            property: property.into(),
            pattern: pattern.into(),
            match_case: true,
        }
    }

    pub fn bbox(property: impl Into<String>, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        FilterExpr::BBox {
            property: property.into(),
            coordinates: [min_x.to_string(), min_y.to_string(), max_x.to_string(), max_y.to_string()],
            crs: None,
        }
    }

    pub fn and(self, other: FilterExpr) -> Self {
        match self {
            FilterExpr::And(mut children) => {
                children.push(other);
                FilterExpr::And(children)
            }
            first => FilterExpr::And(vec![first, other]),
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn join(f: &mut fmt::Formatter, children: &[FilterExpr], keyword: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", keyword)?;
        }
        write!(f, "{}", child)?;
    }
    f.write_str(")")
}

/// Renders the expression back as constraint text. The rendering is
/// canonical, so it doubles as a cache key.
impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FilterExpr::Comparison { property, op, literal } => {
                write!(f, "{} {} {}", property, op.symbol(), quote(literal))
            }
            FilterExpr::Like { property, pattern, match_case } => {
                let keyword = if *match_case { "LIKE" } else { "ILIKE" };
                write!(f, "{} {} {}", property, keyword, quote(pattern))
            }
            FilterExpr::Between { property, lower, upper } => {
                write!(f, "{} BETWEEN {} AND {}", property, quote(lower), quote(upper))
            }
            FilterExpr::BBox { property, coordinates, crs } => {
                write!(f, "BBOX({}, {}", property, coordinates.join(", "))?;
                if let Some(crs) = crs {
                    write!(f, ", {}", quote(crs))?;
                }
                f.write_str(")")
            }
            FilterExpr::After { property, instant } => write!(f, "{} AFTER {}", property, quote(instant)),
            FilterExpr::Before { property, instant } => write!(f, "{} BEFORE {}", property, quote(instant)),
            FilterExpr::During { property, start, end } => {
                write!(f, "{} DURING {}/{}", property, quote(start), quote(end))
            }
            FilterExpr::IsNull { property } => write!(f, "{} IS NULL", property),
            FilterExpr::And(children) => join(f, children, "AND"),
            FilterExpr::Or(children) => join(f, children, "OR"),
            FilterExpr::Not(child) => write!(f, "NOT ({})", child),
        }
    }
}

/// A compiled LIKE pattern: `%` any run, `_` one character, `\` escapes.
#[derive(Debug, Clone)]
pub struct LikePattern {
    pub source: String,
    pub match_case: bool,
    regex: Regex,
}

impl LikePattern {
    pub fn new(source: &str, match_case: bool) -> Result<Self> {
        let mut expression = String::from(if match_case { "(?s)^" } else { "(?is)^" });
        let mut chars = source.chars();
        while let Some(c) = chars.next() {
            match c {
                '%' => expression.push_str(".*"),
                '_' => expression.push('.'),
                '\\' => {
                    let escaped = chars.next().unwrap_or('\\');
                    expression.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4])));
                }
                other => expression.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        expression.push('$');

        Ok(LikePattern {
            source: source.to_string(),
            match_case,
            regex: Regex::new(&expression)?,
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.match_case == other.match_case
    }
}

/// Validated predicate over indexed values, built once per query.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    All,                                                           // no constraint
    Compare { property: String, op: CompareOp, literal: IndexValue },
    Like { property: String, pattern: LikePattern },
    Between { property: String, lower: f64, upper: f64 },          // numeric, inclusive
    BBox { property: String, envelope: Envelope },
    TemporalAfter { property: String, instant: DateTime<Utc> },
    TemporalBefore { property: String, instant: DateTime<Utc> },
    TemporalBetween { property: String, start: DateTime<Utc>, end: DateTime<Utc> },
    IsNull { property: String },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// Property a leaf predicate reads, `None` for combinators.
    pub fn property(&self) -> Option<&str> {
        match self {
            Predicate::Compare { property, .. }
            | Predicate::Like { property, .. }
            | Predicate::Between { property, .. }
            | Predicate::BBox { property, .. }
            | Predicate::TemporalAfter { property, .. }
            | Predicate::TemporalBefore { property, .. }
            | Predicate::TemporalBetween { property, .. }
            | Predicate::IsNull { property } => Some(property),
            Predicate::All | Predicate::And(_) | Predicate::Or(_) | Predicate::Not(_) => None,
        }
    }
}
