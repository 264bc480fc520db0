use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::error::{Error, ErrorKind, Result};
use crate::index::entry::{Envelope, IndexValue};
use crate::query::ast::{Constraint, FilterExpr, LikePattern, Predicate};
use crate::query::parser::ConstraintParser;
use crate::query::queryable::{QueryableRegistry, QueryableType};
use crate::tree::node::parse_instant;

/// Coordinate reference systems accepted in BBOX clauses.
const SUPPORTED_CRS: &[&str] = &["EPSG:4326", "CRS:84", "urn:ogc:def:crs:EPSG::4326", "urn:ogc:def:crs:OGC:1.3:CRS84"];

/// Turns client constraints into validated predicates. Every property is
/// checked against the registry and every literal read with the property's
/// value type; failures name the clause they come from.
pub struct ConstraintTranslator<'r> {
    registry: &'r QueryableRegistry,
    parser: ConstraintParser,
}

impl<'r> ConstraintTranslator<'r> {
    pub fn new(registry: &'r QueryableRegistry) -> Self {
        ConstraintTranslator {
            registry,
            parser: ConstraintParser::new(),
        }
    }

    /// `None` is the protocol's "no constraint", which matches everything.
    pub fn translate(&self, constraint: Option<&Constraint>) -> Result<Predicate> {
        let Some(constraint) = constraint else {
            return Ok(Predicate::All);
        };
        let filter = self.to_filter(constraint)?;
        let predicate = self.translate_filter(&filter)?;
        debug!(constraint = %filter, "translated constraint");
        Ok(predicate)
    }

    /// Parse textual constraints, pass structured ones through.
    pub fn to_filter(&self, constraint: &Constraint) -> Result<FilterExpr> {
        match constraint {
            Constraint::Cql(text) => self.parser.parse(text),
            Constraint::Filter(filter) => Ok(filter.clone()),
        }
    }

    pub fn translate_filter(&self, filter: &FilterExpr) -> Result<Predicate> {
        match filter {
            FilterExpr::Comparison { property, op, literal } => {
                let value_type = self.value_type(property, filter)?;
                let literal = match value_type {
                    QueryableType::Text => IndexValue::Text(literal.clone()),
                    QueryableType::Numeric => IndexValue::Number(self.number(literal, filter)?),
                    QueryableType::DateTime => IndexValue::Instant(self.instant(literal, filter)?),
                    QueryableType::Envelope => {
                        return Err(self.syntax(filter, "comparison operators do not apply to a bounding box"));
                    }
                };
                Ok(Predicate::Compare {
                    property: property.clone(),
                    op: *op,
                    literal,
                })
            }

            FilterExpr::Like { property, pattern, match_case } => {
                if self.value_type(property, filter)? != QueryableType::Text {
                    return Err(self.syntax(filter, "LIKE needs a text property"));
                }
                let pattern = LikePattern::new(pattern, *match_case).map_err(|e| e.within(&filter.to_string()))?;
                Ok(Predicate::Like {
                    property: property.clone(),
                    pattern,
                })
            }

            FilterExpr::Between { property, lower, upper } => match self.value_type(property, filter)? {
                QueryableType::Numeric => Ok(Predicate::Between {
                    property: property.clone(),
                    lower: self.number(lower, filter)?,
                    upper: self.number(upper, filter)?,
                }),
                QueryableType::DateTime => Ok(Predicate::TemporalBetween {
                    property: property.clone(),
                    start: self.instant(lower, filter)?,
                    end: self.instant(upper, filter)?,
                }),
                _ => Err(self.syntax(filter, "BETWEEN needs a numeric or temporal property")),
            },

            FilterExpr::BBox { property, coordinates, crs } => {
                if self.value_type(property, filter)? != QueryableType::Envelope {
                    return Err(self.syntax(filter, "BBOX needs a bounding box property"));
                }
                if let Some(crs) = crs {
                    if !SUPPORTED_CRS.contains(&crs.as_str()) {
                        return Err(self.syntax(filter, &format!("unsupported CRS '{}'", crs)));
                    }
                }
                let [min_x, min_y, max_x, max_y] = [
                    self.number(&coordinates[0], filter)?,
                    self.number(&coordinates[1], filter)?,
                    self.number(&coordinates[2], filter)?,
                    self.number(&coordinates[3], filter)?,
                ];
                if min_x > max_x || min_y > max_y {
                    return Err(self.syntax(filter, "lower corner lies above the upper corner"));
                }
                Ok(Predicate::BBox {
                    property: property.clone(),
                    envelope: Envelope::new(min_x, min_y, max_x, max_y),
                })
            }

            FilterExpr::After { property, instant } => {
                self.require_temporal(property, filter)?;
                Ok(Predicate::TemporalAfter {
                    property: property.clone(),
                    instant: self.instant(instant, filter)?,
                })
            }

            FilterExpr::Before { property, instant } => {
                self.require_temporal(property, filter)?;
                Ok(Predicate::TemporalBefore {
                    property: property.clone(),
                    instant: self.instant(instant, filter)?,
                })
            }

            FilterExpr::During { property, start, end } => {
                self.require_temporal(property, filter)?;
                Ok(Predicate::TemporalBetween {
                    property: property.clone(),
                    start: self.instant(start, filter)?,
                    end: self.instant(end, filter)?,
                })
            }

            FilterExpr::IsNull { property } => {
                self.value_type(property, filter)?;
                Ok(Predicate::IsNull {
                    property: property.clone(),
                })
            }

            FilterExpr::And(children) => Ok(Predicate::And(self.translate_children(children, filter)?)),
            FilterExpr::Or(children) => Ok(Predicate::Or(self.translate_children(children, filter)?)),
            FilterExpr::Not(child) => Ok(Predicate::Not(Box::new(self.translate_filter(child)?))),
        }
    }

    fn translate_children(&self, children: &[FilterExpr], clause: &FilterExpr) -> Result<Vec<Predicate>> {
        if children.is_empty() {
            return Err(self.syntax(clause, "a logical operator needs at least one operand"));
        }
        children.iter().map(|child| self.translate_filter(child)).collect()
    }

    fn value_type(&self, property: &str, clause: &FilterExpr) -> Result<QueryableType> {
        self.registry
            .get(property)
            .map(|queryable| queryable.value_type)
            .map_err(|e| e.within(&format!("in clause `{}`", clause)))
    }

    fn require_temporal(&self, property: &str, clause: &FilterExpr) -> Result<()> {
        match self.value_type(property, clause)? {
            QueryableType::DateTime => Ok(()),
            _ => Err(self.syntax(clause, "temporal operators need a date/time property")),
        }
    }

    fn number(&self, literal: &str, clause: &FilterExpr) -> Result<f64> {
        literal
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| self.syntax(clause, &format!("'{}' is not a number", literal)))
    }

    fn instant(&self, literal: &str, clause: &FilterExpr) -> Result<DateTime<Utc>> {
        parse_instant(literal).ok_or_else(|| self.syntax(clause, &format!("'{}' is not a date/time", literal)))
    }

    fn syntax(&self, clause: &FilterExpr, reason: &str) -> Error {
        Error::new(ErrorKind::ConstraintSyntax, format!("{} in clause `{}`", reason, clause))
    }
}
