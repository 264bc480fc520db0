pub mod ast;
pub mod parser;
pub mod queryable;
pub mod translator;
pub mod matcher;
pub mod cache;

pub use ast::{CompareOp, Constraint, FilterExpr, Predicate};
pub use queryable::{QueryableRegistry, QueryableType};
pub use translator::ConstraintTranslator;
