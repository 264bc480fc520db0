pub mod executor;
pub mod projection;
pub mod results;
pub mod domain;

pub use domain::{DomainResolver, DomainValues};
pub use executor::{QueryExecutor, QueryRequest, SortKey};
pub use projection::Projection;
pub use results::{ProjectedRecord, QueryResult, ResultMode};
