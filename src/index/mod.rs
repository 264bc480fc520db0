pub mod entry;
pub mod catalog_index;

pub use catalog_index::CatalogIndex;
pub use entry::{Envelope, IndexEntry, IndexValue};
