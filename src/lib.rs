pub mod core;
pub mod tree;
pub mod schema;
pub mod query;
pub mod index;
pub mod search;
pub mod parallel;

pub use crate::core::catalog::Catalog;
pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, NavigationErrorKind, Result};
pub use crate::core::transaction::{Action, TransactionSummary, UpdateMode};
pub use crate::core::types::SchemaKind;
pub use crate::query::ast::{Constraint, FilterExpr};
pub use crate::schema::record::RecordKind;
pub use crate::search::{Projection, QueryRequest, QueryResult, ResultMode};
pub use crate::tree::{Node, PropertyUpdate};

/*
┌──────────────────────────────────────────────────────────────────────────────┐
│                          CATALOGDB ARCHITECTURE                               │
└──────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── CORE LAYER ──────────────────────────────────┐
│  struct Catalog                                                               │
│  • config: Config                  // paging limits, cache size, bulk workers │
│  • registry: QueryableRegistry     // queryable names and value types         │
│  • store: RecordStore              // identifier -> Record (authoritative)    │
│  • index: CatalogIndex             // identifier -> IndexEntry + bitmaps      │
│  • locks: RecordLocks              // one exclusive lock per identifier       │
│  • cache: QueryCache               // (generation, query) -> identifiers      │
│                                                                               │
│  TransactionCoordinator: Begin -> Delete* -> Insert* -> Update* -> Commit     │
└───────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── TREE LAYER ──────────────────────────────────┐
│  PathExpression  "a/b[3]/c" -> [Segment{a}, Segment{b, 3}, Segment{c}]        │
│  navigator       Structure + path -> Location{parent, segment, target}        │
│  UpdateApplier   Location + Node  -> write / append / remove (type checked)   │
│  extract         path fan-out for indexing, path copy for projections         │
└───────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── SCHEMA LAYER ────────────────────────────────┐
│  RecordKind { Iso, Dc, Ebrim, RawNode }  -- each implements RecordTree        │
│  SchemaProfile: declarations, brief/summary paths, extraction table           │
└───────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── QUERY LAYER ─────────────────────────────────┐
│  text ──ConstraintParser──> FilterExpr ──ConstraintTranslator──> Predicate    │
│  CatalogIndex::evaluate(Predicate) ──> sort ──> page ──> Projection           │
└───────────────────────────────────────────────────────────────────────────────┘

Write path (targeted update):
  1. resolve targets       index read lock
  2. lock record           RecordLocks
  3. clone + apply         UpdateApplier (all-or-nothing per record)
  4. derive entry          IndexEntry::derive
  5. publish               store write lock -> index write lock (generation + 1)
*/
