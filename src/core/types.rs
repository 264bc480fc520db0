use serde::{Serialize, Deserialize};
use std::fmt;
use std::sync::Arc;

use crate::index::entry::IndexEntry;
use crate::tree::RecordTree;

/// Internal slot number of a record inside the index bitmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub fn new(id: u32) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DocId {
    fn from(id: u32) -> Self {
        DocId(id)
    }
}

/// The metadata standard a record conforms to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SchemaKind {
    Iso,
    Dc,
    Ebrim,
    Raw,
}

impl SchemaKind {
    pub const ALL: [SchemaKind; 4] = [SchemaKind::Iso, SchemaKind::Dc, SchemaKind::Ebrim, SchemaKind::Raw];

    /// Qualified type name used by clients in `typeNames`.
    pub fn type_name(&self) -> &'static str {
        match self {
            SchemaKind::Iso => "gmd:MD_Metadata",
            SchemaKind::Dc => "csw:Record",
            SchemaKind::Ebrim => "rim:RegistryObject",
            SchemaKind::Raw => "raw",
        }
    }

    /// Accepts both the qualified and the local type name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let local = name.rsplit(':').next().unwrap_or(name);
        SchemaKind::ALL.into_iter().find(|kind| {
            let qualified = kind.type_name();
            let kind_local = qualified.rsplit(':').next().unwrap_or(qualified);
            qualified == name || kind_local == local
        })
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A stored metadata record together with the index entry derived from it.
///
/// The content and the entry are always replaced together, so a record
/// never carries an entry computed from a different version of its tree.
pub struct Record {
    pub identifier: String,
    pub content: Box<dyn RecordTree>,
    pub indexed: Arc<IndexEntry>,
}

impl Record {
    pub fn new(identifier: String, content: Box<dyn RecordTree>, indexed: IndexEntry) -> Self {
        Record {
            identifier,
            content,
            indexed: Arc::new(indexed),
        }
    }

    pub fn schema_kind(&self) -> SchemaKind {
        self.content.schema_kind()
    }
}

impl Clone for Record {
    fn clone(&self) -> Self {
        Record {
            identifier: self.identifier.clone(),
            content: self.content.box_clone(),
            indexed: Arc::clone(&self.indexed),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Record")
            .field("identifier", &self.identifier)
            .field("kind", &self.schema_kind())
            .field("content", &self.content)
            .finish()
    }
}
