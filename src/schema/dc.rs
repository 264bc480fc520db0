use serde_json::Value;
use std::sync::LazyLock;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::SchemaKind;
use crate::schema::profile::SchemaProfile;
use crate::tree::node::{Structure, ValueKind};
use crate::tree::record::RecordTree;

/// Dublin Core `csw:Record`. Most elements repeat.
pub static DC_PROFILE: LazyLock<SchemaProfile> = LazyLock::new(|| {
    let mut builder = SchemaProfile::builder(SchemaKind::Dc, "Record", "identifier");
    for element in [
        "identifier", "title", "creator", "subject", "description", "abstract", "publisher",
        "contributor", "format", "source", "language", "relation", "coverage", "rights", "spatial",
    ] {
        builder = builder.declare_many("Record", element, ValueKind::Text);
    }
    builder
        .declare_many("Record", "date", ValueKind::DateTime)
        .declare("Record", "modified", ValueKind::DateTime)
        .declare("Record", "type", ValueKind::Text)
        .declare_many("Record", "BoundingBox", ValueKind::Structure("BoundingBox".into()))
        .declare("BoundingBox", "crs", ValueKind::Text)
        .declare("BoundingBox", "minx", ValueKind::Numeric)
        .declare("BoundingBox", "miny", ValueKind::Numeric)
        .declare("BoundingBox", "maxx", ValueKind::Numeric)
        .declare("BoundingBox", "maxy", ValueKind::Numeric)
        .brief(&["identifier", "title", "type", "BoundingBox"])
        .summary(&["subject", "format", "relation", "modified", "abstract", "spatial", "language"])
        .extract("identifier", &["identifier"])
        .extract("Identifier", &["identifier"])
        .extract("Title", &["title"])
        .extract("title", &["title"])
        .extract("Abstract", &["abstract", "description"])
        .extract("abstract", &["abstract"])
        .extract("Subject", &["subject"])
        .extract("subject", &["subject"])
        .extract("Language", &["language"])
        .extract("language", &["language"])
        .extract("Modified", &["modified"])
        .extract("Date", &["date"])
        .extract("Type", &["type"])
        .extract("type", &["type"])
        .extract("Format", &["format"])
        .extract("format", &["format"])
        .extract("OrganisationName", &["publisher", "creator"])
        .extract("BoundingBox", &["BoundingBox"])
        .build()
});

#[derive(Debug, Clone, PartialEq)]
pub struct DcRecord {
    root: Structure,
}

impl DcRecord {
    pub fn new(root: Structure) -> Result<Self> {
        if root.type_name != DC_PROFILE.root_type {
            return Err(Error::new(
                ErrorKind::Document,
                format!("a Dublin Core record is rooted at Record, not {}", root.type_name),
            ));
        }
        Ok(DcRecord { root })
    }

    pub fn from_json(document: &Value) -> Result<Self> {
        Ok(DcRecord {
            root: DC_PROFILE.tree_from_json(document)?,
        })
    }
}

impl RecordTree for DcRecord {
    fn profile(&self) -> &'static SchemaProfile {
        &DC_PROFILE
    }

    fn root(&self) -> &Structure {
        &self.root
    }

    fn root_mut(&mut self) -> &mut Structure {
        &mut self.root
    }

    fn box_clone(&self) -> Box<dyn RecordTree> {
        Box::new(self.clone())
    }
}
