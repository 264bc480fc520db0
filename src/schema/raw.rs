use serde_json::Value;
use std::sync::LazyLock;

use crate::core::error::Result;
use crate::core::types::SchemaKind;
use crate::schema::profile::SchemaProfile;
use crate::tree::node::Structure;
use crate::tree::record::RecordTree;

/// Free-form records. Nothing is declared, so the tree shape follows the
/// JSON: arrays become collections and everything else a singleton.
pub static RAW_PROFILE: LazyLock<SchemaProfile> = LazyLock::new(|| {
    SchemaProfile::builder(SchemaKind::Raw, "record", "identifier")
        .lenient()
        .brief(&["identifier", "title", "type"])
        .summary(&["abstract", "subject", "modified", "language", "format"])
        .extract("identifier", &["identifier"])
        .extract("Identifier", &["identifier"])
        .extract("Title", &["title"])
        .extract("title", &["title"])
        .extract("Abstract", &["abstract"])
        .extract("abstract", &["abstract"])
        .extract("Subject", &["subject"])
        .extract("subject", &["subject"])
        .extract("Language", &["language"])
        .extract("language", &["language"])
        .extract("Modified", &["modified"])
        .extract("Type", &["type"])
        .extract("type", &["type"])
        .extract("Format", &["format"])
        .extract("format", &["format"])
        .extract("BoundingBox", &["BoundingBox"])
        .build()
});

#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    root: Structure,
}

impl RawRecord {
    pub fn new(root: Structure) -> Self {
        RawRecord { root }
    }

    pub fn from_json(document: &Value) -> Result<Self> {
        Ok(RawRecord {
            root: RAW_PROFILE.tree_from_json(document)?,
        })
    }
}

impl RecordTree for RawRecord {
    fn profile(&self) -> &'static SchemaProfile {
        &RAW_PROFILE
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::Node;
    use serde_json::json;

    #[test]
    fn infers_shape_from_json() {
        let record = RawRecord::from_json(&json!({
            "identifier": "raw-1",
            "subject": ["a", "b"],
            "extent": {"minx": 1, "maxx": 2}
        }))
        .unwrap();
        assert_eq!(record.identifier().as_deref(), Some("raw-1"));
        assert!(record.root().resolve("subject").unwrap().is_collection());
        let extent = record.root().children_of("extent")[0].as_structure().unwrap();
        assert_eq!(extent.type_name, "extent");
        assert_eq!(extent.children_of("maxx")[0], &Node::numeric(2.0));
    }
}
