use serde_json::Value;

use crate::core::error::Result;
use crate::core::types::SchemaKind;
use crate::schema::dc::DcRecord;
use crate::schema::ebrim::EbrimRecord;
use crate::schema::iso::IsoRecord;
use crate::schema::raw::RawRecord;
use crate::tree::record::RecordTree;

/// A document already resolved to its schema. Everything past the
/// protocol boundary works on this, never on a loosely typed object.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordKind {
    Iso(IsoRecord),
    Dc(DcRecord),
    Ebrim(EbrimRecord),
    RawNode(RawRecord),
}

impl RecordKind {
    pub fn from_json(kind: SchemaKind, document: &Value) -> Result<Self> {
        Ok(match kind {
            SchemaKind::Iso => RecordKind::Iso(IsoRecord::from_json(document)?),
            SchemaKind::Dc => RecordKind::Dc(DcRecord::from_json(document)?),
            SchemaKind::Ebrim => RecordKind::Ebrim(EbrimRecord::from_json(document)?),
            SchemaKind::Raw => RecordKind::RawNode(RawRecord::from_json(document)?),
        })
    }

    /// Parse JSON text for the given schema.
    pub fn parse(kind: SchemaKind, text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text)?;
        RecordKind::from_json(kind, &document)
    }

    pub fn schema_kind(&self) -> SchemaKind {
        self.tree().schema_kind()
    }

    pub fn tree(&self) -> &dyn RecordTree {
        match self {
            RecordKind::Iso(record) => record,
            RecordKind::Dc(record) => record,
            RecordKind::Ebrim(record) => record,
            RecordKind::RawNode(record) => record,
        }
    }

    pub fn into_tree(self) -> Box<dyn RecordTree> {
        match self {
            RecordKind::Iso(record) => Box::new(record),
            RecordKind::Dc(record) => Box::new(record),
            RecordKind::Ebrim(record) => Box::new(record),
            RecordKind::RawNode(record) => Box::new(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn parses_each_kind() {
        let iso = RecordKind::parse(SchemaKind::Iso, r#"{"fileIdentifier": "a"}"#).unwrap();
        assert_eq!(iso.schema_kind(), SchemaKind::Iso);
        let raw = RecordKind::parse(SchemaKind::Raw, r#"{"identifier": "b", "anything": [1, 2]}"#).unwrap();
        assert_eq!(raw.tree().identifier().as_deref(), Some("b"));
    }

    #[test]
    fn malformed_json_is_a_document_error() {
        let err = RecordKind::parse(SchemaKind::Dc, "{not json").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Document);
    }
}
