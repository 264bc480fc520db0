use serde_json::Value;
use std::sync::LazyLock;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::SchemaKind;
use crate::schema::profile::SchemaProfile;
use crate::tree::node::{Structure, ValueKind};
use crate::tree::record::RecordTree;

fn structure(name: &str) -> ValueKind {
    ValueKind::Structure(name.to_string())
}

pub static EBRIM_PROFILE: LazyLock<SchemaProfile> = LazyLock::new(|| {
    SchemaProfile::builder(SchemaKind::Ebrim, "RegistryObject", "id")
        .texts("RegistryObject", &["id", "lid", "objectType", "status", "mimeType", "home"])
        .declare("RegistryObject", "Name", structure("InternationalString"))
        .declare("RegistryObject", "Description", structure("InternationalString"))
        .declare_many("RegistryObject", "Slot", structure("Slot"))
        .declare_many("RegistryObject", "Classification", structure("Classification"))
        .declare_many("RegistryObject", "ExternalIdentifier", structure("ExternalIdentifier"))
        .declare_many("InternationalString", "LocalizedString", structure("LocalizedString"))
        .texts("LocalizedString", &["value", "lang", "charset"])
        .texts("Slot", &["name", "slotType"])
        .declare_many("Slot", "value", ValueKind::Text)
        .texts(
            "Classification",
            &[
                "id",
                "classificationScheme",
                "classificationNode",
                "classifiedObject",
                "nodeRepresentation",
            ],
        )
        .texts("ExternalIdentifier", &["id", "identificationScheme", "registryObject", "value"])
        .brief(&["id", "objectType", "Name"])
        .summary(&["Description", "status", "mimeType", "Classification"])
        .extract("identifier", &["id"])
        .extract("Identifier", &["id", "ExternalIdentifier/value"])
        .extract("Title", &["Name/LocalizedString/value"])
        .extract("title", &["Name/LocalizedString/value"])
        .extract("Abstract", &["Description/LocalizedString/value"])
        .extract("abstract", &["Description/LocalizedString/value"])
        .extract("Subject", &["Classification/classificationNode"])
        .extract("Language", &["Name/LocalizedString/lang"])
        .extract("Type", &["objectType"])
        .extract("type", &["objectType"])
        .extract("Format", &["mimeType"])
        .extract("format", &["mimeType"])
        .build()
});

/// An ebRIM registry object.
#[derive(Debug, Clone, PartialEq)]
pub struct EbrimRecord {
    root: Structure,
}

impl EbrimRecord {
    pub fn new(root: Structure) -> Result<Self> {
        if root.type_name != EBRIM_PROFILE.root_type {
            return Err(Error::new(
                ErrorKind::Document,
                format!("an ebRIM record is rooted at RegistryObject, not {}", root.type_name),
            ));
        }
        Ok(EbrimRecord { root })
    }

    pub fn from_json(document: &Value) -> Result<Self> {
        Ok(EbrimRecord {
            root: EBRIM_PROFILE.tree_from_json(document)?,
        })
    }
}

impl RecordTree for EbrimRecord {
    fn profile(&self) -> &'static SchemaProfile {
        &EBRIM_PROFILE
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
