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

/// ISO 19115 metadata, restricted to the elements catalogs query and show.
pub static ISO_PROFILE: LazyLock<SchemaProfile> = LazyLock::new(|| {
    SchemaProfile::builder(SchemaKind::Iso, "MD_Metadata", "fileIdentifier")
        .texts(
            "MD_Metadata",
            &[
                "fileIdentifier",
                "language",
                "characterSet",
                "parentIdentifier",
                "metadataStandardName",
                "metadataStandardVersion",
            ],
        )
        .declare_many("MD_Metadata", "hierarchyLevel", ValueKind::Text)
        .declare_many("MD_Metadata", "contact", structure("CI_ResponsibleParty"))
        .declare("MD_Metadata", "dateStamp", ValueKind::DateTime)
        .declare_many("MD_Metadata", "identificationInfo", structure("MD_DataIdentification"))
        .declare("MD_Metadata", "distributionInfo", structure("MD_Distribution"))
        // identification
        .declare("MD_DataIdentification", "citation", structure("CI_Citation"))
        .texts("MD_DataIdentification", &["abstract", "purpose"])
        .declare_many("MD_DataIdentification", "status", ValueKind::Text)
        .declare_many("MD_DataIdentification", "pointOfContact", structure("CI_ResponsibleParty"))
        .declare_many("MD_DataIdentification", "descriptiveKeywords", structure("MD_Keywords"))
        .declare_many("MD_DataIdentification", "language", ValueKind::Text)
        .declare_many("MD_DataIdentification", "topicCategory", ValueKind::Text)
        .declare_many("MD_DataIdentification", "extent", structure("EX_Extent"))
        .declare_many("MD_DataIdentification", "resourceConstraints", ValueKind::External("MD_Constraints".into()))
        .declare("CI_Citation", "title", ValueKind::Text)
        .declare_many("CI_Citation", "alternateTitle", ValueKind::Text)
        .declare_many("CI_Citation", "date", structure("CI_Date"))
        .declare_many("CI_Citation", "identifier", structure("MD_Identifier"))
        .declare_many("CI_Citation", "citedResponsibleParty", structure("CI_ResponsibleParty"))
        .texts("MD_Identifier", &["code", "codeSpace"])
        .declare("CI_Date", "date", ValueKind::DateTime)
        .declare("CI_Date", "dateType", ValueKind::Text)
        .texts("CI_ResponsibleParty", &["individualName", "organisationName", "positionName", "role"])
        .declare("CI_ResponsibleParty", "contactInfo", ValueKind::External("CI_Contact".into()))
        .declare_many("MD_Keywords", "keyword", ValueKind::Text)
        .declare("MD_Keywords", "type", ValueKind::Text)
        .declare("MD_Keywords", "thesaurusName", structure("CI_Citation"))
        // extents
        .declare("EX_Extent", "description", ValueKind::Text)
        .declare_many("EX_Extent", "geographicElement", structure("EX_GeographicBoundingBox"))
        .declare_many("EX_Extent", "temporalElement", structure("EX_TemporalExtent"))
        .declare("EX_GeographicBoundingBox", "westBoundLongitude", ValueKind::Numeric)
        .declare("EX_GeographicBoundingBox", "eastBoundLongitude", ValueKind::Numeric)
        .declare("EX_GeographicBoundingBox", "southBoundLatitude", ValueKind::Numeric)
        .declare("EX_GeographicBoundingBox", "northBoundLatitude", ValueKind::Numeric)
        .declare("EX_TemporalExtent", "beginPosition", ValueKind::DateTime)
        .declare("EX_TemporalExtent", "endPosition", ValueKind::DateTime)
        // distribution
        .declare_many("MD_Distribution", "distributionFormat", structure("MD_Format"))
        .declare_many("MD_Distribution", "transferOptions", ValueKind::External("MD_DigitalTransferOptions".into()))
        .texts("MD_Format", &["name", "version"])
        .brief(&[
            "fileIdentifier",
            "hierarchyLevel",
            "identificationInfo/citation/title",
            "identificationInfo/extent/geographicElement",
        ])
        .summary(&[
            "language",
            "dateStamp",
            "metadataStandardName",
            "identificationInfo/abstract",
            "identificationInfo/descriptiveKeywords",
            "identificationInfo/topicCategory",
            "identificationInfo/pointOfContact",
            "distributionInfo",
        ])
        .extract("identifier", &["fileIdentifier"])
        .extract("Identifier", &["fileIdentifier", "identificationInfo/citation/identifier/code"])
        .extract("ParentIdentifier", &["parentIdentifier"])
        .extract("Title", &["identificationInfo/citation/title"])
        .extract("title", &["identificationInfo/citation/title"])
        .extract("AlternateTitle", &["identificationInfo/citation/alternateTitle"])
        .extract("Abstract", &["identificationInfo/abstract"])
        .extract("abstract", &["identificationInfo/abstract"])
        .extract("Subject", &["identificationInfo/descriptiveKeywords/keyword", "identificationInfo/topicCategory"])
        .extract("subject", &["identificationInfo/descriptiveKeywords/keyword"])
        .extract("TopicCategory", &["identificationInfo/topicCategory"])
        .extract("Language", &["language"])
        .extract("language", &["language"])
        .extract("ResourceLanguage", &["identificationInfo/language"])
        .extract("Modified", &["dateStamp"])
        .extract("Date", &["identificationInfo/citation/date/date"])
        .extract("Type", &["hierarchyLevel"])
        .extract("type", &["hierarchyLevel"])
        .extract("Format", &["distributionInfo/distributionFormat/name"])
        .extract("format", &["distributionInfo/distributionFormat/name"])
        .extract(
            "OrganisationName",
            &["contact/organisationName", "identificationInfo/pointOfContact/organisationName"],
        )
        .extract("BoundingBox", &["identificationInfo/extent/geographicElement"])
        .extract("TempExtent_begin", &["identificationInfo/extent/temporalElement/beginPosition"])
        .extract("TempExtent_end", &["identificationInfo/extent/temporalElement/endPosition"])
        .build()
});

#[derive(Debug, Clone, PartialEq)]
pub struct IsoRecord {
    root: Structure,
}

impl IsoRecord {
    pub fn new(root: Structure) -> Result<Self> {
        if root.type_name != ISO_PROFILE.root_type {
            return Err(Error::new(
                ErrorKind::Document,
                format!("an ISO record is rooted at MD_Metadata, not {}", root.type_name),
            ));
        }
        Ok(IsoRecord { root })
    }

    pub fn from_json(document: &Value) -> Result<Self> {
        Ok(IsoRecord {
            root: ISO_PROFILE.tree_from_json(document)?,
        })
    }
}

impl RecordTree for IsoRecord {
    fn profile(&self) -> &'static SchemaProfile {
        &ISO_PROFILE
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
