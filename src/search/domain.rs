use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind, Result};
use crate::index::catalog_index::CatalogIndex;
use crate::query::queryable::QueryableRegistry;

/// Protocol parameters with a fixed set of allowed values.
const PARAMETER_DOMAINS: &[(&str, &[&str])] = &[
    ("GetRecords.resultType", &["hits", "results", "validate"]),
    ("GetRecords.ElementSetName", &["brief", "full", "summary"]),
    ("GetRecords.typeNames", &["csw:Record", "gmd:MD_Metadata", "raw", "rim:RegistryObject"]),
    ("GetRecords.outputFormat", &["application/json"]),
    ("GetRecordById.ElementSetName", &["brief", "full", "summary"]),
    (
        "GetCapabilities.sections",
        &["All", "Filter_Capabilities", "OperationsMetadata", "ServiceIdentification", "ServiceProvider"],
    ),
];

/// Sorted distinct values of one property or parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainValues {
    pub name: String,
    pub values: Vec<String>,
}

pub struct DomainResolver<'a> {
    registry: &'a QueryableRegistry,
    index: &'a CatalogIndex,
}

impl<'a> DomainResolver<'a> {
    pub fn new(registry: &'a QueryableRegistry, index: &'a CatalogIndex) -> Self {
        DomainResolver { registry, index }
    }

    /// Both arguments accept comma-separated lists. Property names are
    /// matched case-sensitively against the queryables.
    pub fn resolve(&self, property_name: Option<&str>, parameter_name: Option<&str>) -> Result<Vec<DomainValues>> {
        if property_name.is_none() && parameter_name.is_none() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "either a property name or a parameter name is required".to_string(),
            ));
        }

        let mut domains = Vec::new();
        for name in split(parameter_name) {
            domains.push(self.parameter(name)?);
        }
        for name in split(property_name) {
            domains.push(self.property(name)?);
        }
        Ok(domains)
    }

    fn parameter(&self, name: &str) -> Result<DomainValues> {
        PARAMETER_DOMAINS
            .iter()
            .find(|(parameter, _)| parameter.eq_ignore_ascii_case(name))
            .map(|(parameter, values)| DomainValues {
                name: parameter.to_string(),
                values: values.iter().map(|v| v.to_string()).collect(),
            })
            .ok_or_else(|| Error::new(ErrorKind::InvalidArgument, format!("unknown parameter name '{}'", name)))
    }

    fn property(&self, name: &str) -> Result<DomainValues> {
        let queryable = self.registry.get(name)?;
        let mut values: Vec<String> = self.index.domain(&queryable.name).iter().map(|v| v.to_string()).collect();
        // distinct values may still render alike, e.g. 1 and 1.0
        values.dedup();
        Ok(DomainValues {
            name: queryable.name.clone(),
            values,
        })
    }
}

fn split(names: Option<&str>) -> impl Iterator<Item = &str> {
    names
        .into_iter()
        .flat_map(|names| names.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
}
