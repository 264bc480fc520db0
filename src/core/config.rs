use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{Error, ErrorKind, Result};

/// Catalog settings. Every field has a default so partial files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_max_records: usize,         // page size when a query does not ask for one
    pub max_records_limit: usize,           // upper clamp on maxRecords
    pub query_cache_size: usize,            // ordered result lists kept in the LRU

    pub bulk_index_workers: usize,          // 0 means one per core
    pub bulk_index_batch_size: usize,

    pub assign_missing_identifiers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_max_records: 10,
            max_records_limit: 1000,
            query_cache_size: 256,

            bulk_index_workers: 0,
            bulk_index_batch_size: 500,

            assign_missing_identifiers: true,
        }
    }
}

impl Config {
    /// Load from a TOML/JSON/YAML file (optional) layered under `CATALOG_*`
    /// environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()).required(false))
            .add_source(::config::Environment::with_prefix("CATALOG").try_parsing(true))
            .build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_records_limit == 0 {
            return Err(Error::new(ErrorKind::Config, "max_records_limit must be at least 1".to_string()));
        }
        if self.default_max_records > self.max_records_limit {
            return Err(Error::new(
                ErrorKind::Config,
                format!(
                    "default_max_records ({}) exceeds max_records_limit ({})",
                    self.default_max_records, self.max_records_limit
                ),
            ));
        }
        if self.query_cache_size == 0 {
            return Err(Error::new(ErrorKind::Config, "query_cache_size must be at least 1".to_string()));
        }
        if self.bulk_index_batch_size == 0 {
            return Err(Error::new(ErrorKind::Config, "bulk_index_batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
