//! Data source configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::complexity::model::EXPECTED_SYSTEM_COUNT;
use crate::error::MmkgResult;
use crate::relationship::curated::CuratedTables;

/// Where the codelist data and free-text documents live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding `DiseaseSummary.csv`, `codelists/` and `tests/`.
    pub root: PathBuf,
    /// Directory of `.txt` / `.md` documents to index.
    pub documents_dir: PathBuf,
    pub expected_system_count: usize,
    /// Optional TOML file replacing the built-in curated tables.
    pub curated_tables: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("documents/CPRD_multimorbidity_codelists-main"),
            documents_dir: PathBuf::from("documents"),
            expected_system_count: EXPECTED_SYSTEM_COUNT,
            curated_tables: None,
        }
    }
}

impl DataConfig {
    /// Curated tables from the configured file, or the built-in CPRD tables.
    pub fn load_curated_tables(&self) -> MmkgResult<CuratedTables> {
        match &self.curated_tables {
            Some(path) => CuratedTables::from_toml_file(path),
            None => Ok(CuratedTables::cprd()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: DataConfig = toml::from_str(r#"root = "/srv/cprd""#).unwrap();
        assert_eq!(config.root, PathBuf::from("/srv/cprd"));
        assert_eq!(config.expected_system_count, 15);
        assert!(config.curated_tables.is_none());
    }

    #[test]
    fn test_missing_curated_file_is_an_error() {
        let config = DataConfig {
            curated_tables: Some(PathBuf::from("/nonexistent/curated.toml")),
            ..DataConfig::default()
        };
        assert!(config.load_curated_tables().is_err());
        assert!(!DataConfig::default().load_curated_tables().unwrap().associations.is_empty());
    }
}
