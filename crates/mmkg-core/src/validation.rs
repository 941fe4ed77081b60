//! Structural checks over a data root.
//!
//! These are the checks that decide whether the core dataset is usable,
//! independent of any graph, vector store or model being reachable.

use serde::Serialize;
use tracing::{info, warn};

use crate::condition::{CODELISTS_DIR, SUMMARY_FILE, TESTS_DIR};
use crate::config::DataConfig;
use crate::dataset::Dataset;

/// Conditions whose presence is reported when validating a CPRD root.
pub const KEY_CONDITIONS: &[&str] = &[
    "Type 2 Diabetes Mellitus",
    "Hypertension",
    "Heart failure",
    "COPD",
    "Depression",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    /// Informational; does not fail validation.
    Warn,
    Fail,
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub checks: Vec<Check>,
}

impl ValidationReport {
    fn push(&mut self, name: &str, status: CheckStatus, detail: impl Into<String>) {
        self.checks.push(Check {
            name: name.to_string(),
            status,
            detail: detail.into(),
        });
    }

    fn require(&mut self, name: &str, ok: bool, detail: impl Into<String>) -> bool {
        let status = if ok { CheckStatus::Pass } else { CheckStatus::Fail };
        self.push(name, status, detail);
        ok
    }

    fn expect_soft(&mut self, name: &str, ok: bool, detail: impl Into<String>) {
        let status = if ok { CheckStatus::Pass } else { CheckStatus::Warn };
        self.push(name, status, detail);
    }

    /// True when no check failed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.status != CheckStatus::Fail)
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }
}

/// Run every structural check, returning the loaded dataset when it loads.
pub fn validate(config: &DataConfig) -> (ValidationReport, Option<Dataset>) {
    let mut report = ValidationReport::default();
    let root = &config.root;

    if !report.require("data root", root.is_dir(), root.display().to_string()) {
        return finish(report, None);
    }
    let summary = root.join(SUMMARY_FILE);
    if !report.require(SUMMARY_FILE, summary.is_file(), summary.display().to_string()) {
        return finish(report, None);
    }
    let codelists = root.join(CODELISTS_DIR);
    report.require("codelists directory", codelists.is_dir(), codelists.display().to_string());
    let tests = root.join(TESTS_DIR);
    report.expect_soft("tests directory", tests.is_dir(), tests.display().to_string());
    report.expect_soft(
        "documents directory",
        config.documents_dir.is_dir(),
        config.documents_dir.display().to_string(),
    );

    let dataset = match Dataset::load(config) {
        Ok(dataset) => dataset,
        Err(e) => {
            report.require("summary parses", false, e.to_string());
            return finish(report, None);
        }
    };

    report.require(
        "conditions loaded",
        !dataset.records.is_empty(),
        format!("{} conditions", dataset.records.len()),
    );
    report.require(
        "body systems found",
        !dataset.systems.is_empty(),
        format!("{} systems", dataset.systems.len()),
    );
    report.expect_soft(
        "system coverage",
        dataset.systems.len() >= dataset.expected_system_count,
        format!("{} of {} expected", dataset.systems.len(), dataset.expected_system_count),
    );

    let missing: Vec<&str> = KEY_CONDITIONS
        .iter()
        .copied()
        .filter(|name| !dataset.records.iter().any(|r| r.matches(name)))
        .collect();
    report.expect_soft(
        "key conditions",
        missing.is_empty(),
        if missing.is_empty() {
            format!("all {} present", KEY_CONDITIONS.len())
        } else {
            format!("missing {}", missing.join(", "))
        },
    );

    report.require(
        "codelists parsed",
        dataset.codelist_tally.loaded > 0,
        format!(
            "{} loaded, {} skipped",
            dataset.codelist_tally.loaded, dataset.codelist_tally.skipped
        ),
    );
    let with_snomed = dataset.codelists.iter().filter(|c| c.stats.snomed_rows > 0).count();
    report.expect_soft(
        "SNOMED CT codes",
        with_snomed > 0,
        format!("{} of {} codelists", with_snomed, dataset.codelists.len()),
    );

    finish(report, Some(dataset))
}

fn finish(report: ValidationReport, dataset: Option<Dataset>) -> (ValidationReport, Option<Dataset>) {
    if report.passed() {
        info!(
            checks = report.checks.len(),
            warnings = report.count(CheckStatus::Warn),
            "Data validation passed"
        );
    } else {
        warn!(failed = report.count(CheckStatus::Fail), "Data validation failed");
    }
    (report, dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_root(dir: &std::path::Path) {
        fs::write(
            dir.join(SUMMARY_FILE),
            "disease_num,Disease_mod,Disease,system,system_num,type,testresults\n\
             1,Hypertension,Hypertension,Circulatory,1,chronic,no\n\
             2,Depression,Depression,Mental,5,chronic,no\n",
        )
        .unwrap();
        fs::create_dir(dir.join(CODELISTS_DIR)).unwrap();
        fs::write(
            dir.join(CODELISTS_DIR).join("Hypertension.csv"),
            "mapping,descr,snomedctconceptid\nsnomed,Essential hypertension,59621000\n",
        )
        .unwrap();
    }

    fn status(report: &ValidationReport, name: &str) -> CheckStatus {
        report.checks.iter().find(|c| c.name == name).unwrap().status
    }

    #[test]
    fn test_valid_root_passes_with_warnings() {
        let dir = tempfile::tempdir().unwrap();
        write_root(dir.path());
        let config = DataConfig {
            root: dir.path().to_path_buf(),
            documents_dir: dir.path().join("missing-docs"),
            ..DataConfig::default()
        };

        let (report, dataset) = validate(&config);
        assert!(report.passed());
        assert!(dataset.is_some());
        assert_eq!(status(&report, "tests directory"), CheckStatus::Warn);
        assert_eq!(status(&report, "system coverage"), CheckStatus::Warn);
        assert_eq!(status(&report, "key conditions"), CheckStatus::Warn);
        assert_eq!(status(&report, "SNOMED CT codes"), CheckStatus::Pass);
    }

    #[test]
    fn test_missing_root_stops_early() {
        let config = DataConfig {
            root: std::path::PathBuf::from("/nonexistent/cprd"),
            ..DataConfig::default()
        };
        let (report, dataset) = validate(&config);
        assert!(!report.passed());
        assert!(dataset.is_none());
        assert_eq!(report.checks.len(), 1);
    }

    #[test]
    fn test_empty_codelists_fail() {
        let dir = tempfile::tempdir().unwrap();
        write_root(dir.path());
        fs::remove_file(dir.path().join(CODELISTS_DIR).join("Hypertension.csv")).unwrap();
        let config = DataConfig {
            root: dir.path().to_path_buf(),
            ..DataConfig::default()
        };

        let (report, dataset) = validate(&config);
        assert!(!report.passed());
        assert!(dataset.is_some());
        assert_eq!(status(&report, "codelists parsed"), CheckStatus::Fail);
    }
}
