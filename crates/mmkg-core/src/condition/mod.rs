//! Condition summary and codelist loading.
//!
//! Reads the CPRD disease summary table and the per-condition codelist
//! files under a data root:
//!
//! ```text
//! <root>/DiseaseSummary.csv
//! <root>/codelists/<condition>.csv
//! <root>/tests/<test>.csv
//! ```
//!
//! A missing root or summary file is fatal. A bad codelist or test file is
//! logged and skipped.

pub mod model;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{MmkgError, MmkgResult};
use model::{
    BodySystem, Codelist, CodelistEntry, CodelistStats, ConditionRecord, LoadTally, SummaryRow,
    TestCodelist,
};

/// File name of the disease summary table.
pub const SUMMARY_FILE: &str = "DiseaseSummary.csv";

/// Subdirectory holding per-condition codelists.
pub const CODELISTS_DIR: &str = "codelists";

/// Subdirectory holding test value codelists.
pub const TESTS_DIR: &str = "tests";

/// Load every condition from the disease summary table.
///
/// Fails when the root or the summary file is missing, when a row cannot be
/// parsed, when an id repeats, or when a row has no body system.
pub fn load_summary(root: &Path) -> MmkgResult<Vec<ConditionRecord>> {
    if !root.is_dir() {
        return Err(MmkgError::RootNotFound(root.to_path_buf()));
    }
    let path = root.join(SUMMARY_FILE);
    if !path.is_file() {
        return Err(MmkgError::SummaryNotFound(path));
    }

    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_path(&path)?;
    let mut records = Vec::new();
    let mut seen: HashMap<i64, String> = HashMap::new();

    for result in reader.deserialize::<SummaryRow>() {
        let row = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            MmkgError::invalid_record(line, e.to_string())
        })?;
        let line = records.len() as u64 + 2;
        let record = ConditionRecord::from_row(row);

        if record.system.is_empty() {
            return Err(MmkgError::invalid_record(
                line,
                format!("condition '{}' has no body system", record.name),
            ));
        }
        if let Some(first) = seen.insert(record.id, record.name.clone()) {
            return Err(MmkgError::DuplicateCondition {
                id: record.id,
                first,
                second: record.name,
            });
        }

        records.push(record);
    }

    info!(path = %path.display(), conditions = records.len(), "Loaded disease summary");
    Ok(records)
}

/// Distinct body systems observed in the records, ordered by ordinal then name.
pub fn body_systems(records: &[ConditionRecord]) -> Vec<BodySystem> {
    let mut systems: BTreeMap<&str, i64> = BTreeMap::new();
    for record in records {
        systems.entry(record.system.as_str()).or_insert(record.system_num);
    }

    let mut result: Vec<BodySystem> = systems
        .into_iter()
        .map(|(name, system_num)| BodySystem {
            name: name.to_string(),
            system_num,
        })
        .collect();
    result.sort_by(|a, b| a.system_num.cmp(&b.system_num).then_with(|| a.name.cmp(&b.name)));
    result
}

/// Group condition records by body system name.
pub fn conditions_by_system(records: &[ConditionRecord]) -> BTreeMap<&str, Vec<&ConditionRecord>> {
    let mut grouped: BTreeMap<&str, Vec<&ConditionRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.system.as_str()).or_default().push(record);
    }
    grouped
}

/// Load every condition codelist under `<root>/codelists`.
pub fn load_codelists(root: &Path) -> (Vec<Codelist>, LoadTally) {
    let dir = root.join(CODELISTS_DIR);
    let files = csv_files(&dir);
    info!(dir = %dir.display(), files = files.len(), "Found codelist files");

    let mut codelists = Vec::with_capacity(files.len());
    let mut tally = LoadTally::default();

    for path in files {
        let condition = file_stem(&path);
        match read_codelist(&path) {
            Ok(entries) => {
                let stats = CodelistStats::from_entries(&entries);
                debug!(condition = %condition, codes = stats.row_count, "Loaded codelist");
                codelists.push(Codelist {
                    condition,
                    file_path: path.display().to_string(),
                    entries,
                    stats,
                });
                tally.loaded += 1;
            }
            Err(e) => {
                warn!(condition = %condition, error = %e, "Skipping unreadable codelist");
                tally.skipped += 1;
            }
        }
    }

    info!(loaded = tally.loaded, skipped = tally.skipped, "Codelists loaded");
    (codelists, tally)
}

/// Load every test value codelist under `<root>/tests`.
pub fn load_test_codelists(root: &Path) -> (Vec<TestCodelist>, LoadTally) {
    let dir = root.join(TESTS_DIR);
    let files = csv_files(&dir);
    info!(dir = %dir.display(), files = files.len(), "Found test files");

    let mut tests = Vec::with_capacity(files.len());
    let mut tally = LoadTally::default();

    for path in files {
        let name = file_stem(&path);
        match read_raw_table(&path) {
            Ok((headers, rows)) => {
                debug!(test = %name, rows = rows.len(), "Loaded test codelist");
                tests.push(TestCodelist {
                    name,
                    file_path: path.display().to_string(),
                    headers,
                    rows,
                });
                tally.loaded += 1;
            }
            Err(e) => {
                warn!(test = %name, error = %e, "Skipping unreadable test file");
                tally.skipped += 1;
            }
        }
    }

    info!(loaded = tally.loaded, skipped = tally.skipped, "Test codelists loaded");
    (tests, tally)
}

fn read_codelist(path: &Path) -> MmkgResult<Vec<CodelistEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_path(path)?;

    let mut entries = Vec::new();
    for result in reader.deserialize::<CodelistEntry>() {
        entries.push(result?);
    }
    Ok(entries)
}

fn read_raw_table(path: &Path) -> MmkgResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

/// List `*.csv` files in a directory, sorted. A missing directory yields none.
fn csv_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        debug!(dir = %dir.display(), "Directory not present");
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map_or(false, |e| e.eq_ignore_ascii_case("csv")))
        .collect();
    files.sort();
    files
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
