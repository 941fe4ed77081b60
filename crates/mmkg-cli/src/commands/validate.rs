//! Data validation command.

use anyhow::{bail, Result};

use mmkg_core::validation::validate;

use crate::config::AppConfig;
use crate::output;

pub fn execute(config: &AppConfig) -> Result<()> {
    let (report, dataset) = validate(&config.data);
    output::print_validation(&report);
    if let Some(dataset) = &dataset {
        output::print_dataset_summary(dataset);
    }

    if !report.passed() {
        bail!("Data validation failed for {}", config.data.root.display());
    }
    Ok(())
}
