//! Relationship, complexity and burden analysis.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use mmkg_core::complexity::model::{ConditionComplexity, SystemDistribution};
use mmkg_core::complexity::distribution_from_codelists;
use mmkg_core::relationship::model::RelationshipKind;
use mmkg_core::Dataset;

use crate::config::AppConfig;
use crate::output;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Print the analysis as JSON
    #[arg(long)]
    pub json: bool,

    /// Compute the system distribution from codelist metadata instead of the summary table
    #[arg(long)]
    pub from_codelists: bool,
}

#[derive(Serialize)]
struct Analysis<'a> {
    conditions: usize,
    systems: usize,
    same_system: usize,
    multimorbidity_patterns: usize,
    system_interactions: usize,
    distribution: &'a SystemDistribution,
    complexity: &'a [ConditionComplexity],
}

pub fn execute(args: AnalyzeArgs, config: &AppConfig) -> Result<()> {
    let dataset = Dataset::load(&config.data)
        .with_context(|| format!("Failed to load data from {}", config.data.root.display()))?;

    let distribution = if args.from_codelists {
        distribution_from_codelists(&dataset.codelists, dataset.expected_system_count)
    } else {
        dataset.distribution()
    };
    let complexity = dataset.complexity();

    if args.json {
        let analysis = Analysis {
            conditions: dataset.records.len(),
            systems: dataset.systems.len(),
            same_system: dataset.count_kind(RelationshipKind::SameSystem),
            multimorbidity_patterns: dataset.count_kind(RelationshipKind::MultimorbidityPattern),
            system_interactions: dataset.count_kind(RelationshipKind::SystemInteraction),
            distribution: &distribution,
            complexity: &complexity,
        };
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    output::print_dataset_summary(&dataset);
    output::print_distribution(&distribution);
    output::print_complexity(&complexity);
    Ok(())
}
