//! Research hypothesis evaluation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use mmkg_core::hypothesis::model::HypothesisReport;
use mmkg_core::hypothesis::{evaluate_all, HypothesisInput};
use mmkg_core::Dataset;

use crate::commands::ask::RagBackends;
use crate::config::AppConfig;
use crate::output;

#[derive(Args)]
pub struct HypothesesArgs {
    /// Also put each hypothesis' questions to the GraphRAG chain
    #[arg(long)]
    pub with_llm: bool,

    /// Print the results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Evaluate every hypothesis over a loaded dataset.
pub(crate) fn evaluate_dataset(dataset: &Dataset) -> HypothesisReport {
    let distribution = dataset.distribution();
    evaluate_all(&HypothesisInput {
        records: &dataset.records,
        codelists: &dataset.codelists,
        relationships: &dataset.relationships,
        distribution: &distribution,
    })
}

pub async fn execute(args: HypothesesArgs, config: &AppConfig) -> Result<()> {
    let dataset = Dataset::load(&config.data)
        .with_context(|| format!("Failed to load data from {}", config.data.root.display()))?;
    let report = evaluate_dataset(&dataset);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_hypotheses(&report);
    }

    if args.with_llm {
        ask_questions(config, &report).await;
    }
    Ok(())
}

/// Put every hypothesis' questions to the chain; failures are reported, not fatal.
pub(crate) async fn ask_questions(config: &AppConfig, report: &HypothesisReport) -> (usize, usize) {
    let backends = RagBackends::connect(config, true).await;
    let chain = backends.chain(config.embedding.top_k);
    let (mut answered, mut failed) = (0, 0);

    for result in &report.results {
        output::heading(result.hypothesis.title());
        for (question, outcome) in chain.answer_batch(result.hypothesis.questions()).await {
            match outcome {
                Ok(answer) => {
                    answered += 1;
                    output::print_answer(&answer);
                    println!();
                }
                Err(e) => {
                    failed += 1;
                    println!("{} {}", "Q:".cyan().bold(), question);
                    println!("{} {:#}", "Failed:".red().bold(), e);
                    println!();
                }
            }
        }
    }

    println!("{} {} answered, {} failed", "LLM queries:".bold(), answered, failed);
    (answered, failed)
}
