//! End-to-end pipeline: validate, analyze, build, index, query.
//!
//! Only the core validation decides the exit status. Graph, vector store
//! and model stages report their outcome and the run carries on.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use tracing::warn;

use mmkg_core::validation::validate;
use mmkg_graph::queries::{demo_report, graph_statistics};
use mmkg_graph::{GraphRepository, InMemoryRepository, PopulateOptions};

use crate::commands::graph::{build, connect_repository};
use crate::commands::hypotheses::{ask_questions, evaluate_dataset};
use crate::commands::index::{collect_documents, index_documents};
use crate::config::AppConfig;
use crate::output;

#[derive(Args)]
pub struct RunArgs {
    /// Build the graph in memory and skip every external service
    #[arg(long)]
    pub offline: bool,

    /// Skip document indexing
    #[arg(long)]
    pub skip_index: bool,

    /// Put the hypothesis questions to the GraphRAG chain
    #[arg(long)]
    pub with_llm: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum StageStatus {
    Passed(String),
    Failed(String),
    Skipped,
}

struct Stages(Vec<(&'static str, StageStatus)>);

impl Stages {
    fn record<T>(&mut self, name: &'static str, result: Result<T>, detail: impl FnOnce(&T) -> String) -> Option<T> {
        match result {
            Ok(value) => {
                self.0.push((name, StageStatus::Passed(detail(&value))));
                Some(value)
            }
            Err(e) => {
                let msg = format!("{:#}", e);
                warn!(stage = name, error = %msg, "Stage failed");
                self.0.push((name, StageStatus::Failed(msg)));
                None
            }
        }
    }

    fn skip(&mut self, name: &'static str) {
        self.0.push((name, StageStatus::Skipped));
    }

    fn print(&self) {
        output::heading("Run summary");
        for (name, status) in &self.0 {
            match status {
                StageStatus::Passed(detail) => println!("  {} {:<22} {}", "✓".green(), name, detail.dimmed()),
                StageStatus::Failed(msg) => println!("  {} {:<22} {}", "✗".red().bold(), name, msg.red()),
                StageStatus::Skipped => println!("  {} {:<22} {}", "-".dimmed(), name, "skipped".dimmed()),
            }
        }
    }
}

pub async fn execute(args: RunArgs, config: &AppConfig) -> Result<()> {
    let mut stages = Stages(Vec::new());

    let (report, dataset) = validate(&config.data);
    output::print_validation(&report);
    let dataset = match dataset {
        Some(dataset) if report.passed() => dataset,
        _ => {
            stages.0.push(("core validation", StageStatus::Failed("see checks above".to_string())));
            stages.print();
            bail!("Core validation failed for {}", config.data.root.display());
        }
    };
    stages.0.push((
        "core validation",
        StageStatus::Passed(format!("{} checks", report.checks.len())),
    ));

    output::print_dataset_summary(&dataset);
    output::print_distribution(&dataset.distribution());
    output::print_complexity(&dataset.complexity());

    let hypotheses = evaluate_dataset(&dataset);
    output::print_hypotheses(&hypotheses);
    stages.0.push((
        "hypotheses",
        StageStatus::Passed(format!("{}/{} supported", hypotheses.supported(), hypotheses.results.len())),
    ));

    let options = PopulateOptions::default();
    if args.offline {
        let repo = InMemoryRepository::new();
        let built = build(&repo, &dataset, options).await;
        if stages.record("graph build", built, |r| format!("{} writes, {} failed", r.written(), r.failed())).is_some() {
            report_graph(&repo, &mut stages).await;
        }
    } else {
        match connect_repository(config).await {
            Ok(repo) => {
                let built = build(&repo, &dataset, options).await;
                if stages.record("graph build", built, |r| format!("{} writes, {} failed", r.written(), r.failed())).is_some() {
                    report_graph(&repo, &mut stages).await;
                }
            }
            Err(e) => {
                stages.record::<()>("graph build", Err(e), |_| String::new());
                stages.skip("graph report");
            }
        }
    }

    if args.offline || args.skip_index {
        stages.skip("document index");
    } else {
        let indexed = match collect_documents(config, false) {
            Ok(documents) => index_documents(config, &documents, false).await,
            Err(e) => Err(e),
        };
        stages.record("document index", indexed, |r| format!("{} indexed, {} failed", r.indexed, r.failed));
    }

    if args.with_llm && !args.offline {
        let (answered, failed) = ask_questions(config, &hypotheses).await;
        stages.0.push(("llm queries", StageStatus::Passed(format!("{} answered, {} failed", answered, failed))));
    } else {
        stages.skip("llm queries");
    }

    stages.print();
    println!();
    println!("{}", "Core system validation successful.".green().bold());
    Ok(())
}

async fn report_graph<R: GraphRepository + ?Sized>(repo: &R, stages: &mut Stages) {
    let result = async {
        let stats = graph_statistics(repo).await?;
        output::print_graph_stats(&stats);
        let report = demo_report(repo).await?;
        output::print_demo_report(&report);
        Ok::<_, anyhow::Error>(stats)
    }
    .await;
    stages.record("graph report", result, |s| {
        format!("{} diseases, {} relationships", s.diseases, s.total_relationships())
    });
}
