//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;

pub mod analyze;
pub mod ask;
pub mod graph;
pub mod hypotheses;
pub mod index;
pub mod run;
pub mod validate;

/// Multimorbidity Knowledge Graph - CPRD codelists, graph build and GraphRAG
#[derive(Parser)]
#[command(name = "mmkg")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file (defaults to ./mmkg.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// CPRD data root, overriding config and MMKG_DATA_ROOT
    #[arg(long, global = true)]
    pub data_root: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the data root is complete and loadable
    Validate,

    /// Relationship, complexity and system burden analysis
    Analyze(analyze::AnalyzeArgs),

    /// Evaluate the research hypotheses against the data
    Hypotheses(hypotheses::HypothesesArgs),

    /// Knowledge Graph commands
    #[command(subcommand)]
    Graph(graph::GraphCommands),

    /// Embed documents into the vector store
    Index(index::IndexArgs),

    /// Answer a question from vector and graph context
    Ask(ask::AskArgs),

    /// Run the whole pipeline and report per stage
    Run(run::RunArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let mut config = AppConfig::resolve(self.config.as_deref())?;
        if let Some(root) = self.data_root {
            config.data.root = root;
        }

        match self.command {
            Commands::Validate => validate::execute(&config),
            Commands::Analyze(args) => analyze::execute(args, &config),
            Commands::Hypotheses(args) => hypotheses::execute(args, &config).await,
            Commands::Graph(cmd) => graph::execute(cmd, &config).await,
            Commands::Index(args) => index::execute(args, &config).await,
            Commands::Ask(args) => ask::execute(args, &config).await,
            Commands::Run(args) => run::execute(args, &config).await,
        }
    }
}
