//! Knowledge Graph CLI commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use tracing::info;

use mmkg_core::Dataset;
use mmkg_graph::queries::{demo_report, graph_statistics};
use mmkg_graph::{
    GraphClient, GraphPopulator, GraphRepository, InMemoryRepository, Neo4jRepository, PopulateOptions,
    PopulateResult,
};

use crate::config::AppConfig;
use crate::output;

#[derive(Subcommand)]
pub enum GraphCommands {
    /// Build the graph from the CPRD data
    Build {
        /// Keep existing nodes instead of clearing the graph first
        #[arg(long)]
        no_reset: bool,

        /// Skip the sample patients
        #[arg(long)]
        no_patients: bool,

        /// Build into an in-memory graph and report on it, without Neo4j
        #[arg(long)]
        in_memory: bool,
    },

    /// Show node and relationship counts
    Stats,

    /// Run the demonstration queries
    Report,

    /// Delete every node and relationship
    Reset {
        /// Confirm destructive operation
        #[arg(long)]
        confirm: bool,
    },
}

pub async fn execute(cmd: GraphCommands, config: &AppConfig) -> Result<()> {
    match cmd {
        GraphCommands::Build {
            no_reset,
            no_patients,
            in_memory,
        } => {
            let options = PopulateOptions {
                reset: !no_reset,
                include_patients: !no_patients,
            };
            cmd_build(config, options, in_memory).await
        }
        GraphCommands::Stats => cmd_stats(&connect_repository(config).await?).await,
        GraphCommands::Report => cmd_report(&connect_repository(config).await?).await,
        GraphCommands::Reset { confirm } => cmd_reset(config, confirm).await,
    }
}

/// Connect to Neo4j with the configured credentials.
pub(crate) async fn connect_repository(config: &AppConfig) -> Result<Neo4jRepository> {
    let client = GraphClient::connect(&config.graph).await?;
    info!(uri = %config.graph.uri, "Connected to Neo4j");
    Ok(Neo4jRepository::new(client))
}

/// Populate `repo` from a loaded dataset and print the tallies.
pub(crate) async fn build<R: GraphRepository + ?Sized>(
    repo: &R,
    dataset: &Dataset,
    options: PopulateOptions,
) -> Result<PopulateResult> {
    let result = GraphPopulator::new(repo, options)
        .run(dataset)
        .await
        .context("Graph build aborted")?;
    output::print_populate_result(&result);
    Ok(result)
}

async fn cmd_build(config: &AppConfig, options: PopulateOptions, in_memory: bool) -> Result<()> {
    let dataset = Dataset::load(&config.data)
        .with_context(|| format!("Failed to load data from {}", config.data.root.display()))?;

    println!("{}", "Building knowledge graph...".bold());
    if in_memory {
        let repo = InMemoryRepository::new();
        build(&repo, &dataset, options).await?;
        cmd_stats(&repo).await?;
        return cmd_report(&repo).await;
    }

    let repo = connect_repository(config).await?;
    build(&repo, &dataset, options).await?;
    Ok(())
}

async fn cmd_stats<R: GraphRepository + ?Sized>(repo: &R) -> Result<()> {
    let stats = graph_statistics(repo).await?;
    output::print_graph_stats(&stats);
    Ok(())
}

async fn cmd_report<R: GraphRepository + ?Sized>(repo: &R) -> Result<()> {
    let report = demo_report(repo).await?;
    output::print_demo_report(&report);
    Ok(())
}

async fn cmd_reset(config: &AppConfig, confirm: bool) -> Result<()> {
    if !confirm {
        println!(
            "{} {}",
            "This will permanently delete every node and relationship in".red().bold(),
            config.graph.uri.yellow()
        );
        let proceed = dialoguer::Confirm::new()
            .with_prompt("Continue?")
            .default(false)
            .interact()?;
        if !proceed {
            println!("{}", "Reset cancelled.".dimmed());
            return Ok(());
        }
    }

    let repo = connect_repository(config).await?;
    repo.reset().await?;
    println!("{}", "Graph cleared.".green().bold());
    Ok(())
}
