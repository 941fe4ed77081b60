//! GraphRAG question answering.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::warn;

use mmkg_core::Dataset;
use mmkg_embedding::{DocumentIndex, OllamaGenerator};
use mmkg_graph::Neo4jRepository;

use crate::commands::graph::connect_repository;
use crate::config::AppConfig;
use crate::output;
use crate::rag::GraphRagChain;

#[derive(Args)]
pub struct AskArgs {
    /// Question to answer
    pub question: String,

    /// Number of document chunks to retrieve (defaults to config)
    #[arg(long)]
    pub top_k: Option<u64>,

    /// Skip graph neighbourhood facts
    #[arg(long)]
    pub no_graph: bool,
}

/// Services the retrieval chain draws on; each is optional.
pub(crate) struct RagBackends {
    pub index: Option<DocumentIndex>,
    pub graph: Option<Neo4jRepository>,
    pub generator: OllamaGenerator,
    pub condition_names: Vec<String>,
}

impl RagBackends {
    /// Connect what is reachable and log what is not.
    pub async fn connect(config: &AppConfig, use_graph: bool) -> Self {
        let index = match DocumentIndex::from_config(&config.embedding) {
            Ok(index) => match index.count().await {
                Ok(_) => Some(index),
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "Vector store unavailable, answering without document context");
                    None
                }
            },
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Vector store client could not be created");
                None
            }
        };

        let graph = if use_graph {
            match connect_repository(config).await {
                Ok(repo) => Some(repo),
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "Neo4j unavailable, answering without graph context");
                    None
                }
            }
        } else {
            None
        };

        let condition_names = match Dataset::load(&config.data) {
            Ok(dataset) => dataset.records.into_iter().map(|r| r.name).collect(),
            Err(e) => {
                warn!(error = %e, "Condition names unavailable for graph lookup");
                Vec::new()
            }
        };

        Self {
            index,
            graph,
            generator: OllamaGenerator::new(&config.embedding.ollama_url, &config.embedding.gen_model),
            condition_names,
        }
    }

    pub fn chain(&self, top_k: u64) -> GraphRagChain<'_> {
        let mut chain = GraphRagChain::new(&self.generator, top_k);
        if let Some(index) = &self.index {
            chain = chain.with_index(index);
        }
        if let Some(graph) = &self.graph {
            chain = chain.with_graph(graph, self.condition_names.clone());
        }
        chain
    }
}

pub async fn execute(args: AskArgs, config: &AppConfig) -> Result<()> {
    let backends = RagBackends::connect(config, !args.no_graph).await;
    let chain = backends.chain(args.top_k.unwrap_or(config.embedding.top_k));

    println!("{} {}", "Using model".dimmed(), backends.generator.model().cyan());
    let answer = chain.answer(&args.question).await?;
    println!();
    output::print_answer(&answer);
    Ok(())
}
