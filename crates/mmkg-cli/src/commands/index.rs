//! Vector index command.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use mmkg_core::document::Document;
use mmkg_core::Dataset;
use mmkg_embedding::chunker::load_documents;
use mmkg_embedding::{DocumentIndex, IndexResult};

use crate::config::AppConfig;

#[derive(Args)]
pub struct IndexArgs {
    /// Drop and recreate the collection first
    #[arg(long)]
    pub recreate: bool,

    /// Index only the free-text documents, not the CPRD tables
    #[arg(long)]
    pub documents_only: bool,
}

pub async fn execute(args: IndexArgs, config: &AppConfig) -> Result<()> {
    let documents = collect_documents(config, args.documents_only)?;
    let result = index_documents(config, &documents, args.recreate).await?;
    if result.indexed == 0 && !documents.is_empty() {
        bail!("No documents were indexed");
    }
    Ok(())
}

/// Text documents plus, unless `documents_only`, the rendered CPRD tables.
pub(crate) fn collect_documents(config: &AppConfig, documents_only: bool) -> Result<Vec<Document>> {
    let mut documents = load_documents(&config.data.documents_dir, config.embedding.chunk_size)?;
    let text_chunks = documents.len();

    if !documents_only {
        let dataset = Dataset::load(&config.data)
            .with_context(|| format!("Failed to load data from {}", config.data.root.display()))?;
        documents.extend(dataset.documents());
    }

    println!(
        "{} {} document(s): {} text chunk(s), {} CPRD table(s)",
        "Collected".bold(),
        documents.len(),
        text_chunks,
        documents.len() - text_chunks
    );
    Ok(documents)
}

/// Embed and upsert documents with a progress bar.
pub(crate) async fn index_documents(config: &AppConfig, documents: &[Document], recreate: bool) -> Result<IndexResult> {
    let index = DocumentIndex::from_config(&config.embedding)?;
    if !index.embedder().health_check().await {
        bail!(
            "Ollama at {} is unreachable or model '{}' is not pulled",
            config.embedding.ollama_url,
            index.embedder().model()
        );
    }

    let pb = ProgressBar::new(documents.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
            .progress_chars("##-"),
    );
    pb.set_message("embedding");

    let result = index.index(documents, recreate, |done| pb.set_position(done as u64)).await;
    pb.finish_and_clear();
    let result = result?;

    println!("\n{}", "Indexing complete:".green().bold());
    println!("  Indexed: {}", result.indexed);
    if result.failed > 0 {
        println!("  Failed:  {}", result.failed.to_string().red());
    }
    println!("  Collection size: {}", index.count().await?);
    Ok(result)
}
