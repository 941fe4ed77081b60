//! Graph-augmented retrieval chain.
//!
//! Retrieves the top document chunks for a question, adds the graph
//! neighbourhood of every condition the question names, and asks the
//! generator to answer from that context.

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use mmkg_embedding::{DocumentIndex, OllamaGenerator, RetrievedChunk};
use mmkg_graph::queries::condition_neighbourhood;
use mmkg_graph::GraphRepository;

/// Conditions looked up in the graph per question.
const MAX_CONDITIONS: usize = 3;

/// Graph edges kept per condition.
const FACTS_PER_CONDITION: usize = 10;

/// Retrieved context plus the generated answer.
#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub question: String,
    pub answer: String,
    pub chunks: Vec<RetrievedChunk>,
    pub facts: Vec<String>,
}

pub struct GraphRagChain<'a> {
    index: Option<&'a DocumentIndex>,
    graph: Option<&'a dyn GraphRepository>,
    generator: &'a OllamaGenerator,
    condition_names: Vec<String>,
    top_k: u64,
}

impl<'a> GraphRagChain<'a> {
    pub fn new(generator: &'a OllamaGenerator, top_k: u64) -> Self {
        Self {
            index: None,
            graph: None,
            generator,
            condition_names: Vec::new(),
            top_k,
        }
    }

    pub fn with_index(mut self, index: &'a DocumentIndex) -> Self {
        self.index = Some(index);
        self
    }

    /// Graph used for neighbourhood facts, with the condition names to spot.
    pub fn with_graph(mut self, graph: &'a dyn GraphRepository, condition_names: Vec<String>) -> Self {
        self.graph = Some(graph);
        self.condition_names = condition_names;
        self
    }

    fn mentioned(&self, question: &str) -> Vec<&str> {
        mentioned_conditions(&self.condition_names, question)
    }

    /// Vector chunks and graph facts for a question.
    pub async fn retrieve(&self, question: &str) -> Result<(Vec<RetrievedChunk>, Vec<String>)> {
        if self.index.is_none() && self.graph.is_none() {
            bail!("No retrieval source available: vector store and graph are both unreachable");
        }

        let chunks = match self.index {
            Some(index) => index.search(question, self.top_k).await?,
            None => Vec::new(),
        };

        let mut facts = Vec::new();
        if let Some(graph) = self.graph {
            for name in self.mentioned(question) {
                let around = condition_neighbourhood(graph, name, FACTS_PER_CONDITION).await?;
                debug!(condition = name, facts = around.len(), "Graph neighbourhood");
                facts.extend(around.iter().map(|n| n.as_fact()));
            }
        }

        Ok((chunks, facts))
    }

    /// Answer one question.
    pub async fn answer(&self, question: &str) -> Result<RagAnswer> {
        let (chunks, facts) = self.retrieve(question).await?;
        let prompt = build_prompt(question, &chunks, &facts);
        let answer = self.generator.generate(&prompt).await?;

        info!(chunks = chunks.len(), facts = facts.len(), "Answered question");
        Ok(RagAnswer {
            question: question.to_string(),
            answer,
            chunks,
            facts,
        })
    }

    /// Answer each question in turn; a failure is logged and kept in place.
    pub async fn answer_batch(&self, questions: &[&str]) -> Vec<(String, Result<RagAnswer>)> {
        let mut out = Vec::with_capacity(questions.len());
        for question in questions {
            let result = self.answer(question).await;
            if let Err(e) = &result {
                warn!(question = *question, error = %format!("{:#}", e), "Query failed");
            }
            out.push((question.to_string(), result));
        }
        out
    }
}

/// Names occurring in the question, case-insensitively, longest first.
///
/// A name contained in an already chosen longer name is skipped, so
/// "Type 2 Diabetes Mellitus" does not also pull in "Diabetes".
pub fn mentioned_conditions<'n>(names: &'n [String], question: &str) -> Vec<&'n str> {
    let question = question.to_lowercase();
    let mut hits: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|n| !n.trim().is_empty() && question.contains(&n.to_lowercase()))
        .collect();
    hits.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    hits.dedup();

    let mut chosen: Vec<&str> = Vec::new();
    for hit in hits {
        let lower = hit.to_lowercase();
        if chosen.iter().any(|c| c.to_lowercase().contains(&lower)) {
            continue;
        }
        chosen.push(hit);
        if chosen.len() == MAX_CONDITIONS {
            break;
        }
    }
    chosen
}

/// Prompt combining vector chunks and graph facts.
pub fn build_prompt(question: &str, chunks: &[RetrievedChunk], facts: &[String]) -> String {
    let mut context = String::new();
    for chunk in chunks {
        context.push_str(&format!("[{}]\n{}\n\n", chunk.source, chunk.content));
    }
    if !facts.is_empty() {
        context.push_str("Graph relationships:\n");
        for fact in facts {
            context.push_str(&format!("- {}\n", fact));
        }
    }
    if context.is_empty() {
        context.push_str("(no context retrieved)\n");
    }

    format!(
        "Answer the question based on the following context from both vector search and graph relationships:\n\n\
         Context: {}\n\
         Question: {}\n\n\
         Answer:",
        context.trim_end(),
        question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmkg_graph::{EdgeUpsert, InMemoryRepository, NodeRef, NodeUpsert};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_mentioned_conditions_prefers_longest() {
        let all = names(&["Diabetes", "Type 2 Diabetes Mellitus", "Hypertension", "Asthma"]);
        let hits = mentioned_conditions(&all, "Does type 2 diabetes mellitus lead to HYPERTENSION?");
        assert_eq!(hits, vec!["Type 2 Diabetes Mellitus", "Hypertension"]);

        assert!(mentioned_conditions(&all, "What about gout?").is_empty());
    }

    #[test]
    fn test_prompt_layout() {
        let chunks = vec![RetrievedChunk {
            source: "CPRD_Asthma".to_string(),
            content: "Condition: Asthma".to_string(),
            score: 0.9,
        }];
        let facts = vec!["Asthma -[SAME_SYSTEM (Respiratory)]- COPD".to_string()];
        let prompt = build_prompt("Is asthma linked to COPD?", &chunks, &facts);

        assert!(prompt.starts_with("Answer the question based on the following context"));
        assert!(prompt.contains("[CPRD_Asthma]\nCondition: Asthma"));
        assert!(prompt.contains("- Asthma -[SAME_SYSTEM (Respiratory)]- COPD"));
        assert!(prompt.ends_with("Question: Is asthma linked to COPD?\n\nAnswer:"));

        let empty = build_prompt("Anything?", &[], &[]);
        assert!(empty.contains("Context: (no context retrieved)"));
    }

    #[tokio::test]
    async fn test_retrieve_graph_facts_only() {
        let repo = InMemoryRepository::new();
        for (id, name) in [(1, "Hypertension"), (2, "Heart failure")] {
            repo.upsert_node(NodeUpsert::new(NodeRef::disease(id)).prop("name", name))
                .await
                .unwrap();
        }
        repo.upsert_edge(
            EdgeUpsert::new(NodeRef::disease(1), NodeRef::disease(2), "MULTIMORBIDITY_PATTERN")
                .qualifier(Some("LEADS_TO"))
                .prop("strength", 0.8),
        )
        .await
        .unwrap();

        let generator = OllamaGenerator::new("http://localhost:11434", "llama3.2:3b");
        let chain = GraphRagChain::new(&generator, 5)
            .with_graph(&repo, names(&["Hypertension", "Heart failure", "Asthma"]));

        let (chunks, facts) = chain.retrieve("How does hypertension progress?").await.unwrap();
        assert!(chunks.is_empty());
        assert_eq!(facts, vec!["Hypertension -[MULTIMORBIDITY_PATTERN (LEADS_TO)]- Heart failure strength 0.80"]);
    }

    #[tokio::test]
    async fn test_retrieve_without_sources_fails() {
        let generator = OllamaGenerator::new("http://localhost:11434", "llama3.2:3b");
        let chain = GraphRagChain::new(&generator, 5);
        assert!(chain.retrieve("anything").await.is_err());
    }
}
