//! Prompt templates for grounded answer generation

use crate::types::Candidate;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the context block from ranked candidates.
    ///
    /// One `Source: <url>\nContent: <text>` entry per candidate, in rank order.
    /// Candidates without a URL are labelled `unknown`.
    pub fn build_context(candidates: &[Candidate]) -> String {
        candidates
            .iter()
            .map(|c| format!("Source: {}\nContent: {}", c.url().unwrap_or("unknown"), c.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full prompt with strict grounding
    pub fn build_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are a business intelligence assistant.
Answer the user's query using ONLY the context provided below.
Always cite sources using [URL] notation when referencing information.
Be concise, factual, and direct. If the context does not contain enough
information to answer the question, say so clearly.

Context:
{context}

Query: {question}

Answer:"#,
            context = context,
            question = question
        )
    }
}
