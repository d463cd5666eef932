// Retrieval-augmented question answering over a vector index


use tracing::{debug, info};

use crate::RagError;
use crate::embeddings::{Embedder, Generator};
use crate::index::{RetrievedChunk, VectorIndex};

/// Number of chunks placed into the prompt
pub const RETRIEVAL_TOP_K: usize = 3;

const PROMPT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub answer: String,
    /// Retrieved chunks in retrieval order, closest first
    pub source_documents: Vec<RetrievedChunk>,
}

/// Retriever plus generator, stuffing every retrieved chunk into one prompt
pub struct RetrievalQa<'a> {
    index: &'a VectorIndex,
    embedder: &'a dyn Embedder,
    generator: &'a dyn Generator,
    top_k: usize,
}

impl<'a> RetrievalQa<'a> {
    #[inline]
    pub fn new(
        index: &'a VectorIndex,
        embedder: &'a dyn Embedder,
        generator: &'a dyn Generator,
    ) -> Self {
        Self {
            index,
            embedder,
            generator,
            top_k: RETRIEVAL_TOP_K,
        }
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[inline]
    pub async fn run(&self, query: &str) -> Result<QueryResult, RagError> {
        let query_vector = self
            .embedder
            .embed_query(query)
            .map_err(|e| RagError::Embedding(format!("{e:#}")))?;

        let source_documents = self.index.search(&query_vector, self.top_k).await?;
        debug!(
            "Retrieved {} chunks for the prompt",
            source_documents.len()
        );

        let prompt = build_prompt(query, &source_documents);
        let answer = self
            .generator
            .generate(&prompt)
            .map_err(|e| RagError::Generation(format!("{e:#}")))?;

        info!("Generated answer with {}", self.generator.generation_model());

        Ok(QueryResult {
            answer: answer.trim().to_string(),
            source_documents,
        })
    }
}

/// Render the question-answering prompt from the retrieved chunks
#[inline]
pub fn build_prompt(query: &str, chunks: &[RetrievedChunk]) -> String {
    let context = chunks
        .iter()
        .map(|retrieved| retrieved.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\n{}\n\nQuestion: {}\nHelpful Answer:",
        PROMPT_PREAMBLE, context, query
    )
}
