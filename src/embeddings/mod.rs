// Embeddings module
// Ollama integration, text chunking and the model traits the pipeline is written against

pub mod chunking;
pub mod ollama;

pub use chunking::{ChunkingConfig, DocumentChunk, TextSplitter};
pub use ollama::OllamaClient;

use anyhow::{Result, anyhow};

/// Maps text into a fixed embedding space
pub trait Embedder: Send + Sync {
    /// Identifier of the model producing the vectors
    fn embedding_model(&self) -> &str;

    /// Embed `texts`, returning one vector per input in input order
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Embedding model returned no vector for the query"))
    }
}

/// Produces an answer for a fully rendered prompt
pub trait Generator: Send + Sync {
    fn generation_model(&self) -> &str;

    fn generate(&self, prompt: &str) -> Result<String>;
}
