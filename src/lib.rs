use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Download error: {0}")]
    Download(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Vector index not found at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error(
        "Index was built with embedding model '{indexed}' but '{configured}' is configured; \
         rebuild the index or pass --allow-model-mismatch"
    )]
    ModelMismatch { indexed: String, configured: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod pdf;
pub mod rag;
pub mod source;
