use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::RagError;

pub const MANIFEST_FILE_NAME: &str = "index.json";

/// Describes how an index directory was built
///
/// Stored next to the LanceDB data so a query can tell whether its embedding
/// model shares the vector space of the index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexManifest {
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    #[inline]
    pub fn new(embedding_model: &str, dimension: usize, chunk_count: usize) -> Self {
        Self {
            embedding_model: embedding_model.to_string(),
            dimension,
            chunk_count,
            created_at: Utc::now(),
        }
    }

    #[inline]
    pub fn read(index_dir: &Path) -> Result<Self, RagError> {
        let path = index_dir.join(MANIFEST_FILE_NAME);
        if !path.is_file() {
            return Err(RagError::IndexNotFound(index_dir.to_path_buf()));
        }

        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            RagError::Index(format!(
                "Failed to parse index manifest {}: {}",
                path.display(),
                e
            ))
        })
    }

    #[inline]
    pub fn write(&self, index_dir: &Path) -> Result<(), RagError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| RagError::Index(format!("Failed to serialize index manifest: {}", e)))?;
        fs::write(index_dir.join(MANIFEST_FILE_NAME), content)?;
        Ok(())
    }
}
