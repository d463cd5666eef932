// Vector index
// LanceDB table of chunk embeddings plus a manifest naming the embedding model

pub mod manifest;


use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::RagError;
use crate::embeddings::{DocumentChunk, Embedder};

pub use manifest::IndexManifest;

const TABLE_NAME: &str = "chunks";

/// Vector index over document chunks, persisted in a single directory
pub struct VectorIndex {
    dir: PathBuf,
    table: Table,
    manifest: IndexManifest,
}

/// A chunk returned by similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub chunk: DocumentChunk,
    /// L2 distance to the query vector, smaller is closer
    pub distance: f32,
}

impl VectorIndex {
    /// Embed `chunks` and write a fresh index to `dir`
    ///
    /// A previous chunks table and manifest in `dir` are replaced, but only
    /// after every chunk has been embedded successfully. Other files in `dir`
    /// are kept.
    #[inline]
    pub async fn build(
        dir: &Path,
        embedder: &dyn Embedder,
        chunks: &[DocumentChunk],
    ) -> Result<Self, RagError> {
        if chunks.is_empty() {
            return Err(RagError::Index(
                "No document chunks to index; the PDF produced no text".to_string(),
            ));
        }

        info!(
            "Embedding {} chunks with {}",
            chunks.len(),
            embedder.embedding_model()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder
            .embed(&texts)
            .map_err(|e| RagError::Embedding(format!("{e:#}")))?;

        let dimension = validate_vectors(&vectors, chunks.len())?;
        let schema = create_schema(dimension)?;
        let record_batch = create_record_batch(&schema, chunks, &vectors, dimension)?;

        fs::create_dir_all(dir)?;

        // Only the manifest and the chunks table belong to the index; anything
        // else sharing the directory is left alone
        let manifest_path = dir.join(manifest::MANIFEST_FILE_NAME);
        if manifest_path.exists() {
            fs::remove_file(&manifest_path)?;
        }

        let connection = connect(dir).await?;
        drop_table_if_exists(&connection).await?;

        let table = connection
            .create_empty_table(TABLE_NAME, Arc::clone(&schema))
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to create table: {}", e)))?;

        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to insert embeddings: {}", e)))?;

        let manifest = IndexManifest::new(embedder.embedding_model(), dimension, chunks.len());
        manifest.write(dir)?;

        info!(
            "Stored vector index with {} chunks ({} dimensions) at '{}'",
            chunks.len(),
            dimension,
            dir.display()
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            table,
            manifest,
        })
    }

    /// Open an index previously written by [`VectorIndex::build`]
    ///
    /// Fails with [`RagError::ModelMismatch`] when the index was built with a
    /// different embedding model, unless `allow_model_mismatch` is set.
    #[inline]
    pub async fn open(
        dir: &Path,
        embedding_model: &str,
        allow_model_mismatch: bool,
    ) -> Result<Self, RagError> {
        if !dir.is_dir() {
            return Err(RagError::IndexNotFound(dir.to_path_buf()));
        }

        let manifest = IndexManifest::read(dir)?;

        if manifest.embedding_model != embedding_model {
            if allow_model_mismatch {
                warn!(
                    "Index at {} was built with '{}' but querying with '{}'; results may be meaningless",
                    dir.display(),
                    manifest.embedding_model,
                    embedding_model
                );
            } else {
                return Err(RagError::ModelMismatch {
                    indexed: manifest.embedding_model,
                    configured: embedding_model.to_string(),
                });
            }
        }

        let connection = connect(dir).await?;
        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to list tables: {}", e)))?;

        if !table_names.iter().any(|name| name == TABLE_NAME) {
            return Err(RagError::IndexNotFound(dir.to_path_buf()));
        }

        let table = connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to open table: {}", e)))?;

        debug!(
            "Opened index at {} ({} chunks, model {})",
            dir.display(),
            manifest.chunk_count,
            manifest.embedding_model
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            table,
            manifest,
        })
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// Number of chunks stored in the table
    #[inline]
    pub async fn count(&self) -> Result<usize, RagError> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Index(format!("Failed to count rows: {}", e)))
    }

    /// Return up to `k` chunks nearest to `query_vector`, closest first
    #[inline]
    pub async fn search(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        if query_vector.len() != self.manifest.dimension {
            return Err(RagError::Index(format!(
                "Query vector has {} dimensions but the index uses {}",
                query_vector.len(),
                self.manifest.dimension
            )));
        }

        debug!("Searching for the {} nearest chunks", k);

        let mut results = self
            .table
            .vector_search(query_vector)
            .map_err(|e| RagError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(k)
            .execute()
            .await
            .map_err(|e| RagError::Index(format!("Failed to execute search: {}", e)))?;

        let mut retrieved = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Index(format!("Failed to read result stream: {}", e)))?
        {
            retrieved.extend(parse_search_batch(&batch)?);
        }

        retrieved.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        retrieved.truncate(k);

        debug!("Retrieved {} chunks", retrieved.len());
        Ok(retrieved)
    }
}

async fn connect(dir: &Path) -> Result<Connection, RagError> {
    let uri = dir.to_string_lossy();
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| RagError::Index(format!("Failed to connect to LanceDB: {}", e)))
}

async fn drop_table_if_exists(connection: &Connection) -> Result<(), RagError> {
    let table_names = connection
        .table_names()
        .execute()
        .await
        .map_err(|e| RagError::Index(format!("Failed to list tables for drop: {}", e)))?;

    if table_names.iter().any(|name| name == TABLE_NAME) {
        info!("Dropping existing chunks table");
        connection
            .drop_table(TABLE_NAME)
            .await
            .map_err(|e| RagError::Index(format!("Failed to drop table: {}", e)))?;
    }

    Ok(())
}

fn to_arrow_dim(vector_dim: usize) -> Result<i32, RagError> {
    i32::try_from(vector_dim).map_err(|_| {
        RagError::Index(format!(
            "Vector dimension {} does not fit an Arrow list size",
            vector_dim
        ))
    })
}

/// Check vector count and dimensions, returning the shared dimension
fn validate_vectors(vectors: &[Vec<f32>], expected: usize) -> Result<usize, RagError> {
    if vectors.len() != expected {
        return Err(RagError::Embedding(format!(
            "Expected {} embeddings but received {}",
            expected,
            vectors.len()
        )));
    }

    let dimension = vectors.first().map_or(0, Vec::len);
    if dimension == 0 {
        return Err(RagError::Embedding(
            "Embedding model returned empty vectors".to_string(),
        ));
    }

    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(RagError::Embedding(format!(
            "Inconsistent embedding dimensions: {} and {}",
            dimension,
            bad.len()
        )));
    }

    Ok(dimension)
}

fn create_schema(vector_dim: usize) -> Result<Arc<Schema>, RagError> {
    let list_size = to_arrow_dim(vector_dim)?;
    Ok(Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                list_size,
            ),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("page", DataType::UInt32, false),
        Field::new("chunk_index", DataType::UInt32, false),
    ])))
}

fn create_record_batch(
    schema: &Arc<Schema>,
    chunks: &[DocumentChunk],
    vectors: &[Vec<f32>],
    vector_dim: usize,
) -> Result<RecordBatch, RagError> {
    let ids: Vec<String> = chunks.iter().map(|_| Uuid::new_v4().to_string()).collect();
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
    let pages: Vec<u32> = chunks.iter().map(|c| c.page).collect();
    let chunk_indices = chunks
        .iter()
        .map(|c| {
            u32::try_from(c.chunk_index).map_err(|_| {
                RagError::Index(format!("Chunk index {} exceeds u32 range", c.chunk_index))
            })
        })
        .collect::<Result<Vec<u32>, RagError>>()?;

    let flat_values: Vec<f32> = vectors.iter().flatten().copied().collect();
    let values_array = Float32Array::from(flat_values);
    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let list_size = to_arrow_dim(vector_dim)?;
    let vector_array = FixedSizeListArray::try_new(field, list_size, Arc::new(values_array), None)
        .map_err(|e| RagError::Index(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(contents)),
        Arc::new(StringArray::from(sources)),
        Arc::new(UInt32Array::from(pages)),
        Arc::new(UInt32Array::from(chunk_indices)),
    ];

    RecordBatch::try_new(Arc::clone(schema), arrays)
        .map_err(|e| RagError::Index(format!("Failed to create record batch: {}", e)))
}

fn string_column<'b>(batch: &'b RecordBatch, name: &str) -> Result<&'b StringArray, RagError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Index(format!("Invalid {} column type", name)))
}

fn u32_column<'b>(batch: &'b RecordBatch, name: &str) -> Result<&'b UInt32Array, RagError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| RagError::Index(format!("Invalid {} column type", name)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<RetrievedChunk>, RagError> {
    let contents = string_column(batch, "content")?;
    let sources = string_column(batch, "source")?;
    let pages = u32_column(batch, "page")?;
    let chunk_indices = u32_column(batch, "chunk_index")?;

    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let retrieved = (0..batch.num_rows())
        .map(|row| RetrievedChunk {
            chunk: DocumentChunk {
                content: contents.value(row).to_string(),
                source: sources.value(row).to_string(),
                page: pages.value(row),
                chunk_index: chunk_indices.value(row) as usize,
            },
            distance: distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) }),
        })
        .collect();

    Ok(retrieved)
}
