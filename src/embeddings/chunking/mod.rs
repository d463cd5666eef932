#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pdf::PdfPage;

/// Paragraph, line, word and finally character boundaries, tried in order
const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Represents a chunk of document text ready for embedding
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    /// The chunk text
    pub content: String,
    /// Identifier of the document the chunk was cut from
    pub source: String,
    /// Zero-based page number within the source document
    pub page: u32,
    /// Position of this chunk in ingestion order
    pub chunk_index: usize,
}

impl DocumentChunk {
    #[inline]
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Configuration for text splitting. Sizes are measured in characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum length of a chunk
    pub chunk_size: usize,
    /// Maximum amount of trailing text repeated at the start of the next chunk
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

/// Recursive character splitter.
///
/// Text is cut on the first separator that occurs in it. Pieces that still
/// exceed the chunk size are cut again with the next separator, the rest are
/// merged back together up to the chunk size while carrying an overlap
/// between consecutive chunks.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: ChunkingConfig,
    separators: &'static [&'static str],
}

impl TextSplitter {
    #[inline]
    pub fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            separators: DEFAULT_SEPARATORS,
        }
    }

    /// Split a single text into chunks
    #[inline]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, self.separators)
    }

    /// Split every page, keeping page metadata on each chunk
    #[inline]
    pub fn split_pages(&self, pages: &[PdfPage]) -> Vec<DocumentChunk> {
        let mut chunks = Vec::new();

        for page in pages {
            for content in self.split_text(&page.text) {
                chunks.push(DocumentChunk {
                    content,
                    source: page.source.clone(),
                    page: page.page,
                    chunk_index: chunks.len(),
                });
            }
        }

        debug!(
            "Split {} pages into {} chunks (avg {} chars)",
            pages.len(),
            chunks.len(),
            chunks.iter().map(DocumentChunk::char_count).sum::<usize>() / chunks.len().max(1)
        );

        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[&'static str]) -> Vec<String> {
        let mut final_chunks = Vec::new();
        let (separator, remaining) = pick_separator(text, separators);

        let mut good_splits = Vec::new();
        for split in split_keeping_separator(text, separator) {
            if char_len(split) < self.config.chunk_size {
                good_splits.push(split);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }

            if remaining.is_empty() {
                final_chunks.push(split.to_string());
            } else {
                final_chunks.extend(self.split_recursive(split, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits));
        }

        final_chunks
    }

    /// Greedily combine small pieces into chunks, carrying an overlap forward
    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let chunk_size = self.config.chunk_size;
        let chunk_overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &split in splits {
            let len = char_len(split);

            if total + len > chunk_size {
                if total > chunk_size {
                    warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total, chunk_size
                    );
                }

                if !current.is_empty() {
                    if let Some(chunk) = join_pieces(&current) {
                        chunks.push(chunk);
                    }

                    // Drop leading pieces until what is left fits as overlap
                    while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                        let Some(front) = current.pop_front() else {
                            break;
                        };
                        total -= char_len(front);
                    }
                }
            }

            current.push_back(split);
            total += len;
        }

        if let Some(chunk) = join_pieces(&current) {
            chunks.push(chunk);
        }

        chunks
    }
}

/// First separator present in `text`, plus the finer separators after it
fn pick_separator<'a>(
    text: &str,
    separators: &'a [&'static str],
) -> (&'static str, &'a [&'static str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator, &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }

    (separators.last().copied().unwrap_or(""), &[])
}

/// Split on `separator`, attaching each separator to the piece after it
#[expect(
    clippy::string_slice,
    reason = "offsets come from match_indices and char_indices"
)]
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

fn join_pieces(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
