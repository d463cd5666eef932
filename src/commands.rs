use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::Result;
use crate::config::Config;
use crate::embeddings::{Embedder, Generator, OllamaClient, TextSplitter};
use crate::index::VectorIndex;
use crate::pdf::load_pdf_pages;
use crate::rag::{QueryResult, RetrievalQa};
use crate::source::{DownloadOutcome, download_pdf_if_needed};

/// What an ingestion run did
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub download: DownloadOutcome,
    pub pages: usize,
    pub chunks: usize,
    pub index_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub question: String,
    pub result: QueryResult,
    /// Wall time from loading the index to receiving the answer
    pub latency: Duration,
}

/// Download the PDF if needed, split it and rebuild the vector index
#[inline]
pub async fn ingest(config: &Config) -> Result<IngestReport> {
    config.validate()?;

    let pdf_path = config.pdf_path();
    let source_url = config.source_url()?;
    let download = download_pdf_if_needed(&pdf_path, &source_url)?;

    let pages = load_pdf_pages(&pdf_path)?;
    let splitter = TextSplitter::new(config.chunking.clone());
    let chunks = splitter.split_pages(&pages);
    info!("Loaded and split {} document chunks.", chunks.len());

    let client = OllamaClient::new(&config.ollama)?;
    let index_dir = config.index_dir();
    VectorIndex::build(&index_dir, &client, &chunks).await?;
    info!("Stored vector index at '{}'.", index_dir.display());

    Ok(IngestReport {
        download,
        pages: pages.len(),
        chunks: chunks.len(),
        index_dir,
    })
}

/// Answer `question` from the index built by [`ingest`]
#[inline]
pub async fn query(
    config: &Config,
    question: &str,
    allow_model_mismatch: bool,
) -> Result<QueryOutcome> {
    config.validate()?;

    let started = Instant::now();

    info!("Loading models...");
    let client = OllamaClient::new(&config.ollama)?;
    debug!(
        "Embedding with {}, generating with {}",
        client.embedding_model(),
        client.generation_model()
    );
    let index = VectorIndex::open(
        &config.index_dir(),
        client.embedding_model(),
        allow_model_mismatch,
    )
    .await?;

    info!("Processing query: {}", question);
    let chain = RetrievalQa::new(&index, &client, &client);
    let result = chain.run(question).await?;

    Ok(QueryOutcome {
        question: question.to_string(),
        result,
        latency: started.elapsed(),
    })
}

#[inline]
pub fn print_ingest_report(report: &IngestReport) {
    print!("{}", format_ingest_report(report));
}

#[inline]
pub fn print_query_outcome(outcome: &QueryOutcome) {
    print!("{}", format_query_outcome(outcome));
}

/// Render the summary printed after `ingest`
#[inline]
pub fn format_ingest_report(report: &IngestReport) -> String {
    let mut out = String::new();
    let _ = match report.download {
        DownloadOutcome::AlreadyPresent => writeln!(out, "PDF: using existing file"),
        DownloadOutcome::Downloaded { bytes } => writeln!(out, "PDF: downloaded {} bytes", bytes),
    };
    let _ = writeln!(out, "Pages: {}", report.pages);
    let _ = writeln!(out, "Chunks: {}", report.chunks);
    let _ = writeln!(out, "Index: {}", report.index_dir.display());
    out
}

/// Render the answer, its sources and the latency as printed by `query`
#[inline]
pub fn format_query_outcome(outcome: &QueryOutcome) -> String {
    // Writing to a String cannot fail
    let mut out = String::new();
    let _ = writeln!(out, "❓ Question: {}", outcome.question);
    let _ = writeln!(out);
    let _ = writeln!(out, "✅ Answer:");
    let _ = writeln!(out, "{}", outcome.result.answer);
    let _ = writeln!(out);
    let _ = writeln!(out, "📄 Sources:");
    for retrieved in &outcome.result.source_documents {
        let _ = writeln!(
            out,
            " - {}",
            source_label(&retrieved.chunk.source, retrieved.chunk.page)
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Latency: {:.2}s", outcome.latency.as_secs_f64());
    out
}

fn source_label(source: &str, page: u32) -> String {
    if source.is_empty() {
        format!("Unknown source (page {})", page)
    } else {
        format!("{} (page {})", source, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::embeddings::DocumentChunk;
    use crate::index::RetrievedChunk;

    fn retrieved(source: &str, page: u32) -> RetrievedChunk {
        RetrievedChunk {
            chunk: DocumentChunk {
                content: "text".to_string(),
                source: source.to_string(),
                page,
                chunk_index: 0,
            },
            distance: 0.5,
        }
    }

    #[test]
    fn query_outcome_rendering() {
        let outcome = QueryOutcome {
            question: "Can I accept gifts?".to_string(),
            result: QueryResult {
                answer: "Only of nominal value.".to_string(),
                source_documents: vec![
                    retrieved("docs/company_policy.pdf", 3),
                    retrieved("", 7),
                ],
            },
            latency: Duration::from_millis(1250),
        };

        assert_eq!(
            format_query_outcome(&outcome),
            "❓ Question: Can I accept gifts?\n\
             \n\
             ✅ Answer:\n\
             Only of nominal value.\n\
             \n\
             📄 Sources:\n\
             \x20- docs/company_policy.pdf (page 3)\n\
             \x20- Unknown source (page 7)\n\
             \n\
             Latency: 1.25s\n"
        );
    }

    #[test]
    fn query_outcome_without_sources() {
        let outcome = QueryOutcome {
            question: "q".to_string(),
            result: QueryResult {
                answer: "I don't know.".to_string(),
                source_documents: Vec::new(),
            },
            latency: Duration::from_secs(2),
        };

        let rendered = format_query_outcome(&outcome);
        assert!(rendered.contains("📄 Sources:\n\nLatency: 2.00s\n"));
    }

    #[test]
    fn ingest_report_rendering() {
        let report = IngestReport {
            download: DownloadOutcome::Downloaded { bytes: 2048 },
            pages: 12,
            chunks: 40,
            index_dir: PathBuf::from("vector_index"),
        };
        assert_eq!(
            format_ingest_report(&report),
            "PDF: downloaded 2048 bytes\nPages: 12\nChunks: 40\nIndex: vector_index\n"
        );

        let cached = IngestReport {
            download: DownloadOutcome::AlreadyPresent,
            ..report
        };
        assert!(format_ingest_report(&cached).starts_with("PDF: using existing file\n"));
    }

    #[test]
    fn source_labels() {
        assert_eq!(
            source_label("docs/company_policy.pdf", 4),
            "docs/company_policy.pdf (page 4)"
        );
        assert_eq!(source_label("", 0), "Unknown source (page 0)");
    }
}
