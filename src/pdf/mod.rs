// PDF loading
// Extracts text page by page so chunks can point back to their page


use std::path::Path;

use lopdf::Document;
use tracing::{debug, info, warn};

use crate::RagError;

/// Text of a single PDF page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPage {
    /// Path of the PDF the page belongs to
    pub source: String,
    /// Zero-based page number
    pub page: u32,
    pub text: String,
}

/// Load every page of the PDF at `path` in page order
///
/// Pages whose text cannot be decoded are kept with empty text so page
/// numbers stay aligned with the document.
#[inline]
pub fn load_pdf_pages(path: &Path) -> Result<Vec<PdfPage>, RagError> {
    debug!("Loading PDF from {}", path.display());

    let document = Document::load(path)
        .map_err(|e| RagError::Pdf(format!("Failed to parse {}: {}", path.display(), e)))?;

    let source = path.display().to_string();
    let page_numbers: Vec<u32> = document.get_pages().into_keys().collect();
    let mut pages = Vec::with_capacity(page_numbers.len());

    for page_number in page_numbers {
        let text = match document.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Failed to extract text from page {} of {}: {}",
                    page_number,
                    path.display(),
                    e
                );
                String::new()
            }
        };

        pages.push(PdfPage {
            source: source.clone(),
            page: page_number.saturating_sub(1),
            text,
        });
    }

    info!("Loaded {} pages from {}", pages.len(), path.display());
    Ok(pages)
}
