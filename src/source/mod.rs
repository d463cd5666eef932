// PDF acquisition
// Downloads the source PDF once and reuses the local copy afterwards


use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use url::Url;

use crate::RagError;

/// Largest PDF body accepted from the network
const MAX_PDF_BYTES: u64 = 256 * 1024 * 1024;
const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was already on disk and no request was made
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

/// Make sure a PDF exists at `pdf_path`, fetching it from `url` if it does not
///
/// Nothing is written to `pdf_path` unless the server answered 200 with a PDF
/// content type.
#[inline]
pub fn download_pdf_if_needed(pdf_path: &Path, url: &Url) -> Result<DownloadOutcome, RagError> {
    if let Some(parent) = pdf_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    if pdf_path.exists() {
        info!(
            "PDF already exists at {}. Skipping download.",
            pdf_path.display()
        );
        return Ok(DownloadOutcome::AlreadyPresent);
    }

    info!("PDF not found. Downloading from {}", url);

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .into();

    let mut response = agent
        .get(url.as_str())
        .call()
        .map_err(|e| RagError::Download(format!("Request to {} failed: {}", url, e)))?;

    let status = response.status().as_u16();
    if status != 200 {
        warn!("Download of {} returned HTTP {}", url, status);
        return Err(RagError::Download(format!(
            "Failed to download a valid PDF file: HTTP {} from {}",
            status, url
        )));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.contains(PDF_CONTENT_TYPE) {
        warn!("Download of {} returned content type {:?}", url, content_type);
        return Err(RagError::Download(format!(
            "Failed to download a valid PDF file: content type '{}' from {}",
            content_type, url
        )));
    }

    let body = response
        .body_mut()
        .with_config()
        .limit(MAX_PDF_BYTES)
        .read_to_vec()
        .map_err(|e| RagError::Download(format!("Failed to read PDF body from {}: {}", url, e)))?;

    // Write next to the target first so an interrupted write never looks cached
    let partial_path = partial_path_for(pdf_path);
    fs::write(&partial_path, &body)?;
    fs::rename(&partial_path, pdf_path)?;

    let bytes = body.len() as u64;
    debug!("Wrote {} bytes to {}", bytes, pdf_path.display());
    info!("Download complete.");

    Ok(DownloadOutcome::Downloaded { bytes })
}

fn partial_path_for(pdf_path: &Path) -> PathBuf {
    let mut name = pdf_path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    pdf_path.with_file_name(name)
}
