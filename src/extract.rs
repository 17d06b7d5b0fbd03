//! Text extraction for uploaded evidence and dossier files.
//!
//! The pipeline only ever sees plain text. PDFs go through `pdf-extract`;
//! plain-text files are decoded lossily. A file whose text cannot be
//! recovered yields empty text, never an error, so a damaged upload still
//! becomes a Document node.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::warn;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

#[derive(Debug)]
pub enum ExtractError {
    UnsupportedContentType(String),
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedContentType(ct) => {
                write!(f, "unsupported content-type: {}", ct)
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracts plain text from file content.
pub fn extract_text(bytes: &[u8], content_type: &str) -> Result<String, ExtractError> {
    match content_type {
        MIME_PDF => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
        }
        MIME_TEXT => Ok(String::from_utf8_lossy(bytes).into_owned()),
        _ => Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        )),
    }
}

/// Content type by file extension, `None` for anything the pipeline skips.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MIME_PDF),
        "txt" => Some(MIME_TEXT),
        _ => None,
    }
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One file read from disk, reduced to text.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: &'static str,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub content_hash: String,
}

pub fn read_document(path: &Path) -> Result<LoadedDocument> {
    let content_type = content_type_for(path)
        .with_context(|| format!("Unsupported file type: {}", path.display()))?;
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let text = match extract_text(&bytes, content_type) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "no text recovered");
            String::new()
        }
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(LoadedDocument {
        path: path.to_path_buf(),
        file_name,
        content_type,
        content_hash: sha256_hex(&text),
        text,
    })
}
