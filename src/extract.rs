//! Text extraction from source documents.
//!
//! Extraction is the pluggable front half of every request: the dispatcher
//! never reads document bytes itself, it asks an [`Extractor`]. The PDF
//! implementation uses the pure-Rust `pdf-extract` crate; the plain-text
//! implementation covers stages whose inputs are already `.txt` files.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while turning a source file into text. Always handled as
/// per-item failures by the dispatcher, never batch-fatal.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to extract text from {path}: {source}")]
    Pdf {
        path: PathBuf,
        source: pdf_extract::OutputError,
    },

    #[error("no extractable text in {0}")]
    Empty(PathBuf),
}

/// Turns a source file into the text sent to the backend.
pub trait Extractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// PDF text extraction, all pages concatenated.
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::NotFound(path.to_path_buf()));
        }

        let text = pdf_extract::extract_text(path).map_err(|source| ExtractError::Pdf {
            path: path.to_path_buf(),
            source,
        })?;

        if text.trim().is_empty() {
            return Err(ExtractError::Empty(path.to_path_buf()));
        }

        Ok(text)
    }
}

/// UTF-8 file read for inputs that are already text.
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::NotFound(path.to_path_buf()));
        }

        std::fs::read_to_string(path).map_err(|source| ExtractError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn plain_text_reads_file_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.txt");
        fs::write(&path, "five sentences of summary").unwrap();

        let text = PlainTextExtractor.extract(&path).unwrap();
        assert_eq!(text, "five sentences of summary");
    }

    #[test]
    fn plain_text_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = PlainTextExtractor
            .extract(&dir.path().join("absent.txt"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn pdf_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = PdfExtractor
            .extract(&dir.path().join("absent.pdf"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(_)));
    }

    #[test]
    fn pdf_garbage_bytes_fail_extraction() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.pdf");
        fs::write(&path, b"this is not a pdf at all").unwrap();

        let err = PdfExtractor.extract(&path).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Pdf { .. } | ExtractError::Empty(_)
        ));
    }
}
