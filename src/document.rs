//! Local documents converted to markdown-like text for the model.
//!
//! PDFs go through pdfium (feature `pdf`); the conversion runs on the blocking
//! pool because pdfium is synchronous and CPU-bound. Markdown and plain text
//! files are read as they are.

use std::path::Path;
use tracing::{debug, info};

use crate::ExtractError;

/// Separates pages in the converted text.
pub const PAGE_BREAK: &str = "\n\n-----\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => Ok(DocumentKind::Pdf),
            Some("md") | Some("markdown") | Some("txt") => Ok(DocumentKind::Text),
            _ => Err(ExtractError::UnsupportedDocument(path.display().to_string())),
        }
    }
}

pub async fn load_document(path: impl AsRef<Path>) -> Result<String, ExtractError> {
    let path = path.as_ref();
    let kind = DocumentKind::from_path(path)?;
    debug!(path = %path.display(), kind = ?kind, "Loading document");

    match kind {
        DocumentKind::Text => tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ExtractError::Io {
                path: path.to_path_buf(),
                source,
            }),
        DocumentKind::Pdf => {
            let owned = path.to_path_buf();
            let pages = tokio::task::spawn_blocking(move || pdf::extract_pages(&owned))
                .await
                .map_err(|e| ExtractError::DocumentError(format!("PDF task panicked: {}", e)))??;
            info!(path = %path.display(), pages = pages.len(), "Converted PDF to text");
            Ok(pages_to_markdown(&pages))
        }
    }
}

/// Joins per-page text, trimming trailing whitespace from each line and
/// dropping blank pages.
pub fn pages_to_markdown(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| {
            page.lines()
                .map(str::trim_end)
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string()
        })
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_BREAK)
}

#[cfg(feature = "pdf")]
mod pdf {
    use super::ExtractError;
    use pdfium_render::prelude::*;
    use std::path::Path;

    fn bind() -> Result<Pdfium, ExtractError> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| ExtractError::DocumentError(format!("pdfium unavailable: {:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }

    pub(super) fn extract_pages(path: &Path) -> Result<Vec<String>, ExtractError> {
        let pdfium = bind()?;
        let document = pdfium.load_pdf_from_file(path, None).map_err(|e| {
            ExtractError::DocumentError(format!("{}: {:?}", path.display(), e))
        })?;

        let mut pages = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let text = page.text().map_err(|e| {
                ExtractError::DocumentError(format!("page {}: {:?}", index + 1, e))
            })?;
            pages.push(text.all());
        }
        Ok(pages)
    }
}

#[cfg(not(feature = "pdf"))]
mod pdf {
    use super::ExtractError;
    use std::path::Path;

    pub(super) fn extract_pages(path: &Path) -> Result<Vec<String>, ExtractError> {
        Err(ExtractError::UnsupportedDocument(format!(
            "{} (rebuild with the `pdf` feature)",
            path.display()
        )))
    }
}
