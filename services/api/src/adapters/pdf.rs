//! services/api/src/adapters/pdf.rs
//!
//! Extracts the text of an uploaded textbook. Implements the
//! `TextExtractionService` port using `pdf-extract`.

use coursegen_core::ports::{PortError, PortResult, TextExtractionService};

#[derive(Clone, Debug, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractionService for PdfTextExtractor {
    /// Returns the concatenated text of all pages.
    fn extract_text(&self, data: &[u8]) -> PortResult<String> {
        if !data.starts_with(b"%PDF") {
            return Err(PortError::InvalidInput(
                "Uploaded textbook is not a PDF file".to_string(),
            ));
        }
        pdf_extract::extract_text_from_mem(data).map_err(|e| {
            PortError::InvalidInput(format!("Failed to extract text from PDF: {}", e))
        })
    }
}
