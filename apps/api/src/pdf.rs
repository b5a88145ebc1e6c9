use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::AppError;

const UNREADABLE: &str = "The file could not be read as a PDF";
const NO_TEXT: &str = "No readable text found in the PDF. Scanned images are not supported.";

/// Turns an uploaded document into plain text for analysis.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, bytes: Bytes) -> Result<String, AppError>;
}

/// `pdf-extract` on a blocking thread. A panic inside the parser is reported
/// like any other unreadable file.
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, bytes: Bytes) -> Result<String, AppError> {
        let size = bytes.len();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| {
                warn!("PDF extraction task failed: {e}");
                AppError::Validation(UNREADABLE.to_string())
            })?
            .map_err(|e| {
                warn!("PDF extraction failed: {e}");
                AppError::Validation(UNREADABLE.to_string())
            })?;

        let text = non_empty(text)?;
        debug!("Extracted {} chars from a {size}-byte PDF", text.len());
        Ok(text)
    }
}

fn non_empty(text: String) -> Result<String, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::Validation(NO_TEXT.to_string()));
    }
    Ok(text.to_string())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Treats the upload as UTF-8 text.
    pub struct PlainTextExtractor;

    #[async_trait]
    impl TextExtractor for PlainTextExtractor {
        async fn extract_text(&self, bytes: Bytes) -> Result<String, AppError> {
            non_empty(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}
