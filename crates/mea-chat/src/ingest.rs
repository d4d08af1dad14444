//! Adding documents to the knowledge base.
//!
//! Both calls report their outcome in the transcript and return it, so an
//! adapter can also react directly (close a form, clear a file picker).

use mea_core::{ClientError, Message};
use mea_transport::BackendClient;
use mea_transport::http::IngestAck;
use tracing::{info, warn};

use crate::transcript::Transcript;

const UNTITLED: &str = "Untitled Document";
const EMPTY_TEXT: &str = "Please enter some text content.";
const NOT_A_PDF: &str = "Please select a PDF file.";
const TEXT_FAILED: &str = "Failed to add document";
const PDF_FAILED: &str = "Failed to upload PDF";

/// Submits text and PDF documents for background indexing.
#[derive(Clone, Debug)]
pub struct Ingestor {
    backend: BackendClient,
    transcript: Transcript,
}

impl Ingestor {
    /// Ingestor posting through `backend` and reporting into `transcript`.
    pub fn new(backend: BackendClient, transcript: Transcript) -> Self {
        Self {
            backend,
            transcript,
        }
    }

    /// Add a plain-text document. A blank title becomes "Untitled Document";
    /// blank text is rejected without a request.
    pub async fn submit_text(&self, title: &str, text: &str) -> Result<(), ClientError> {
        let title = match title.trim() {
            "" => UNTITLED,
            t => t,
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(self.report(ClientError::Validation(EMPTY_TEXT.into())));
        }

        let outcome = self.backend.add_text(title, text).await;
        match accepted(outcome, TEXT_FAILED) {
            Ok(()) => {
                info!(%title, chars = text.len(), "text document queued");
                let _ = self.transcript.append(Message::system(format!(
                    "Successfully added document: \"{title}\". Processing in background..."
                )));
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// Upload a PDF. `file_name` must end in `.pdf` (any case); the title is
    /// the name without that suffix.
    pub async fn submit_pdf(&self, file_name: &str, bytes: Vec<u8>) -> Result<(), ClientError> {
        let Some(title) = pdf_title(file_name) else {
            return Err(self.report(ClientError::Validation(NOT_A_PDF.into())));
        };

        let size = bytes.len();
        let outcome = self.backend.add_pdf(file_name, title, bytes).await;
        match accepted(outcome, PDF_FAILED) {
            Ok(()) => {
                info!(%file_name, bytes = size, "pdf queued");
                let _ = self.transcript.append(Message::system(format!(
                    "Successfully uploaded PDF: \"{file_name}\". Processing in background..."
                )));
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    fn report(&self, err: ClientError) -> ClientError {
        warn!(error = %err, category = %err.category(), "document ingestion failed");
        let _ = self.transcript.append(Message::error(err.user_message()));
        err
    }
}

/// Title for a PDF upload, or `None` when the name has no `.pdf` suffix.
pub fn pdf_title(file_name: &str) -> Option<&str> {
    let split = file_name.len().checked_sub(4)?;
    let (stem, ext) = (file_name.get(..split)?, file_name.get(split..)?);
    ext.eq_ignore_ascii_case(".pdf").then_some(stem)
}

fn accepted(outcome: Result<IngestAck, ClientError>, fallback: &str) -> Result<(), ClientError> {
    let ack = outcome?;
    if ack.ok {
        return Ok(());
    }
    let message = ack
        .error
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    Err(ClientError::Backend(message))
}
