use std::path::Path;

use crate::error::{ClientError, Result};

const DOCUMENT_EXTENSION: &str = "pdf";

/// Validate a question before it is sent
///
/// Returns the trimmed question.
pub fn validate_question(question: &str) -> Result<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ClientError::InvalidRequest(
            "Question cannot be empty".into(),
        ));
    }
    Ok(question)
}

/// Validate a document name and size before upload
pub fn validate_document(file_name: &str, len: u64) -> Result<()> {
    if file_name.trim().is_empty() {
        return Err(ClientError::InvalidRequest(
            "Document name cannot be empty".into(),
        ));
    }

    let is_pdf = Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext == DOCUMENT_EXTENSION);
    if !is_pdf {
        return Err(ClientError::InvalidRequest(format!(
            "Only PDF files are allowed: {}",
            file_name
        )));
    }

    if len == 0 {
        return Err(ClientError::InvalidRequest(format!(
            "Document is empty: {}",
            file_name
        )));
    }

    Ok(())
}
