//! Errors that end an exchange

use crate::attachment::too_large_notice;
use crate::code_index::CodeIndexError;
use crate::llm::LlmError;
use crate::state_machine::FailureKind;
use crate::store::StoreError;
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Why an exchange was dropped. Every variant leaves history untouched.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Attachment download failed: {0}")]
    TransportDownload(#[source] TransportError),
    #[error("Attachment is not readable text")]
    Decode,
    #[error("Completion failed: {0}")]
    CompletionApi(#[source] LlmError),
    #[error("Completion timed out after {0:?}")]
    CompletionTimeout(Duration),
    #[error("Storage failed: {0}")]
    Storage(#[from] StoreError),
    #[error("Attachment is {size} bytes, limit is {limit}")]
    AttachmentTooLarge { size: u64, limit: u64 },
}

impl ExchangeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExchangeError::TransportDownload(_) => FailureKind::TransportDownload,
            ExchangeError::Decode => FailureKind::Decode,
            ExchangeError::CompletionApi(_) | ExchangeError::CompletionTimeout(_) => {
                FailureKind::CompletionApi
            }
            ExchangeError::Storage(_) => FailureKind::Storage,
            ExchangeError::AttachmentTooLarge { .. } => FailureKind::AttachmentTooLarge,
        }
    }

    /// Short text shown to the user in place of a reply
    pub fn user_notice(&self) -> String {
        match self {
            ExchangeError::TransportDownload(_) => "❌ Error downloading the attachment".to_string(),
            ExchangeError::Decode => "❌ Could not read the file as text".to_string(),
            ExchangeError::CompletionApi(_) | ExchangeError::CompletionTimeout(_) => {
                "❌ AI service error. Please try again later.".to_string()
            }
            ExchangeError::Storage(_) => {
                "❌ Storage error: this exchange was not saved to history".to_string()
            }
            ExchangeError::AttachmentTooLarge { limit, .. } => too_large_notice(*limit),
        }
    }
}

/// Why a code block download could not be served
#[derive(Error, Debug)]
pub enum CodeFileError {
    #[error(transparent)]
    NotFound(#[from] CodeIndexError),
    #[error("Upload failed: {0}")]
    Upload(#[from] TransportError),
}
