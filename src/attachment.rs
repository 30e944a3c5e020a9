//! Turning uploaded attachments into completion prompts

use encoding_rs::WINDOWS_1251;
use thiserror::Error;

/// Documents larger than this are refused before download
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 20 * 1024 * 1024;

pub const DEFAULT_DOCUMENT_PROMPT: &str = "What is in this file?";
pub const DEFAULT_PHOTO_PROMPT: &str = "What is in this picture?";

/// Marker appended to persisted image turns; image bytes are never stored
pub const IMAGE_MARKER: &str = "[image]";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachmentError {
    #[error("Attachment is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
    #[error("Attachment is not text")]
    Binary,
}

/// Reject a declared size above `limit`
pub fn check_size(size: u64, limit: u64) -> Result<(), AttachmentError> {
    if size > limit {
        Err(AttachmentError::TooLarge { size, limit })
    } else {
        Ok(())
    }
}

/// User-facing rejection for an oversized document
pub fn too_large_notice(limit: u64) -> String {
    format!("❌ File is too large! Maximum {} MB.", limit / (1024 * 1024))
}

/// Decode file bytes as UTF-8, then Windows-1251, then Latin-1.
///
/// Latin-1 maps every byte, so the chain only fails for data that contains
/// NUL bytes, which no supported text encoding produces in practice.
pub fn decode_text(bytes: &[u8]) -> Result<String, AttachmentError> {
    if bytes.contains(&0) {
        return Err(AttachmentError::Binary);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }
    if let Some(text) = WINDOWS_1251.decode_without_bom_handling_and_without_replacement(bytes) {
        return Ok(text.into_owned());
    }
    Ok(bytes.iter().copied().map(char::from).collect())
}

/// Prompt for a text document: caption, file name, then the fenced content
pub fn document_prompt(caption: Option<&str>, file_name: &str, content: &str) -> String {
    let caption = non_empty(caption).unwrap_or(DEFAULT_DOCUMENT_PROMPT);
    format!("{caption}\n\nFile: {file_name}\n\n```\n{content}\n```")
}

/// Prompt text accompanying a photo
pub fn photo_prompt(caption: Option<&str>) -> &str {
    non_empty(caption).unwrap_or(DEFAULT_PHOTO_PROMPT)
}

/// Persisted form of an image turn
pub fn image_turn_text(prompt: &str) -> String {
    format!("{prompt} {IMAGE_MARKER}")
}

fn non_empty(caption: Option<&str>) -> Option<&str> {
    caption.filter(|c| !c.trim().is_empty())
}
