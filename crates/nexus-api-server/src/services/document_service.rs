use std::sync::Arc;
use tracing::{debug, info};

use crate::database::{Document, Repository};
use crate::utils::error::ApiError;

/// Stores uploaded documents as raw text. Vector indexing is a declared
/// integration point: `vector_id` stays NULL and `is_indexed` false until an
/// indexer exists.
pub struct DocumentService {
    repository: Arc<Repository>,
}

impl DocumentService {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }

    /// Ingest an uploaded file: decode bytes as text (best effort, invalid
    /// sequences dropped), record raw size and type.
    pub async fn ingest(
        &self,
        user_id: i64,
        filename: &str,
        file_data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<Document, ApiError> {
        info!(
            "Ingesting document from user {}: {} ({} bytes)",
            user_id,
            filename,
            file_data.len()
        );

        let content = decode_text(&file_data);
        debug!("Decoded {} characters", content.len());

        let file_type = content_type
            .map(|t| t.to_string())
            .or_else(|| {
                mime_guess::from_path(filename)
                    .first()
                    .map(|m| m.essence_str().to_string())
            });

        let document = self
            .repository
            .create_document(
                user_id,
                filename,
                &content,
                file_type.as_deref(),
                file_data.len() as i32,
            )
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        Ok(document)
    }
}

/// Best-effort UTF-8 decode; invalid byte sequences are dropped while every
/// validly encoded character, U+FFFD included, passes through untouched.
fn decode_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_utf8() {
        assert_eq!(decode_text("hello world".as_bytes()), "hello world");
    }

    #[test]
    fn test_decode_drops_invalid_sequences() {
        let bytes = [b'a', b'b', 0xFF, 0xFE, b'c'];
        assert_eq!(decode_text(&bytes), "abc");
    }

    #[test]
    fn test_decode_keeps_replacement_char_in_valid_input() {
        let text = "ab\u{FFFD}c";
        assert_eq!(decode_text(text.as_bytes()), text);
    }

    #[test]
    fn test_decode_keeps_encoded_replacement_next_to_invalid_bytes() {
        let mut bytes = "ok\u{FFFD}".as_bytes().to_vec();
        bytes.push(0xFF);
        assert_eq!(decode_text(&bytes), "ok\u{FFFD}");
    }

    #[test]
    fn test_decode_resumes_after_invalid_sequence() {
        let bytes = [0xE2, 0x82, b'x', 0xF0, 0x9F, b'y'];
        assert_eq!(decode_text(&bytes), "xy");
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode_text(&[]), "");
    }
}
