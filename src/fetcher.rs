//! Blob content fetching and decoding.
//!
//! Retrieves a blob from the [`RemoteSource`] and turns its transport
//! encoding into text. No retries: a failed fetch is returned to the caller,
//! which aborts the run.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{PipelineError, Result};
use crate::remote::{EncodedBlob, RemoteSource};

/// Fetch a blob and decode it to text.
pub async fn fetch_content(remote: &dyn RemoteSource, blob_id: &str) -> Result<String> {
    let blob = remote.fetch_blob(blob_id).await?;
    decode_blob(blob_id, &blob)
}

/// Decode a blob's transport encoding into UTF-8 text.
///
/// Base64 payloads may contain line breaks (GitHub wraps at 60 columns);
/// all ASCII whitespace is ignored before decoding.
pub fn decode_blob(blob_id: &str, blob: &EncodedBlob) -> Result<String> {
    let bytes = match blob.encoding.as_str() {
        "base64" => {
            let compact: String = blob
                .content
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| PipelineError::decode(blob_id, format!("invalid base64: {}", e)))?
        }
        "utf-8" | "utf8" => return Ok(blob.content.clone()),
        other => {
            return Err(PipelineError::decode(
                blob_id,
                format!("unsupported encoding '{}'", other),
            ))
        }
    };

    String::from_utf8(bytes)
        .map_err(|e| PipelineError::decode(blob_id, format!("content is not UTF-8: {}", e)))
}
