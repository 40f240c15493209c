//! Blob metadata header codec.
//!
//! Metadata travels as `b64;` followed by the standard base64 encoding of
//! the JSON object. The prefix lets the receiving side tell encoded payloads
//! apart from anything else that might land in the header.

use base64::Engine;
use serde_json::{Map, Value};

/// Arbitrary JSON object attached to a blob.
pub type Metadata = Map<String, Value>;

/// Header name used against the edge endpoint and on signed-URL transfers.
pub const METADATA_HEADER_INTERNAL: &str = "x-amz-meta-user";
/// Header name used against the central API.
pub const METADATA_HEADER_EXTERNAL: &str = "netlify-blobs-metadata";

pub const BASE64_PREFIX: &str = "b64;";

/// Maximum size of the encoded header value in bytes.
pub const METADATA_MAX_SIZE: usize = 2 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Metadata object exceeds the maximum size")]
    TooLarge,
    #[error("metadata header is missing the `{BASE64_PREFIX}` prefix")]
    MissingPrefix,
    #[error("metadata header is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("metadata header is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a metadata map into its header value.
///
/// Returns `None` for an empty map, nothing needs to be sent then.
pub fn encode(metadata: &Metadata) -> Result<Option<String>, MetadataError> {
    if metadata.is_empty() {
        return Ok(None);
    }

    let json = serde_json::to_vec(metadata)?;
    let payload = format!(
        "{BASE64_PREFIX}{}",
        base64::engine::general_purpose::STANDARD.encode(json)
    );

    if payload.len() > METADATA_MAX_SIZE {
        return Err(MetadataError::TooLarge);
    }

    Ok(Some(payload))
}

/// Decode a header value produced by [`encode`].
pub fn decode(header: &str) -> Result<Metadata, MetadataError> {
    let encoded = header
        .strip_prefix(BASE64_PREFIX)
        .ok_or(MetadataError::MissingPrefix)?;
    let json = base64::engine::general_purpose::STANDARD.decode(encoded)?;
    Ok(serde_json::from_slice(&json)?)
}
