//! Inputs handed over by the function runtime.
//!
//! The runtime passes a base64 encoded JSON blob describing the blobs
//! endpoints, and the inbound request carries the site and deploy ids as
//! headers. Both are decoded here and nowhere else.

use base64::Engine;
use http::HeaderMap;
use serde::{Deserialize, Serialize};

pub const SITE_ID_HEADER: &str = "x-nf-site-id";
pub const DEPLOY_ID_HEADER: &str = "x-nf-deploy-id";

/// Environment variable some runtimes use to pass the encoded context.
pub const BLOBS_CONTEXT_ENV: &str = "NETLIFY_BLOBS_CONTEXT";

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("blobs context is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("blobs context is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decoded blobs context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventContext {
    #[serde(default)]
    pub token: Option<String>,
    /// Edge endpoint.
    #[serde(default)]
    pub url: Option<String>,
    /// Edge endpoint bypassing the cache, used for strong consistency.
    #[serde(default)]
    pub url_uncached: Option<String>,
    #[serde(default)]
    pub primary_region: Option<String>,
}

impl EventContext {
    /// Decode the context from its base64 form.
    pub fn decode(encoded: &str) -> Result<Self, ContextError> {
        let json = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        Ok(serde_json::from_slice(&json)?)
    }

    pub fn encode(&self) -> Result<String, ContextError> {
        let json = serde_json::to_vec(self)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }
}

/// Site and deploy ids of the caller, read from inbound request headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerIdentity {
    pub site_id: Option<String>,
    pub deploy_id: Option<String>,
}

impl CallerIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            site_id: read(SITE_ID_HEADER),
            deploy_id: read(DEPLOY_ID_HEADER),
        }
    }
}
