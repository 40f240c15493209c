use http::{HeaderMap, StatusCode};

use crate::metadata::MetadataError;
use crate::transport::TransportError;
use crate::validation::ValidationError;

/// Header carrying the upstream's error detail on a failed API call.
pub const NF_ERROR_HEADER: &str = "nf-error";
/// Header carrying the upstream request id on a failed API call.
pub const NF_REQUEST_ID_HEADER: &str = "nf-request-id";

pub type Result<T, E = BlobsError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum BlobsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(
        "Netlify Blobs has failed to perform a read using strong consistency because the \
         environment has not been configured with a 'uncachedEdgeURL' property"
    )]
    ConsistencyConfiguration,
    #[error(
        "The environment has not been configured to use Netlify Blobs. To use it manually, \
         supply the following properties when creating a store: {0}"
    )]
    MissingEnvironment(String),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("url cannot be used as a base: {0}")]
    CannotBeABase(String),
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
    #[error(transparent)]
    BlobsInternal(#[from] BlobsInternalError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BlobsError {
    /// True for errors raised before any network access.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BlobsError::Validation(_)
                | BlobsError::ConsistencyConfiguration
                | BlobsError::MissingEnvironment(_)
                | BlobsError::InvalidUrl(_)
                | BlobsError::CannotBeABase(_)
                | BlobsError::InvalidHeader(_)
        )
    }
}

/// A remote call (signing exchange or store operation) that failed or
/// returned an unexpected status.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Netlify Blobs has generated an internal error ({details})")]
pub struct BlobsInternalError {
    pub status: Option<StatusCode>,
    pub request_id: Option<String>,
    details: String,
}

impl BlobsInternalError {
    /// Build from a response status and headers.
    ///
    /// The upstream `NF-Error` header wins over the bare status code, and the
    /// `NF-Request-ID` header is appended when present.
    pub fn from_response(status: StatusCode, headers: &HeaderMap) -> Self {
        let mut details = header_str(headers, NF_ERROR_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} status code", status.as_u16()));
        let request_id = header_str(headers, NF_REQUEST_ID_HEADER).map(str::to_string);
        if let Some(id) = &request_id {
            details.push_str(&format!(", ID: {id}"));
        }

        Self {
            status: Some(status),
            request_id,
            details,
        }
    }

    /// Build from a transport failure, where no response was received.
    pub fn from_transport(err: &TransportError) -> Self {
        Self {
            status: None,
            request_id: None,
            details: err.to_string(),
        }
    }

    pub fn details(&self) -> &str {
        &self.details
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
