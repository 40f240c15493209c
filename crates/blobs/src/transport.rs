//! HTTP transport seam.
//!
//! The resolver and client only ever talk to the network through
//! [`Transport`], which keeps resolution testable without a server and lets
//! callers layer their own policies (retries, proxies) underneath.

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use reqwest::Client;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    fn from_reqwest(err: reqwest::Error, timeout: Option<Duration>) -> Self {
        match timeout {
            Some(timeout) if err.is_timeout() => TransportError::Timeout(timeout),
            _ => TransportError::Http(err),
        }
    }
}

/// A fully resolved HTTP request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Deadline for the whole exchange, if any.
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }
}

/// A buffered HTTP response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[async_trait::async_trait]
pub trait Transport: std::fmt::Debug + Send + Sync {
    async fn execute(&self, request: TransportRequest)
        -> Result<TransportResponse, TransportError>;
}

/// Default transport on top of a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("netlify-blobs-rs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let timeout = request.timeout;
        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, timeout))?;

        let status = response.status();
        let headers = response.headers().clone();
        // the deadline also covers reading the body
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(e, timeout))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
