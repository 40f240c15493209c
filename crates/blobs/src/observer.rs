use std::sync::Arc;

use parking_lot::Mutex;

use crate::transport::{TransportRequest, TransportResponse};

/// Which leg of an operation an exchange belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Signed-URL request against the central API.
    Signing,
    /// The request carrying (or fetching) the blob itself.
    Transfer,
}

/// Receives every request/response pair the client sends.
///
/// Observers are handed to the client explicitly; nothing is recorded
/// unless the caller asks for it.
pub trait RequestObserver: std::fmt::Debug + Send + Sync {
    fn observe(&self, kind: ExchangeKind, request: &TransportRequest, response: &TransportResponse);
}

/// A recorded exchange. Bodies are not kept.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub kind: ExchangeKind,
    pub method: http::Method,
    pub url: url::Url,
    pub status: http::StatusCode,
}

/// Observer that keeps every exchange in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    exchanges: Arc<Mutex<Vec<Exchange>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the exchanges seen so far.
    pub fn exchanges(&self) -> Vec<Exchange> {
        self.exchanges.lock().clone()
    }
}

impl RequestObserver for RecordingObserver {
    fn observe(&self, kind: ExchangeKind, request: &TransportRequest, response: &TransportResponse) {
        self.exchanges.lock().push(Exchange {
            kind,
            method: request.method.clone(),
            url: request.url.clone(),
            status: response.status,
        });
    }
}
