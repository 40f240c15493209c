use std::collections::VecDeque;
use std::sync::Arc;

use http::StatusCode;
use parking_lot::Mutex;

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

/// In-memory transport: records requests and replays queued outcomes.
///
/// Runs out of queued outcomes → answers 404.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    requests: Arc<Mutex<Vec<TransportRequest>>>,
    outcomes: Arc<Mutex<VecDeque<Result<TransportResponse, String>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: TransportResponse) {
        self.outcomes.lock().push_back(Ok(response));
    }

    pub fn push_status(&self, status: StatusCode) {
        self.push_response(TransportResponse::new(status));
    }

    pub fn push_error(&self, message: &str) {
        self.outcomes.lock().push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(request);
        match self.outcomes.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(TransportError::Other(message)),
            None => Ok(TransportResponse::new(StatusCode::NOT_FOUND)),
        }
    }
}
