use std::sync::Arc;

use bytes::Bytes;
use http::header::{CACHE_CONTROL, IF_NONE_MATCH};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::{BlobsError, BlobsInternalError, Result};
use crate::observer::{ExchangeKind, RequestObserver};
use crate::operation::{Method, StoreOperation};
use crate::resolver::{ResolvedRequest, Resolver};
use crate::store::Store;
use crate::transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};
use crate::validation::{self, DEPLOY_STORE_PREFIX};

/// Cache policy applied to every write.
pub const PUT_CACHE_CONTROL: &str = "max-age=0, stale-while-revalidate=60";

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    observer: Option<Arc<dyn RequestObserver>>,
}

/// Blobs client. Cheap to clone; clones share configuration and transport.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.inner.config)
            .field("transport", &self.inner.transport)
            .field("observed", &self.inner.observer.is_some())
            .finish()
    }
}

impl Client {
    /// Create a client using the default `reqwest` transport.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                observer: None,
            }),
        }
    }

    /// Return a client reporting every exchange to `observer`.
    pub fn with_observer(&self, observer: Arc<dyn RequestObserver>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config: self.inner.config.clone(),
                transport: self.inner.transport.clone(),
                observer: Some(observer),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Handle on a regular store.
    pub fn store(&self, name: &str) -> Result<Store> {
        validation::validate_user_store_name(name)?;
        Ok(Store::new(self.clone(), name.to_string()))
    }

    /// Handle on the store scoped to a single deploy.
    pub fn deploy_store(&self, deploy_id: &str) -> Result<Store> {
        if deploy_id.is_empty() {
            return Err(BlobsError::MissingEnvironment("deployID".to_string()));
        }
        let name = format!("{DEPLOY_STORE_PREFIX}{deploy_id}");
        validation::validate_store_name(&name)?;
        Ok(Store::new(self.clone(), name))
    }

    /// Resolve an operation without sending the final request.
    pub async fn resolve(&self, operation: &StoreOperation) -> Result<ResolvedRequest> {
        self.resolver().resolve(operation).await
    }

    /// Resolve an operation and send the final request.
    ///
    /// The response is returned whatever its status; interpreting it is up to
    /// the caller. Only transport failures surface as errors here.
    #[tracing::instrument(
        skip(self, operation, body, extra_headers),
        fields(method = %operation.method, store = ?operation.store_name, key = ?operation.key)
    )]
    pub async fn make_request(
        &self,
        operation: &StoreOperation,
        body: Option<Bytes>,
        extra_headers: HeaderMap,
    ) -> Result<TransportResponse> {
        let resolved = self.resolve(operation).await?;

        let mut headers = resolved.headers;
        headers.extend(extra_headers);
        if let Some(etag) = &operation.if_none_match {
            let value = HeaderValue::from_str(etag)
                .map_err(|_| BlobsError::InvalidHeader("if-none-match"))?;
            headers.insert(IF_NONE_MATCH, value);
        }
        if operation.method == Method::Put {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static(PUT_CACHE_CONTROL));
        }

        let mut request = TransportRequest::new(operation.method.as_http(), resolved.url);
        request.headers = headers;
        request.timeout = self.inner.config.request_timeout();
        if resolved.forward_body {
            request.body = Some(body.unwrap_or_default());
        }

        let response = self.inner.transport.execute(request.clone()).await?;
        tracing::debug!(route = %resolved.route, status = %response.status, "blobs request completed");

        if let Some(observer) = &self.inner.observer {
            observer.observe(ExchangeKind::Transfer, &request, &response);
        }

        Ok(response)
    }

    /// List the stores of the configured site. Returns a single page.
    pub async fn list_stores(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut operation = StoreOperation::new(Method::List);
        if let Some(prefix) = prefix {
            operation = operation.parameter("prefix", prefix);
        }

        let response = self.make_request(&operation, None, HeaderMap::new()).await?;
        let body: ListStoresResponse = parse_json(response)?;
        Ok(body.stores)
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.inner.config, self.inner.transport.as_ref())
            .with_observer(self.inner.observer.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ListStoresResponse {
    #[serde(default)]
    stores: Vec<String>,
}

/// Require a 200 and decode the body as JSON.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(response: TransportResponse) -> Result<T> {
    expect_status(&response, &[StatusCode::OK])?;
    Ok(serde_json::from_slice(&response.body)?)
}

pub(crate) fn expect_status(response: &TransportResponse, allowed: &[StatusCode]) -> Result<()> {
    if allowed.contains(&response.status) {
        return Ok(());
    }
    Err(BlobsInternalError::from_response(response.status, &response.headers).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::RecordingObserver;
    use crate::resolver::SIGNED_URL_ACCEPT;
    use crate::testing::MockTransport;
    use http::header::ACCEPT;
    use serde_json::json;

    fn api_client(transport: &MockTransport) -> Client {
        let config = ClientConfig::builder()
            .site_id("site-1")
            .token("t")
            .build()
            .unwrap();
        Client::with_transport(config, Arc::new(transport.clone()))
    }

    fn signed(url: &str) -> TransportResponse {
        let mut response = TransportResponse::new(StatusCode::OK);
        response.body = serde_json::to_vec(&json!({ "url": url })).unwrap().into();
        response
    }

    #[tokio::test]
    async fn test_put_sets_cache_control_and_forwards_body() {
        let transport = MockTransport::new();
        transport.push_response(signed("https://signed.example/put"));
        transport.push_status(StatusCode::OK);
        let client = api_client(&transport);

        let response = client
            .make_request(
                &StoreOperation::put("construction", "nails"),
                Some(Bytes::from_static(b"steel")),
                HeaderMap::new(),
            )
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].headers[ACCEPT], SIGNED_URL_ACCEPT);
        assert!(requests[0].body.is_none());
        assert!(requests[0].headers.get(CACHE_CONTROL).is_none());

        let transfer = &requests[1];
        assert_eq!(transfer.method, http::Method::PUT);
        assert_eq!(transfer.url.as_str(), "https://signed.example/put");
        assert_eq!(transfer.headers[CACHE_CONTROL], PUT_CACHE_CONTROL);
        assert_eq!(transfer.body.as_deref(), Some(&b"steel"[..]));
    }

    #[tokio::test]
    async fn test_edge_put_sets_cache_control() {
        let transport = MockTransport::new();
        transport.push_status(StatusCode::OK);
        let config = ClientConfig::builder()
            .edge_url("https://edge.example")
            .token("t")
            .build()
            .unwrap();
        let client = Client::with_transport(config, Arc::new(transport.clone()));

        client
            .make_request(&StoreOperation::put("s", "k"), None, HeaderMap::new())
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].headers[CACHE_CONTROL], PUT_CACHE_CONTROL);
        assert_eq!(requests[0].body.as_deref(), Some(&b""[..]));
    }

    #[tokio::test]
    async fn test_get_drops_body_and_sends_condition() {
        let transport = MockTransport::new();
        transport.push_response(signed("https://signed.example/get"));
        transport.push_status(StatusCode::NOT_MODIFIED);
        let client = api_client(&transport);

        let operation = StoreOperation::get("s", "k").if_none_match("\"abc\"");
        let response = client
            .make_request(&operation, Some(Bytes::from_static(b"ignored")), HeaderMap::new())
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::NOT_MODIFIED);

        let transfer = &transport.requests()[1];
        assert!(transfer.body.is_none());
        assert_eq!(transfer.headers[IF_NONE_MATCH], "\"abc\"");
        assert!(transfer.headers.get(CACHE_CONTROL).is_none());
    }

    #[tokio::test]
    async fn test_transfer_transport_error_is_surfaced_unchanged() {
        let transport = MockTransport::new();
        transport.push_response(signed("https://signed.example/get"));
        transport.push_error("socket closed");
        let client = api_client(&transport);

        let err = client
            .make_request(&StoreOperation::get("s", "k"), None, HeaderMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BlobsError::Transport(_)));
    }

    #[tokio::test]
    async fn test_observer_sees_both_legs() {
        let transport = MockTransport::new();
        transport.push_response(signed("https://signed.example/get"));
        transport.push_status(StatusCode::OK);
        let observer = RecordingObserver::new();
        let client = api_client(&transport).with_observer(Arc::new(observer.clone()));

        client
            .make_request(&StoreOperation::get("s", "k"), None, HeaderMap::new())
            .await
            .unwrap();

        let exchanges = observer.exchanges();
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[0].kind, ExchangeKind::Signing);
        assert_eq!(exchanges[1].kind, ExchangeKind::Transfer);
        assert_eq!(exchanges[1].url.as_str(), "https://signed.example/get");
    }

    #[tokio::test]
    async fn test_list_stores() {
        let transport = MockTransport::new();
        let mut response = TransportResponse::new(StatusCode::OK);
        response.body = serde_json::to_vec(&json!({ "stores": ["construction", "deploy:abc"] }))
            .unwrap()
            .into();
        transport.push_response(response);
        let client = api_client(&transport);

        let stores = client.list_stores(Some("con")).await.unwrap();
        assert_eq!(stores, vec!["construction", "deploy:abc"]);
        assert_eq!(
            transport.requests()[0].url.as_str(),
            "https://api.netlify.com/api/v1/blobs/site-1?prefix=con"
        );
    }

    #[test]
    fn test_store_factories_validate_names() {
        let client = api_client(&MockTransport::new());
        assert!(client.store("construction").is_ok());
        assert!(matches!(
            client.store("deploy:abc"),
            Err(BlobsError::Validation(_))
        ));
        assert!(matches!(client.store("a/b"), Err(BlobsError::Validation(_))));
        assert_eq!(client.deploy_store("abc").unwrap().name(), "deploy:abc");
        assert!(matches!(
            client.deploy_store(""),
            Err(BlobsError::MissingEnvironment(_))
        ));
    }
}
