//! Request resolution.
//!
//! Turns a [`StoreOperation`] into the URL and headers of the request that
//! actually moves the data. Configurations with an edge URL resolve locally.
//! Without one, everything goes through the central API, and reads/writes of
//! a single blob first trade the API URL for a signed URL.

use std::fmt;

use http::header::{ACCEPT, AUTHORIZATION};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ClientConfig, Consistency};
use crate::error::{BlobsError, BlobsInternalError, Result};
use crate::metadata::{self, METADATA_HEADER_EXTERNAL, METADATA_HEADER_INTERNAL};
use crate::observer::{ExchangeKind, RequestObserver};
use crate::operation::{Method, StoreOperation};
use crate::transport::{Transport, TransportRequest};
use crate::validation;

/// Accept header value asking the API for a signed URL instead of the data.
pub const SIGNED_URL_ACCEPT: &str = "application/json;type=signed-url";

const API_PATH_PREFIX: [&str; 3] = ["api", "v1", "blobs"];

/// Which endpoint a resolved request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Edge endpoint, served from cache.
    Edge,
    /// Edge endpoint bypassing the cache.
    UncachedEdge,
    /// Central API, used as-is (listing, HEAD, DELETE).
    Api,
    /// Signed URL handed out by the central API.
    SignedUrl,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Route::Edge => "edge",
            Route::UncachedEdge => "uncached edge",
            Route::Api => "api",
            Route::SignedUrl => "signed url",
        };
        write!(f, "{name}")
    }
}

/// Outcome of resolution, consumed immediately by the transport.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub route: Route,
    pub url: Url,
    pub headers: HeaderMap,
    /// Whether the caller's body belongs on the final request.
    pub forward_body: bool,
}

/// Body of a successful signing exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrlResponse {
    pub url: String,
}

/// Resolves operations against one configuration.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    config: &'a ClientConfig,
    transport: &'a dyn Transport,
    observer: Option<&'a dyn RequestObserver>,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a ClientConfig, transport: &'a dyn Transport) -> Self {
        Self {
            config,
            transport,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Option<&'a dyn RequestObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Resolve an operation.
    ///
    /// Validation and consistency checks happen before any I/O. Only GET and
    /// PUT of a single key through the central API touch the network.
    pub async fn resolve(&self, operation: &StoreOperation) -> Result<ResolvedRequest> {
        validate(operation)?;

        let consistency = operation.effective_consistency(self.config.consistency());
        let encoded_metadata = match &operation.metadata {
            Some(metadata) => metadata::encode(metadata)?,
            None => None,
        };
        let segments = path_segments(self.config.site_id(), operation);

        if let Some(edge_url) = self.config.edge_url() {
            return self.resolve_edge(
                edge_url,
                operation,
                consistency,
                encoded_metadata.as_deref(),
                &segments,
            );
        }

        self.resolve_api(operation, encoded_metadata.as_deref(), &segments)
            .await
    }

    fn resolve_edge(
        &self,
        edge_url: &Url,
        operation: &StoreOperation,
        consistency: Consistency,
        encoded_metadata: Option<&str>,
        segments: &[String],
    ) -> Result<ResolvedRequest> {
        let (route, base) = match consistency {
            Consistency::Strong => match self.config.uncached_edge_url() {
                Some(uncached) => (Route::UncachedEdge, uncached),
                None => return Err(BlobsError::ConsistencyConfiguration),
            },
            Consistency::Eventual => (Route::Edge, edge_url),
        };

        let mut headers = self.auth_headers()?;
        if let Some(encoded) = encoded_metadata {
            headers.insert(METADATA_HEADER_INTERNAL, header_value(encoded, "metadata")?);
        }

        let region_segment = self.config.region().map(|r| format!("region:{r}"));
        let mut url = build_url(base, region_segment.iter().map(String::as_str), segments)?;
        append_parameters(&mut url, operation.parameters.iter());

        tracing::debug!(%route, %url, method = %operation.method, "resolved edge request");

        Ok(ResolvedRequest {
            route,
            url,
            headers,
            forward_body: operation.method == Method::Put,
        })
    }

    async fn resolve_api(
        &self,
        operation: &StoreOperation,
        encoded_metadata: Option<&str>,
        segments: &[String],
    ) -> Result<ResolvedRequest> {
        let mut headers = self.auth_headers()?;
        let mut url = build_url(self.config.api_url(), API_PATH_PREFIX, segments)?;

        let region = self.config.region().map(|r| ("region".to_string(), r.to_string()));
        append_parameters(&mut url, region.iter().chain(operation.parameters.iter()));

        let forward_body = operation.method == Method::Put;
        let as_is = |headers: HeaderMap, url: Url| ResolvedRequest {
            route: Route::Api,
            url,
            headers,
            forward_body,
        };

        // Listing stores or blobs is served by the API directly.
        if operation.store_name.is_none() || operation.key.is_none() {
            tracing::debug!(%url, "resolved api list request");
            return Ok(as_is(headers, url));
        }

        if let Some(encoded) = encoded_metadata {
            headers.insert(METADATA_HEADER_EXTERNAL, header_value(encoded, "metadata")?);
        }

        if matches!(operation.method, Method::Head | Method::Delete) {
            tracing::debug!(%url, method = %operation.method, "resolved api request");
            return Ok(as_is(headers, url));
        }

        let signed_url = self.exchange_signed_url(operation, url, headers).await?;

        let mut transfer_headers = HeaderMap::new();
        if let Some(encoded) = encoded_metadata {
            transfer_headers.insert(METADATA_HEADER_INTERNAL, header_value(encoded, "metadata")?);
        }

        Ok(ResolvedRequest {
            route: Route::SignedUrl,
            url: signed_url,
            headers: transfer_headers,
            forward_body,
        })
    }

    /// Ask the API for a signed URL covering this operation.
    async fn exchange_signed_url(
        &self,
        operation: &StoreOperation,
        url: Url,
        mut headers: HeaderMap,
    ) -> Result<Url> {
        headers.insert(ACCEPT, HeaderValue::from_static(SIGNED_URL_ACCEPT));

        let mut request = TransportRequest::new(operation.method.as_http(), url);
        request.headers = headers;
        request.timeout = self.config.request_timeout();

        tracing::debug!(url = %request.url, method = %request.method, "requesting signed url");

        let response = match self.transport.execute(request.clone()).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "signed url request failed");
                return Err(BlobsInternalError::from_transport(&err).into());
            }
        };

        if let Some(observer) = self.observer {
            observer.observe(ExchangeKind::Signing, &request, &response);
        }

        if response.status != StatusCode::OK {
            let err = BlobsInternalError::from_response(response.status, &response.headers);
            tracing::warn!(status = %response.status, error = %err, "signed url request rejected");
            return Err(err.into());
        }

        let signed: SignedUrlResponse = serde_json::from_slice(&response.body)?;
        Ok(Url::parse(&signed.url)?)
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut value = header_value(&format!("Bearer {}", self.config.token()), "authorization")?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

/// Resolve a single operation without an observer.
pub async fn resolve(
    config: &ClientConfig,
    transport: &dyn Transport,
    operation: &StoreOperation,
) -> Result<ResolvedRequest> {
    Resolver::new(config, transport).resolve(operation).await
}

fn validate(operation: &StoreOperation) -> Result<()> {
    if let Some(name) = &operation.store_name {
        validation::validate_store_name(name)?;
    }
    if let Some(key) = &operation.key {
        validation::validate_key(key)?;
    }
    Ok(())
}

/// Logical path `/{siteID}[/{storeName}][/{key}]` as URL segments.
///
/// Empty parts are dropped. A key keeps its `/` separators, so
/// `dir/file` becomes two segments.
fn path_segments(site_id: &str, operation: &StoreOperation) -> Vec<String> {
    let mut segments = Vec::new();
    if !site_id.is_empty() {
        segments.push(site_id.to_string());
    }
    if let Some(store) = operation.store_name.as_deref().filter(|s| !s.is_empty()) {
        segments.push(store.to_string());
    }
    if let Some(key) = operation.key.as_deref().filter(|k| !k.is_empty()) {
        segments.extend(key.split('/').map(str::to_string));
    }
    segments
}

/// Replace the path of `base` with `prefix` followed by `segments`.
fn build_url<'p>(
    base: &Url,
    prefix: impl IntoIterator<Item = &'p str>,
    segments: &[String],
) -> Result<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| BlobsError::CannotBeABase(base.to_string()))?
        .clear()
        .extend(prefix)
        .extend(segments);
    Ok(url)
}

fn append_parameters<'p>(url: &mut Url, parameters: impl Iterator<Item = &'p (String, String)>) {
    let mut parameters = parameters.peekable();
    // query_pairs_mut leaves a dangling `?` when nothing is appended
    if parameters.peek().is_none() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (name, value) in parameters {
        query.append_pair(name, value);
    }
}

fn header_value(value: &str, name: &'static str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| BlobsError::InvalidHeader(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use crate::testing::MockTransport;
    use crate::transport::TransportResponse;
    use serde_json::json;

    fn edge_config() -> ClientConfig {
        ClientConfig::builder()
            .edge_url("https://edge.example")
            .token("t")
            .build()
            .unwrap()
    }

    fn api_config() -> ClientConfig {
        ClientConfig::builder()
            .site_id("site-1")
            .token("t")
            .api_url("")
            .build()
            .unwrap()
    }

    fn metadata() -> Metadata {
        match json!({ "name": "Netlify" }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn signed(url: &str) -> TransportResponse {
        let mut response = TransportResponse::new(StatusCode::OK);
        response.body = serde_json::to_vec(&json!({ "url": url })).unwrap().into();
        response
    }

    #[tokio::test]
    async fn test_edge_get_resolves_locally() {
        let config = edge_config();
        let transport = MockTransport::new();

        let resolved = resolve(&config, &transport, &StoreOperation::get("construction", "nails"))
            .await
            .unwrap();

        assert_eq!(resolved.route, Route::Edge);
        assert_eq!(resolved.url.as_str(), "https://edge.example/construction/nails");
        assert_eq!(resolved.headers[AUTHORIZATION], "Bearer t");
        assert!(!resolved.forward_body);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_edge_path_includes_site_region_and_parameters() {
        let config = ClientConfig::builder()
            .site_id("site-1")
            .edge_url("https://edge.example/ignored/path")
            .uncached_edge_url("https://uncached.example")
            .region("us-east-1")
            .token("t")
            .build()
            .unwrap();
        let transport = MockTransport::new();
        let operation = StoreOperation::put("construction", "dir/nails")
            .metadata(metadata())
            .consistency(Consistency::Strong)
            .parameter("context", "deploy");

        let resolved = resolve(&config, &transport, &operation).await.unwrap();

        assert_eq!(resolved.route, Route::UncachedEdge);
        assert_eq!(
            resolved.url.as_str(),
            "https://uncached.example/region:us-east-1/site-1/construction/dir/nails?context=deploy"
        );
        assert_eq!(
            resolved.headers[METADATA_HEADER_INTERNAL],
            "b64;eyJuYW1lIjoiTmV0bGlmeSJ9"
        );
        assert!(resolved.headers.get(METADATA_HEADER_EXTERNAL).is_none());
        assert!(resolved.forward_body);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_strong_consistency_requires_uncached_url() {
        let config = edge_config();
        let transport = MockTransport::new();

        for operation in [
            StoreOperation::get("s", "k"),
            StoreOperation::put("s", "k"),
            StoreOperation::delete("s", "k"),
            StoreOperation::head("s", "k"),
            StoreOperation::list("s"),
        ] {
            let err = resolve(&config, &transport, &operation.consistency(Consistency::Strong))
                .await
                .unwrap_err();
            assert!(matches!(err, BlobsError::ConsistencyConfiguration));
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_client_default_consistency_applies() {
        let config = ClientConfig::builder()
            .edge_url("https://edge.example")
            .token("t")
            .consistency(Consistency::Strong)
            .build()
            .unwrap();
        let transport = MockTransport::new();

        let err = resolve(&config, &transport, &StoreOperation::get("s", "k"))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobsError::ConsistencyConfiguration));

        let resolved = resolve(
            &config,
            &transport,
            &StoreOperation::get("s", "k").consistency(Consistency::Eventual),
        )
        .await
        .unwrap();
        assert_eq!(resolved.route, Route::Edge);
    }

    #[tokio::test]
    async fn test_invalid_names_fail_before_io() {
        let config = api_config();
        let transport = MockTransport::new();

        for store in ["a/b", "a%2Fb"] {
            let err = resolve(&config, &transport, &StoreOperation::get(store, "k"))
                .await
                .unwrap_err();
            assert!(matches!(err, BlobsError::Validation(_)));
        }

        let err = resolve(&config, &transport, &StoreOperation::put("s", "k".repeat(601)))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobsError::Validation(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_dot_segment_keys_fail_before_io() {
        let transport = MockTransport::new();

        for config in [edge_config(), api_config()] {
            for key in [".", "..", "a/../b", "a/./b"] {
                for operation in [
                    StoreOperation::get("construction", key),
                    StoreOperation::put("construction", key),
                    StoreOperation::delete("construction", key),
                ] {
                    let err = resolve(&config, &transport, &operation).await.unwrap_err();
                    assert!(
                        matches!(
                            err,
                            BlobsError::Validation(validation::ValidationError::KeyDotSegment)
                        ),
                        "{key}: {err}"
                    );
                }
            }
        }
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_dotted_key_keeps_its_own_path() {
        let resolved = resolve(
            &edge_config(),
            &MockTransport::new(),
            &StoreOperation::delete("construction", "a/.../b"),
        )
        .await
        .unwrap();
        assert_eq!(
            resolved.url.as_str(),
            "https://edge.example/construction/a/.../b"
        );
    }

    #[tokio::test]
    async fn test_api_put_exchanges_signed_url() {
        let config = api_config();
        let transport = MockTransport::new();
        transport.push_response(signed("https://signed.example/x"));

        let operation = StoreOperation::put("construction", "nails").metadata(metadata());
        let resolved = resolve(&config, &transport, &operation).await.unwrap();

        assert_eq!(resolved.route, Route::SignedUrl);
        assert_eq!(resolved.url.as_str(), "https://signed.example/x");
        assert!(resolved.headers.get(AUTHORIZATION).is_none());
        assert_eq!(
            resolved.headers[METADATA_HEADER_INTERNAL],
            "b64;eyJuYW1lIjoiTmV0bGlmeSJ9"
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let signing = &requests[0];
        assert_eq!(signing.method, http::Method::PUT);
        assert_eq!(
            signing.url.as_str(),
            "https://api.netlify.com/api/v1/blobs/site-1/construction/nails"
        );
        assert_eq!(signing.headers[ACCEPT], SIGNED_URL_ACCEPT);
        assert_eq!(signing.headers[AUTHORIZATION], "Bearer t");
        assert_eq!(
            signing.headers[METADATA_HEADER_EXTERNAL],
            "b64;eyJuYW1lIjoiTmV0bGlmeSJ9"
        );
        assert!(signing.body.is_none());
    }

    #[tokio::test]
    async fn test_api_signing_failure_carries_upstream_detail() {
        let config = api_config();
        let transport = MockTransport::new();
        let mut response = TransportResponse::new(StatusCode::INTERNAL_SERVER_ERROR);
        response
            .headers
            .insert("nf-error", HeaderValue::from_static("disk full"));
        response
            .headers
            .insert("nf-request-id", HeaderValue::from_static("req-9"));
        transport.push_response(response);

        let err = resolve(&config, &transport, &StoreOperation::put("construction", "nails"))
            .await
            .unwrap_err();

        match err {
            BlobsError::BlobsInternal(internal) => {
                assert!(internal.to_string().contains("disk full"));
                assert_eq!(internal.request_id.as_deref(), Some("req-9"));
                assert_eq!(internal.status, Some(StatusCode::INTERNAL_SERVER_ERROR));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_api_signing_transport_error_is_internal() {
        let config = api_config();
        let transport = MockTransport::new();
        transport.push_error("connection reset");

        let err = resolve(&config, &transport, &StoreOperation::get("s", "k"))
            .await
            .unwrap_err();
        match err {
            BlobsError::BlobsInternal(internal) => {
                assert!(internal.details().contains("connection reset"));
                assert!(internal.status.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_api_head_delete_and_list_resolve_without_io() {
        let config = ClientConfig::builder()
            .site_id("site-1")
            .token("t")
            .api_url("https://api.example")
            .region("eu-central-1")
            .build()
            .unwrap();
        let transport = MockTransport::new();

        let resolved = resolve(&config, &transport, &StoreOperation::delete("s", "k"))
            .await
            .unwrap();
        assert_eq!(resolved.route, Route::Api);
        assert_eq!(
            resolved.url.as_str(),
            "https://api.example/api/v1/blobs/site-1/s/k?region=eu-central-1"
        );

        let resolved = resolve(
            &config,
            &transport,
            &StoreOperation::head("s", "k").metadata(metadata()),
        )
        .await
        .unwrap();
        assert!(resolved.headers.get(METADATA_HEADER_EXTERNAL).is_some());

        let resolved = resolve(
            &config,
            &transport,
            &StoreOperation::list("s")
                .metadata(metadata())
                .parameter("prefix", "dir/"),
        )
        .await
        .unwrap();
        assert_eq!(
            resolved.url.as_str(),
            "https://api.example/api/v1/blobs/site-1/s?region=eu-central-1&prefix=dir%2F"
        );
        assert!(resolved.headers.get(METADATA_HEADER_EXTERNAL).is_none());

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_api_get_forwards_region_to_signing_call() {
        let config = ClientConfig::builder()
            .site_id("site-1")
            .token("t")
            .region("us-east-2")
            .build()
            .unwrap();
        let transport = MockTransport::new();
        transport.push_response(signed("https://signed.example/get"));

        let resolved = resolve(&config, &transport, &StoreOperation::get("s", "k"))
            .await
            .unwrap();
        assert_eq!(resolved.url.as_str(), "https://signed.example/get");
        assert!(resolved.headers.is_empty());

        let requests = transport.requests();
        assert_eq!(requests[0].method, http::Method::GET);
        assert_eq!(
            requests[0].url.as_str(),
            "https://api.netlify.com/api/v1/blobs/site-1/s/k?region=us-east-2"
        );
    }

    #[tokio::test]
    async fn test_signing_response_must_be_json() {
        let config = api_config();
        let transport = MockTransport::new();
        let mut response = TransportResponse::new(StatusCode::OK);
        response.body = "not json".into();
        transport.push_response(response);

        let err = resolve(&config, &transport, &StoreOperation::get("s", "k"))
            .await
            .unwrap_err();
        assert!(matches!(err, BlobsError::Json(_)));
    }

    #[test]
    fn test_path_segments_skip_empty_parts() {
        let op = StoreOperation::new(Method::List);
        assert_eq!(path_segments("site", &op), vec!["site"]);
        assert!(path_segments("", &op).is_empty());

        let op = StoreOperation::get("store", "a/b c");
        assert_eq!(path_segments("", &op), vec!["store", "a", "b c"]);
    }

    #[test]
    fn test_build_url_encodes_segments() {
        let base = Url::parse("https://edge.example").unwrap();
        let url = build_url(&base, [], &["s".to_string(), "b c?".to_string()]).unwrap();
        assert_eq!(url.as_str(), "https://edge.example/s/b%20c%3F");
    }
}
