use std::fmt;

use crate::config::Consistency;
use crate::metadata::Metadata;

/// Logical store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Delete,
    Head,
    /// Listing; sent as an HTTP GET without a key.
    List,
}

impl Method {
    pub fn as_http(&self) -> http::Method {
        match self {
            Method::Get | Method::List => http::Method::GET,
            Method::Put => http::Method::PUT,
            Method::Delete => http::Method::DELETE,
            Method::Head => http::Method::HEAD,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::List => "LIST",
        };
        write!(f, "{name}")
    }
}

/// A single operation against a store, consumed by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOperation {
    pub method: Method,
    pub store_name: Option<String>,
    pub key: Option<String>,
    pub metadata: Option<Metadata>,
    /// Overrides the client default when set.
    pub consistency: Option<Consistency>,
    /// Extra query parameters, appended in order.
    pub parameters: Vec<(String, String)>,
    /// Etag for a conditional read (`if-none-match`).
    pub if_none_match: Option<String>,
}

impl StoreOperation {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            store_name: None,
            key: None,
            metadata: None,
            consistency: None,
            parameters: Vec::new(),
            if_none_match: None,
        }
    }

    pub fn get(store: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(Method::Get).store(store).key(key)
    }

    pub fn put(store: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(Method::Put).store(store).key(key)
    }

    pub fn delete(store: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(Method::Delete).store(store).key(key)
    }

    pub fn head(store: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(Method::Head).store(store).key(key)
    }

    pub fn list(store: impl Into<String>) -> Self {
        Self::new(Method::List).store(store)
    }

    pub fn store(mut self, store: impl Into<String>) -> Self {
        self.store_name = Some(store.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    pub fn if_none_match(mut self, etag: impl Into<String>) -> Self {
        self.if_none_match = Some(etag.into());
        self
    }

    /// Effective consistency given the client default.
    pub fn effective_consistency(&self, default: Consistency) -> Consistency {
        self.consistency.unwrap_or(default)
    }
}
