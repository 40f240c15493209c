use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::context::{CallerIdentity, EventContext};
use crate::error::{BlobsError, Result};

/// Central API used when the configuration does not name one.
pub const DEFAULT_API_URL: &str = "https://api.netlify.com";

/// Read consistency requested for an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    /// May be served from the edge cache.
    #[default]
    Eventual,
    /// Must observe the most recent write; requires the uncached edge endpoint.
    Strong,
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Consistency::Eventual => write!(f, "eventual"),
            Consistency::Strong => write!(f, "strong"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown consistency mode: {0} (expected `eventual` or `strong`)")]
pub struct ParseConsistencyError(String);

impl FromStr for Consistency {
    type Err = ParseConsistencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eventual" => Ok(Consistency::Eventual),
            "strong" => Ok(Consistency::Strong),
            other => Err(ParseConsistencyError(other.to_string())),
        }
    }
}

/// Immutable client configuration.
///
/// Set once when the client is created. Having an `edge_url` selects the
/// edge-capable resolution branch, otherwise every request goes through the
/// central API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    site_id: String,
    token: String,
    api_url: Url,
    edge_url: Option<Url>,
    uncached_edge_url: Option<Url>,
    region: Option<String>,
    consistency: Consistency,
    request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Build a configuration from a decoded event context and the caller
    /// identity headers of the inbound request.
    pub fn from_event(context: &EventContext, identity: &CallerIdentity) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(site_id) = &identity.site_id {
            builder = builder.site_id(site_id);
        }
        if let Some(token) = &context.token {
            builder = builder.token(token);
        }
        if let Some(url) = &context.url {
            builder = builder.edge_url(url);
        }
        if let Some(url) = &context.url_uncached {
            builder = builder.uncached_edge_url(url);
        }
        if let Some(region) = &context.primary_region {
            builder = builder.region(region);
        }
        builder.build()
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn edge_url(&self) -> Option<&Url> {
        self.edge_url.as_ref()
    }

    pub fn uncached_edge_url(&self) -> Option<&Url> {
        self.uncached_edge_url.as_ref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn consistency(&self) -> Consistency {
        self.consistency
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Whether requests can go straight to the edge endpoint.
    pub fn is_edge_capable(&self) -> bool {
        self.edge_url.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    site_id: Option<String>,
    token: Option<String>,
    api_url: Option<String>,
    edge_url: Option<String>,
    uncached_edge_url: Option<String>,
    region: Option<String>,
    consistency: Consistency,
    request_timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    pub fn site_id(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn edge_url(mut self, url: impl Into<String>) -> Self {
        self.edge_url = Some(url.into());
        self
    }

    pub fn uncached_edge_url(mut self, url: impl Into<String>) -> Self {
        self.uncached_edge_url = Some(url.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Finish the configuration.
    ///
    /// A token is always required. The site id may be empty only on the
    /// edge branch, where the edge URL can already be site-scoped. Empty
    /// strings count as unset for every optional field.
    pub fn build(self) -> Result<ClientConfig> {
        let token = non_empty(self.token);
        let site_id = non_empty(self.site_id);
        let edge_url = non_empty(self.edge_url).map(|u| Url::parse(&u)).transpose()?;

        let mut missing = Vec::new();
        if site_id.is_none() && edge_url.is_none() {
            missing.push("siteID");
        }
        if token.is_none() {
            missing.push("token");
        }
        if !missing.is_empty() {
            return Err(BlobsError::MissingEnvironment(missing.join(", ")));
        }

        let api_url = match non_empty(self.api_url) {
            Some(url) => Url::parse(&url)?,
            None => Url::parse(DEFAULT_API_URL)?,
        };
        let uncached_edge_url = non_empty(self.uncached_edge_url)
            .map(|u| Url::parse(&u))
            .transpose()?;

        Ok(ClientConfig {
            site_id: site_id.unwrap_or_default(),
            token: token.unwrap_or_default(),
            api_url,
            edge_url,
            uncached_edge_url,
            region: non_empty(self.region),
            consistency: self.consistency,
            request_timeout: self.request_timeout,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
