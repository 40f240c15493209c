use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use serde::Deserialize;

use blobs::context::{ContextError, EventContext};
use blobs::{BlobsError, ClientConfig, Consistency};

/// Connection settings shared by every command.
///
/// Precedence: flags / environment, then the TOML file, then the encoded
/// blobs context.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// TOML file with connection settings
    #[arg(long, global = true, env = "BLOBS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Site the stores belong to
    #[arg(long, global = true, env = "NETLIFY_SITE_ID")]
    pub site_id: Option<String>,

    /// Bearer token
    #[arg(long, global = true, env = "NETLIFY_BLOBS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Central API base URL (default: https://api.netlify.com)
    #[arg(long, global = true, env = "NETLIFY_API_URL")]
    pub api_url: Option<String>,

    /// Edge endpoint; when set, requests bypass the central API
    #[arg(long, global = true)]
    pub edge_url: Option<String>,

    /// Uncached edge endpoint, required for strong consistency
    #[arg(long, global = true)]
    pub uncached_edge_url: Option<String>,

    /// Region to pin requests to
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Default consistency: eventual or strong
    #[arg(long, global = true)]
    pub consistency: Option<Consistency>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Base64 encoded blobs context as handed over by the function runtime
    #[arg(long, global = true, env = "NETLIFY_BLOBS_CONTEXT", hide_env_values = true)]
    pub context: Option<String>,
}

/// On-disk form of the connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub site_id: Option<String>,
    pub token: Option<String>,
    pub api_url: Option<String>,
    pub edge_url: Option<String>,
    pub uncached_edge_url: Option<String>,
    pub region: Option<String>,
    pub consistency: Option<Consistency>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid blobs context: {0}")]
    Context(#[from] ContextError),
    #[error(transparent)]
    Blobs(#[from] BlobsError),
}

impl GlobalArgs {
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let context = match &self.context {
            Some(encoded) => EventContext::decode(encoded)?,
            None => EventContext::default(),
        };

        let pick = |flag: &Option<String>, file: &Option<String>, ctx: &Option<String>| {
            flag.clone().or_else(|| file.clone()).or_else(|| ctx.clone())
        };

        let mut builder = ClientConfig::builder();
        if let Some(site_id) = pick(&self.site_id, &file.site_id, &None) {
            builder = builder.site_id(site_id);
        }
        if let Some(token) = pick(&self.token, &file.token, &context.token) {
            builder = builder.token(token);
        }
        if let Some(api_url) = pick(&self.api_url, &file.api_url, &None) {
            builder = builder.api_url(api_url);
        }
        if let Some(edge_url) = pick(&self.edge_url, &file.edge_url, &context.url) {
            builder = builder.edge_url(edge_url);
        }
        if let Some(uncached) = pick(
            &self.uncached_edge_url,
            &file.uncached_edge_url,
            &context.url_uncached,
        ) {
            builder = builder.uncached_edge_url(uncached);
        }
        if let Some(region) = pick(&self.region, &file.region, &context.primary_region) {
            builder = builder.region(region);
        }
        if let Some(consistency) = self.consistency.or(file.consistency) {
            builder = builder.consistency(consistency);
        }
        if let Some(secs) = self.timeout_secs.or(file.timeout_secs) {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }

        let config = builder.build()?;
        tracing::debug!(
            site_id = config.site_id(),
            edge = config.is_edge_capable(),
            region = ?config.region(),
            "loaded client config"
        );
        Ok(config)
    }
}
