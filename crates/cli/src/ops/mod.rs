use clap::Args;

use blobs::metadata::Metadata;
use blobs::{BlobsError, Client, Store};

pub mod delete;
pub mod get;
pub mod list;
pub mod metadata;
pub mod resolve;
pub mod set;
pub mod stores;

crate::command_enum! {
    (Get, get::Get),
    (Set, set::Set),
    (Delete, delete::Delete),
    (Metadata, metadata::ShowMetadata),
    (List, list::List),
    (Stores, stores::Stores),
    (Resolve, resolve::Resolve),
}

/// Which store a command targets.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct StoreTarget {
    /// Site-wide store name
    #[arg(long, short)]
    pub store: Option<String>,

    /// Deploy id, selects the deploy-scoped store
    #[arg(long, env = "NETLIFY_DEPLOY_ID")]
    pub deploy: Option<String>,
}

impl StoreTarget {
    pub fn open(&self, client: &Client) -> Result<Store, BlobsError> {
        match (&self.store, &self.deploy) {
            (Some(name), _) => client.store(name),
            (None, Some(deploy_id)) => client.deploy_store(deploy_id),
            (None, None) => Err(BlobsError::MissingEnvironment(
                "store name or deployID".to_string(),
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataArgError {
    #[error("metadata must be a JSON object: {0}")]
    Json(#[from] serde_json::Error),
    #[error("metadata must be a JSON object, got {0}")]
    NotAnObject(String),
}

/// Parse a `--metadata` argument.
pub fn parse_metadata(raw: Option<&str>) -> Result<Option<Metadata>, MetadataArgError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match serde_json::from_str(raw)? {
        serde_json::Value::Object(map) => Ok(Some(map)),
        other => Err(MetadataArgError::NotAnObject(other.to_string())),
    }
}
