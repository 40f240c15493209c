use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use clap::Args;
use owo_colors::OwoColorize;

use blobs::BlobsError;

use super::{parse_metadata, MetadataArgError, StoreTarget};

#[derive(Args, Debug, Clone)]
pub struct Set {
    #[command(flatten)]
    pub target: StoreTarget,

    /// Key to write
    pub key: String,

    /// Value to store
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub value: Option<String>,

    /// Read the value from a file
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Metadata as a JSON object
    #[arg(long, short)]
    pub metadata: Option<String>,

    /// Validate the value as JSON and store it with a JSON content type
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug)]
pub struct SetOutput {
    pub store: String,
    pub key: String,
    pub size: usize,
}

impl fmt::Display for SetOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} bytes to {}/{}",
            "Stored".green().bold(),
            self.size,
            self.store.dimmed(),
            self.key.bold()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SetError {
    #[error("blobs error: {0}")]
    Blobs(#[from] BlobsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Metadata(#[from] MetadataArgError),
    #[error("value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("either a value or --file is required")]
    MissingValue,
}

#[async_trait::async_trait]
impl crate::op::Op for Set {
    type Error = SetError;
    type Output = SetOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let store = self.target.open(&ctx.client)?;
        let metadata = parse_metadata(self.metadata.as_deref())?;

        let data = match (&self.value, &self.file) {
            (Some(value), _) => Bytes::from(value.clone()),
            (None, Some(path)) => Bytes::from(std::fs::read(path)?),
            (None, None) => return Err(SetError::MissingValue),
        };
        let size = data.len();

        if self.json {
            let value: serde_json::Value = serde_json::from_slice(&data)?;
            store.set_json(&self.key, &value, metadata).await?;
        } else {
            store.set(&self.key, data, metadata).await?;
        }

        Ok(SetOutput {
            store: store.name().to_string(),
            key: self.key.clone(),
            size,
        })
    }
}
