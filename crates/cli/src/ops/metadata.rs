use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use blobs::store::BlobMetadata;
use blobs::BlobsError;

use super::StoreTarget;

/// Show the etag and metadata of a blob without downloading it.
#[derive(Args, Debug, Clone)]
pub struct ShowMetadata {
    #[command(flatten)]
    pub target: StoreTarget,

    /// Key of the blob
    pub key: String,
}

#[derive(Debug)]
pub struct MetadataOutput {
    pub key: String,
    pub entry: Option<BlobMetadata>,
}

impl fmt::Display for MetadataOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(entry) = &self.entry else {
            return write!(f, "{} {}", "Not found:".yellow(), self.key);
        };

        writeln!(f, "{} {}", "Key:".dimmed(), self.key.bold())?;
        writeln!(
            f,
            "{} {}",
            "etag:".dimmed(),
            entry.etag.as_deref().unwrap_or("-")
        )?;
        if entry.metadata.is_empty() {
            return write!(f, "{} {}", "metadata:".dimmed(), "none".dimmed());
        }
        writeln!(f, "{}", "metadata:".dimmed())?;
        let pretty = serde_json::to_string_pretty(&entry.metadata).map_err(|_| fmt::Error)?;
        write!(f, "{pretty}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("blobs error: {0}")]
    Blobs(#[from] BlobsError),
}

#[async_trait::async_trait]
impl crate::op::Op for ShowMetadata {
    type Error = MetadataError;
    type Output = MetadataOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let store = self.target.open(&ctx.client)?;
        let entry = store.get_metadata(&self.key).await?;

        Ok(MetadataOutput {
            key: self.key.clone(),
            entry,
        })
    }
}
