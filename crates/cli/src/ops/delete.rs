use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use blobs::BlobsError;

use super::StoreTarget;

#[derive(Args, Debug, Clone)]
pub struct Delete {
    #[command(flatten)]
    pub target: StoreTarget,

    /// Key to delete
    pub key: String,
}

#[derive(Debug)]
pub struct DeleteOutput {
    pub store: String,
    pub key: String,
}

impl fmt::Display for DeleteOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}",
            "Deleted".green().bold(),
            self.store.dimmed(),
            self.key.bold()
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("blobs error: {0}")]
    Blobs(#[from] BlobsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Delete {
    type Error = DeleteError;
    type Output = DeleteOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let store = self.target.open(&ctx.client)?;
        store.delete(&self.key).await?;

        Ok(DeleteOutput {
            store: store.name().to_string(),
            key: self.key.clone(),
        })
    }
}
