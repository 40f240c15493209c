use std::fmt;

use clap::Args;
use comfy_table::Table;

use blobs::store::{ListOptions, ListResult};
use blobs::BlobsError;

use super::StoreTarget;

#[derive(Args, Debug, Clone)]
pub struct List {
    #[command(flatten)]
    pub target: StoreTarget,

    /// Only list keys starting with this prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Group keys on `/` and show the groups as directories
    #[arg(long)]
    pub directories: bool,
}

#[derive(Debug)]
pub struct ListOutput {
    pub result: ListResult,
}

impl fmt::Display for ListOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.result.blobs.is_empty() && self.result.directories.is_empty() {
            return write!(f, "No blobs found");
        }

        let mut table = Table::new();
        table.set_header(vec!["KEY", "ETAG", "SIZE", "LAST MODIFIED"]);
        for dir in &self.result.directories {
            table.add_row(vec![format!("{dir}/"), String::new(), String::new(), String::new()]);
        }
        for blob in &self.result.blobs {
            table.add_row(vec![
                blob.key.clone(),
                blob.etag.clone(),
                blob.size.map(|s| s.to_string()).unwrap_or_default(),
                blob.last_modified.clone().unwrap_or_default(),
            ]);
        }
        write!(f, "{table}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("blobs error: {0}")]
    Blobs(#[from] BlobsError),
}

#[async_trait::async_trait]
impl crate::op::Op for List {
    type Error = ListError;
    type Output = ListOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let store = self.target.open(&ctx.client)?;
        let options = ListOptions {
            prefix: self.prefix.clone(),
            directories: self.directories,
        };
        let result = store.list(&options).await?;

        Ok(ListOutput { result })
    }
}
