use std::fmt;

use clap::Args;
use comfy_table::Table;

use blobs::BlobsError;

#[derive(Args, Debug, Clone)]
pub struct Stores {
    /// Only list stores whose name starts with this prefix
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Debug)]
pub struct StoresOutput {
    pub stores: Vec<String>,
}

impl fmt::Display for StoresOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stores.is_empty() {
            return write!(f, "No stores found");
        }

        let mut table = Table::new();
        table.set_header(vec!["NAME", "SCOPE"]);
        for name in &self.stores {
            let scope = if name.starts_with(blobs::validation::DEPLOY_STORE_PREFIX) {
                "deploy"
            } else {
                "site"
            };
            table.add_row(vec![name.clone(), scope.to_string()]);
        }
        write!(f, "{table}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoresError {
    #[error("blobs error: {0}")]
    Blobs(#[from] BlobsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Stores {
    type Error = StoresError;
    type Output = StoresOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let stores = ctx.client.list_stores(self.prefix.as_deref()).await?;
        Ok(StoresOutput { stores })
    }
}
