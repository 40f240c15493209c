use std::fmt;

use clap::{Args, ValueEnum};
use owo_colors::OwoColorize;

use blobs::operation::{Method, StoreOperation};
use blobs::resolver::ResolvedRequest;
use blobs::BlobsError;

use super::{parse_metadata, MetadataArgError};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    Get,
    Put,
    Delete,
    Head,
    List,
}

impl From<MethodArg> for Method {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Get => Method::Get,
            MethodArg::Put => Method::Put,
            MethodArg::Delete => Method::Delete,
            MethodArg::Head => Method::Head,
            MethodArg::List => Method::List,
        }
    }
}

/// Show where a request would be sent, without sending it.
///
/// GET and PUT through the central API still perform the signing exchange.
#[derive(Args, Debug, Clone)]
pub struct Resolve {
    /// Operation to resolve
    #[arg(long, short, value_enum, default_value_t = MethodArg::Get)]
    pub method: MethodArg,

    /// Store name; omit to resolve the site-level store listing
    #[arg(long, short)]
    pub store: Option<String>,

    /// Key within the store
    pub key: Option<String>,

    /// Metadata as a JSON object
    #[arg(long)]
    pub metadata: Option<String>,
}

impl Resolve {
    fn operation(&self) -> Result<StoreOperation, ResolveError> {
        let mut operation = StoreOperation::new(self.method.into());
        if let Some(store) = &self.store {
            operation = operation.store(store);
        }
        if let Some(key) = &self.key {
            operation = operation.key(key);
        }
        if let Some(metadata) = parse_metadata(self.metadata.as_deref())? {
            operation = operation.metadata(metadata);
        }
        Ok(operation)
    }
}

#[derive(Debug)]
pub struct ResolveOutput {
    pub resolved: ResolvedRequest,
}

impl fmt::Display for ResolveOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", "route:".dimmed(), self.resolved.route.bold())?;
        writeln!(f, "{} {}", "url:".dimmed(), self.resolved.url)?;
        write!(f, "{}", "headers:".dimmed())?;
        if self.resolved.headers.is_empty() {
            write!(f, " {}", "none".dimmed())?;
        }
        for (name, value) in &self.resolved.headers {
            let shown = if name.as_str() == "authorization" {
                "<redacted>".to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            write!(f, "\n  {}: {shown}", name.as_str())?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("blobs error: {0}")]
    Blobs(#[from] BlobsError),
    #[error(transparent)]
    Metadata(#[from] MetadataArgError),
}

#[async_trait::async_trait]
impl crate::op::Op for Resolve {
    type Error = ResolveError;
    type Output = ResolveOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let operation = self.operation()?;
        let resolved = ctx.client.resolve(&operation).await?;
        Ok(ResolveOutput { resolved })
    }
}
