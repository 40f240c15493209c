use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use blobs::BlobsError;

use super::StoreTarget;

#[derive(Args, Debug, Clone)]
pub struct Get {
    #[command(flatten)]
    pub target: StoreTarget,

    /// Key of the blob to read
    pub key: String,

    /// Write the blob to this file instead of printing it
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
pub enum GetContent {
    Text(String),
    Binary(Vec<u8>),
    Written(PathBuf),
    NotFound,
}

#[derive(Debug)]
pub struct GetOutput {
    pub key: String,
    pub size: usize,
    pub content: GetContent,
}

impl fmt::Display for GetOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let GetContent::NotFound = self.content {
            return write!(f, "{} {}", "Not found:".yellow(), self.key);
        }

        writeln!(
            f,
            "{} {}  {} {} bytes",
            "Key:".dimmed(),
            self.key.bold(),
            "Size:".dimmed(),
            self.size
        )?;
        match &self.content {
            GetContent::Text(text) => write!(f, "{text}"),
            GetContent::Binary(bytes) => {
                let hex = bytes
                    .iter()
                    .map(|b| format!("{:02x}", b))
                    .collect::<Vec<_>>()
                    .join(" ");
                write!(f, "{} {hex}", "Binary content (hex):".dimmed())
            }
            GetContent::Written(path) => {
                write!(f, "{} {}", "Written to".green(), path.display())
            }
            GetContent::NotFound => Ok(()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error("blobs error: {0}")]
    Blobs(#[from] BlobsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Get {
    type Error = GetError;
    type Output = GetOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let store = self.target.open(&ctx.client)?;

        let Some(data) = store.get(&self.key).await? else {
            return Ok(GetOutput {
                key: self.key.clone(),
                size: 0,
                content: GetContent::NotFound,
            });
        };

        let size = data.len();
        let content = match &self.output {
            Some(path) => {
                std::fs::write(path, &data)?;
                GetContent::Written(path.clone())
            }
            None => match String::from_utf8(data.to_vec()) {
                Ok(text) => GetContent::Text(text),
                Err(err) => GetContent::Binary(err.into_bytes()),
            },
        };

        Ok(GetOutput {
            key: self.key.clone(),
            size,
            content,
        })
    }
}
