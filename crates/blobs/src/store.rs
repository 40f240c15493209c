//! Per-store handle and the operations exposed on it.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, ETAG};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::{expect_status, parse_json, Client};
use crate::config::Consistency;
use crate::error::Result;
use crate::metadata::{self, Metadata, METADATA_HEADER_INTERNAL};
use crate::operation::StoreOperation;
use crate::transport::TransportResponse;

/// Etag and metadata of a stored blob.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobMetadata {
    pub etag: Option<String>,
    pub metadata: Metadata,
}

/// Result of a conditional read.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobEntry {
    /// `None` when the caller's etag is still current.
    pub data: Option<Bytes>,
    pub etag: Option<String>,
    pub metadata: Metadata,
    /// True when the caller's etag matched and no data was sent.
    pub fresh: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub prefix: Option<String>,
    /// Group keys on `/` and report the groups as directories.
    pub directories: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedBlob {
    pub key: String,
    pub etag: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResult {
    #[serde(default)]
    pub blobs: Vec<ListedBlob>,
    #[serde(default)]
    pub directories: Vec<String>,
}

/// A named store. Holds a clone of its client.
#[derive(Debug, Clone)]
pub struct Store {
    client: Client,
    name: String,
    consistency: Option<Consistency>,
}

impl Store {
    pub(crate) fn new(client: Client, name: String) -> Self {
        Self {
            client,
            name,
            consistency: None,
        }
    }

    /// Override the client's default consistency for this store.
    pub fn with_consistency(mut self, consistency: Consistency) -> Self {
        self.consistency = Some(consistency);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read a blob. A missing key is `Ok(None)`.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let response = self.send(StoreOperation::get(&self.name, key), None).await?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        expect_status(&response, &[StatusCode::OK])?;
        Ok(Some(response.body))
    }

    /// Read a blob and decode it as JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(body) => Ok(Some(serde_json::from_slice(&body)?)),
            None => Ok(None),
        }
    }

    /// Read a blob with its etag and metadata.
    ///
    /// With `etag` set, an unchanged blob comes back as a fresh entry
    /// without data.
    pub async fn get_with_metadata(&self, key: &str, etag: Option<&str>) -> Result<Option<BlobEntry>> {
        let mut operation = StoreOperation::get(&self.name, key);
        if let Some(etag) = etag {
            operation = operation.if_none_match(etag);
        }

        let response = self.send(operation, None).await?;
        match response.status {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::NOT_MODIFIED if etag.is_some() => {
                let BlobMetadata { etag: current, metadata } = read_metadata(&response)?;
                Ok(Some(BlobEntry {
                    data: None,
                    etag: current.or_else(|| etag.map(str::to_string)),
                    metadata,
                    fresh: true,
                }))
            }
            _ => {
                expect_status(&response, &[StatusCode::OK])?;
                let BlobMetadata { etag, metadata } = read_metadata(&response)?;
                Ok(Some(BlobEntry {
                    data: Some(response.body),
                    etag,
                    metadata,
                    fresh: false,
                }))
            }
        }
    }

    /// Read only the etag and metadata of a blob.
    pub async fn get_metadata(&self, key: &str) -> Result<Option<BlobMetadata>> {
        let response = self.send(StoreOperation::head(&self.name, key), None).await?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        expect_status(&response, &[StatusCode::OK])?;
        read_metadata(&response).map(Some)
    }

    /// Write a blob.
    pub async fn set(
        &self,
        key: &str,
        data: impl Into<Bytes>,
        metadata: Option<Metadata>,
    ) -> Result<()> {
        let operation = with_metadata(StoreOperation::put(&self.name, key), metadata);
        let response = self.send(operation, Some(data.into())).await?;
        expect_status(&response, &[StatusCode::OK])
    }

    /// Write a value serialized as JSON.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        metadata: Option<Metadata>,
    ) -> Result<()> {
        let body = Bytes::from(serde_json::to_vec(value)?);
        let operation = with_metadata(StoreOperation::put(&self.name, key), metadata);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .make_request(&self.scoped(operation), Some(body), headers)
            .await?;
        expect_status(&response, &[StatusCode::OK])
    }

    /// Delete a blob. Deleting a missing key succeeds.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let response = self.send(StoreOperation::delete(&self.name, key), None).await?;
        expect_status(
            &response,
            &[StatusCode::OK, StatusCode::NO_CONTENT, StatusCode::NOT_FOUND],
        )
    }

    /// List the blobs in this store. Returns the first page only.
    pub async fn list(&self, options: &ListOptions) -> Result<ListResult> {
        let mut operation = StoreOperation::list(&self.name);
        if let Some(prefix) = &options.prefix {
            operation = operation.parameter("prefix", prefix);
        }
        if options.directories {
            operation = operation.parameter("directories", "true");
        }

        let response = self.send(operation, None).await?;
        parse_json(response)
    }

    async fn send(&self, operation: StoreOperation, body: Option<Bytes>) -> Result<TransportResponse> {
        self.client
            .make_request(&self.scoped(operation), body, HeaderMap::new())
            .await
    }

    fn scoped(&self, operation: StoreOperation) -> StoreOperation {
        match self.consistency {
            Some(consistency) if operation.consistency.is_none() => {
                operation.consistency(consistency)
            }
            _ => operation,
        }
    }
}

fn with_metadata(operation: StoreOperation, metadata: Option<Metadata>) -> StoreOperation {
    match metadata {
        Some(metadata) => operation.metadata(metadata),
        None => operation,
    }
}

fn read_metadata(response: &TransportResponse) -> Result<BlobMetadata> {
    let metadata = match response.header(METADATA_HEADER_INTERNAL) {
        Some(header) => metadata::decode(header)?,
        None => Metadata::new(),
    };

    Ok(BlobMetadata {
        etag: response.header(ETAG.as_str()).map(str::to_string),
        metadata,
    })
}
