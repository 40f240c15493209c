//! Client for Netlify Blobs key/value stores.
//!
//! The heart of the crate is the [`resolver`], which decides where a store
//! operation is sent: straight to the edge endpoint when the runtime provides
//! one, or through the central API, which hands out signed URLs for reads and
//! writes of single blobs. [`Client`] and [`Store`] wrap resolution and the
//! HTTP [`transport`] into the usual get / set / delete / list calls.

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod metadata;
pub mod observer;
pub mod operation;
pub mod resolver;
pub mod store;
pub mod transport;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use client::Client;
pub use config::{ClientConfig, Consistency};
pub use error::{BlobsError, BlobsInternalError, Result};
pub use store::Store;

pub mod prelude {
    pub use crate::client::{Client, PUT_CACHE_CONTROL};
    pub use crate::config::{ClientConfig, ClientConfigBuilder, Consistency, DEFAULT_API_URL};
    pub use crate::context::{CallerIdentity, ContextError, EventContext};
    pub use crate::error::{BlobsError, BlobsInternalError};
    pub use crate::metadata::Metadata;
    pub use crate::observer::{Exchange, ExchangeKind, RecordingObserver, RequestObserver};
    pub use crate::operation::{Method, StoreOperation};
    pub use crate::resolver::{resolve, ResolvedRequest, Resolver, Route, SignedUrlResponse};
    pub use crate::store::{BlobEntry, BlobMetadata, ListOptions, ListResult, ListedBlob, Store};
    pub use crate::transport::{
        ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse,
    };
}
