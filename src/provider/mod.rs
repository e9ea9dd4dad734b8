//! Transport contract, default HTTP transport, and request assembly.

pub mod http;
pub mod request;

pub use http::HttpTransport;
pub use request::{RequestAssembler, RequestPayload, RequestParts};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::WeaveError;

/// Raw response body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, WeaveError>>;

/// Sends a request and returns the streamed response body.
///
/// Implementations retry at most once, after refreshing the credential on an
/// authorization failure. Any other non-success status is returned as
/// [`WeaveError::Api`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, path: &str, body: &serde_json::Value) -> Result<ByteStream, WeaveError>;
}
