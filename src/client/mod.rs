use bytes::Bytes;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::models::{HealthReport, QueryRequest};

mod http;

pub use http::HttpBackend;

/// Raw response body of a streaming endpoint, fragment by fragment
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Type alias for the future returned by the streaming calls
pub type StreamFuture = Pin<Box<dyn Future<Output = Result<FragmentStream>> + Send>>;

pub type HealthFuture = Pin<Box<dyn Future<Output = Result<HealthReport>> + Send>>;

/// Document Q&A service that answers with event streams
///
/// Implementations only open the streams; decoding and session tracking are
/// done by [`crate::consumer::StreamConsumer`].
pub trait Backend: Send + Sync {
    /// Submit a document and return its processing event stream
    fn upload(&self, file_name: &str, document: Bytes) -> StreamFuture;

    /// Submit a question with its history and return the answer event stream
    fn ask(&self, request: &QueryRequest) -> StreamFuture;

    fn health(&self) -> HealthFuture;

    /// Get the backend name for logging
    fn name(&self) -> &str;
}
