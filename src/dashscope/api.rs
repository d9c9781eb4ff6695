use async_trait::async_trait;
use std::sync::Arc;

use super::types::{GenerationParam, GenerationResult, TextEmbeddingParam, TextEmbeddingResult};
use crate::{Error, Result};

/// Information available once a stream has been accepted by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStatus {
    pub request_id: Option<String>,
}

/// Receiver of streamed generation events.
///
/// After `stream_call` returns `Ok`, the callback sees `on_open`, zero or
/// more `on_event`, then exactly one of `on_complete` / `on_error`. Calls
/// may arrive on any task.
#[async_trait]
pub trait ResultCallback: Send + Sync {
    async fn on_open(&self, _status: &StreamStatus) {}

    async fn on_event(&self, result: GenerationResult);

    async fn on_complete(&self);

    async fn on_error(&self, error: Error);

    /// Set once the consumer went away; the producer should stop.
    fn is_cancelled(&self) -> bool {
        false
    }
}

#[async_trait]
pub trait GenerationApi: Send + Sync {
    async fn call(&self, param: &GenerationParam) -> Result<GenerationResult>;

    /// Open a stream. Returns once the server accepted the request; events
    /// are then pushed to `callback` from a background task.
    async fn stream_call(
        &self,
        param: GenerationParam,
        callback: Arc<dyn ResultCallback>,
    ) -> Result<()>;
}

#[async_trait]
pub trait TextEmbeddingApi: Send + Sync {
    async fn call(&self, param: &TextEmbeddingParam) -> Result<TextEmbeddingResult>;
}
