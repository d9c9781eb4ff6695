//! Push callbacks -> pull stream

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::mapper::{to_chat_response, EmptyContentPolicy};
use crate::dashscope::{GenerationResult, ResultCallback, StreamStatus};
use crate::types::ChatResponse;
use crate::{BoxStream, Error, Result};

pub const DEFAULT_STREAM_BUFFER: usize = 32;

/// [`ResultCallback`] that forwards mapped events into a bounded channel.
///
/// The sender is dropped after the terminal item, which ends the stream.
pub struct StreamBridge {
    sink: ArcSwapOption<mpsc::Sender<Result<ChatResponse>>>,
    policy: EmptyContentPolicy,
}

impl StreamBridge {
    /// Create the bridge and the stream the caller consumes.
    pub fn channel(
        capacity: usize,
        policy: EmptyContentPolicy,
    ) -> (Arc<Self>, BoxStream<'static, ChatResponse>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let bridge = Arc::new(Self {
            sink: ArcSwapOption::from_pointee(tx),
            policy,
        });
        (bridge, Box::pin(ReceiverStream::new(rx)))
    }

    async fn send(&self, item: Result<ChatResponse>) -> bool {
        let Some(sender) = self.sink.load_full() else {
            return false;
        };
        if sender.send(item).await.is_err() {
            tracing::debug!("stream receiver dropped");
            self.sink.store(None);
            return false;
        }
        true
    }

    /// Deliver a terminal error and close the stream.
    async fn fail(&self, error: Error) {
        tracing::error!(error = %error, "stream failed");
        self.send(Err(Error::stream("DashScope stream failed", error)))
            .await;
        self.sink.store(None);
    }
}

#[async_trait]
impl ResultCallback for StreamBridge {
    async fn on_open(&self, status: &StreamStatus) {
        tracing::info!(request_id = ?status.request_id, "stream opened");
    }

    async fn on_event(&self, result: GenerationResult) {
        match to_chat_response(&result, self.policy) {
            Ok(response) => {
                self.send(Ok(response)).await;
            }
            Err(e) => self.fail(e).await,
        }
    }

    async fn on_complete(&self) {
        tracing::info!("stream completed");
        self.sink.store(None);
    }

    async fn on_error(&self, error: Error) {
        self.fail(error).await;
    }

    fn is_cancelled(&self) -> bool {
        match self.sink.load_full() {
            Some(sender) => sender.is_closed(),
            None => true,
        }
    }
}
