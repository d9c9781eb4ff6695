use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

use super::api::{GenerationApi, ResultCallback, StreamStatus, TextEmbeddingApi};
use super::sse::{decode_frames, SseFrame};
use super::types::{GenerationParam, GenerationResult, TextEmbeddingParam, TextEmbeddingResult};
use crate::config::ConnectionProperties;
use crate::transport::http::vendor_error;
use crate::transport::HttpTransport;
use crate::{BoxStream, Error, Result};

pub const GENERATION_PATH: &str = "/api/v1/services/aigc/text-generation/generation";
pub const TEXT_EMBEDDING_PATH: &str = "/api/v1/services/embeddings/text-embedding/text-embedding";

/// DashScope native HTTP API.
pub struct DashScopeApi {
    transport: Arc<HttpTransport>,
}

impl DashScopeApi {
    pub fn new(connection: &ConnectionProperties) -> Result<Self> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(
            connection,
        )?)))
    }

    pub fn with_transport(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }
}

#[async_trait]
impl GenerationApi for DashScopeApi {
    async fn call(&self, param: &GenerationParam) -> Result<GenerationResult> {
        tracing::debug!(model = %param.model, messages = param.messages().len(), "generation call");
        self.transport.post_json(GENERATION_PATH, param).await
    }

    async fn stream_call(
        &self,
        param: GenerationParam,
        callback: Arc<dyn ResultCallback>,
    ) -> Result<()> {
        tracing::debug!(model = %param.model, "opening generation stream");
        let (request_id, body) = self.transport.post_sse(GENERATION_PATH, &param).await?;
        let frames = decode_frames(body);
        tokio::spawn(drive_stream(frames, StreamStatus { request_id }, callback));
        Ok(())
    }
}

#[async_trait]
impl TextEmbeddingApi for DashScopeApi {
    async fn call(&self, param: &TextEmbeddingParam) -> Result<TextEmbeddingResult> {
        tracing::debug!(model = %param.model, texts = param.input.texts.len(), "text embedding call");
        self.transport.post_json(TEXT_EMBEDDING_PATH, param).await
    }
}

/// Pump decoded frames into the callback until the stream ends, fails, or
/// the consumer cancels. Dropping `frames` closes the connection.
async fn drive_stream(
    mut frames: BoxStream<'static, SseFrame>,
    status: StreamStatus,
    callback: Arc<dyn ResultCallback>,
) {
    callback.on_open(&status).await;
    loop {
        if callback.is_cancelled() {
            tracing::debug!("stream consumer went away, closing connection");
            return;
        }
        match frames.next().await {
            Some(Ok(frame)) if frame.is_error() => {
                callback
                    .on_error(vendor_error(frame.http_status, &frame.data))
                    .await;
                return;
            }
            Some(Ok(frame)) => {
                if frame.data.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<GenerationResult>(&frame.data) {
                    Ok(result) => callback.on_event(result).await,
                    Err(e) => {
                        callback.on_error(Error::Serialization(e)).await;
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                callback.on_error(e).await;
                return;
            }
            None => {
                callback.on_complete().await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ResultCallback for Recorder {
        async fn on_open(&self, status: &StreamStatus) {
            self.log
                .lock()
                .unwrap()
                .push(format!("open:{}", status.request_id.clone().unwrap_or_default()));
        }

        async fn on_event(&self, result: GenerationResult) {
            let text = result.output.choices[0].message.content.clone();
            self.log.lock().unwrap().push(format!("event:{text}"));
        }

        async fn on_complete(&self) {
            self.log.lock().unwrap().push("complete".into());
        }

        async fn on_error(&self, error: Error) {
            self.log.lock().unwrap().push(format!("error:{:?}", error.status()));
        }
    }

    fn body(parts: Vec<String>) -> BoxStream<'static, SseFrame> {
        let items: Vec<Result<Bytes>> = parts.into_iter().map(|p| Ok(Bytes::from(p))).collect();
        decode_frames(Box::pin(futures::stream::iter(items)))
    }

    fn event(id: u32, text: &str) -> String {
        format!(
            "id:{id}\nevent:result\n:HTTP_STATUS/200\ndata:{{\"output\":{{\"choices\":[{{\"finish_reason\":\"null\",\"message\":{{\"role\":\"assistant\",\"content\":\"{text}\"}}}}]}},\"request_id\":\"r\"}}\n\n"
        )
    }

    #[tokio::test]
    async fn driver_reports_events_then_completion() {
        let recorder = Arc::new(Recorder::default());
        drive_stream(
            body(vec![event(1, "2"), event(2, "+2")]),
            StreamStatus {
                request_id: Some("r".into()),
            },
            recorder.clone(),
        )
        .await;
        assert_eq!(
            *recorder.log.lock().unwrap(),
            vec!["open:r", "event:2", "event:+2", "complete"]
        );
    }

    #[tokio::test]
    async fn error_frame_terminates_the_stream() {
        let recorder = Arc::new(Recorder::default());
        drive_stream(
            body(vec![
                event(1, "2"),
                "id:2\nevent:error\n:HTTP_STATUS/429\ndata:{\"code\":\"Throttling\",\"message\":\"slow\"}\n\n".into(),
                event(3, "never"),
            ]),
            StreamStatus::default(),
            recorder.clone(),
        )
        .await;
        assert_eq!(
            *recorder.log.lock().unwrap(),
            vec!["open:", "event:2", "error:Some(429)"]
        );
    }
}
