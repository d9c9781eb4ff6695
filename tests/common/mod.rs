//! Scripted in-process DashScope fakes shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use dashscope_ai::dashscope::{
    GenerationApi, GenerationParam, GenerationResult, ResultCallback, StreamStatus,
    TextEmbeddingApi, TextEmbeddingParam, TextEmbeddingResult,
};
use dashscope_ai::resilience::{RetryConfig, RetryTemplate};
use dashscope_ai::tools::{FunctionCallback, FunctionCallbackWrapper};
use dashscope_ai::{Error, Result};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn answer(text: &str, input_tokens: u64, output_tokens: u64) -> GenerationResult {
    serde_json::from_value(json!({
        "request_id": format!("req-{text}"),
        "output": {"choices": [{
            "finish_reason": "stop",
            "message": {"role": "assistant", "content": text}
        }]},
        "usage": {
            "input_tokens": input_tokens,
            "output_tokens": output_tokens,
            "total_tokens": input_tokens + output_tokens
        }
    }))
    .unwrap()
}

/// Assistant turn requesting the given `(id, name, arguments)` calls.
pub fn tool_calls(calls: &[(&str, &str, &str)]) -> GenerationResult {
    let calls: Vec<_> = calls
        .iter()
        .map(|(id, name, args)| {
            json!({"id": id, "type": "function", "function": {"name": name, "arguments": args}})
        })
        .collect();
    serde_json::from_value(json!({
        "request_id": "req-tools",
        "output": {"choices": [{
            "finish_reason": "tool_calls",
            "message": {"role": "assistant", "content": "", "tool_calls": calls}
        }]},
        "usage": {"input_tokens": 5, "output_tokens": 5, "total_tokens": 10}
    }))
    .unwrap()
}

pub fn chunk(text: &str) -> GenerationResult {
    serde_json::from_value(json!({
        "request_id": "req-stream",
        "output": {"choices": [{
            "finish_reason": "null",
            "message": {"role": "assistant", "content": text}
        }]},
        "usage": {"input_tokens": 4, "output_tokens": 1, "total_tokens": 5}
    }))
    .unwrap()
}

pub fn vendor_error(status: u16) -> Error {
    Error::Vendor {
        status: Some(status),
        code: Some("InternalError".into()),
        message: "scripted failure".into(),
        request_id: None,
    }
}

/// Retry template with millisecond backoff.
pub fn fast_retry(max_retries: u32) -> RetryTemplate {
    RetryTemplate::from_config(RetryConfig {
        max_retries,
        min_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        ..RetryConfig::default()
    })
}

/// What a scripted stream does once opened.
#[derive(Clone)]
pub enum StreamStep {
    Event(GenerationResult),
    Fail(u16),
}

#[derive(Default)]
pub struct ScriptedGeneration {
    responses: Mutex<VecDeque<Result<GenerationResult>>>,
    open_failures: Mutex<VecDeque<Error>>,
    stream_script: Mutex<Vec<StreamStep>>,
    pub requests: Mutex<Vec<GenerationParam>>,
    pub stream_opens: AtomicUsize,
    pub delivered_events: Arc<AtomicUsize>,
}

impl ScriptedGeneration {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, result: GenerationResult) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(result));
        self
    }

    pub fn fail(&self, error: Error) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn fail_open(&self, error: Error) -> &Self {
        self.open_failures.lock().unwrap().push_back(error);
        self
    }

    pub fn stream(&self, steps: Vec<StreamStep>) -> &Self {
        *self.stream_script.lock().unwrap() = steps;
        self
    }

    pub fn requests(&self) -> Vec<GenerationParam> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationApi for ScriptedGeneration {
    async fn call(&self, param: &GenerationParam) -> Result<GenerationResult> {
        self.requests.lock().unwrap().push(param.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(answer("fallback", 1, 1)))
    }

    async fn stream_call(
        &self,
        param: GenerationParam,
        callback: Arc<dyn ResultCallback>,
    ) -> Result<()> {
        self.stream_opens.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(param);
        if let Some(err) = self.open_failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let steps = self.stream_script.lock().unwrap().clone();
        let delivered = self.delivered_events.clone();
        tokio::spawn(async move {
            callback
                .on_open(&StreamStatus {
                    request_id: Some("req-stream".into()),
                })
                .await;
            for step in steps {
                if callback.is_cancelled() {
                    return;
                }
                match step {
                    StreamStep::Event(result) => {
                        callback.on_event(result).await;
                        delivered.fetch_add(1, Ordering::SeqCst);
                    }
                    StreamStep::Fail(status) => {
                        callback.on_error(vendor_error(status)).await;
                        return;
                    }
                }
                tokio::task::yield_now().await;
            }
            callback.on_complete().await;
        });
        Ok(())
    }
}

/// Stream fake that records whether the producer noticed cancellation.
pub struct EndlessStream {
    pub cancelled: Arc<Mutex<bool>>,
}

impl EndlessStream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            cancelled: Arc::new(Mutex::new(false)),
        })
    }
}

#[async_trait]
impl GenerationApi for EndlessStream {
    async fn call(&self, _param: &GenerationParam) -> Result<GenerationResult> {
        Ok(answer("unused", 1, 1))
    }

    async fn stream_call(
        &self,
        _param: GenerationParam,
        callback: Arc<dyn ResultCallback>,
    ) -> Result<()> {
        let cancelled = self.cancelled.clone();
        tokio::spawn(async move {
            loop {
                if callback.is_cancelled() {
                    *cancelled.lock().unwrap() = true;
                    return;
                }
                callback.on_event(chunk("tick")).await;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct ScriptedEmbedding {
    pub requests: Mutex<Vec<TextEmbeddingParam>>,
    pub failures_left: AtomicUsize,
}

impl ScriptedEmbedding {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl TextEmbeddingApi for ScriptedEmbedding {
    async fn call(&self, param: &TextEmbeddingParam) -> Result<TextEmbeddingResult> {
        self.requests.lock().unwrap().push(param.clone());
        if self.failures_left.load(Ordering::SeqCst) > 0 {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
            return Err(vendor_error(503));
        }
        // Each vector is [batch-local index, text length].
        let embeddings: Vec<_> = param
            .input
            .texts
            .iter()
            .enumerate()
            .map(|(i, t)| json!({"text_index": i, "embedding": [i as f64, t.len() as f64]}))
            .collect();
        Ok(serde_json::from_value(json!({
            "request_id": "emb",
            "output": {"embeddings": embeddings},
            "usage": {"total_tokens": param.input.texts.len() * 2}
        }))
        .unwrap())
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct CityArgs {
    pub city: String,
}

/// `lookup_weather` tool that counts its invocations.
pub fn weather_tool(invocations: Arc<AtomicUsize>) -> Arc<dyn FunctionCallback> {
    FunctionCallbackWrapper::builder("lookup_weather")
        .description("Current weather for a city")
        .build(move |args: CityArgs| {
            let invocations = invocations.clone();
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok(format!("Sunny in {}", args.city))
            }
        })
}

pub fn failing_tool() -> Arc<dyn FunctionCallback> {
    FunctionCallbackWrapper::builder("explode").build(|_args: CityArgs| async move {
        Err::<String, _>(Error::tool("explode", "tool crashed"))
    })
}
