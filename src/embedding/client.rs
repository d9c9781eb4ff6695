//! Embedding client for DashScope text-embedding models.

use async_trait::async_trait;
use std::sync::Arc;

use super::types::{
    Document, Embedding, EmbeddingOptions, EmbeddingRequest, EmbeddingResponse,
    EmbeddingResponseMetadata, MetadataMode,
};
use super::EmbeddingClient;
use crate::dashscope::types::DEFAULT_EMBEDDING_MODEL;
use crate::dashscope::{TextEmbeddingApi, TextEmbeddingParam, TextType};
use crate::resilience::RetryTemplate;
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_MAX_BATCH_SIZE: usize = 25;

/// Output size of the known text-embedding models.
fn known_dimensions(model: &str) -> Option<usize> {
    match model {
        "text-embedding-v1" | "text-embedding-v2" => Some(1536),
        "text-embedding-v3" => Some(1024),
        _ => None,
    }
}

pub struct DashScopeEmbeddingClient {
    api: Arc<dyn TextEmbeddingApi>,
    default_options: EmbeddingOptions,
    metadata_mode: MetadataMode,
    retry: RetryTemplate,
    max_batch_size: usize,
}

impl DashScopeEmbeddingClient {
    pub fn new(api: Arc<dyn TextEmbeddingApi>) -> Self {
        Self::builder(api).build()
    }

    pub fn builder(api: Arc<dyn TextEmbeddingApi>) -> DashScopeEmbeddingClientBuilder {
        DashScopeEmbeddingClientBuilder {
            api,
            default_options: EmbeddingOptions::default(),
            metadata_mode: MetadataMode::default(),
            retry: RetryTemplate::default(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    fn resolve(&self, options: Option<&EmbeddingOptions>) -> (String, TextType) {
        let model = options
            .and_then(|o| o.model.clone())
            .or_else(|| self.default_options.model.clone())
            .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
        let text_type = options
            .and_then(|o| o.text_type)
            .or(self.default_options.text_type)
            .unwrap_or_default();
        (model, text_type)
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f64>> {
        self.single(vec![text.to_string()]).await
    }

    /// Embed a document, formatted according to the client's metadata mode.
    pub async fn embed_document(&self, document: &Document) -> Result<Vec<f64>> {
        self.single(vec![document.formatted_content(self.metadata_mode)])
            .await
    }

    pub async fn embed_all(&self, texts: &[impl AsRef<str>]) -> Result<Vec<Vec<f64>>> {
        let instructions = texts.iter().map(|t| t.as_ref().to_string()).collect();
        Ok(self
            .call(&EmbeddingRequest::new(instructions, None))
            .await?
            .into_vectors())
    }

    /// Vector size of the default model; unknown models are probed once.
    pub async fn dimensions(&self) -> Result<usize> {
        let (model, _) = self.resolve(None);
        if let Some(known) = known_dimensions(&model) {
            return Ok(known);
        }
        Ok(self.embed("Hello World").await?.len())
    }

    async fn single(&self, instructions: Vec<String>) -> Result<Vec<f64>> {
        let response = self.call(&EmbeddingRequest::new(instructions, None)).await?;
        response
            .into_vectors()
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::validation_with_context(
                    "No embedding returned",
                    ErrorContext::new()
                        .with_field_path("output.embeddings")
                        .with_source("embedding_client"),
                )
            })
    }
}

#[async_trait]
impl EmbeddingClient for DashScopeEmbeddingClient {
    async fn call(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse> {
        let (model, text_type) = self.resolve(request.options.as_ref());
        tracing::debug!(model = %model, inputs = request.instructions.len(), "retrieving embeddings");

        let mut results = Vec::with_capacity(request.instructions.len());
        let mut total_tokens = 0u64;
        for (batch, chunk) in request
            .instructions
            .chunks(self.max_batch_size)
            .enumerate()
        {
            let param = TextEmbeddingParam::new(model.clone(), chunk.to_vec(), text_type);
            let result = self.retry.execute(|| self.api.call(&param)).await?;
            let offset = batch * self.max_batch_size;
            results.extend(result.output.embeddings.into_iter().map(|item| Embedding {
                index: item.text_index + offset,
                output: item.embedding,
            }));
            total_tokens += result.usage.total_tokens;
        }

        if results.is_empty() {
            tracing::warn!(model = %model, "No embeddings returned");
        }
        Ok(EmbeddingResponse {
            results,
            metadata: EmbeddingResponseMetadata {
                model,
                total_tokens,
            },
        })
    }
}

pub struct DashScopeEmbeddingClientBuilder {
    api: Arc<dyn TextEmbeddingApi>,
    default_options: EmbeddingOptions,
    metadata_mode: MetadataMode,
    retry: RetryTemplate,
    max_batch_size: usize,
}

impl DashScopeEmbeddingClientBuilder {
    pub fn default_options(mut self, options: EmbeddingOptions) -> Self {
        self.default_options = options;
        self
    }

    pub fn metadata_mode(mut self, mode: MetadataMode) -> Self {
        self.metadata_mode = mode;
        self
    }

    pub fn retry(mut self, retry: RetryTemplate) -> Self {
        self.retry = retry;
        self
    }

    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }

    pub fn build(self) -> DashScopeEmbeddingClient {
        DashScopeEmbeddingClient {
            api: self.api,
            default_options: self.default_options,
            metadata_mode: self.metadata_mode,
            retry: self.retry,
            max_batch_size: self.max_batch_size,
        }
    }
}
