//! 向量嵌入模块：基于 DashScope 文本嵌入模型生成向量。
//!
//! # Embedding Module
//!
//! [`DashScopeEmbeddingClient`] turns texts or [`Document`]s into vectors.
//! Large inputs are split into batches; indices in the response always refer
//! to positions in the original input.

pub mod client;
pub mod types;

use async_trait::async_trait;

use crate::Result;

pub use client::{DashScopeEmbeddingClient, DashScopeEmbeddingClientBuilder, DEFAULT_MAX_BATCH_SIZE};
pub use types::{
    Document, Embedding, EmbeddingOptions, EmbeddingRequest, EmbeddingResponse,
    EmbeddingResponseMetadata, MetadataMode,
};

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn call(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse>;
}
