//! DashScope 厂商边界：原生请求/响应类型、调用接口与 HTTP 实现。
//!
//! # DashScope Vendor Boundary
//!
//! The chat and embedding clients only depend on the [`GenerationApi`],
//! [`TextEmbeddingApi`] and [`ResultCallback`] traits. [`DashScopeApi`] is
//! the implementation over DashScope's native HTTP + SSE protocol.

pub mod api;
pub mod client;
pub mod sse;
pub mod types;

pub use api::{GenerationApi, ResultCallback, StreamStatus, TextEmbeddingApi};
pub use client::DashScopeApi;
pub use types::{
    ChatMessage, GenerationChoice, GenerationParam, GenerationResult, GenerationUsage,
    ResultFormat, Role, TextEmbeddingParam, TextEmbeddingResult, TextType,
};
