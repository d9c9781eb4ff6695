//! # dashscope-ai
//!
//! 阿里云 DashScope（通义千问）对话与文本嵌入的 Rust 适配库，提供统一的对话/嵌入客户端抽象。
//!
//! Alibaba Cloud DashScope (Qwen) chat and embedding clients behind a
//! provider-agnostic chat/embedding abstraction.
//!
//! ## Overview
//!
//! A [`chat::Prompt`] (ordered messages plus optional options) goes through
//! the options merger into a DashScope request. The tool dispatch loop calls
//! the model, runs any requested tools and calls again until the model
//! answers. The response mapper turns the final result into a
//! [`types::ChatResponse`]. Streaming calls bridge DashScope's push
//! callbacks into a pull [`futures::Stream`].
//!
//! ## Key Features
//!
//! - **Tool calling**: register [`tools::FunctionCallback`]s, enable them by name per call
//! - **Streaming**: bounded, cancel-on-drop streams of incremental responses
//! - **Retries**: the whole dispatch loop is retried on transient failures
//! - **Embeddings**: batched text and document embeddings
//! - **Configuration**: YAML plus `DASHSCOPE_*` environment variables
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dashscope_ai::chat::{ChatClient, Prompt};
//! use dashscope_ai::config::DashScopeProperties;
//! use dashscope_ai::tools::ToolRegistry;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> dashscope_ai::Result<()> {
//!     let properties = DashScopeProperties::from_env();
//!     let client = properties
//!         .chat_client(Arc::new(ToolRegistry::new()))?
//!         .expect("chat is enabled by default");
//!
//!     let response = client.call(&Prompt::user("What is 2+2?")).await?;
//!     println!("{}", response.text());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`chat`] | Chat client, options merger, dispatch loop, streaming bridge |
//! | [`embedding`] | Embedding client and document types |
//! | [`tools`] | Function callbacks and the tool registry |
//! | [`dashscope`] | DashScope wire types, API traits and HTTP implementation |
//! | [`resilience`] | Retry policy and template |
//! | [`transport`] | HTTP client construction |
//! | [`config`] | Properties and client factories |
//! | [`types`] | Provider-agnostic messages, tools and responses |

pub mod chat;
pub mod config;
pub mod dashscope;
pub mod embedding;
pub mod resilience;
pub mod tools;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use chat::{
    ChatClient, DashScopeChatClient, DashScopeChatOptions, Prompt, StreamingChatClient,
};
pub use embedding::{DashScopeEmbeddingClient, EmbeddingClient};
pub use types::{
    message::{Message, MessageRole},
    response::ChatResponse,
    tool::ToolCall,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
