//! 对话模块：DashScope 对话客户端、选项合并、工具调度循环与流式桥接。
//!
//! # Chat Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`translate`] | Generic messages to DashScope messages |
//! | [`options`] | Chat options and the options merger |
//! | [`dispatch`] | Tool/function dispatch loop |
//! | [`mapper`] | DashScope results to [`ChatResponse`] |
//! | [`streaming`] | Callback to stream bridge |
//! | [`client`] | [`DashScopeChatClient`] |
//!
//! ```rust,no_run
//! use dashscope_ai::chat::{ChatClient, DashScopeChatClient, Prompt};
//! use dashscope_ai::config::ConnectionProperties;
//! use dashscope_ai::dashscope::DashScopeApi;
//! use std::sync::Arc;
//!
//! # async fn run() -> dashscope_ai::Result<()> {
//! let api = Arc::new(DashScopeApi::new(&ConnectionProperties::default())?);
//! let client = DashScopeChatClient::new(api);
//! let response = client.call(&Prompt::user("What is 2+2?")).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod dispatch;
pub mod mapper;
pub mod options;
pub mod prompt;
pub mod streaming;
pub mod translate;

use async_trait::async_trait;

use crate::types::ChatResponse;
use crate::{BoxStream, Result};

pub use client::{CompiledRequest, DashScopeChatClient, DashScopeChatClientBuilder};
pub use dispatch::{ToolDispatcher, DEFAULT_MAX_TOOL_ITERATIONS};
pub use mapper::EmptyContentPolicy;
pub use options::{DashScopeChatOptions, DashScopeChatOptionsBuilder, PortableChatOptions};
pub use prompt::{Prompt, PromptOptions};
pub use streaming::StreamBridge;

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn call(&self, prompt: &Prompt) -> Result<ChatResponse>;
}

#[async_trait]
pub trait StreamingChatClient: Send + Sync {
    /// Open a stream of incremental responses. Failures after this returns
    /// arrive as the stream's terminal `Error::Stream` item.
    async fn stream(&self, prompt: &Prompt) -> Result<BoxStream<'static, ChatResponse>>;
}
