//! 类型系统模块：与厂商无关的对话、工具调用与响应类型。
//!
//! # Types Module
//!
//! Provider-agnostic primitives the chat client speaks. The DashScope wire
//! representations live in [`crate::dashscope::types`] and are converted to
//! and from these types at the edges.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role and content |
//! | [`MessageRole`] | Message role (system, user, assistant, tool) |
//! | [`ToolDefinition`] | Tool definition for model context |
//! | [`ToolCall`] | Function/tool call from model response |
//! | [`ChatResponse`] | Generations plus request metadata and usage |
//!
//! ## Example
//!
//! ```rust
//! use dashscope_ai::types::{Message, ToolDefinition};
//!
//! let system = Message::system("You are a helpful assistant");
//! let user = Message::user("What's the weather?");
//!
//! let tool = ToolDefinition::function(
//!     "get_weather",
//!     Some("Get current weather for a location".to_string()),
//!     Some(serde_json::json!({
//!         "type": "object",
//!         "properties": { "location": {"type": "string"} }
//!     })),
//! );
//! assert_eq!(tool.name(), "get_weather");
//! ```

pub mod message;
pub mod response;
pub mod tool;

pub use message::{Message, MessageRole};
pub use response::{ChatResponse, ChatResponseMetadata, Generation, GenerationMetadata, Usage};
pub use tool::{FunctionCall, FunctionDefinition, ToolCall, ToolChoice, ToolDefinition};
