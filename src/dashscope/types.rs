//! DashScope native request/response shapes

use serde::{Deserialize, Deserializer, Serialize};

use crate::chat::DashScopeChatOptions;
use crate::types::{ToolCall, ToolChoice, ToolDefinition};

pub const DEFAULT_CHAT_MODEL: &str = "qwen-turbo";
pub const DEFAULT_TEMPERATURE: f64 = 0.95;
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-v1";

/// Output shape requested from the generation endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    Text,
    #[default]
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Message as DashScope sends and receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            name: Some(name.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Request descriptor for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParam {
    pub model: String,
    pub input: GenerationInput,
    #[serde(default)]
    pub parameters: GenerationParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationInput {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_format: Option<ResultFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_search: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental_output: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

impl GenerationParam {
    /// Compile options and messages into a request, filling the documented
    /// fallbacks for model, temperature and result format.
    pub fn from_options(options: &DashScopeChatOptions, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: options
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            input: GenerationInput { messages },
            parameters: GenerationParameters {
                result_format: Some(options.result_format.unwrap_or_default()),
                seed: options.seed,
                max_tokens: options.max_tokens,
                top_p: options.top_p,
                top_k: options.top_k,
                repetition_penalty: options.repetition_penalty,
                presence_penalty: options.presence_penalty,
                temperature: Some(options.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
                stop: options.stop.clone(),
                enable_search: options.enable_search,
                incremental_output: options.incremental_output,
                user: options.user.clone(),
                tools: options.tools.clone().filter(|t| !t.is_empty()),
                tool_choice: options.tool_choice.clone(),
            },
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.input.messages
    }

    pub fn result_format(&self) -> ResultFormat {
        self.parameters.result_format.unwrap_or_default()
    }
}

/// Result of one generation call, or one streamed event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub output: GenerationOutput,
    #[serde(default)]
    pub usage: GenerationUsage,
}

impl GenerationResult {
    /// Assistant message of the first choice when it requests tool calls.
    pub fn tool_call_message(&self) -> Option<&ChatMessage> {
        self.output
            .choices
            .first()
            .map(|c| &c.message)
            .filter(|m| m.has_tool_calls())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<GenerationChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationChoice {
    #[serde(default)]
    pub finish_reason: Option<String>,
    pub message: ChatMessage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl GenerationUsage {
    pub fn total(&self) -> u64 {
        self.total_tokens
            .unwrap_or(self.input_tokens + self.output_tokens)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextType {
    Query,
    #[default]
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEmbeddingParam {
    pub model: String,
    pub input: TextEmbeddingInput,
    pub parameters: TextEmbeddingParameters,
}

impl TextEmbeddingParam {
    pub fn new(model: impl Into<String>, texts: Vec<String>, text_type: TextType) -> Self {
        Self {
            model: model.into(),
            input: TextEmbeddingInput { texts },
            parameters: TextEmbeddingParameters { text_type },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEmbeddingInput {
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEmbeddingParameters {
    pub text_type: TextType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextEmbeddingResult {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub output: TextEmbeddingOutput,
    #[serde(default)]
    pub usage: TextEmbeddingUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextEmbeddingOutput {
    #[serde(default)]
    pub embeddings: Vec<TextEmbeddingItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEmbeddingItem {
    pub text_index: usize,
    pub embedding: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEmbeddingUsage {
    #[serde(default)]
    pub total_tokens: u64,
}
