//! Provider-agnostic chat results

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token accounting for a single model request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub generation_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, generation_tokens: u64, total_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            generation_tokens,
            total_tokens,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

/// One candidate output of the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    /// Free-form properties: `role`, `id` (request id), `finishReason`.
    #[serde(default)]
    pub info: Map<String, Value>,
    pub metadata: GenerationMetadata,
}

impl Generation {
    pub fn role(&self) -> Option<&str> {
        self.info.get("role").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponseMetadata {
    pub id: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub generations: Vec<Generation>,
    pub metadata: ChatResponseMetadata,
}

impl ChatResponse {
    /// First generation, if any.
    pub fn result(&self) -> Option<&Generation> {
        self.generations.first()
    }

    /// Text of the first generation, or an empty string.
    pub fn text(&self) -> &str {
        self.result().map(|g| g.text.as_str()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }
}
