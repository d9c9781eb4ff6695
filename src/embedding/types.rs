//! Embedding types and data structures.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::dashscope::TextType;

/// Which document metadata is folded into the text that gets embedded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataMode {
    All,
    #[default]
    Embed,
    Inference,
    None,
}

/// A piece of content with metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    /// Metadata keys left out of the embedded text.
    #[serde(default)]
    pub excluded_embed_metadata_keys: Vec<String>,
    /// Metadata keys left out of the text shown to a model.
    #[serde(default)]
    pub excluded_inference_metadata_keys: Vec<String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Render the content with the metadata the mode keeps, as
    /// `key: value` lines followed by a blank line and the content.
    pub fn formatted_content(&self, mode: MetadataMode) -> String {
        let excluded: &[String] = match mode {
            MetadataMode::All => &[],
            MetadataMode::Embed => &self.excluded_embed_metadata_keys,
            MetadataMode::Inference => &self.excluded_inference_metadata_keys,
            MetadataMode::None => return self.content.clone(),
        };
        let lines: Vec<String> = self
            .metadata
            .iter()
            .filter(|(key, _)| !excluded.contains(key))
            .map(|(key, value)| match value {
                Value::String(s) => format!("{}: {}", key, s),
                other => format!("{}: {}", key, other),
            })
            .collect();
        if lines.is_empty() {
            self.content.clone()
        } else {
            format!("{}\n\n{}", lines.join("\n"), self.content)
        }
    }
}

/// Per-request embedding options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingOptions {
    pub model: Option<String>,
    pub text_type: Option<TextType>,
}

impl EmbeddingOptions {
    pub fn model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            text_type: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingRequest {
    pub instructions: Vec<String>,
    pub options: Option<EmbeddingOptions>,
}

impl EmbeddingRequest {
    pub fn new(instructions: Vec<String>, options: Option<EmbeddingOptions>) -> Self {
        Self {
            instructions,
            options,
        }
    }
}

/// A single embedding vector and the index of its input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub index: usize,
    pub output: Vec<f64>,
}

impl Embedding {
    pub fn dimensions(&self) -> usize {
        self.output.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponseMetadata {
    pub model: String,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub results: Vec<Embedding>,
    pub metadata: EmbeddingResponseMetadata,
}

impl EmbeddingResponse {
    /// Vectors ordered by input index.
    pub fn into_vectors(mut self) -> Vec<Vec<f64>> {
        self.results.sort_by_key(|e| e.index);
        self.results.into_iter().map(|e| e.output).collect()
    }
}
