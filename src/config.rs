//! 配置模块：从 YAML 与环境变量加载 DashScope 连接、对话、嵌入与重试配置。
//!
//! Precedence, lowest first: built-in defaults, the YAML document, then the
//! `DASHSCOPE_*` environment variables.
//!
//! ```yaml
//! connection:
//!   base_url: https://dashscope.aliyuncs.com
//!   timeout_secs: 60
//! chat:
//!   options:
//!     model: qwen-plus
//!     temperature: 0.7
//! embedding:
//!   metadata_mode: embed
//! retry:
//!   max_retries: 5
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::chat::{DashScopeChatClient, DashScopeChatOptions, EmptyContentPolicy};
use crate::dashscope::DashScopeApi;
use crate::embedding::{DashScopeEmbeddingClient, EmbeddingOptions, MetadataMode};
use crate::resilience::{RetryConfig, RetryTemplate};
use crate::tools::ToolRegistry;
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com";
pub const API_KEY_ENV: &str = "DASHSCOPE_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashScopeProperties {
    pub connection: ConnectionProperties,
    pub chat: ChatProperties,
    pub embedding: EmbeddingProperties,
    pub retry: RetryProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
            proxy_url: None,
        }
    }
}

impl ConnectionProperties {
    /// Configured key, else `DASHSCOPE_API_KEY`. Blank values count as unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(API_KEY_ENV)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatProperties {
    pub enabled: bool,
    pub options: DashScopeChatOptions,
    pub max_tool_iterations: usize,
    pub empty_content: EmptyContentPolicy,
    pub stream_buffer: usize,
}

impl Default for ChatProperties {
    fn default() -> Self {
        Self {
            enabled: true,
            options: DashScopeChatOptions::builder()
                .model(crate::dashscope::types::DEFAULT_CHAT_MODEL)
                .temperature(0.8)
                .top_p(0.8)
                .build(),
            max_tool_iterations: crate::chat::DEFAULT_MAX_TOOL_ITERATIONS,
            empty_content: EmptyContentPolicy::default(),
            stream_buffer: crate::chat::streaming::DEFAULT_STREAM_BUFFER,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingProperties {
    pub enabled: bool,
    pub options: EmbeddingOptions,
    pub metadata_mode: MetadataMode,
    pub max_batch_size: usize,
}

impl Default for EmbeddingProperties {
    fn default() -> Self {
        Self {
            enabled: true,
            options: EmbeddingOptions::model(crate::dashscope::types::DEFAULT_EMBEDDING_MODEL),
            metadata_mode: MetadataMode::Embed,
            max_batch_size: crate::embedding::DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryProperties {
    pub max_retries: u32,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryProperties {
    fn default() -> Self {
        let config = RetryConfig::default();
        Self {
            max_retries: config.max_retries,
            min_delay_ms: config.min_delay.as_millis() as u64,
            max_delay_ms: config.max_delay.as_millis() as u64,
            retry_on_status: config.retry_on_status,
        }
    }
}

impl RetryProperties {
    pub fn to_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms.max(self.min_delay_ms)),
            retry_on_status: self.retry_on_status.clone(),
        }
    }
}

impl DashScopeProperties {
    /// Parse YAML. Chat options given in the document are layered over the
    /// default chat options field by field.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut properties: Self = serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                format!("Invalid DashScope configuration: {}", e),
                ErrorContext::new().with_source("config"),
            )
        })?;
        properties.chat.options =
            DashScopeChatOptions::merge(&ChatProperties::default().options, &properties.chat.options);
        Ok(properties)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("Cannot read configuration file: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("config"),
            )
        })?;
        let mut properties = Self::from_yaml_str(&text)?;
        properties.apply_env_overrides();
        Ok(properties)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut properties = Self::default();
        properties.apply_env_overrides();
        properties
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `DASHSCOPE_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(API_KEY_ENV) {
            self.connection.api_key = Some(key);
        }
        if let Some(url) = get("DASHSCOPE_BASE_URL") {
            self.connection.base_url = url;
        }
        if let Some(secs) = get("DASHSCOPE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.connection.timeout_secs = secs;
        }
        if let Some(proxy) = get("DASHSCOPE_PROXY_URL") {
            self.connection.proxy_url = Some(proxy);
        }
        if let Some(model) = get("DASHSCOPE_CHAT_MODEL") {
            self.chat.options.model = Some(model);
        }
        if let Some(model) = get("DASHSCOPE_EMBEDDING_MODEL") {
            self.embedding.options.model = Some(model);
        }
        if let Some(retries) = get("DASHSCOPE_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.retry.max_retries = retries;
        }
    }

    fn retry_template(&self) -> RetryTemplate {
        RetryTemplate::from_config(self.retry.to_config())
    }

    /// Chat client wired from these properties, or `None` when chat is disabled.
    pub fn chat_client(&self, registry: Arc<ToolRegistry>) -> Result<Option<DashScopeChatClient>> {
        if !self.chat.enabled {
            return Ok(None);
        }
        let api = Arc::new(DashScopeApi::new(&self.connection)?);
        Ok(Some(
            DashScopeChatClient::builder(api)
                .default_options(self.chat.options.clone())
                .registry(registry)
                .retry(self.retry_template())
                .max_tool_iterations(self.chat.max_tool_iterations)
                .empty_content(self.chat.empty_content)
                .stream_buffer(self.chat.stream_buffer)
                .build(),
        ))
    }

    /// Embedding client wired from these properties, or `None` when disabled.
    pub fn embedding_client(&self) -> Result<Option<DashScopeEmbeddingClient>> {
        if !self.embedding.enabled {
            return Ok(None);
        }
        let api = Arc::new(DashScopeApi::new(&self.connection)?);
        Ok(Some(
            DashScopeEmbeddingClient::builder(api)
                .default_options(self.embedding.options.clone())
                .metadata_mode(self.embedding.metadata_mode)
                .retry(self.retry_template())
                .max_batch_size(self.embedding.max_batch_size)
                .build(),
        ))
    }
}
