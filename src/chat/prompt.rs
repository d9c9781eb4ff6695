use super::options::{DashScopeChatOptions, PortableChatOptions};
use crate::embedding::EmbeddingOptions;
use crate::types::Message;
use crate::{Error, ErrorContext, Result};

/// Options a prompt may carry.
#[derive(Debug, Clone)]
pub enum PromptOptions {
    Portable(PortableChatOptions),
    DashScope(DashScopeChatOptions),
    Embedding(EmbeddingOptions),
}

impl PromptOptions {
    /// Resolve into DashScope chat options; embedding options are rejected.
    pub fn to_chat_options(&self) -> Result<DashScopeChatOptions> {
        match self {
            PromptOptions::DashScope(options) => Ok(options.clone()),
            PromptOptions::Portable(options) => Ok(DashScopeChatOptions::from(options)),
            PromptOptions::Embedding(_) => Err(Error::validation_with_context(
                "Prompt options are not chat options",
                ErrorContext::new()
                    .with_details("embedding options cannot drive a chat call")
                    .with_field_path("prompt.options")
                    .with_source("options_merger"),
            )),
        }
    }
}

impl From<DashScopeChatOptions> for PromptOptions {
    fn from(options: DashScopeChatOptions) -> Self {
        PromptOptions::DashScope(options)
    }
}

impl From<PortableChatOptions> for PromptOptions {
    fn from(options: PortableChatOptions) -> Self {
        PromptOptions::Portable(options)
    }
}

impl From<EmbeddingOptions> for PromptOptions {
    fn from(options: EmbeddingOptions) -> Self {
        PromptOptions::Embedding(options)
    }
}

/// An ordered conversation plus optional per-call options.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub messages: Vec<Message>,
    pub options: Option<PromptOptions>,
}

impl Prompt {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            options: None,
        }
    }

    /// Single user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(vec![Message::user(text)])
    }

    pub fn with_options(mut self, options: impl Into<PromptOptions>) -> Self {
        self.options = Some(options.into());
        self
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Prompt::user(text)
    }
}

impl From<Vec<Message>> for Prompt {
    fn from(messages: Vec<Message>) -> Self {
        Prompt::new(messages)
    }
}
