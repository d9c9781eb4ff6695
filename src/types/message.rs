//! Provider-agnostic conversation messages

use serde::{Deserialize, Serialize};

/// One turn of a conversation.
///
/// Messages are values: a conversation grows by appending new messages,
/// existing ones are never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, text)
    }

    /// Result of a tool invocation, linked to the call that requested it.
    pub fn tool(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            role: MessageRole::Tool,
            content: text.into(),
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
        }
    }

    pub fn with_role(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: text.into(),
            tool_call_id: None,
            name: None,
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    #[serde(alias = "function")]
    Tool,
    /// Any role this crate does not know how to send.
    #[serde(other)]
    Unknown,
}
