//! Generic conversation -> DashScope messages

use crate::dashscope::{ChatMessage, Role};
use crate::types::{Message, MessageRole};
use crate::{Error, ErrorContext, Result};

/// Map a generic role to its DashScope counterpart.
pub fn to_role(role: MessageRole) -> Result<Role> {
    match role {
        MessageRole::System => Ok(Role::System),
        MessageRole::User => Ok(Role::User),
        MessageRole::Assistant => Ok(Role::Assistant),
        MessageRole::Tool => Ok(Role::Tool),
        MessageRole::Unknown => Err(Error::validation_with_context(
            "Unsupported message role",
            ErrorContext::new()
                .with_field_path("message.role")
                .with_source("message_translator"),
        )),
    }
}

/// Translate a conversation, preserving order. Messages whose role cannot be
/// sent are dropped.
pub fn to_vendor_messages(messages: &[Message]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter_map(|message| match to_role(message.role) {
            Ok(role) => Some(ChatMessage {
                role,
                content: message.content.clone(),
                name: message.name.clone(),
                tool_call_id: message.tool_call_id.clone(),
                tool_calls: Vec::new(),
            }),
            Err(_) => {
                tracing::debug!(role = ?message.role, "dropping message with unsupported role");
                None
            }
        })
        .collect()
}
