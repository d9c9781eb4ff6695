//! DashScope results -> ChatResponse

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dashscope::{GenerationResult, GenerationUsage, Role};
use crate::types::{ChatResponse, ChatResponseMetadata, Generation, GenerationMetadata, Usage};
use crate::{Error, ErrorContext, Result};

/// What to do with a choice whose content is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyContentPolicy {
    #[default]
    Reject,
    Allow,
}

pub fn to_usage(usage: &GenerationUsage) -> Usage {
    Usage::new(usage.input_tokens, usage.output_tokens, usage.total())
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

/// In-progress stream chunks carry the literal string "null".
fn finish_reason(raw: Option<&String>) -> Option<String> {
    raw.filter(|reason| !reason.is_empty() && reason.as_str() != "null")
        .cloned()
}

fn generation(
    text: String,
    role: Role,
    request_id: &str,
    finish_reason: Option<String>,
    usage: Usage,
) -> Generation {
    let mut info = Map::new();
    info.insert("role".into(), Value::from(role_name(role)));
    info.insert("id".into(), Value::from(request_id));
    info.insert(
        "finishReason".into(),
        finish_reason.clone().map(Value::from).unwrap_or(Value::Null),
    );
    Generation {
        text,
        info,
        metadata: GenerationMetadata {
            finish_reason,
            usage,
        },
    }
}

/// Map one vendor result into a response: one generation per choice.
pub fn to_chat_response(result: &GenerationResult, policy: EmptyContentPolicy) -> Result<ChatResponse> {
    let usage = to_usage(&result.usage);
    let metadata = ChatResponseMetadata {
        id: Some(result.request_id.clone()).filter(|id| !id.is_empty()),
        usage,
    };

    let generations = if !result.output.choices.is_empty() {
        result
            .output
            .choices
            .iter()
            .enumerate()
            .map(|(index, choice)| {
                if choice.message.content.is_empty() && policy == EmptyContentPolicy::Reject {
                    return Err(Error::validation_with_context(
                        "Model returned empty content",
                        ErrorContext::new()
                            .with_field_path(format!("output.choices[{}].message.content", index))
                            .with_details(format!("request_id: {}", result.request_id))
                            .with_source("response_mapper"),
                    ));
                }
                Ok(generation(
                    choice.message.content.clone(),
                    choice.message.role,
                    &result.request_id,
                    finish_reason(choice.finish_reason.as_ref()),
                    usage,
                ))
            })
            .collect::<Result<Vec<_>>>()?
    } else if let Some(text) = result.output.text.as_ref() {
        if text.is_empty() && policy == EmptyContentPolicy::Reject {
            return Err(Error::validation_with_context(
                "Model returned empty content",
                ErrorContext::new()
                    .with_field_path("output.text")
                    .with_source("response_mapper"),
            ));
        }
        vec![generation(
            text.clone(),
            Role::Assistant,
            &result.request_id,
            finish_reason(result.output.finish_reason.as_ref()),
            usage,
        )]
    } else {
        tracing::warn!(request_id = %result.request_id, "No choices returned");
        Vec::new()
    };

    Ok(ChatResponse {
        generations,
        metadata,
    })
}
