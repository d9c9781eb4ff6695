//! Tool/function dispatch loop
//!
//! ```text
//! AwaitingModel(request) --call--> result
//!   result has no tool calls        -> Done(result)
//!   result requests tool calls      -> run tools, append, AwaitingModel(follow-up)
//! ```

use super::options::DashScopeChatOptions;
use crate::dashscope::{ChatMessage, GenerationApi, GenerationParam, GenerationResult};
use crate::tools::ToolSnapshot;
use crate::{Error, Result};

pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 25;

enum LoopState {
    AwaitingModel(GenerationParam),
    Done(GenerationResult),
}

/// Runs model calls until the model stops requesting tools.
#[derive(Debug, Clone, Copy)]
pub struct ToolDispatcher {
    max_iterations: usize,
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOOL_ITERATIONS)
    }
}

impl ToolDispatcher {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Drive the loop to completion. `defaults` supplies the sampling
    /// configuration of follow-up requests.
    pub async fn run(
        &self,
        api: &dyn GenerationApi,
        request: GenerationParam,
        tools: &ToolSnapshot,
        defaults: &DashScopeChatOptions,
    ) -> Result<GenerationResult> {
        let mut state = LoopState::AwaitingModel(request);
        let mut calls = 0usize;

        loop {
            let request = match state {
                LoopState::Done(result) => return Ok(result),
                LoopState::AwaitingModel(request) => request,
            };
            if calls == self.max_iterations {
                return Err(Error::ToolLoopExceeded {
                    max_iterations: self.max_iterations,
                });
            }
            calls += 1;

            let result = api.call(&request).await?;
            let assistant = match result.tool_call_message() {
                None => {
                    tracing::debug!(iteration = calls, "model answered without tool calls");
                    state = LoopState::Done(result);
                    continue;
                }
                Some(message) => message.clone(),
            };
            tracing::debug!(
                iteration = calls,
                tool_calls = assistant.tool_calls.len(),
                "model requested tool calls"
            );

            let mut history = request.input.messages.clone();
            history.push(assistant.clone());
            for call in &assistant.tool_calls {
                if !call.is_function() {
                    tracing::debug!(tool_type = %call.tool_type, id = %call.id, "skipping built-in tool call");
                    continue;
                }
                let name = call.function.name.as_str();
                let callback = tools.lookup(name)?;
                let content = callback
                    .call(&call.function.arguments)
                    .await
                    .map_err(|e| match e {
                        Error::Tool { .. } => e,
                        other => Error::tool(name, other.to_string()),
                    })?;
                history.push(ChatMessage::tool_result(call.id.as_str(), name, content));
            }

            state = LoopState::AwaitingModel(follow_up(&request, defaults, history));
        }
    }
}

/// Next request: default sampling configuration plus the full history. The
/// previous model and tool definitions carry over; tool choice does not.
fn follow_up(
    previous: &GenerationParam,
    defaults: &DashScopeChatOptions,
    history: Vec<ChatMessage>,
) -> GenerationParam {
    let mut next = GenerationParam::from_options(defaults, history);
    next.model = previous.model.clone();
    next.parameters.tools = previous.parameters.tools.clone();
    next.parameters.tool_choice = None;
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashscope::Role;
    use crate::types::{ToolChoice, ToolDefinition};

    #[test]
    fn follow_up_keeps_model_and_tools_but_drops_tool_choice() {
        let defaults = DashScopeChatOptions::builder()
            .model("qwen-turbo")
            .temperature(0.5)
            .build();
        let mut previous = GenerationParam::from_options(
            &DashScopeChatOptions::builder()
                .model("qwen-max")
                .tool_choice(ToolChoice::function("lookup_weather"))
                .tools(vec![ToolDefinition::function("lookup_weather", None, None)])
                .build(),
            vec![ChatMessage::new(Role::User, "weather?")],
        );
        previous.parameters.temperature = Some(0.1);

        let history = vec![
            ChatMessage::new(Role::User, "weather?"),
            ChatMessage::tool_result("call_1", "lookup_weather", "Sunny"),
        ];
        let next = follow_up(&previous, &defaults, history);
        assert_eq!(next.model, "qwen-max");
        assert_eq!(next.parameters.temperature, Some(0.5));
        assert_eq!(next.parameters.tools.as_ref().map(Vec::len), Some(1));
        assert!(next.parameters.tool_choice.is_none());
        assert!(next.messages().starts_with(previous.messages()));
    }
}
