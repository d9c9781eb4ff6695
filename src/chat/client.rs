use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use super::dispatch::ToolDispatcher;
use super::mapper::{to_chat_response, EmptyContentPolicy};
use super::options::DashScopeChatOptions;
use super::prompt::Prompt;
use super::streaming::{StreamBridge, DEFAULT_STREAM_BUFFER};
use super::translate::to_vendor_messages;
use super::{ChatClient, StreamingChatClient};
use crate::dashscope::{GenerationApi, GenerationParam, ResultCallback};
use crate::resilience::RetryTemplate;
use crate::tools::{ToolRegistry, ToolSnapshot};
use crate::types::ChatResponse;
use crate::{BoxStream, Result};

/// Chat client for DashScope generation models.
///
/// Non-streaming calls run the whole tool dispatch loop under the retry
/// template. Streaming calls retry only the establishment of the stream.
pub struct DashScopeChatClient {
    api: Arc<dyn GenerationApi>,
    default_options: DashScopeChatOptions,
    registry: Arc<ToolRegistry>,
    retry: RetryTemplate,
    dispatcher: ToolDispatcher,
    empty_content: EmptyContentPolicy,
    stream_buffer: usize,
}

/// Request compiled from a prompt, plus the tools visible to it.
pub struct CompiledRequest {
    pub param: GenerationParam,
    pub tools: ToolSnapshot,
}

impl DashScopeChatClient {
    /// Client with the stock defaults (temperature 0.95, top_p 0.7).
    pub fn new(api: Arc<dyn GenerationApi>) -> Self {
        Self::builder(api).build()
    }

    pub fn builder(api: Arc<dyn GenerationApi>) -> DashScopeChatClientBuilder {
        DashScopeChatClientBuilder {
            api,
            default_options: DashScopeChatOptions::builder()
                .temperature(0.95)
                .top_p(0.7)
                .build(),
            registry: None,
            retry: RetryTemplate::default(),
            dispatcher: ToolDispatcher::default(),
            empty_content: EmptyContentPolicy::default(),
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }

    pub fn default_options(&self) -> &DashScopeChatOptions {
        &self.default_options
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Merge default and per-call options and resolve enabled tools.
    pub fn create_request(&self, prompt: &Prompt) -> Result<CompiledRequest> {
        let runtime = prompt
            .options
            .as_ref()
            .map(|o| o.to_chat_options())
            .transpose()?
            .unwrap_or_default();

        let mut enabled: BTreeSet<String> = self.default_options.functions.clone();
        enabled.extend(runtime.functions.iter().cloned());
        enabled.extend(runtime.function_callbacks.names().map(str::to_string));

        let merged = DashScopeChatOptions::merge(&self.default_options, &runtime);
        let tools = self
            .registry
            .snapshot()
            .with_callbacks(merged.function_callbacks.iter());

        let mut param = GenerationParam::from_options(&merged, to_vendor_messages(&prompt.messages));
        if !enabled.is_empty() {
            let resolved = tools.definitions(&enabled)?;
            let mut definitions = param.parameters.tools.take().unwrap_or_default();
            let mut seen: HashSet<String> =
                definitions.iter().map(|d| d.name().to_string()).collect();
            for definition in resolved {
                if seen.insert(definition.name().to_string()) {
                    definitions.push(definition);
                }
            }
            param.parameters.tools = Some(definitions);
        }

        tracing::debug!(
            model = %param.model,
            messages = param.messages().len(),
            tools = param.parameters.tools.as_ref().map(Vec::len).unwrap_or(0),
            "compiled generation request"
        );
        Ok(CompiledRequest { param, tools })
    }

    async fn run_once(&self, request: &CompiledRequest) -> Result<ChatResponse> {
        let result = self
            .dispatcher
            .run(
                self.api.as_ref(),
                request.param.clone(),
                &request.tools,
                &self.default_options,
            )
            .await?;
        to_chat_response(&result, self.empty_content)
    }
}

#[async_trait]
impl ChatClient for DashScopeChatClient {
    async fn call(&self, prompt: &Prompt) -> Result<ChatResponse> {
        let request = self.create_request(prompt)?;
        self.retry.execute(|| self.run_once(&request)).await
    }
}

#[async_trait]
impl StreamingChatClient for DashScopeChatClient {
    async fn stream(&self, prompt: &Prompt) -> Result<BoxStream<'static, ChatResponse>> {
        let request = self.create_request(prompt)?;
        let (bridge, stream) = StreamBridge::channel(self.stream_buffer, self.empty_content);
        let callback: Arc<dyn ResultCallback> = bridge.clone();

        let established = self
            .retry
            .execute(|| {
                self.api
                    .stream_call(request.param.clone(), callback.clone())
            })
            .await;
        if let Err(e) = established {
            tracing::warn!(error = %e, "could not open DashScope stream");
            bridge.on_error(e).await;
        }
        Ok(stream)
    }
}

pub struct DashScopeChatClientBuilder {
    api: Arc<dyn GenerationApi>,
    default_options: DashScopeChatOptions,
    registry: Option<Arc<ToolRegistry>>,
    retry: RetryTemplate,
    dispatcher: ToolDispatcher,
    empty_content: EmptyContentPolicy,
    stream_buffer: usize,
}

impl DashScopeChatClientBuilder {
    pub fn default_options(mut self, options: DashScopeChatOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Share a registry with other clients. Callbacks in this client's
    /// default options stay local to it and are never added to the registry.
    pub fn registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn retry(mut self, retry: RetryTemplate) -> Self {
        self.retry = retry;
        self
    }

    pub fn max_tool_iterations(mut self, max_iterations: usize) -> Self {
        self.dispatcher = ToolDispatcher::new(max_iterations);
        self
    }

    pub fn empty_content(mut self, policy: EmptyContentPolicy) -> Self {
        self.empty_content = policy;
        self
    }

    pub fn stream_buffer(mut self, capacity: usize) -> Self {
        self.stream_buffer = capacity.max(1);
        self
    }

    /// Callbacks in the default options are resolvable by this client only;
    /// they are sent to the model only when enabled by name.
    pub fn build(self) -> DashScopeChatClient {
        DashScopeChatClient {
            api: self.api,
            default_options: self.default_options,
            registry: self.registry.unwrap_or_default(),
            retry: self.retry,
            dispatcher: self.dispatcher,
            empty_content: self.empty_content,
            stream_buffer: self.stream_buffer,
        }
    }
}

impl std::fmt::Debug for DashScopeChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashScopeChatClient")
            .field("default_options", &self.default_options)
            .field(
                "tools",
                &self
                    .registry
                    .snapshot()
                    .with_callbacks(self.default_options.function_callbacks.iter())
                    .names(),
            )
            .field("max_tool_iterations", &self.dispatcher.max_iterations())
            .field("empty_content", &self.empty_content)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::PortableChatOptions;
    use crate::dashscope::{GenerationResult, TextType};
    use crate::embedding::EmbeddingOptions;
    use crate::tools::FunctionCallbackWrapper;
    use crate::types::{Message, ToolDefinition};
    use crate::Error;
    use schemars::JsonSchema;
    use serde::Deserialize;

    struct Unreachable;

    #[async_trait]
    impl GenerationApi for Unreachable {
        async fn call(&self, _param: &GenerationParam) -> Result<GenerationResult> {
            unreachable!("request compilation must not call the model")
        }

        async fn stream_call(
            &self,
            _param: GenerationParam,
            _callback: Arc<dyn ResultCallback>,
        ) -> Result<()> {
            unreachable!("request compilation must not call the model")
        }
    }

    #[derive(Deserialize, JsonSchema)]
    struct City {
        city: String,
    }

    fn weather() -> Arc<dyn crate::tools::FunctionCallback> {
        FunctionCallbackWrapper::builder("lookup_weather")
            .build(|c: City| async move { Ok(format!("Sunny in {}", c.city)) })
    }

    #[test]
    fn default_callbacks_are_resolvable_but_not_enabled() {
        let client = DashScopeChatClient::builder(Arc::new(Unreachable))
            .default_options(DashScopeChatOptions::builder().function_callback(weather()).build())
            .build();
        let request = client.create_request(&Prompt::user("hi")).unwrap();
        assert!(request.param.parameters.tools.is_none());
        assert!(request.tools.contains("lookup_weather"));

        let enabled = Prompt::user("hi")
            .with_options(DashScopeChatOptions::builder().function("lookup_weather").build());
        let request = client.create_request(&enabled).unwrap();
        let tools = request.param.parameters.tools.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "lookup_weather");
    }

    #[test]
    fn runtime_callbacks_are_enabled_and_explicit_tools_come_first() {
        let client = DashScopeChatClient::new(Arc::new(Unreachable));
        let prompt = Prompt::user("hi").with_options(
            DashScopeChatOptions::builder()
                .tools(vec![
                    ToolDefinition::function("web_search", None, None),
                    ToolDefinition::function("lookup_weather", None, None),
                ])
                .function_callback(weather())
                .build(),
        );
        let request = client.create_request(&prompt).unwrap();
        let names: Vec<String> = request
            .param
            .parameters
            .tools
            .unwrap()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["web_search", "lookup_weather"]);
        assert!(client.registry().snapshot().get("lookup_weather").is_none());
    }

    #[test]
    fn default_callbacks_do_not_leak_into_a_shared_registry() {
        let shared = Arc::new(ToolRegistry::new());
        let owner = DashScopeChatClient::builder(Arc::new(Unreachable))
            .registry(shared.clone())
            .default_options(DashScopeChatOptions::builder().function_callback(weather()).build())
            .build();
        let neighbour = DashScopeChatClient::builder(Arc::new(Unreachable))
            .registry(shared.clone())
            .build();

        assert!(shared.snapshot().get("lookup_weather").is_none());

        let enabled = Prompt::user("hi")
            .with_options(DashScopeChatOptions::builder().function("lookup_weather").build());
        let request = owner.create_request(&enabled).unwrap();
        assert!(request.tools.contains("lookup_weather"));
        assert!(matches!(
            neighbour.create_request(&enabled),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn unknown_enabled_tool_is_a_configuration_error() {
        let client = DashScopeChatClient::new(Arc::new(Unreachable));
        let prompt = Prompt::user("hi")
            .with_options(DashScopeChatOptions::builder().function("nope").build());
        assert!(matches!(
            client.create_request(&prompt),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn merged_options_reach_the_request() {
        let client = DashScopeChatClient::builder(Arc::new(Unreachable))
            .default_options(DashScopeChatOptions::builder().model("qwen-plus").top_p(0.8).build())
            .build();
        let prompt = Prompt::new(vec![Message::system("be brief"), Message::user("2+2?")])
            .with_options(PortableChatOptions {
                temperature: Some(0.2),
                ..Default::default()
            });
        let request = client.create_request(&prompt).unwrap();
        assert_eq!(request.param.model, "qwen-plus");
        assert_eq!(request.param.parameters.temperature, Some(0.2));
        assert_eq!(request.param.parameters.top_p, Some(0.8));
        assert_eq!(request.param.messages().len(), 2);

        let wrong = Prompt::user("hi").with_options(EmbeddingOptions {
            model: None,
            text_type: Some(TextType::Query),
        });
        assert!(matches!(
            client.create_request(&wrong),
            Err(Error::Validation { .. })
        ));
    }
}
