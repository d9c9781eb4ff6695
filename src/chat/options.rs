//! Chat options and the options merger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::dashscope::ResultFormat;
use crate::tools::{FunctionCallback, FunctionCallbacks};
use crate::types::{ToolChoice, ToolDefinition};

/// DashScope generation options. Every field is optional; unset fields fall
/// back to the client's defaults when merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashScopeChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
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
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_search: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_format: Option<ResultFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental_output: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Names of registered tools enabled for the call.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub functions: BTreeSet<String>,
    /// Callbacks supplied together with these options.
    #[serde(skip)]
    pub function_callbacks: FunctionCallbacks,
}

impl DashScopeChatOptions {
    pub fn builder() -> DashScopeChatOptionsBuilder {
        DashScopeChatOptionsBuilder::default()
    }

    /// Field-wise merge: a value set in `overrides` wins, otherwise the
    /// default is kept. Enabled function names are unioned and callbacks
    /// concatenated.
    pub fn merge(defaults: &Self, overrides: &Self) -> Self {
        let mut functions = defaults.functions.clone();
        functions.extend(overrides.functions.iter().cloned());
        let mut callbacks = defaults.function_callbacks.0.clone();
        callbacks.extend(overrides.function_callbacks.iter().cloned());

        Self {
            model: overrides.model.clone().or_else(|| defaults.model.clone()),
            seed: overrides.seed.or(defaults.seed),
            max_tokens: overrides.max_tokens.or(defaults.max_tokens),
            top_p: overrides.top_p.or(defaults.top_p),
            top_k: overrides.top_k.or(defaults.top_k),
            repetition_penalty: overrides.repetition_penalty.or(defaults.repetition_penalty),
            presence_penalty: overrides.presence_penalty.or(defaults.presence_penalty),
            temperature: overrides.temperature.or(defaults.temperature),
            user: overrides.user.clone().or_else(|| defaults.user.clone()),
            stop: overrides.stop.clone().or_else(|| defaults.stop.clone()),
            enable_search: overrides.enable_search.or(defaults.enable_search),
            result_format: overrides.result_format.or(defaults.result_format),
            incremental_output: overrides.incremental_output.or(defaults.incremental_output),
            tools: overrides.tools.clone().or_else(|| defaults.tools.clone()),
            tool_choice: overrides
                .tool_choice
                .clone()
                .or_else(|| defaults.tool_choice.clone()),
            functions,
            function_callbacks: FunctionCallbacks(callbacks),
        }
    }
}

#[derive(Debug, Default)]
pub struct DashScopeChatOptionsBuilder {
    options: DashScopeChatOptions,
}

impl DashScopeChatOptionsBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.options.model = Some(model.into());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.options.top_p = Some(top_p);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.options.top_k = Some(top_k);
        self
    }

    pub fn repetition_penalty(mut self, penalty: f64) -> Self {
        self.options.repetition_penalty = Some(penalty);
        self
    }

    pub fn presence_penalty(mut self, penalty: f64) -> Self {
        self.options.presence_penalty = Some(penalty);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.options.user = Some(user.into());
        self
    }

    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.options.stop = Some(stop);
        self
    }

    pub fn enable_search(mut self, enable: bool) -> Self {
        self.options.enable_search = Some(enable);
        self
    }

    pub fn result_format(mut self, format: ResultFormat) -> Self {
        self.options.result_format = Some(format);
        self
    }

    pub fn incremental_output(mut self, incremental: bool) -> Self {
        self.options.incremental_output = Some(incremental);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.options.tools = Some(tools);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.options.tool_choice = Some(choice);
        self
    }

    /// Enable a registered tool by name.
    pub fn function(mut self, name: impl Into<String>) -> Self {
        self.options.functions.insert(name.into());
        self
    }

    pub fn functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.functions.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn function_callback(mut self, callback: Arc<dyn FunctionCallback>) -> Self {
        self.options.function_callbacks.0.push(callback);
        self
    }

    pub fn build(self) -> DashScopeChatOptions {
        self.options
    }
}

/// Provider-agnostic options a prompt may carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortableChatOptions {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
}

impl From<&PortableChatOptions> for DashScopeChatOptions {
    fn from(portable: &PortableChatOptions) -> Self {
        Self {
            model: portable.model.clone(),
            temperature: portable.temperature,
            top_p: portable.top_p,
            top_k: portable.top_k,
            max_tokens: portable.max_tokens,
            stop: portable.stop.clone(),
            ..Self::default()
        }
    }
}
