//! 工具调用模块：函数回调、闭包包装器与工具注册表。
//!
//! # Tools Module
//!
//! A [`FunctionCallback`] is a capability the model may invoke by name. The
//! [`ToolRegistry`] keeps them; each chat call works from an immutable
//! [`ToolSnapshot`] so registrations made mid-call never affect it.
//!
//! ```rust
//! use dashscope_ai::tools::{FunctionCallbackWrapper, ToolRegistry};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct Weather {
//!     city: String,
//! }
//!
//! let registry = ToolRegistry::new();
//! registry.register(FunctionCallbackWrapper::builder("lookup_weather")
//!     .description("Current weather for a city")
//!     .build(|input: Weather| async move { Ok(format!("Sunny in {}", input.city)) }));
//! assert!(registry.snapshot().contains("lookup_weather"));
//! ```

pub mod registry;
pub mod wrapper;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::types::ToolDefinition;
use crate::Result;

pub use registry::{ToolRegistry, ToolSnapshot};
pub use wrapper::{FunctionCallbackWrapper, FunctionCallbackWrapperBuilder};

/// A named capability the model can invoke.
#[async_trait]
pub trait FunctionCallback: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// JSON schema of the arguments object.
    fn input_schema(&self) -> Option<serde_json::Value> {
        None
    }

    /// Invoke with the model's serialized JSON arguments; returns the tool
    /// message content.
    async fn call(&self, arguments: &str) -> Result<String>;

    fn definition(&self) -> ToolDefinition {
        let description = Some(self.description().to_string()).filter(|d| !d.is_empty());
        ToolDefinition::function(self.name(), description, self.input_schema())
    }
}

/// Callbacks carried inside chat options. Only names appear in debug output.
#[derive(Clone, Default)]
pub struct FunctionCallbacks(pub Vec<Arc<dyn FunctionCallback>>);

impl FunctionCallbacks {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|c| c.name())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FunctionCallback>> {
        self.0.iter()
    }
}

impl fmt::Debug for FunctionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl From<Vec<Arc<dyn FunctionCallback>>> for FunctionCallbacks {
    fn from(callbacks: Vec<Arc<dyn FunctionCallback>>) -> Self {
        Self(callbacks)
    }
}
