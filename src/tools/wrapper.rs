//! Closure-backed function callbacks.

use async_trait::async_trait;
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use super::FunctionCallback;
use crate::{Error, Result};

type Handler = dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// [`FunctionCallback`] built from an async closure over a typed input.
pub struct FunctionCallbackWrapper {
    name: String,
    description: String,
    input_schema: Value,
    handler: Box<Handler>,
}

impl FunctionCallbackWrapper {
    pub fn builder(name: impl Into<String>) -> FunctionCallbackWrapperBuilder {
        FunctionCallbackWrapperBuilder {
            name: name.into(),
            description: String::new(),
        }
    }
}

pub struct FunctionCallbackWrapperBuilder {
    name: String,
    description: String,
}

impl FunctionCallbackWrapperBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Finish with the handler; the input schema is derived from `I`.
    pub fn build<I, O, F, Fut>(self, handler: F) -> Arc<dyn FunctionCallback>
    where
        I: DeserializeOwned + JsonSchema + Send + 'static,
        O: Serialize + Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let name = self.name.clone();
        let erased = move |args: Value| -> BoxFuture<'static, Result<Value>> {
            let handler = handler.clone();
            let name = name.clone();
            Box::pin(async move {
                let input: I = serde_json::from_value(args).map_err(|e| {
                    Error::tool(name.as_str(), format!("invalid arguments: {}", e))
                })?;
                let output = handler(input).await?;
                Ok(serde_json::to_value(output)?)
            })
        };

        let schema = serde_json::to_value(schemars::schema_for!(I)).unwrap_or(Value::Null);
        Arc::new(FunctionCallbackWrapper {
            name: self.name,
            description: self.description,
            input_schema: schema,
            handler: Box::new(erased),
        })
    }
}

#[async_trait]
impl FunctionCallback for FunctionCallbackWrapper {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Option<Value> {
        Some(self.input_schema.clone()).filter(|s| !s.is_null())
    }

    async fn call(&self, arguments: &str) -> Result<String> {
        let args = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments).map_err(|e| {
                Error::tool(self.name.as_str(), format!("arguments are not JSON: {}", e))
            })?
        };
        let output = (self.handler)(args).await?;
        Ok(match output {
            Value::String(text) => text,
            other => other.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Weather {
        city: String,
    }

    #[derive(Serialize)]
    struct Report {
        city: String,
        celsius: i32,
    }

    #[tokio::test]
    async fn string_outputs_are_unquoted() {
        let cb = FunctionCallbackWrapper::builder("lookup_weather")
            .description("Current weather")
            .build(|w: Weather| async move { Ok(format!("Sunny in {}", w.city)) });
        assert_eq!(cb.call(r#"{"city":"Paris"}"#).await.unwrap(), "Sunny in Paris");
        let schema = cb.input_schema().unwrap();
        assert_eq!(schema["properties"]["city"]["type"], "string");
        assert_eq!(cb.definition().function.description.as_deref(), Some("Current weather"));
    }

    #[tokio::test]
    async fn structured_outputs_are_serialized() {
        let cb = FunctionCallbackWrapper::builder("report").build(|w: Weather| async move {
            Ok(Report {
                city: w.city,
                celsius: 21,
            })
        });
        let out: Value = serde_json::from_str(&cb.call(r#"{"city":"Oslo"}"#).await.unwrap()).unwrap();
        assert_eq!(out, serde_json::json!({"city": "Oslo", "celsius": 21}));
    }

    #[tokio::test]
    async fn bad_arguments_are_tool_errors() {
        let cb = FunctionCallbackWrapper::builder("lookup_weather")
            .build(|w: Weather| async move { Ok(w.city) });
        let err = cb.call("{\"town\":1}").await.unwrap_err();
        assert!(matches!(err, Error::Tool { ref name, .. } if name == "lookup_weather"));
        assert!(matches!(cb.call("not json").await, Err(Error::Tool { .. })));
    }
}
