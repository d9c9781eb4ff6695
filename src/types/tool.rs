//! Tool calling definitions shared by the chat client and the DashScope wire format

use serde::{Deserialize, Serialize};

pub const FUNCTION_TOOL_TYPE: &str = "function";

/// Tool definition (for function calling)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String, // "function"
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: Option<String>,
        parameters: Option<serde_json::Value>,
    ) -> Self {
        Self {
            tool_type: FUNCTION_TOOL_TYPE.to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description,
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>, // JSON Schema
}

/// Tool call (invocation from model)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub tool_type: String,
    #[serde(default)]
    pub function: FunctionCall,
}

impl ToolCall {
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tool_type: FUNCTION_TOOL_TYPE.to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn is_function(&self) -> bool {
        self.tool_type == FUNCTION_TOOL_TYPE
    }
}

fn default_tool_type() -> String {
    FUNCTION_TOOL_TYPE.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    /// Arguments as serialized JSON text, exactly as the model produced them.
    #[serde(default)]
    pub arguments: String,
}

/// Which tool, if any, the model should call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    Mode(ToolChoiceMode),
    Function(NamedToolChoice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoiceMode {
    None,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedToolChoice {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: NamedFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedFunction {
    pub name: String,
}

impl ToolChoice {
    pub fn none() -> Self {
        ToolChoice::Mode(ToolChoiceMode::None)
    }

    pub fn auto() -> Self {
        ToolChoice::Mode(ToolChoiceMode::Auto)
    }

    /// Force the model to call the named function.
    pub fn function(name: impl Into<String>) -> Self {
        ToolChoice::Function(NamedToolChoice {
            tool_type: FUNCTION_TOOL_TYPE.to_string(),
            function: NamedFunction { name: name.into() },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_choice_wire_shapes() {
        assert_eq!(serde_json::to_value(ToolChoice::auto()).unwrap(), json!("auto"));
        assert_eq!(serde_json::to_value(ToolChoice::none()).unwrap(), json!("none"));
        assert_eq!(
            serde_json::to_value(ToolChoice::function("lookup_weather")).unwrap(),
            json!({"type": "function", "function": {"name": "lookup_weather"}})
        );
        let parsed: ToolChoice =
            serde_json::from_value(json!({"type": "function", "function": {"name": "x"}}))
                .unwrap();
        assert_eq!(parsed, ToolChoice::function("x"));
    }

    #[test]
    fn tool_call_defaults_to_function_type() {
        let call: ToolCall = serde_json::from_value(json!({
            "id": "call_1",
            "function": {"name": "lookup_weather", "arguments": "{\"city\":\"Paris\"}"}
        }))
        .unwrap();
        assert!(call.is_function());
        assert_eq!(call.function.arguments, r#"{"city":"Paris"}"#);
    }
}
