use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g., "output.choices[0].message.content")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Stage that raised the error (e.g., "options_merger", "tool_dispatch")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the DashScope adapter.
///
/// Categories follow what a caller can do about them: configuration and
/// validation errors are fatal to the call, vendor and transport errors are
/// candidates for the retry policy, stream errors terminate a stream.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("DashScope error{}: {message}{}", format_status(.status, .code), format_request_id(.request_id))]
    Vendor {
        status: Option<u16>,
        code: Option<String>,
        message: String,
        request_id: Option<String>,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Stream error: {message}: {source}")]
    Stream {
        message: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Tool '{name}' failed: {message}")]
    Tool { name: String, message: String },

    #[error("Tool dispatch did not finish within {max_iterations} model calls")]
    ToolLoopExceeded { max_iterations: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_status(status: &Option<u16>, code: &Option<String>) -> String {
    match (status, code) {
        (Some(s), Some(c)) => format!(" HTTP {} ({})", s, c),
        (Some(s), None) => format!(" HTTP {}", s),
        (None, Some(c)) => format!(" ({})", c),
        (None, None) => String::new(),
    }
}

fn format_request_id(request_id: &Option<String>) -> String {
    request_id
        .as_ref()
        .map(|id| format!(" [request_id: {}]", id))
        .unwrap_or_default()
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::configuration_with_context(msg, ErrorContext::new())
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_with_context(msg, ErrorContext::new())
    }

    /// Create a new validation (invalid argument) error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Wrap any error raised while establishing or consuming a stream.
    ///
    /// Already-wrapped stream errors are passed through unchanged.
    pub fn stream(msg: impl Into<String>, source: Error) -> Self {
        match source {
            Error::Stream { .. } => source,
            other => Error::Stream {
                message: msg.into(),
                source: Box::new(other),
            },
        }
    }

    pub fn tool(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Tool {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    /// HTTP status reported by the vendor, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Vendor { status, .. } => *status,
            Error::Stream { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Whether re-running the failed unit of work may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Vendor { status: None, .. } => true,
            Error::Vendor {
                status: Some(status),
                ..
            } => matches!(*status, 408 | 429) || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = Error::configuration_with_context(
            "No function callback found for function name: lookup_weather",
            ErrorContext::new()
                .with_field_path("output.choices[0].message.tool_calls[0]")
                .with_source("tool_dispatch"),
        );
        let text = err.to_string();
        assert!(text.starts_with("Configuration error: No function callback"));
        assert!(text.contains("source: tool_dispatch"));
        assert_eq!(
            err.context().and_then(|c| c.source.as_deref()),
            Some("tool_dispatch")
        );
    }

    #[test]
    fn vendor_errors_classify_by_status() {
        let vendor = |status| Error::Vendor {
            status,
            code: Some("Throttling".into()),
            message: "slow down".into(),
            request_id: Some("req-1".into()),
        };
        assert!(vendor(Some(429)).is_retryable());
        assert!(vendor(Some(503)).is_retryable());
        assert!(vendor(None).is_retryable());
        assert!(!vendor(Some(401)).is_retryable());
        assert_eq!(
            vendor(Some(429)).to_string(),
            "DashScope error HTTP 429 (Throttling): slow down [request_id: req-1]"
        );
    }

    #[test]
    fn stream_wrapping_is_not_nested() {
        let inner = Error::Vendor {
            status: Some(500),
            code: None,
            message: "boom".into(),
            request_id: None,
        };
        let once = Error::stream("stream callback failed", inner);
        let twice = Error::stream("again", once);
        match &twice {
            Error::Stream { message, source } => {
                assert_eq!(message, "stream callback failed");
                assert!(matches!(**source, Error::Vendor { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(twice.status(), Some(500));
        assert!(!twice.is_retryable());
        assert!(!Error::tool("x", "bad").is_retryable());
        assert!(!Error::validation("empty").is_retryable());
    }
}
