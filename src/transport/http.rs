use crate::config::ConnectionProperties;
use crate::{BoxStream, Error, ErrorContext, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::Proxy;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Correlation id attached to every outbound request.
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-dashscope-client-request-id";

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(connection: &ConnectionProperties) -> Result<Self> {
        let api_key = connection.resolve_api_key().ok_or_else(|| {
            Error::configuration_with_context(
                "DashScope API key is not configured",
                ErrorContext::new()
                    .with_field_path("connection.api_key")
                    .with_details("set DASHSCOPE_API_KEY or connection.api_key")
                    .with_source("http_transport"),
            )
        })?;

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(connection.timeout_secs.max(1)))
            .pool_max_idle_per_host(
                env::var("DASHSCOPE_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(
                env::var("DASHSCOPE_HTTP_POOL_IDLE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(90),
            )))
            .user_agent(concat!("dashscope-ai/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy_url) = connection.proxy_url.as_deref() {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    format!("Invalid proxy URL: {}", e),
                    ErrorContext::new()
                        .with_field_path("connection.proxy_url")
                        .with_source("http_transport"),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let base_url = url::Url::parse(&connection.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("Invalid base URL: {}", e),
                ErrorContext::new()
                    .with_field_path("connection.base_url")
                    .with_details(connection.base_url.clone())
                    .with_source("http_transport"),
            )
        })?;

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .post(url)
            .bearer_auth(&self.api_key)
            .header(CLIENT_REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string())
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(path)
            .json(body)
            .send()
            .await
            .map_err(TransportError::Http)?;
        let response = check_status(response).await?;
        let text = response.text().await.map_err(TransportError::Http)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// POST a JSON body asking for a server-sent-events response.
    ///
    /// Returns the response headers' request id (if any) and the raw body
    /// stream once the server accepted the request.
    pub async fn post_sse<B>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(Option<String>, BoxStream<'static, Bytes>)>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .request(path)
            .header("accept", "text/event-stream")
            .header("X-DashScope-SSE", "enable")
            .json(body)
            .send()
            .await
            .map_err(TransportError::Http)?;
        let response = check_status(response).await?;
        let request_id = response
            .headers()
            .get("x-request-id")
            .or_else(|| response.headers().get("x-dashscope-request-id"))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let byte_stream = response
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));
        Ok((request_id, Box::pin(byte_stream)))
    }
}

/// Error body returned by DashScope for failed calls.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl ApiErrorBody {
    pub(crate) fn into_error(self, status: Option<u16>, raw: &str) -> Error {
        Error::Vendor {
            status,
            code: self.code,
            message: self.message.unwrap_or_else(|| raw.trim().to_string()),
            request_id: self.request_id,
        }
    }
}

pub(crate) fn vendor_error(status: Option<u16>, body: &str) -> Error {
    serde_json::from_str::<ApiErrorBody>(body)
        .unwrap_or_default()
        .into_error(status, body)
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!("DashScope API error {}: {}", status, body);
    Err(vendor_error(Some(status.as_u16()), &body))
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
