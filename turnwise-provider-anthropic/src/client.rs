//! The streaming Messages API client.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use turnwise_types::{ProtocolStream, Provider, ProviderError, ProviderRequest};

use crate::error::{map_http_status, map_reqwest_error};
use crate::mapping::to_api_request;
use crate::sse::protocol_events;

const FALLBACK_MODEL: &str = "claude-sonnet-4-20250514";
const PUBLIC_ENDPOINT: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Streams turns from the Anthropic Messages API.
///
/// Every [`Provider::stream`] call is one `POST /v1/messages` with
/// `"stream": true`. A non-2xx status is mapped to a [`ProviderError`]
/// before any event is produced, so the caller may retry it; the body of a
/// 2xx response is framed lazily into protocol events.
///
/// ```no_run
/// use std::time::Duration;
/// use turnwise_provider_anthropic::Anthropic;
///
/// let client = Anthropic::new(std::env::var("ANTHROPIC_API_KEY").unwrap_or_default())
///     .model("claude-haiku-4-5-20251001")
///     .connect_timeout(Duration::from_secs(5));
/// ```
#[derive(Clone)]
pub struct Anthropic {
    api_key: String,
    fallback_model: String,
    endpoint: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for Anthropic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anthropic")
            .field("fallback_model", &self.fallback_model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Anthropic {
    /// A client for the public endpoint using `api_key`.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            fallback_model: FALLBACK_MODEL.into(),
            endpoint: PUBLIC_ENDPOINT.into(),
            http: http_client(CONNECT_TIMEOUT),
        }
    }

    /// Model sent when a request leaves `model` empty.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    /// Point at a proxy or a test server. A trailing `/` is ignored.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Limit how long establishing a connection may take. Reading the
    /// stream is never time-limited here.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.http = http_client(timeout);
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.endpoint)
    }

    fn headers(&self) -> Result<HeaderMap, ProviderError> {
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| ProviderError::Authentication("API key is not a valid header".into()))?;
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

fn http_client(connect_timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "turnwise.llm.client_fallback");
            reqwest::Client::new()
        })
}

impl Provider for Anthropic {
    fn stream(
        &self,
        request: ProviderRequest,
    ) -> impl Future<Output = Result<ProtocolStream, ProviderError>> + Send {
        let url = self.messages_url();
        let headers = self.headers();
        let http = self.http.clone();
        let mut body = to_api_request(&request, &self.fallback_model);
        body["stream"] = serde_json::Value::Bool(true);

        async move {
            let headers = headers?;
            tracing::debug!(
                model = %body["model"],
                messages = request.messages.len(),
                tools = request.tools.len(),
                thinking = request.reasoning_budget_tokens.is_some(),
                "turnwise.llm.open_stream"
            );

            let response = http
                .post(&url)
                .headers(headers)
                .json(&body)
                .send()
                .await
                .map_err(map_reqwest_error)?;

            let status = response.status();
            if status.is_success() {
                return Ok(protocol_events(response.bytes_stream()));
            }
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            Err(map_http_status(status, &headers, &text))
        }
    }
}
