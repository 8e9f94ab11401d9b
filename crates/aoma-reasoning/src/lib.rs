//! Reasoning service backed by the Anthropic Messages API.
//!
//! Failures are classified for the step executor: rate limits, overload,
//! server errors, timeouts and connection errors are transient; every other
//! rejection is permanent.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use aoma_core::{CoreError, ReasoningRequest, ReasoningResponse, ReasoningService, ServiceError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

const API_VERSION: &str = "2023-06-01";

/// HTTP status Anthropic uses for an overloaded API
const OVERLOADED: u16 = 529;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Base URL, without trailing slash
    pub api_base: String,
    /// Fallback timeout for requests that do not carry their own
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 120,
        }
    }
}

/// Reasoning service calling the Messages API
#[derive(Debug, Clone)]
pub struct AnthropicReasoningService {
    config: AnthropicConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

impl AnthropicReasoningService {
    /// Create a client. Fails without an API key.
    pub fn new(config: AnthropicConfig) -> Result<Self, CoreError> {
        if config.api_key.trim().is_empty() {
            return Err(CoreError::ConfigurationError(
                "Anthropic API key is required. Set ANTHROPIC_API_KEY.".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::ConfigurationError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// The configured model
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn map_http_error(error: reqwest::Error) -> ServiceError {
        if error.is_timeout() {
            ServiceError::Transient(format!("Request timeout: {}", error))
        } else if error.is_connect() {
            ServiceError::Transient(format!("Connection error: {}", error))
        } else if error.is_request() || error.is_body() {
            ServiceError::Transient(format!("HTTP error: {}", error))
        } else {
            ServiceError::Permanent(format!("HTTP error: {}", error))
        }
    }
}

/// Classify a non-success status
pub fn classify_status(status: StatusCode, body: &str) -> ServiceError {
    let message = format!("Anthropic API error ({}): {}", status, body);
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
        || status.as_u16() == OVERLOADED
    {
        ServiceError::Transient(message)
    } else {
        ServiceError::Permanent(message)
    }
}

#[async_trait]
impl ReasoningService for AnthropicReasoningService {
    #[instrument(skip(self, request), fields(step_id = %request.step_id, model = %self.config.model))]
    async fn invoke(&self, request: ReasoningRequest) -> Result<ReasoningResponse, ServiceError> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens,
            system: Some(request.system_prompt.as_str()).filter(|s| !s.trim().is_empty()),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.config.api_base.trim_end_matches('/')))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let error = classify_status(status, &text);
            warn!(status = %status, transient = error.is_transient(), "Anthropic request rejected");
            return Err(error);
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Transient(format!("Failed to parse Anthropic response: {}", e)))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = parsed.stop_reason.as_deref().unwrap_or("unknown"),
                "Anthropic response received"
            );
        }

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if text.trim().is_empty() {
            return Err(ServiceError::Transient("Empty response from Anthropic".to_string()));
        }

        Ok(ReasoningResponse::new(text))
    }
}
