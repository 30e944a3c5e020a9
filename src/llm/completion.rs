//! Client for the completion gateway
//!
//! Wire shape: `{"model", "request": {"messages"}, "tools"?}` in,
//! `{"choices": [{"message": {"content"}}]}` out.

use super::types::{ChatMessage, CompletionRequest, CompletionResponse, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct CompletionService {
    client: Client,
    url: String,
    api_key: String,
}

impl CompletionService {
    /// `timeout` bounds the whole HTTP exchange
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    fn translate_request(request: &CompletionRequest) -> WireRequest<'_> {
        WireRequest {
            model: &request.model,
            request: WireConversation {
                messages: &request.messages,
            },
            tools: request.web_search.then(|| vec![WireTool { r#type: "web_search" }]),
        }
    }

    fn normalize_response(resp: WireResponse) -> Result<CompletionResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No choices in response"))?;

        let text = choice
            .message
            .content
            .ok_or_else(|| LlmError::unknown("Response message has no content"))?;

        let usage = resp.usage.map_or_else(Usage::default, |u| Usage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(CompletionResponse { text, usage })
    }
}

#[async_trait]
impl LlmService for CompletionService {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let wire_request = Self::translate_request(request);

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<WireErrorResponse>(&body)
                .map_or(body, |err| err.error.message);
            return Err(LlmError::from_status(status.as_u16(), &message));
        }

        let wire_response: WireResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(wire_response)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    request: WireConversation<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Serialize)]
struct WireConversation<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Debug, Serialize)]
struct WireTool {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}
