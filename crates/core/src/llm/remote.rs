use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::LlmConfig;
use crate::reasoner::TokenUsage;
use crate::{Result, ScoutError};

/// Client for an OpenAI-compatible chat-completions endpoint with tool calling.
pub struct ChatClient {
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ScoutError::InvalidInput("an API key is required for the language model".to_string()));
        }
        let client = reqwest::Client::builder().build().map_err(ScoutError::HttpError)?;
        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat request. `tools` enables function calling.
    pub async fn complete(&self, messages: &[ChatMessage], tools: Option<&[Value]>) -> Result<ChatReply> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            tools,
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        };

        let exchange = async {
            let response = self
                .client
                .post(&self.endpoint)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        let (status, text) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ScoutError::transient(format!("LLM request timed out after {:?}", self.timeout)))?
            .map_err(|e| ScoutError::transient(format!("LLM HTTP request failed: {}", e)))?;

        if !status.is_success() {
            let transient = status.as_u16() == 429 || status.is_server_error();
            return Err(ScoutError::Reasoner { message: format!("LLM API error {}: {}", status, text), transient });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ScoutError::transient(format!("Failed to parse LLM response: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ScoutError::transient("LLM response has no choices"))?;

        let usage = parsed
            .usage
            .map(|u| {
                let input = u.prompt_tokens.unwrap_or(0);
                let output = u.completion_tokens.unwrap_or(0);
                TokenUsage { input, output, total: u.total_tokens.unwrap_or(input + output) }
            })
            .unwrap_or_default();

        debug!(model = %self.model, input = usage.input, output = usage.output, "LLM reply");

        Ok(ChatReply {
            content: choice.message.content.filter(|c| !c.trim().is_empty()),
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
            usage,
        })
    }
}

/// One message of a chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: Some(content.into()), tool_calls: None, tool_call_id: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: Some(content.into()), tool_calls: None, tool_call_id: None }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<WireToolCall>) -> Self {
        let content = content.into();
        Self {
            role: "assistant".to_string(),
            content: (!content.is_empty()).then_some(content),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            tool_call_id: None,
        }
    }

    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
        }
    }
}

/// A function call as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments.
    #[serde(default)]
    pub arguments: String,
}

/// The useful part of a chat-completions response.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub content: Option<String>,
    pub tool_calls: Vec<WireToolCall>,
    pub usage: TokenUsage,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Value]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
    #[serde(default)]
    total_tokens: Option<u64>,
}
