//! Language-model backed [`Reasoner`].
//!
//! [`LlmReasoner`] talks to any OpenAI-compatible chat-completions endpoint
//! (OpenRouter by default). Exploration uses native tool calling; selector
//! proposals and revisions ask for a JSON object and dig it out of whatever
//! prose the model wraps around it.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};

use crate::agent::{History, HistoryEntry, StateSummary};
use crate::reasoner::{Decision, Proposal, ProposalContext, Reasoner, Revision, Step, ToolCall};
use crate::selectors::{Field, SelectorPatch, SelectorSet};
use crate::validate::ValidationResult;
use crate::{Result, ScoutError, tools};

pub mod prompts;
pub mod remote;

use remote::{ChatClient, ChatMessage, FunctionCall, WireToolCall};

/// Default chat-completions endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";

/// Connection and sampling settings for the language model.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 2_000,
            timeout: 60,
        }
    }
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), ..Self::default() }
    }
}

/// Extract a JSON object from text that may wrap it in markdown fences or prose.
pub fn extract_json_from_text(text: &str) -> Option<String> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(text[start..=end].to_string()),
        _ => None,
    }
}

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>\]\[)(,`]+"#).expect("hardcoded regex pattern is valid"));

/// Every http(s) URL mentioned in free text, in order of appearance.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for m in URL_PATTERN.find_iter(text) {
        let url = m.as_str().trim_end_matches(['.', ';', ':']).to_string();
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// Parse the `field -> selector` object out of a model answer.
fn selector_pairs(content: &str) -> Result<Vec<(String, String)>> {
    let json = extract_json_from_text(content)
        .ok_or_else(|| ScoutError::transient("No JSON object found in the model answer"))?;
    let map: Map<String, Value> = serde_json::from_str(&json)
        .map_err(|e| ScoutError::transient(format!("Model answer is not a JSON object: {}", e)))?;
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k, s)),
            _ => None,
        })
        .collect())
}

/// [`Reasoner`] backed by a chat-completions model.
pub struct LlmReasoner {
    client: ChatClient,
}

impl LlmReasoner {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self { client: ChatClient::new(config)? })
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    fn transcript(history: &History, summary: &StateSummary) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(prompts::exploration_system(&summary.base_url, summary.max_articles))];
        for entry in history.entries() {
            match entry {
                HistoryEntry::Task { text } => messages.push(ChatMessage::user(text.clone())),
                HistoryEntry::Thought { thought, calls, .. } => {
                    let wire = calls
                        .iter()
                        .map(|call| WireToolCall {
                            id: call.id.clone(),
                            kind: "function".to_string(),
                            function: FunctionCall {
                                name: call.name.clone(),
                                arguments: match &call.args {
                                    Value::String(raw) => raw.clone(),
                                    other => other.to_string(),
                                },
                            },
                        })
                        .collect();
                    messages.push(ChatMessage::assistant(thought.clone(), wire));
                }
                HistoryEntry::Observation { call_id, observation, .. } => {
                    messages.push(ChatMessage::tool(call_id.clone(), observation.to_string()));
                }
                HistoryEntry::Completion { thought, .. } => {
                    messages.push(ChatMessage::assistant(thought.clone(), Vec::new()));
                }
            }
        }
        messages.push(ChatMessage::user(format!(
            "Current state:\n{}\nDecide the next step: call tools, or reply with {}: and the article URLs.",
            summary,
            prompts::FINAL_ANSWER
        )));
        messages
    }

    async fn ask_json(&self, prompt: String) -> Result<(Vec<(String, String)>, crate::reasoner::TokenUsage)> {
        let reply = self.client.complete(&[ChatMessage::user(prompt)], None).await?;
        let content = reply.content.ok_or_else(|| ScoutError::transient("Model returned an empty answer"))?;
        Ok((selector_pairs(&content)?, reply.usage))
    }
}

#[async_trait]
impl Reasoner for LlmReasoner {
    async fn decide(&self, history: &History, summary: &StateSummary) -> Result<Decision> {
        let messages = Self::transcript(history, summary);
        let definitions = tools::definitions();
        let reply = self.client.complete(&messages, Some(&definitions)).await?;
        let thought = reply.content.unwrap_or_default();

        let step = if reply.tool_calls.is_empty() {
            Step::Complete { urls: extract_urls(&thought) }
        } else {
            let calls = reply
                .tool_calls
                .into_iter()
                .enumerate()
                .map(|(i, call)| ToolCall {
                    id: if call.id.is_empty() { format!("call_{}_{}", summary.iteration, i) } else { call.id },
                    name: call.function.name,
                    args: serde_json::from_str(&call.function.arguments)
                        .unwrap_or(Value::String(call.function.arguments)),
                })
                .collect();
            Step::Invoke { calls }
        };

        Ok(Decision { thought, step, usage: reply.usage })
    }

    async fn propose_selectors(&self, context: &ProposalContext) -> Result<Proposal> {
        let (pairs, usage) = self.ask_json(prompts::proposal(context)).await?;
        Ok(Proposal { selectors: SelectorSet::from_pairs(pairs), usage })
    }

    async fn revise_selectors(
        &self, context: &ProposalContext, current: &SelectorSet, validation: &ValidationResult, failing: &[Field],
    ) -> Result<Revision> {
        let (pairs, usage) = self.ask_json(prompts::revision(context, current, validation, failing)).await?;
        Ok(Revision { patch: SelectorPatch::from_pairs(pairs), usage })
    }
}
