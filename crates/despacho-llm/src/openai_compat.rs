//! OpenAI-compatible chat-completions decision layer.
//!
//! Works with any endpoint speaking the `/v1/chat/completions` protocol with
//! function tools (`OpenAI`, LM Studio, vLLM, Ollama).

use async_trait::async_trait;
use despacho_core::ActionPayload;
use reqwest::Client;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::decision::DecisionLayer;
use crate::error::{LlmError, LlmResult};
use crate::tools::{action_tools, payload_from_tool_call, tool_for_kind};
use crate::types::{Decision, Message, MessageRole, Proposal, ToolCall, ToolDefinition};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a customs and trade-compliance assistant for a \
Brazilian import broker. Answer questions directly. When the user asks you to send an email or to \
register a DUIMP, call the matching tool; the user will review a preview and confirm before \
anything is executed. Never claim an action was performed.";

/// Decision layer backed by an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiCompatDecisionLayer {
    client: Client,
    model: String,
    max_tokens: usize,
    temperature: f64,
    base_url: String,
    api_key: Option<String>,
    system_prompt: String,
}

impl OpenAiCompatDecisionLayer {
    /// Create a layer for `OpenAI`.
    #[must_use]
    pub fn openai(api_key: &str, model: &str) -> Self {
        Self::custom(DEFAULT_OPENAI_URL, Some(api_key), model)
    }

    /// Create a layer for any compatible endpoint.
    #[must_use]
    pub fn custom(base_url: &str, api_key: Option<&str>, model: &str) -> Self {
        Self {
            client: Client::new(),
            model: model.to_string(),
            max_tokens: 1024,
            temperature: 0.2,
            base_url: base_url.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(ToString::to_string),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Set max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Replace the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Replace the HTTP client (e.g. one with a request timeout).
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn build_request(&self, messages: &[Message], tools: &[ToolDefinition], forced: Option<&str>) -> Value {
        let mut openai_messages = Vec::with_capacity(messages.len().saturating_add(1));
        if !self.system_prompt.is_empty() {
            openai_messages.push(json!({"role": "system", "content": self.system_prompt}));
        }
        for msg in messages {
            let role = match msg.role {
                MessageRole::System => "system",
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            };
            openai_messages.push(json!({"role": role, "content": msg.content}));
        }

        let mut body = json!({
            "model": self.model,
            "messages": openai_messages,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });
        if !tools.is_empty() {
            let openai_tools: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(openai_tools);
            if let Some(name) = forced {
                body["tool_choice"] = json!({"type": "function", "function": {"name": name}});
            }
        }
        body
    }

    async fn complete(&self, request_body: &Value) -> LlmResult<OpenAiMessage> {
        if self.api_key.is_none() && !is_local_url(&self.base_url) {
            return Err(LlmError::ApiKeyNotConfigured {
                provider: "openai-compat".to_string(),
            });
        }

        debug!(model = %self.model, base_url = %self.base_url, "Requesting completion");

        let mut request = self
            .client
            .post(&self.base_url)
            .header("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            let mut auth_value = HeaderValue::try_from(format!("Bearer {api_key}")).map_err(|e| {
                LlmError::ApiRequestFailed(format!("Invalid API key characters: {e}"))
            })?;
            auth_value.set_sensitive(true);
            request = request.header("Authorization", auth_value);
        }

        let response = request
            .json(request_body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Completion request failed");
            return Err(LlmError::InvalidResponse(format!(
                "HTTP {}: {body}",
                status.as_u16()
            )));
        }

        let response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))
    }
}

/// Turn the first tool call of a message into a proposal, or its text into a reply.
fn decision_from_message(message: OpenAiMessage) -> LlmResult<Decision> {
    let note = message.content.filter(|c| !c.trim().is_empty());
    match message.tool_calls.unwrap_or_default().into_iter().next() {
        Some(tc) => {
            let call = tool_call(tc)?;
            let payload = payload_from_tool_call(&call)?;
            Ok(Decision::Propose(Proposal { payload, note }))
        },
        None => Ok(Decision::Reply(note.unwrap_or_default())),
    }
}

fn tool_call(tc: OpenAiToolCall) -> LlmResult<ToolCall> {
    let arguments: Value = serde_json::from_str(&tc.function.arguments)
        .map_err(|e| LlmError::InvalidResponse(format!("Invalid tool arguments JSON: {e}")))?;
    Ok(ToolCall {
        id: tc.id,
        name: tc.function.name,
        arguments,
    })
}

fn regeneration_prompt(prior: &ActionPayload, instruction: &str) -> LlmResult<String> {
    let current = serde_json::to_string_pretty(prior)
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
    Ok(format!(
        "Revise the pending {} draft below following this instruction: {instruction}\n\
         Keep every field the instruction does not ask to change.\n\nCurrent draft:\n{current}",
        prior.kind()
    ))
}

#[async_trait]
impl DecisionLayer for OpenAiCompatDecisionLayer {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn decide(&self, history: &[Message]) -> LlmResult<Decision> {
        let body = self.build_request(history, &action_tools(), None);
        let message = self.complete(&body).await?;
        decision_from_message(message)
    }

    async fn regenerate(
        &self,
        history: &[Message],
        prior: &ActionPayload,
        instruction: &str,
    ) -> LlmResult<ActionPayload> {
        let tool = tool_for_kind(prior.kind()).ok_or_else(|| {
            LlmError::InvalidResponse(format!("cannot regenerate {} drafts", prior.kind()))
        })?;

        let mut messages = history.to_vec();
        messages.push(Message::user(regeneration_prompt(prior, instruction)?));
        let body = self.build_request(&messages, std::slice::from_ref(&tool), Some(&tool.name));
        let message = self.complete(&body).await?;

        match decision_from_message(message)? {
            Decision::Propose(proposal) if proposal.payload.kind() == prior.kind() => {
                Ok(proposal.payload)
            },
            Decision::Propose(proposal) => Err(LlmError::InvalidResponse(format!(
                "regeneration changed kind from {} to {}",
                prior.kind(),
                proposal.payload.kind()
            ))),
            Decision::Reply(_) => Err(LlmError::InvalidResponse(
                "model did not call the revision tool".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for OpenAiCompatDecisionLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatDecisionLayer")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

/// Whether a URL points at a local endpoint, where no API key is expected.
fn is_local_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("localhost") || lower.contains("127.0.0.1") || lower.contains("[::1]")
}
