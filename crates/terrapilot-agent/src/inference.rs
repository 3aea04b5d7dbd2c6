//! # HTTP Inference Adapter
//!
//! Talks to any OpenAI-compatible `chat/completions` endpoint (llama.cpp,
//! vLLM, Ollama, hosted APIs). The reply's text content runs through the
//! tool-call extractor; native `tool_calls` in the reply are preferred when
//! the server emits them.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use terrapilot_core::{CoreResult, InferenceAdapter, Prompt, ToolCall};
use tracing::{debug, warn};

use crate::config::InferenceConfig;
use crate::error::{AgentError, AgentResult};
use crate::extractor::extract_tool_call;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<NativeToolCall>,
}

#[derive(Debug, Deserialize)]
struct NativeToolCall {
    function: NativeFunction,
}

#[derive(Debug, Deserialize)]
struct NativeFunction {
    name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    arguments: String,
}

/// Inference adapter backed by an OpenAI-compatible HTTP endpoint
pub struct HttpInferenceAdapter {
    client: Client,
    config: InferenceConfig,
}

impl HttpInferenceAdapter {
    pub fn new(config: InferenceConfig) -> AgentResult<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> AgentResult<Self> {
        Self::new(InferenceConfig::from_env()?)
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    async fn complete(&self, prompt: &Prompt) -> AgentResult<ReplyMessage> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: 0.0,
        };

        let mut request = self.client.post(self.config.completions_url()).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AgentError::InvalidResponse(format!(
                "inference endpoint returned {status}: {detail}"
            )));
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| AgentError::InvalidResponse("reply contained no choices".to_string()))
    }
}

fn native_call(message: &ReplyMessage) -> Option<ToolCall> {
    let function = &message.tool_calls.first()?.function;
    let arguments = if function.arguments.trim().is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(&function.arguments).ok()?
    };
    Some(ToolCall::with_arguments(function.name.clone(), arguments))
}

#[async_trait]
impl InferenceAdapter for HttpInferenceAdapter {
    async fn infer(&self, prompt: &Prompt) -> CoreResult<Option<ToolCall>> {
        let message = self.complete(prompt).await?;

        if let Some(call) = native_call(&message) {
            debug!(tool = %call.name, "Model returned a native tool call");
            return Ok(Some(call));
        }

        let text = message.content.unwrap_or_default();
        let call = extract_tool_call(&text);
        match &call {
            Some(call) => debug!(tool = %call.name, "Extracted tool call from reply"),
            None => warn!(reply_len = text.len(), "Reply contained no tool call"),
        }
        Ok(call)
    }
}
