//! LLM provider seam and the HTTP client behind it.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tabula_core::config::{LlmConfig, LlmProvider};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("llm http failure: {0}")]
    Http(String),
    #[error("llm returned a malformed response: {0}")]
    MalformedResponse(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LlmCompletion {
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<LlmCompletion, LlmError>;
    fn model_name(&self) -> &str;
}

/// Chat client over the provider HTTP APIs. OpenAI and Ollama share
/// the `/v1/chat/completions` shape; Anthropic has its own.
pub struct HttpLlmClient {
    http: reqwest::Client,
    provider: LlmProvider,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout_secs: u64,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| LlmError::Http(error.to_string()))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| match config.provider {
                LlmProvider::OpenAi => "https://api.openai.com".to_string(),
                LlmProvider::Anthropic => "https://api.anthropic.com".to_string(),
                LlmProvider::Ollama => "http://localhost:11434".to_string(),
            })
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http,
            provider: config.provider,
            base_url,
            api_key: config.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    async fn complete_chat(&self, system: &str, user: &str) -> Result<LlmCompletion, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: 0.0,
        };

        let mut builder = self.http.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|error| self.map_reqwest(error))?;
        if !response.status().is_success() {
            return Err(LlmError::Http(format!("{url} returned {}", response.status())));
        }

        let body: ChatResponse =
            response.json().await.map_err(|error| LlmError::MalformedResponse(error.to_string()))?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse("response had no choices".to_string()))?;
        let usage = body.usage.unwrap_or_default();

        Ok(LlmCompletion {
            text: choice.message.content,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> Result<LlmCompletion, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: 1024,
            system,
            messages: vec![ChatMessage { role: "user", content: user }],
        };

        let mut builder = self.http.post(&url).json(&request).header("anthropic-version", "2023-06-01");
        if let Some(api_key) = &self.api_key {
            builder = builder.header("x-api-key", api_key);
        }

        let response = builder.send().await.map_err(|error| self.map_reqwest(error))?;
        if !response.status().is_success() {
            return Err(LlmError::Http(format!("{url} returned {}", response.status())));
        }

        let body: AnthropicResponse =
            response.json().await.map_err(|error| LlmError::MalformedResponse(error.to_string()))?;
        let text = body
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| LlmError::MalformedResponse("response had no content".to_string()))?;

        Ok(LlmCompletion {
            text,
            prompt_tokens: body.usage.input_tokens,
            completion_tokens: body.usage.output_tokens,
        })
    }

    fn map_reqwest(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout { timeout_secs: self.timeout_secs }
        } else {
            LlmError::Http(error.to_string())
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<LlmCompletion, LlmError> {
        match self.provider {
            LlmProvider::OpenAi | LlmProvider::Ollama => self.complete_chat(system, user).await,
            LlmProvider::Anthropic => self.complete_anthropic(system, user).await,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Scripted client for tests: returns queued responses in order, then
/// errors once the script runs out.
#[derive(Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<LlmCompletion, LlmError>>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Ok(LlmCompletion {
            text: text.into(),
            prompt_tokens: 100,
            completion_tokens: 50,
        }));
    }

    pub fn push_error(&self, error: LlmError) {
        self.push(Err(error));
    }

    fn push(&self, entry: Result<LlmCompletion, LlmError>) {
        let mut responses = match self.responses.lock() {
            Ok(responses) => responses,
            Err(poisoned) => poisoned.into_inner(),
        };
        responses.push_back(entry);
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _system: &str, _user: &str) -> Result<LlmCompletion, LlmError> {
        let mut responses = match self.responses.lock() {
            Ok(responses) => responses,
            Err(poisoned) => poisoned.into_inner(),
        };
        responses
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Http("scripted llm is out of responses".to_string())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
