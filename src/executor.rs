//! Prompt execution against the model's responses API.
//!
//! The executor owns an injectable [`ResponsesBackend`], constructed once per
//! run by the host — there is no hidden global client. Online calls retry on
//! rate limiting with exponential backoff (1, 2 units between the three
//! attempts); any other failure propagates immediately. Offline mode returns
//! a deterministic mock without touching the backend at all.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::{ConfigError, PromptError};
use crate::state::RunState;

const MAX_ATTEMPTS: u32 = 3;
const STATE_SNAPSHOT_LIMIT: usize = 6000;
const MOCK_PROMPT_PREFIX: usize = 200;

/// Request body for the responses API.
#[derive(Debug, Clone, Serialize)]
pub struct ResponsesRequest {
    pub model: String,
    pub input: Vec<InputMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputMessage {
    pub role: String,
    pub content: String,
}

/// Response body subset: output items with their content fragments.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponsesReply {
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

/// One attempt against the model API. Implementations map HTTP 429 to
/// [`PromptError::RateLimited`] so the executor can drive retries.
#[async_trait]
pub trait ResponsesBackend: Send + Sync {
    async fn create_response(&self, request: &ResponsesRequest)
        -> Result<ResponsesReply, PromptError>;
}

/// Backend speaking to a real responses endpoint over HTTP.
#[derive(Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

impl HttpBackend {
    pub fn new(api_base: impl Into<String>, api_key: Option<String>) -> Result<Self, ConfigError> {
        let api_key = api_key.ok_or_else(|| {
            ConfigError("OPENAI_API_KEY is not set. Add it to your .env or export it.".into())
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            api_key,
        })
    }
}

#[async_trait]
impl ResponsesBackend for HttpBackend {
    async fn create_response(
        &self,
        request: &ResponsesRequest,
    ) -> Result<ResponsesReply, PromptError> {
        let url = format!("{}/responses", self.api_base.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PromptError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PromptError::Service {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json::<ResponsesReply>().await?)
    }
}

/// Backend stand-in for offline executors; offline prompts never reach it.
struct DisconnectedBackend;

#[async_trait]
impl ResponsesBackend for DisconnectedBackend {
    async fn create_response(
        &self,
        _request: &ResponsesRequest,
    ) -> Result<ResponsesReply, PromptError> {
        Err(PromptError::Config(ConfigError(
            "offline executor has no model API backend".into(),
        )))
    }
}

/// Executes role prompts with the current run state attached.
pub struct PromptExecutor {
    backend: Arc<dyn ResponsesBackend>,
    model: String,
    offline: bool,
    retry_unit: Duration,
}

impl PromptExecutor {
    pub fn new(backend: Arc<dyn ResponsesBackend>, model: impl Into<String>, offline: bool) -> Self {
        Self {
            backend,
            model: model.into(),
            offline,
            retry_unit: Duration::from_secs(1),
        }
    }

    /// Executor that only ever produces deterministic offline mock output.
    pub fn offline(model: impl Into<String>) -> Self {
        Self::new(Arc::new(DisconnectedBackend), model, true)
    }

    /// Override the backoff unit (tests shrink this to milliseconds).
    pub fn with_retry_unit(mut self, unit: Duration) -> Self {
        self.retry_unit = unit;
        self
    }

    /// Run a role prompt and return the model's trimmed output text.
    ///
    /// Never returns an empty-handed error for a successful call: a reply
    /// with no extractable text yields an empty string.
    pub async fn run_prompt(
        &self,
        role_prompt: &str,
        state: &RunState,
    ) -> Result<String, PromptError> {
        let phase = if state.phase.is_empty() {
            "agent"
        } else {
            state.phase.as_str()
        };
        let system = format!("You are a helpful project {}.", phase);
        let user = format!(
            "{}\n\nSTATE:\n{}",
            role_prompt,
            state.snapshot(STATE_SNAPSHOT_LIMIT)
        );

        if self.offline {
            info!(model = %self.model, phase, "offline mode; returning mock output");
            return Ok(format!(
                "[OFFLINE MOCK OUTPUT] phase={}\n\n{}...",
                phase,
                truncate_chars(role_prompt, MOCK_PROMPT_PREFIX)
            ));
        }

        let request = ResponsesRequest {
            model: self.model.clone(),
            input: vec![
                InputMessage {
                    role: "system".into(),
                    content: system,
                },
                InputMessage {
                    role: "user".into(),
                    content: user,
                },
            ],
        };

        let mut attempt: u32 = 0;
        loop {
            info!(model = %self.model, phase, attempt, "calling model");
            match self.backend.create_response(&request).await {
                Ok(reply) => return Ok(extract_text(&reply)),
                Err(PromptError::RateLimited) if attempt + 1 < MAX_ATTEMPTS => {
                    let wait = self.retry_unit * 2u32.pow(attempt);
                    warn!(wait_ms = wait.as_millis() as u64, "rate limited (429); retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Concatenate every `output_text` fragment of the first `message` output
/// item, trimmed. Absence of text yields an empty string, not an error.
fn extract_text(reply: &ResponsesReply) -> String {
    let mut text = String::new();
    if let Some(message) = reply.output.iter().find(|item| item.kind == "message") {
        for part in &message.content {
            if part.kind == "output_text" {
                text.push_str(&part.text);
            }
        }
    }
    text.trim().to_string()
}

fn truncate_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
