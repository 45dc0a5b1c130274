//! OpenAI-compatible causality judge.
//!
//! Sends each (cause, effect) pair to a chat-completions endpoint and parses
//! the reply: an empty response or one starting with "no" (case-insensitive)
//! denies the link, anything else is taken as the relationship phrase.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::CausalityJudge;
use crate::config::JudgeConfig;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_RESPONSE_TOKENS: u32 = 100;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Judge backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiJudge {
    // Built lazily: reqwest's blocking client may not be constructed on an
    // async runtime thread, and judge() always runs on the blocking pool.
    client: OnceLock<reqwest::blocking::Client>,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    timeout: Duration,
}

impl OpenAiJudge {
    /// Build from config plus the `OPENAI_API_KEY` / `OPENAI_BASE_URL`
    /// environment. A base URL override (self-hosted endpoints) makes the
    /// API key optional.
    pub fn from_env(config: &JudgeConfig) -> Result<Self> {
        let env_base_url = std::env::var("OPENAI_BASE_URL").ok();
        let base_url = config
            .base_url
            .clone()
            .or(env_base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let api_key = match std::env::var("OPENAI_API_KEY") {
            Ok(key) => key,
            Err(_) if base_url != DEFAULT_BASE_URL => "not-needed".to_string(),
            Err(_) => anyhow::bail!(
                "OPENAI_API_KEY must be set (or configure a judge base_url for a \
                 self-hosted endpoint)"
            ),
        };

        Ok(Self {
            client: OnceLock::new(),
            api_key,
            base_url,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    fn client(&self) -> Result<&reqwest::blocking::Client> {
        if self.client.get().is_none() {
            let built = reqwest::blocking::Client::builder()
                .timeout(self.timeout)
                .build()
                .context("failed to build HTTP client")?;
            let _ = self.client.set(built);
        }
        Ok(self.client.get().expect("client initialized above"))
    }

    fn build_prompt(cause_text: &str, effect_text: &str) -> String {
        format!(
            "Consider these two sequential events:\n\
             1. \"{cause_text}\"\n\
             2. \"{effect_text}\"\n\n\
             Are these events part of the same workflow or narrative sequence? \
             This includes:\n\
             - Direct causal relationships (A caused B)\n\
             - Sequential steps in a process (A then B)\n\
             - Related actions in a workflow\n\n\
             If they ARE related, briefly describe their relationship in one \
             sentence. If they are NOT related or are completely independent, \
             respond with \"No.\""
        )
    }
}

impl CausalityJudge for OpenAiJudge {
    fn judge(&self, cause_text: &str, effect_text: &str) -> Result<Option<String>> {
        let prompt = Self::build_prompt(cause_text, effect_text);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: self.temperature,
            max_tokens: MAX_RESPONSE_TOKENS,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client()?
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .context("judge request failed")?;

        let status = response.status();
        anyhow::ensure!(status.is_success(), "judge returned HTTP {status}");

        let body: ChatResponse = response.json().context("failed to parse judge response")?;
        let content = body
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("")
            .trim()
            .to_string();

        tracing::debug!(verdict = %content, "causality judgement");
        Ok(parse_verdict(&content))
    }
}

/// Interpret the raw model reply. Empty or leading "no" denies the link.
fn parse_verdict(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() || trimmed.to_lowercase().starts_with("no") {
        None
    } else {
        Some(trimmed.to_string())
    }
}
