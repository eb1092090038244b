/// LLM Client — the single point of entry for all Claude API calls in the
/// agent.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// All answer generation MUST go through the `AnswerEngine` trait, and its
/// Claude implementation goes through this client.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

use prompts::{
    ANSWER_SYSTEM, CHECKBOX_PROMPT_TEMPLATE, COVER_LETTER_PROMPT_TEMPLATE, COVER_LETTER_SYSTEM,
    NUMERIC_PROMPT_TEMPLATE, OPTIONS_PROMPT_TEMPLATE, OPTIONS_RETRY_PROMPT_TEMPLATE,
    TEXTUAL_PROMPT_TEMPLATE, TEXTUAL_RETRY_PROMPT_TEMPLATE,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls. Intentionally hardcoded to prevent
/// accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 1024;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// The answer-generation capability consumed by the field handlers.
///
/// Implementations decide model, prompting, and cost; the handlers only see
/// questions in, answers out. The `*_with_retry` variants carry the
/// previous answer and the site's validation message so the engine can pick
/// differently.
#[async_trait]
pub trait AnswerEngine: Send + Sync {
    /// Short free-text answer for an open question.
    async fn answer_textual(&self, question: &str) -> Result<String, LlmError>;

    /// Answer for a numeric-only control (bare number, no units).
    async fn answer_numeric(&self, question: &str) -> Result<String, LlmError>;

    /// Picks one answer from an enumerated option list; the reply should be
    /// one of the options verbatim, but callers must tolerate paraphrase.
    async fn answer_from_options(
        &self,
        question: &str,
        options: &[String],
    ) -> Result<String, LlmError>;

    /// Yes/no style decision for checkbox prompts.
    async fn answer_checkbox_question(&self, prompt: &str) -> Result<String, LlmError>;

    async fn answer_textual_with_retry(
        &self,
        question: &str,
        previous: &str,
        error: &str,
    ) -> Result<String, LlmError>;

    async fn answer_from_options_with_retry(
        &self,
        question: &str,
        options: &[String],
        previous: &str,
        error: &str,
    ) -> Result<String, LlmError>;

    /// Drafts a full cover letter from a candidate summary.
    async fn draft_cover_letter(&self, candidate_summary: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Makes a raw call to the Claude API, returning the full response
    /// object. Retries on 429 (rate limit) and 5xx errors with exponential
    /// backoff.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Calls the LLM and returns the trimmed plain-text answer.
    pub async fn call_text(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let response = self.call(prompt, system).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text.to_string())
    }
}

/// Claude-backed `AnswerEngine`.
#[derive(Clone)]
pub struct ClaudeAnswerEngine {
    client: LlmClient,
}

impl ClaudeAnswerEngine {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

fn render_options(options: &[String]) -> String {
    options
        .iter()
        .enumerate()
        .map(|(i, o)| format!("{}. {o}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl AnswerEngine for ClaudeAnswerEngine {
    async fn answer_textual(&self, question: &str) -> Result<String, LlmError> {
        let prompt = TEXTUAL_PROMPT_TEMPLATE.replace("{question}", question);
        self.client.call_text(&prompt, ANSWER_SYSTEM).await
    }

    async fn answer_numeric(&self, question: &str) -> Result<String, LlmError> {
        let prompt = NUMERIC_PROMPT_TEMPLATE.replace("{question}", question);
        self.client.call_text(&prompt, ANSWER_SYSTEM).await
    }

    async fn answer_from_options(
        &self,
        question: &str,
        options: &[String],
    ) -> Result<String, LlmError> {
        let prompt = OPTIONS_PROMPT_TEMPLATE
            .replace("{question}", question)
            .replace("{options}", &render_options(options));
        self.client.call_text(&prompt, ANSWER_SYSTEM).await
    }

    async fn answer_checkbox_question(&self, prompt_text: &str) -> Result<String, LlmError> {
        let prompt = CHECKBOX_PROMPT_TEMPLATE.replace("{prompt}", prompt_text);
        self.client.call_text(&prompt, ANSWER_SYSTEM).await
    }

    async fn answer_textual_with_retry(
        &self,
        question: &str,
        previous: &str,
        error: &str,
    ) -> Result<String, LlmError> {
        let prompt = TEXTUAL_RETRY_PROMPT_TEMPLATE
            .replace("{question}", question)
            .replace("{previous}", previous)
            .replace("{error}", error);
        self.client.call_text(&prompt, ANSWER_SYSTEM).await
    }

    async fn answer_from_options_with_retry(
        &self,
        question: &str,
        options: &[String],
        previous: &str,
        error: &str,
    ) -> Result<String, LlmError> {
        let prompt = OPTIONS_RETRY_PROMPT_TEMPLATE
            .replace("{question}", question)
            .replace("{options}", &render_options(options))
            .replace("{previous}", previous)
            .replace("{error}", error);
        self.client.call_text(&prompt, ANSWER_SYSTEM).await
    }

    async fn draft_cover_letter(&self, candidate_summary: &str) -> Result<String, LlmError> {
        let prompt = COVER_LETTER_PROMPT_TEMPLATE.replace("{summary}", candidate_summary);
        self.client.call_text(&prompt, COVER_LETTER_SYSTEM).await
    }
}
