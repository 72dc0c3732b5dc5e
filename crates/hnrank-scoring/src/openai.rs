//! OpenAI chat-completions score provider.
//!
//! Sends the top of the ranking as a numbered list and asks the model for a
//! JSON object with per-position scores and a short analysis. Replies that
//! are not JSON objects are kept verbatim under `"analysis"`.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use hnrank_core::{Insight, RankingSnapshot};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::provider::ScoreProvider;
use crate::retry::retry_with_backoff;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;

/// Articles beyond this position are not sent to the model.
const MAX_PROMPT_ARTICLES: usize = 30;
const MAX_ERROR_BODY_CHARS: usize = 512;

const SYSTEM_PROMPT: &str = "You rate Hacker News stories for a reader who wants fresh, \
substantive technical content. Reply with a single JSON object with keys \
\"scores\" (array of {\"position\": number, \"score\": number from 0 to 10}) and \
\"analysis\" (one short paragraph about the ranking as a whole). No other text.";

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Score provider backed by an OpenAI-compatible chat-completions endpoint.
///
/// Use [`OpenAiProvider::new`] for production or
/// [`OpenAiProvider::with_base_url`] to point at a mock server in tests.
pub struct OpenAiProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    endpoint: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint.as_str())
            .field("has_api_key", &self.api_key.is_some())
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    /// Creates a provider pointed at the public OpenAI API.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: Option<&str>, model: &str, timeout_secs: u64) -> Result<Self, ScoringError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a provider with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`ScoringError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: Option<&str>,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, ScoringError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("hnrank/0.1 (ranking-rescore)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join("v1/chat/completions"))
            .map_err(|e| ScoringError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_owned),
            model: model.to_owned(),
            endpoint,
            max_retries: 2,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        })
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    async fn complete_once(&self, api_key: &str, request: &ChatRequest<'_>) -> Result<String, ScoringError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let text = response.text().await?;
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| ScoringError::Deserialize {
                context: "chat completion response".to_string(),
                source: e,
            })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(ScoringError::EmptyResponse);
        }
        Ok(content)
    }
}

fn build_prompt(snapshot: &RankingSnapshot) -> String {
    let mut prompt = format!(
        "Ranking from {} ({} articles, recorded as {}sorted newest first):\n",
        snapshot.source_url,
        snapshot.total_articles,
        if snapshot.is_correctly_sorted { "" } else { "NOT " },
    );
    for article in snapshot.articles.iter().take(MAX_PROMPT_ARTICLES) {
        let _ = writeln!(
            prompt,
            "{}. [{}] {}",
            article.position, article.time_text, article.title
        );
    }
    prompt
}

/// Parses the model reply into a payload object.
///
/// Markdown code fences are stripped. A reply that is not a JSON object is
/// kept as plain text under `"analysis"`.
fn interpret_content(content: &str, model: &str) -> serde_json::Value {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map_or(trimmed, str::trim);

    let mut payload = match serde_json::from_str::<serde_json::Value>(unfenced) {
        Ok(value) if value.is_object() => value,
        _ => serde_json::json!({ "analysis": trimmed }),
    };
    if let Some(object) = payload.as_object_mut() {
        object.insert("model".to_string(), serde_json::Value::from(model));
    }
    payload
}

#[async_trait]
impl ScoreProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn request_scoring(&self, snapshot: &RankingSnapshot) -> Result<Insight, ScoringError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ScoringError::Unavailable(
                "OPENAI_API_KEY is not configured".to_string(),
            ));
        };

        if snapshot.articles.is_empty() {
            let payload = serde_json::json!({
                "model": self.model,
                "analysis": "No articles to score.",
            });
            return Ok(Insight::new(snapshot.id, self.name(), true, payload));
        }

        let prompt = build_prompt(snapshot);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.2,
        };

        let content = retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.complete_once(api_key, &request)
        })
        .await?;

        tracing::debug!(
            ranking_id = %snapshot.id,
            model = %self.model,
            chars = content.len(),
            "openai: scoring response received"
        );

        let payload = interpret_content(&content, &self.model);
        Ok(Insight::new(snapshot.id, self.name(), true, payload))
    }
}
