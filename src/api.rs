//! LLM transport with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait for one chat round-trip
//! - [`GroqClient`]: OpenAI-compatible chat completions on Groq
//! - [`GeminiClient`]: Google Gemini `generateContent`
//! - [`RetryAsk`]: decorator that adds retry logic to any `AskAsync`
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to every delay

use crate::error::{NewsError, Result};
use rand::{Rng, rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// One system + user prompt pair and its sampling settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait for async LLM interaction.
///
/// Implementors send one [`ChatRequest`] and return the model's reply. The
/// abstraction lets [`RetryAsk`] wrap any backend.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    async fn ask(&self, request: &ChatRequest) -> Result<Self::Response>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    /// Retries after the first attempt.
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// ```ignore
    /// let groq = GroqClient::new(http, key, model, base_url);
    /// let retrying = RetryAsk::new(groq, 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, request: &ChatRequest) -> Result<Self::Response> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(request).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Groq's OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct GroqClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: [OpenAiMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiReply,
}

#[derive(Deserialize)]
struct OpenAiReply {
    #[serde(default)]
    content: Option<String>,
}

impl GroqClient {
    pub fn new(
        http: Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl AskAsync for GroqClient {
    type Response = String;

    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn ask(&self, request: &ChatRequest) -> Result<String> {
        let t0 = Instant::now();
        let body = OpenAiRequest {
            model: &self.model,
            messages: [
                OpenAiMessage { role: "system", content: &request.system },
                OpenAiMessage { role: "user", content: &request.user },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let resp = self
            .http
            .post(format!("{}/openai/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(NewsError::Llm(format!("Groq returned {status}: {text}")));
        }

        let parsed: OpenAiResponse = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| NewsError::Llm("Groq returned no content".into()))?;

        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, chars = content.len(), "Groq replied");
        Ok(content)
    }
}

/// Google Gemini `generateContent`.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(
        http: Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl AskAsync for GeminiClient {
    type Response = String;

    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn ask(&self, request: &ChatRequest) -> Result<String> {
        let t0 = Instant::now();
        // Gemini has no system role on this endpoint; the prompts are joined.
        let body = json!({
            "contents": [{
                "parts": [{ "text": format!("{}\n\n{}", request.system, request.user) }]
            }],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
            }
        });

        let resp = self
            .http
            .post(format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(NewsError::Llm(format!("Gemini returned {status}: {text}")));
        }

        let parsed: GeminiResponse = resp.json().await?;
        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| NewsError::Llm("Gemini returned empty text".into()))?;

        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, chars = content.len(), "Gemini replied");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            system: "You are a news editor.".into(),
            user: "Summarize this.".into(),
            temperature: 0.5,
            max_tokens: 100,
        }
    }

    #[derive(Debug)]
    struct Flaky {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, _: &ChatRequest) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(NewsError::Llm("503".into()))
            } else {
                Ok("ok".into())
            }
        }
    }

    #[tokio::test]
    async fn retry_recovers_after_failures() {
        let api = RetryAsk::new(Flaky { calls: AtomicUsize::new(0), fail_first: 2 }, 3, StdDuration::ZERO);
        assert_eq!(api.ask(&request()).await.unwrap(), "ok");
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up() {
        let api = RetryAsk::new(Flaky { calls: AtomicUsize::new(0), fail_first: 10 }, 1, StdDuration::ZERO);
        assert!(api.ask(&request()).await.is_err());
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn groq_posts_chat_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/v1/chat/completions"))
            .and(header("authorization", "Bearer gsk_test"))
            .and(body_partial_json(json!({
                "model": "llama-3.3-70b-versatile",
                "max_tokens": 100,
                "messages": [
                    {"role": "system", "content": "You are a news editor."},
                    {"role": "user", "content": "Summarize this."}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  A summary.  "}}]
            })))
            .mount(&server)
            .await;

        let groq = GroqClient::new(Client::new(), "gsk_test", "llama-3.3-70b-versatile", server.uri());
        assert_eq!(groq.ask(&request()).await.unwrap(), "A summary.");
    }

    #[tokio::test]
    async fn groq_error_status_is_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let groq = GroqClient::new(Client::new(), "k", "m", server.uri());
        let err = groq.ask(&request()).await.unwrap_err();
        assert!(matches!(err, NewsError::Llm(msg) if msg.contains("429")));
    }

    #[tokio::test]
    async fn gemini_generates_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash-lite:generateContent"))
            .and(query_param("key", "AIza_test"))
            .and(body_partial_json(json!({
                "contents": [{"parts": [{"text": "You are a news editor.\n\nSummarize this."}]}],
                "generationConfig": {"maxOutputTokens": 100}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Ringkasan."}]}}]
            })))
            .mount(&server)
            .await;

        let gemini = GeminiClient::new(Client::new(), "AIza_test", "gemini-2.0-flash-lite", server.uri());
        assert_eq!(gemini.ask(&request()).await.unwrap(), "Ringkasan.");
    }

    #[tokio::test]
    async fn gemini_empty_text_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": ""}]}}]
            })))
            .mount(&server)
            .await;

        let gemini = GeminiClient::new(Client::new(), "k", "m", server.uri());
        assert!(gemini.ask(&request()).await.is_err());
    }
}
