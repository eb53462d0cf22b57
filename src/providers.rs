//! External collaborators: the LLM, web search, and object storage.
//!
//! The pipeline talks to every network dependency through an object-safe
//! trait held as `Arc<dyn ...>`, so tests inject deterministic fakes and
//! the CLI injects real clients without the pipeline knowing which it got.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 5xx / timeout failures from LLM APIs are transient and
//! frequent under load. [`complete_with_retry`] applies exponential
//! backoff (`retry_backoff_ms * 2^attempt`): with a 500 ms base and 3
//! retries the wait sequence is 500 ms, 1 s, 2 s. Permanent errors (bad
//! API key, malformed request) are not retried; they surface immediately
//! as [`PipelineError::UpstreamUnavailable`]. Schema-invalid *content* is
//! a different failure class handled by the orchestrator, not here.

use crate::error::PipelineError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

// ── Token accounting ─────────────────────────────────────────────────────

/// Token usage accumulated across every LLM call in a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

// ── LLM provider ─────────────────────────────────────────────────────────

/// One synchronous request/response completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: usize,
}

/// The provider's reply: raw text plus token accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// Why a provider call failed, split by whether retrying can help.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// Rate limit, 5xx, timeout: worth retrying with backoff.
    #[error("transient provider error: {0}")]
    Transient(String),
    /// Auth failure, malformed request: retrying will not help.
    #[error("permanent provider error: {0}")]
    Permanent(String),
}

/// An opaque LLM collaborator, invoked request/response (no streaming).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs and error messages.
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError>;
}

/// Call the provider, retrying transient failures with exponential backoff.
///
/// # Errors
/// [`PipelineError::UpstreamUnavailable`] once the attempt budget is
/// exhausted or a permanent error is seen.
pub async fn complete_with_retry(
    provider: &Arc<dyn LlmProvider>,
    request: &CompletionRequest,
    max_retries: u32,
    retry_backoff_ms: u64,
) -> Result<Completion, PipelineError> {
    let mut last_err = String::new();

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let backoff = retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "LLM retry {}/{} after {}ms: {}",
                attempt, max_retries, backoff, last_err
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.complete(request).await {
            Ok(completion) => {
                debug!(
                    "LLM call ok: {} in / {} out tokens",
                    completion.usage.input_tokens, completion.usage.output_tokens
                );
                return Ok(completion);
            }
            Err(ProviderError::Permanent(detail)) => {
                return Err(PipelineError::UpstreamUnavailable {
                    provider: provider.name().to_string(),
                    detail,
                });
            }
            Err(ProviderError::Transient(detail)) => {
                last_err = detail;
            }
        }
    }

    Err(PipelineError::UpstreamUnavailable {
        provider: provider.name().to_string(),
        detail: format!("{last_err} (after {max_retries} retries)"),
    })
}

// ── Web search provider ──────────────────────────────────────────────────

/// Web search collaborator. Returns ranked snippets as display text; the
/// context builder keeps the result in its own labeled block so provenance
/// stays attributable.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, ProviderError>;
}

// ── Object storage ───────────────────────────────────────────────────────

/// Object storage collaborator. The pipeline calls `put` exactly once per
/// rendered artifact and never persists binaries any other way.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes at a path, returning an opaque handle.
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, PipelineError>;

    /// Issue a time-limited download URL for a stored handle.
    async fn signed_url(&self, handle: &str, ttl_secs: u64) -> Result<String, PipelineError>;

    /// Fetch stored bytes. Used by the CLI to write artifacts to disk and
    /// by tests to assert on rendered output.
    async fn get(&self, handle: &str) -> Result<Vec<u8>, PipelineError>;
}

/// In-process object store for tests and the CLI.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, (Vec<u8>, String)>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, PipelineError> {
        self.objects
            .insert(path.to_string(), (bytes, content_type.to_string()));
        Ok(path.to_string())
    }

    async fn signed_url(&self, handle: &str, ttl_secs: u64) -> Result<String, PipelineError> {
        if !self.objects.contains_key(handle) {
            return Err(PipelineError::Storage(format!("no such object: {handle}")));
        }
        Ok(format!("memory://{handle}?ttl={ttl_secs}"))
    }

    async fn get(&self, handle: &str) -> Result<Vec<u8>, PipelineError> {
        self.objects
            .get(handle)
            .map(|entry| entry.value().0.clone())
            .ok_or_else(|| PipelineError::Storage(format!("no such object: {handle}")))
    }
}

// ── Anthropic Messages API provider ──────────────────────────────────────

/// `LlmProvider` over the Anthropic Messages API.
///
/// Used by the CLI; the library itself never requires it. Reads nothing
/// from the environment: the caller passes the key explicitly so tests and
/// embedders stay in control.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    system: &'a str,
    messages: Vec<MessageBody<'a>>,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: UsageBody,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
struct UsageBody {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: &request.system_prompt,
            messages: vec![MessageBody {
                role: "user",
                content: &request.user_prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::Transient(e.to_string())
                } else {
                    ProviderError::Permanent(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = format!("HTTP {status}: {detail}");
            // 429 and 5xx recover on their own; everything else will not.
            return if status.as_u16() == 429 || status.is_server_error() {
                Err(ProviderError::Transient(message))
            } else {
                Err(ProviderError::Permanent(message))
            };
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Permanent(format!("malformed API response: {e}")))?;

        let text = parsed
            .content
            .first()
            .map(|block| block.text.clone())
            .unwrap_or_default();

        Ok(Completion {
            text,
            usage: TokenUsage {
                input_tokens: parsed.usage.input_tokens,
                output_tokens: parsed.usage.output_tokens,
            },
        })
    }
}
