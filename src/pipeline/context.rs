//! Context assembly: turn parsed documents into one token-budgeted blob
//! for report synthesis.
//!
//! ## Budgeting
//!
//! Token counts use a cheap `len / 4` heuristic. Exactness is not required:
//! the estimate only gates the summarization fallback and the hard cap,
//! both of which have generous margins. The budget ladder:
//!
//! * total ≤ [`SUMMARIZE_THRESHOLD`]: documents pass through untouched.
//! * above it: every document individually over
//!   [`SUMMARIZE_DOC_THRESHOLD`] is replaced by a model-generated
//!   abstractive summary (a cheaper bounded call); small documents pass
//!   through unchanged.
//! * still above [`MAX_CONTEXT_TOKENS`] after summarization: fail with
//!   `ContextTooLarge`. Silent truncation is off the table because it
//!   would corrupt citation integrity.
//!
//! Web-search results are appended as a distinct labeled block, never
//! mixed into document content, so provenance stays attributable.

use crate::config::GenerationConfig;
use crate::error::PipelineError;
use crate::pipeline::parse::SourceDocument;
use crate::prompts;
use crate::providers::{
    complete_with_retry, CompletionRequest, LlmProvider, SearchProvider, TokenUsage,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

/// Hard cap on assembled context size. Leaves output headroom below the
/// model's window.
pub const MAX_CONTEXT_TOKENS: usize = 150_000;
/// Above this total, oversized documents get summarized.
pub const SUMMARIZE_THRESHOLD: usize = 100_000;
/// A document over this individual size is a summarization candidate.
pub const SUMMARIZE_DOC_THRESHOLD: usize = 10_000;
/// Simultaneous summarization calls per job.
const SUMMARIZE_CONCURRENCY: usize = 4;

/// Rough token estimate: 4 characters per token, rounded up so any
/// non-empty text counts as at least one token.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// One document's contribution to the context.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentContext {
    pub name: String,
    pub content: String,
    pub token_count: usize,
}

/// The assembled context. Never mutated after construction; invariant:
/// `total_tokens <= MAX_CONTEXT_TOKENS`.
#[derive(Debug, Clone)]
pub struct PreparedContext {
    pub documents: Vec<DocumentContext>,
    pub total_tokens: usize,
    pub was_summarized: bool,
    pub web_search_text: Option<String>,
}

impl PreparedContext {
    /// Render the combined blob sent to the model: one labeled block per
    /// document, then the web-search block when present.
    pub fn combined(&self) -> String {
        let mut parts: Vec<String> = self
            .documents
            .iter()
            .map(|d| format!("=== DOCUMENT: {} ===\n\n{}", d.name, d.content))
            .collect();
        if let Some(ref web) = self.web_search_text {
            parts.push(format!("=== WEB SEARCH RESULTS ===\n\n{web}"));
        }
        parts.join("\n\n")
    }
}

/// Builds and budget-optimises context from parsed documents.
pub struct ContextBuilder<'a> {
    llm: &'a Arc<dyn LlmProvider>,
    search: Option<&'a Arc<dyn SearchProvider>>,
    config: &'a GenerationConfig,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(
        llm: &'a Arc<dyn LlmProvider>,
        search: Option<&'a Arc<dyn SearchProvider>>,
        config: &'a GenerationConfig,
    ) -> Self {
        Self {
            llm,
            search,
            config,
        }
    }

    /// Assemble the context, summarizing documents when the budget demands
    /// it and merging optional web-search results.
    ///
    /// # Errors
    /// [`PipelineError::ContextTooLarge`] when the post-summarization total
    /// still exceeds the hard cap, and upstream errors from the web-search
    /// call. Summarization *call* failures degrade to deterministic
    /// truncation of that document rather than failing the job.
    pub async fn prepare(
        &self,
        documents: &[SourceDocument],
        web_query: Option<&str>,
    ) -> Result<(PreparedContext, TokenUsage), PipelineError> {
        let mut usage = TokenUsage::default();

        let mut contexts: Vec<DocumentContext> = documents
            .iter()
            .map(|doc| DocumentContext {
                name: doc.name.clone(),
                content: doc.extracted_text.clone(),
                token_count: doc.token_estimate,
            })
            .collect();

        let mut total: usize = contexts.iter().map(|d| d.token_count).sum();
        info!("Context total before optimisation: ~{total} tokens");

        let mut was_summarized = false;
        if total > SUMMARIZE_THRESHOLD {
            info!("Context exceeds {SUMMARIZE_THRESHOLD} tokens, summarizing oversized documents");
            let summaries: Vec<(usize, String, TokenUsage)> = stream::iter(
                contexts
                    .iter()
                    .enumerate()
                    .filter(|(_, doc)| doc.token_count > SUMMARIZE_DOC_THRESHOLD)
                    .map(|(i, doc)| async move {
                        let (content, call_usage) = self.summarize_document(doc).await;
                        (i, content, call_usage)
                    }),
            )
            .buffer_unordered(SUMMARIZE_CONCURRENCY)
            .collect()
            .await;

            for (i, content, call_usage) in summaries {
                usage.add(call_usage);
                contexts[i].content = content;
                contexts[i].token_count = estimate_tokens(&contexts[i].content);
            }
            was_summarized = true;
            total = contexts.iter().map(|d| d.token_count).sum();
            info!("Context total after summarization: ~{total} tokens");
        }

        let web_search_text = match web_query {
            Some(query) => Some(self.run_web_search(query).await?),
            None => None,
        };
        if let Some(ref web) = web_search_text {
            total += estimate_tokens(web);
        }

        if total > MAX_CONTEXT_TOKENS {
            return Err(PipelineError::ContextTooLarge {
                tokens: total,
                limit: MAX_CONTEXT_TOKENS,
            });
        }

        Ok((
            PreparedContext {
                documents: contexts,
                total_tokens: total,
                was_summarized,
                web_search_text,
            },
            usage,
        ))
    }

    /// Summarize one oversized document with a bounded model call.
    ///
    /// On provider failure the document is truncated to the per-document
    /// threshold instead; a degraded context beats a dead job here because
    /// the hard cap downstream still protects citation integrity.
    async fn summarize_document(&self, doc: &DocumentContext) -> (String, TokenUsage) {
        info!("Summarizing '{}' (~{} tokens)", doc.name, doc.token_count);

        let request = CompletionRequest {
            system_prompt: prompts::SUMMARIZE_SYSTEM_PROMPT.to_string(),
            user_prompt: prompts::summarize_user_prompt(&doc.name, &doc.content),
            max_tokens: self.config.summary_max_tokens,
        };

        match complete_with_retry(
            self.llm,
            &request,
            self.config.max_retries,
            self.config.retry_backoff_ms,
        )
        .await
        {
            Ok(completion) => (
                format!("[Summarized from {}]\n\n{}", doc.name, completion.text.trim()),
                completion.usage,
            ),
            Err(e) => {
                warn!("Summarization of '{}' failed, truncating: {e}", doc.name);
                let max_chars = SUMMARIZE_DOC_THRESHOLD * 4;
                let truncated: String = doc.content.chars().take(max_chars).collect();
                (
                    format!("[Truncated: {}]\n\n{truncated}...", doc.name),
                    TokenUsage::default(),
                )
            }
        }
    }

    async fn run_web_search(&self, query: &str) -> Result<String, PipelineError> {
        let search = self.search.ok_or_else(|| {
            PipelineError::InvalidConfig(
                "web query requested but no search provider configured".into(),
            )
        })?;
        info!("Running web search: {query}");
        search
            .search(query)
            .await
            .map_err(|e| PipelineError::UpstreamUnavailable {
                provider: "search".into(),
                detail: e.to_string(),
            })
    }
}
