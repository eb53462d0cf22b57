//! # briefcraft
//!
//! Turn a set of business documents (PDF/DOCX/XLSX/PPTX) into an
//! AI-generated research report and slide deck, tracked through an
//! asynchronous job with progress polling.
//!
//! ## Pipeline Overview
//!
//! ```text
//! uploads
//!  │
//!  ├─ 1. Parse     per-format text extraction via the parser registry
//!  ├─ 2. Context   token-budgeted assembly, summarization fallback,
//!  │               optional web-search block
//!  ├─ 3. Generate  staged LLM calls → validated Report, then Presentation
//!  ├─ 4. Render    PDF / DOCX / PPTX artifacts, branding-aware,
//!  │               per-format failure isolation
//!  └─ 5. Store     one object-store put per artifact + signed URL
//! ```
//!
//! Every stage transition updates the job record, so a polling client sees
//! monotonically non-decreasing progress in stage order. One corrupt
//! upload or one failed output format degrades the result; it never aborts
//! the sibling files or formats.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use briefcraft::{
//!     AnthropicProvider, GenerationConfig, GenerationService, OutputFormat,
//!     DEFAULT_ANTHROPIC_MODEL,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let llm = Arc::new(AnthropicProvider::new(
//!         std::env::var("ANTHROPIC_API_KEY")?,
//!         DEFAULT_ANTHROPIC_MODEL,
//!     ));
//!     let service = GenerationService::builder().llm(llm).build()?;
//!
//!     let config = GenerationConfig::builder()
//!         .title("Q3 Market Review")
//!         .output_formats([OutputFormat::Pdf, OutputFormat::Pptx])
//!         .build()?;
//!     let job_id = service
//!         .submit(vec![("q3.pdf".into(), std::fs::read("q3.pdf")?)], config)
//!         .await?;
//!
//!     let job = service.wait_until_terminal(&job_id, 500).await?;
//!     for artifact in &job.artifacts {
//!         println!("{} → {:?}", artifact.format.as_str(), artifact.download_url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Collaborators
//!
//! The LLM, web search, job store, and object store are trait objects
//! injected through [`GenerationService::builder`]. The crate bundles an
//! Anthropic Messages API provider plus in-memory stores; deployments
//! swap in their own implementations without touching the pipeline.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `briefcraft` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library:
//! ```toml
//! briefcraft = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod job;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    BrandConfig, DetailLevel, GenerationConfig, GenerationConfigBuilder, OutputFormat, Rgb,
    SlideRange,
};
pub use error::{FileError, PipelineError, RenderError};
pub use job::{
    ContextStats, FileStatus, GenerationJob, InMemoryJobStore, JobStatus, JobStore,
    OutputArtifact,
};
pub use model::{
    EditRecord, Presentation, Report, Section, SectionPath, Slide, TimelineEvent,
};
pub use pipeline::context::{
    PreparedContext, MAX_CONTEXT_TOKENS, SUMMARIZE_DOC_THRESHOLD, SUMMARIZE_THRESHOLD,
};
pub use pipeline::parse::{DocumentParser, ParserRegistry, SourceDocument};
pub use providers::{
    AnthropicProvider, Completion, CompletionRequest, LlmProvider, MemoryObjectStore,
    ObjectStore, ProviderError, SearchProvider, TokenUsage, DEFAULT_ANTHROPIC_MODEL,
};
pub use service::{GenerationService, GenerationServiceBuilder, JobResult, StatusSnapshot};
