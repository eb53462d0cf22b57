//! Job tracking: the status state machine, the mutable job aggregate, and
//! the record store consumed by polling callers.
//!
//! ## State machine
//!
//! ```text
//! pending ─▶ parsing ─▶ building_context ─▶ generating_report
//!     ─▶ [generating_presentation] ─▶ rendering ─▶ completed
//! ```
//!
//! Any mid-pipeline state can transition to `failed` (terminal, with a
//! message) or `cancelled` (terminal, cooperative). Externally the mid
//! states are all surfaced under the umbrella label `processing`.
//!
//! ## Invariants
//!
//! * Progress is a monotonically non-decreasing integer; [`GenerationJob::set_progress`]
//!   clamps rather than trusting the caller.
//! * Terminal states are immutable: `advance`, `fail`, and `cancel` are
//!   no-ops once the job has completed, failed, or been cancelled.
//! * A job is mutated only by its single pipeline run (and, after
//!   completion, by the targeted-edit path, which is the sole sanctioned
//!   post-completion mutation).

use crate::config::{GenerationConfig, OutputFormat};
use crate::error::{FileError, PipelineError, RenderError};
use crate::model::{EditRecord, Presentation, Report};
use crate::providers::TokenUsage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

// ── Progress breakpoints ─────────────────────────────────────────────────
// Stage-boundary percentages. The exact numbers are presentation detail;
// monotonicity is the invariant callers may rely on.

pub const PROGRESS_PARSING: u8 = 5;
pub const PROGRESS_PARSED: u8 = 20;
pub const PROGRESS_CONTEXT_BUILT: u8 = 35;
pub const PROGRESS_REPORT_DONE: u8 = 65;
pub const PROGRESS_PRESENTATION_DONE: u8 = 80;
pub const PROGRESS_RENDERED: u8 = 95;
pub const PROGRESS_COMPLETE: u8 = 100;

/// Lifecycle state of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Parsing,
    BuildingContext,
    GeneratingReport,
    GeneratingPresentation,
    Rendering,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal states never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// The umbrella label surfaced to polling clients: every mid-pipeline
    /// state reads as `processing`.
    pub fn external_label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            _ => "processing",
        }
    }
}

/// Per-file parse outcome, recorded so one corrupt upload is visible
/// without failing the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStatus {
    pub name: String,
    /// Token estimate of the extracted text; `None` until parsed.
    pub token_estimate: Option<usize>,
    pub error: Option<FileError>,
}

/// Budget outcome of the context-assembly stage, kept on the job so
/// callers can see whether summarization kicked in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContextStats {
    pub total_tokens: usize,
    pub was_summarized: bool,
}

/// A successfully rendered and stored artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub format: OutputFormat,
    /// Opaque object-storage handle returned by `ObjectStore::put`.
    pub handle: String,
    pub download_url: Option<String>,
}

/// The mutable aggregate root for one end-to-end generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub error: Option<String>,
    /// The request configuration, kept so post-completion edits reuse the
    /// job's model settings.
    pub config: GenerationConfig,
    pub files: Vec<FileStatus>,
    pub context: Option<ContextStats>,
    pub report: Option<Report>,
    pub presentation: Option<Presentation>,
    pub artifacts: Vec<OutputArtifact>,
    /// Per-format render failures; non-fatal to sibling formats.
    pub render_failures: Vec<RenderError>,
    pub token_usage: TokenUsage,
    pub edit_history: Vec<EditRecord>,
    /// Cooperative cancellation flag, checked at stage boundaries.
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    pub fn new(id: impl Into<String>, file_names: Vec<String>, config: GenerationConfig) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            progress: 0,
            error: None,
            config,
            files: file_names
                .into_iter()
                .map(|name| FileStatus {
                    name,
                    token_estimate: None,
                    error: None,
                })
                .collect(),
            context: None,
            report: None,
            presentation: None,
            artifacts: Vec::new(),
            render_failures: Vec::new(),
            token_usage: TokenUsage::default(),
            edit_history: Vec::new(),
            cancel_requested: false,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Raise progress, never lowering it. No-op on terminal jobs.
    pub fn set_progress(&mut self, progress: u8) {
        if self.status.is_terminal() {
            return;
        }
        self.progress = self.progress.max(progress.min(100));
    }

    /// Move to the next pipeline stage with its boundary percentage.
    pub fn advance(&mut self, status: JobStatus, progress: u8) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.set_progress(progress);
        if status == JobStatus::Completed {
            self.progress = PROGRESS_COMPLETE;
            self.completed_at = Some(Utc::now());
        }
    }

    /// Mark the job failed with a human-readable message.
    pub fn fail(&mut self, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.error = Some(message.into());
        self.completed_at = Some(Utc::now());
    }

    /// Mark the job cancelled (cooperative: callers check
    /// `cancel_requested` at stage boundaries and then call this).
    pub fn mark_cancelled(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }
}

// ── Job store ────────────────────────────────────────────────────────────

/// A mutation applied to a stored job under the store's lock.
pub type JobMutation = Box<dyn FnOnce(&mut GenerationJob) + Send>;

/// Record store for [`GenerationJob`]. The pipeline treats this as a plain
/// keyed record store, not a transactional system; swap in a database-backed
/// implementation by implementing these three calls.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: GenerationJob) -> Result<(), PipelineError>;

    async fn get(&self, id: &str) -> Result<GenerationJob, PipelineError>;

    /// Apply a mutation atomically and return the updated record.
    async fn update(&self, id: &str, mutation: JobMutation)
        -> Result<GenerationJob, PipelineError>;
}

/// In-process job store backed by a concurrent map.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<String, GenerationJob>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, job: GenerationJob) -> Result<(), PipelineError> {
        self.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<GenerationJob, PipelineError> {
        self.jobs
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PipelineError::JobNotFound { id: id.to_string() })
    }

    async fn update(
        &self,
        id: &str,
        mutation: JobMutation,
    ) -> Result<GenerationJob, PipelineError> {
        let mut entry = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| PipelineError::JobNotFound { id: id.to_string() })?;
        let job = entry.value_mut();
        mutation(job);
        job.updated_at = Utc::now();
        Ok(job.clone())
    }
}
