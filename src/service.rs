//! The pipeline entry point: job submission, polling, cancellation, and
//! post-completion targeted edits.
//!
//! [`GenerationService`] owns the collaborators (LLM, web search, job
//! store, object store, parser registry) and runs each submitted job as a
//! single asynchronous task. A semaphore caps how many jobs run at once;
//! submissions beyond the cap queue on the permit rather than running
//! unbounded against downstream rate limits.
//!
//! Within one job the stages are strictly sequential, each depending on
//! the prior stage's complete output:
//!
//! ```text
//! pending ─▶ parsing ─▶ building_context ─▶ generating_report
//!     ─▶ [generating_presentation] ─▶ rendering ─▶ completed
//! ```
//!
//! Cancellation is cooperative: `cancel` sets a flag, and the pipeline
//! checks it before starting each stage. In-flight network calls are not
//! aborted.

use crate::config::GenerationConfig;
use crate::error::PipelineError;
use crate::job::{
    ContextStats, FileStatus, GenerationJob, InMemoryJobStore, JobStatus, JobStore,
    OutputArtifact, PROGRESS_CONTEXT_BUILT, PROGRESS_PARSED, PROGRESS_PARSING,
    PROGRESS_PRESENTATION_DONE, PROGRESS_RENDERED, PROGRESS_REPORT_DONE,
};
use crate::model::{EditRecord, SectionPath};
use crate::pipeline::context::ContextBuilder;
use crate::pipeline::generate::Generator;
use crate::pipeline::parse::{parse_all, ParserRegistry};
use crate::pipeline::render;
use crate::providers::{LlmProvider, MemoryObjectStore, ObjectStore, SearchProvider, TokenUsage};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

/// Externally visible job state, shaped for a polling client.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusSnapshot {
    pub id: String,
    pub status: JobStatus,
    /// The umbrella label (`pending` / `processing` / `completed` /
    /// `failed` / `cancelled`).
    pub status_label: &'static str,
    pub progress: u8,
    pub error: Option<String>,
}

/// The completed job's payload: structured content, artifacts, and the
/// per-file and per-format outcomes.
#[derive(Debug, Clone, serde::Serialize)]
pub struct JobResult {
    pub report: Option<crate::model::Report>,
    pub presentation: Option<crate::model::Presentation>,
    pub artifacts: Vec<OutputArtifact>,
    pub render_failures: Vec<crate::error::RenderError>,
    pub files: Vec<FileStatus>,
    pub token_usage: TokenUsage,
    pub edit_history: Vec<EditRecord>,
}

struct Inner {
    registry: ParserRegistry,
    llm: Arc<dyn LlmProvider>,
    search: Option<Arc<dyn SearchProvider>>,
    jobs: Arc<dyn JobStore>,
    objects: Arc<dyn ObjectStore>,
    job_permits: Semaphore,
}

/// Document-to-artifact generation service.
///
/// Cheap to clone (everything behind one `Arc`); share a single instance
/// per deployment so the concurrency cap applies globally.
///
/// # Example
/// ```rust,no_run
/// use briefcraft::{GenerationConfig, GenerationService, OutputFormat};
/// use std::sync::Arc;
///
/// # async fn run(llm: Arc<dyn briefcraft::LlmProvider>) -> Result<(), briefcraft::PipelineError> {
/// let service = GenerationService::builder().llm(llm).build()?;
///
/// let config = GenerationConfig::builder()
///     .output_formats([OutputFormat::Pdf])
///     .build()?;
/// let job_id = service
///     .submit(vec![("q3.pdf".into(), std::fs::read("q3.pdf").unwrap())], config)
///     .await?;
///
/// let job = service.wait_until_terminal(&job_id, 250).await?;
/// println!("{}: {:?}", job_id, job.status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GenerationService {
    inner: Arc<Inner>,
}

/// Builder for [`GenerationService`]. Only the LLM provider is required;
/// stores default to in-memory implementations.
pub struct GenerationServiceBuilder {
    registry: ParserRegistry,
    llm: Option<Arc<dyn LlmProvider>>,
    search: Option<Arc<dyn SearchProvider>>,
    jobs: Option<Arc<dyn JobStore>>,
    objects: Option<Arc<dyn ObjectStore>>,
    max_concurrent_jobs: usize,
}

impl GenerationService {
    pub fn builder() -> GenerationServiceBuilder {
        GenerationServiceBuilder {
            registry: ParserRegistry::new(),
            llm: None,
            search: None,
            jobs: None,
            objects: None,
            max_concurrent_jobs: 4,
        }
    }

    /// Submit one generation job. Returns immediately with the job id; the
    /// pipeline runs as a background task (queued when the concurrency cap
    /// is reached).
    pub async fn submit(
        &self,
        files: Vec<(String, Vec<u8>)>,
        config: GenerationConfig,
    ) -> Result<String, PipelineError> {
        if files.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one source file is required".into(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let names = files.iter().map(|(name, _)| name.clone()).collect();
        let job = GenerationJob::new(&id, names, config);
        self.inner.jobs.create(job).await?;
        info!("Job {id} submitted with {} file(s)", files.len());

        let inner = Arc::clone(&self.inner);
        let job_id = id.clone();
        tokio::spawn(async move {
            // Closed only on shutdown; a closed semaphore drops the job on
            // the floor, which is fine because the process is exiting.
            let Ok(_permit) = inner.job_permits.acquire().await else {
                return;
            };
            match run_pipeline(&inner, &job_id, files).await {
                Ok(()) => {}
                Err(PipelineError::Cancelled) => {
                    info!("Job {job_id} cancelled");
                }
                Err(e) => {
                    error!("Job {job_id} failed: {e}");
                    let message = e.to_string();
                    let _ = inner
                        .jobs
                        .update(&job_id, Box::new(move |j| j.fail(message)))
                        .await;
                }
            }
        });

        Ok(id)
    }

    /// Status/progress/error for a polling client.
    pub async fn get_status(&self, job_id: &str) -> Result<StatusSnapshot, PipelineError> {
        let job = self.inner.jobs.get(job_id).await?;
        Ok(StatusSnapshot {
            id: job.id,
            status: job.status,
            status_label: job.status.external_label(),
            progress: job.progress,
            error: job.error,
        })
    }

    /// The job's result payload. Meaningful once the job is terminal, but
    /// callable at any point (mid-pipeline fields are simply `None`).
    pub async fn get_result(&self, job_id: &str) -> Result<JobResult, PipelineError> {
        let job = self.inner.jobs.get(job_id).await?;
        Ok(JobResult {
            report: job.report,
            presentation: job.presentation,
            artifacts: job.artifacts,
            render_failures: job.render_failures,
            files: job.files,
            token_usage: job.token_usage,
            edit_history: job.edit_history,
        })
    }

    /// Request cooperative cancellation. The pipeline checks the flag at
    /// the next stage boundary; a job that already reached a terminal
    /// state is unaffected.
    pub async fn cancel(&self, job_id: &str) -> Result<(), PipelineError> {
        self.inner
            .jobs
            .update(job_id, Box::new(|j| j.cancel_requested = true))
            .await?;
        Ok(())
    }

    /// Poll the job until it reaches a terminal state.
    pub async fn wait_until_terminal(
        &self,
        job_id: &str,
        poll_ms: u64,
    ) -> Result<GenerationJob, PipelineError> {
        loop {
            let job = self.inner.jobs.get(job_id).await?;
            if job.status.is_terminal() {
                return Ok(job);
            }
            sleep(Duration::from_millis(poll_ms)).await;
        }
    }

    /// Apply a targeted edit to one node of a completed job's report or
    /// presentation (`slides.N` paths edit the deck).
    ///
    /// The edit is the only sanctioned post-completion mutation: the
    /// model's reply replaces the node in place and an [`EditRecord`] is
    /// appended to the job's history.
    ///
    /// # Errors
    /// [`PipelineError::InvalidState`] unless the job is completed,
    /// [`PipelineError::InvalidPath`] for an unresolvable path, plus the
    /// generation-stage errors.
    pub async fn edit_section(
        &self,
        job_id: &str,
        path: &str,
        instructions: &str,
    ) -> Result<EditRecord, PipelineError> {
        let job = self.inner.jobs.get(job_id).await?;
        if job.status != JobStatus::Completed {
            return Err(PipelineError::InvalidState {
                detail: format!(
                    "job {job_id} is {:?}; only completed jobs can be edited",
                    job.status
                ),
            });
        }

        let parsed: SectionPath = path
            .parse()
            .map_err(|_| PipelineError::InvalidPath { path: path.into() })?;
        let generator = Generator::new(&self.inner.llm, &job.config);

        match parsed {
            SectionPath::Slide(index) => {
                let mut presentation =
                    job.presentation
                        .clone()
                        .ok_or_else(|| PipelineError::InvalidState {
                            detail: format!("job {job_id} has no presentation to edit"),
                        })?;
                let (record, usage) = generator
                    .edit_slide(&mut presentation, index, instructions)
                    .await?;
                let stored = record.clone();
                self.inner
                    .jobs
                    .update(
                        job_id,
                        Box::new(move |j| {
                            j.presentation = Some(presentation);
                            j.edit_history.push(stored);
                            j.token_usage.add(usage);
                        }),
                    )
                    .await?;
                Ok(record)
            }
            report_path => {
                let mut report =
                    job.report
                        .clone()
                        .ok_or_else(|| PipelineError::InvalidState {
                            detail: format!("job {job_id} has no report to edit"),
                        })?;
                let (record, usage) = generator
                    .edit_report_section(&mut report, &report_path, instructions)
                    .await?;
                let stored = record.clone();
                self.inner
                    .jobs
                    .update(
                        job_id,
                        Box::new(move |j| {
                            j.report = Some(report);
                            j.edit_history.push(stored);
                            j.token_usage.add(usage);
                        }),
                    )
                    .await?;
                Ok(record)
            }
        }
    }

    /// Remove the newest edit from the job's history without restoring
    /// the prior content (display-only undo; see DESIGN.md).
    pub async fn undo_last_edit(&self, job_id: &str) -> Result<EditRecord, PipelineError> {
        let job = self.inner.jobs.get(job_id).await?;
        let record = job
            .edit_history
            .last()
            .cloned()
            .ok_or_else(|| PipelineError::InvalidState {
                detail: format!("job {job_id} has no edits to undo"),
            })?;
        self.inner
            .jobs
            .update(
                job_id,
                Box::new(|j| {
                    j.edit_history.pop();
                }),
            )
            .await?;
        Ok(record)
    }

    /// Fetch a stored artifact's bytes (testing and CLI convenience; web
    /// deployments hand out signed URLs instead).
    pub async fn artifact_bytes(&self, handle: &str) -> Result<Vec<u8>, PipelineError> {
        self.inner.objects.get(handle).await
    }
}

impl GenerationServiceBuilder {
    pub fn llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn job_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.jobs = Some(store);
        self
    }

    pub fn object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.objects = Some(store);
        self
    }

    pub fn registry(mut self, registry: ParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Cap on simultaneously running jobs. Default: 4.
    pub fn max_concurrent_jobs(mut self, n: usize) -> Self {
        self.max_concurrent_jobs = n;
        self
    }

    pub fn build(self) -> Result<GenerationService, PipelineError> {
        let llm = self
            .llm
            .ok_or_else(|| PipelineError::InvalidConfig("an LLM provider is required".into()))?;
        if self.max_concurrent_jobs == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_concurrent_jobs must be ≥ 1".into(),
            ));
        }
        Ok(GenerationService {
            inner: Arc::new(Inner {
                registry: self.registry,
                llm,
                search: self.search,
                jobs: self
                    .jobs
                    .unwrap_or_else(|| Arc::new(InMemoryJobStore::new())),
                objects: self
                    .objects
                    .unwrap_or_else(|| Arc::new(MemoryObjectStore::new())),
                job_permits: Semaphore::new(self.max_concurrent_jobs),
            }),
        })
    }
}

// ── Pipeline execution ───────────────────────────────────────────────────

async fn run_pipeline(
    inner: &Inner,
    job_id: &str,
    files: Vec<(String, Vec<u8>)>,
) -> Result<(), PipelineError> {
    let config = inner.jobs.get(job_id).await?.config;

    // ── Stage 1: parse ───────────────────────────────────────────────────
    check_cancelled(inner, job_id).await?;
    update(inner, job_id, |j| j.advance(JobStatus::Parsing, PROGRESS_PARSING)).await?;

    let (documents, failures) = parse_all(&inner.registry, &files);

    let parsed: Vec<(String, usize)> = documents
        .iter()
        .map(|d| (d.name.clone(), d.token_estimate))
        .collect();
    let failed = failures.clone();
    update(inner, job_id, move |j| {
        for file in &mut j.files {
            if let Some((_, tokens)) = parsed.iter().find(|(name, _)| *name == file.name) {
                file.token_estimate = Some(*tokens);
            } else if let Some(err) = failed.iter().find(|e| e.file_name() == file.name) {
                file.error = Some(err.clone());
            }
        }
        j.set_progress(PROGRESS_PARSED);
    })
    .await?;

    if documents.is_empty() {
        return Err(PipelineError::NoUsableInput {
            total: files.len(),
            first_error: failures
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no files".into()),
        });
    }
    if !failures.is_empty() {
        warn!(
            "Job {job_id}: {} of {} file(s) failed to parse, continuing",
            failures.len(),
            files.len()
        );
    }

    // ── Stage 2: context ─────────────────────────────────────────────────
    check_cancelled(inner, job_id).await?;
    update(inner, job_id, |j| {
        j.advance(JobStatus::BuildingContext, PROGRESS_PARSED)
    })
    .await?;

    let builder = ContextBuilder::new(&inner.llm, inner.search.as_ref(), &config);
    let (context, context_usage) = builder
        .prepare(&documents, config.web_query.as_deref())
        .await?;
    let stats = ContextStats {
        total_tokens: context.total_tokens,
        was_summarized: context.was_summarized,
    };
    update(inner, job_id, move |j| {
        j.context = Some(stats);
        j.token_usage.add(context_usage);
        j.set_progress(PROGRESS_CONTEXT_BUILT);
    })
    .await?;

    // ── Stage 3: report ──────────────────────────────────────────────────
    check_cancelled(inner, job_id).await?;
    update(inner, job_id, |j| {
        j.advance(JobStatus::GeneratingReport, PROGRESS_CONTEXT_BUILT)
    })
    .await?;

    let generator = Generator::new(&inner.llm, &config);
    let (report, report_usage) = generator.generate_report(&context).await?;
    let stored_report = report.clone();
    update(inner, job_id, move |j| {
        j.report = Some(stored_report);
        j.token_usage.add(report_usage);
        j.set_progress(PROGRESS_REPORT_DONE);
    })
    .await?;

    // ── Stage 4: presentation (only when the deck is requested) ──────────
    let presentation = if config.wants_presentation() {
        check_cancelled(inner, job_id).await?;
        update(inner, job_id, |j| {
            j.advance(JobStatus::GeneratingPresentation, PROGRESS_REPORT_DONE)
        })
        .await?;

        let (presentation, usage) = generator.generate_presentation(&report).await?;
        let stored = presentation.clone();
        update(inner, job_id, move |j| {
            j.presentation = Some(stored);
            j.token_usage.add(usage);
            j.set_progress(PROGRESS_PRESENTATION_DONE);
        })
        .await?;
        Some(presentation)
    } else {
        None
    };

    // ── Stage 5: render and store artifacts ──────────────────────────────
    check_cancelled(inner, job_id).await?;
    update(inner, job_id, |j| {
        j.advance(JobStatus::Rendering, PROGRESS_PRESENTATION_DONE)
    })
    .await?;

    let (rendered, mut render_failures) = render::render_all(
        &report,
        presentation.as_ref(),
        &config.output_formats,
        &config.brand,
    );

    let mut artifacts = Vec::new();
    for (format, bytes) in rendered {
        let path = format!("jobs/{job_id}/report.{}", format.as_str());
        // A storage failure counts against this format only, same as a
        // render failure.
        let stored = async {
            let handle = inner
                .objects
                .put(&path, bytes, format.content_type())
                .await?;
            let url = inner
                .objects
                .signed_url(&handle, config.signed_url_ttl_secs)
                .await?;
            Ok::<_, PipelineError>((handle, url))
        }
        .await;
        match stored {
            Ok((handle, url)) => artifacts.push(OutputArtifact {
                format,
                handle,
                download_url: Some(url),
            }),
            Err(e) => {
                warn!("Job {job_id}: storing {} artifact failed: {e}", format.as_str());
                render_failures.push(crate::error::RenderError {
                    format: format.as_str().to_string(),
                    detail: e.to_string(),
                });
            }
        }
    }

    if artifacts.is_empty() {
        return Err(PipelineError::AllRendersFailed {
            total: config.output_formats.len(),
            first_error: render_failures
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no formats requested".into()),
        });
    }

    let stored_artifacts = artifacts.clone();
    let stored_failures = render_failures.clone();
    update(inner, job_id, move |j| {
        j.artifacts = stored_artifacts;
        j.render_failures = stored_failures;
        j.set_progress(PROGRESS_RENDERED);
    })
    .await?;

    // ── Done ─────────────────────────────────────────────────────────────
    update(inner, job_id, |j| j.advance(JobStatus::Completed, 100)).await?;
    info!("Job {job_id} completed");
    Ok(())
}

async fn update(
    inner: &Inner,
    job_id: &str,
    mutation: impl FnOnce(&mut GenerationJob) + Send + 'static,
) -> Result<GenerationJob, PipelineError> {
    inner.jobs.update(job_id, Box::new(mutation)).await
}

/// Stage-boundary cancellation check: marks the job cancelled and unwinds
/// the pipeline when the flag is set.
async fn check_cancelled(inner: &Inner, job_id: &str) -> Result<(), PipelineError> {
    let job = inner.jobs.get(job_id).await?;
    if job.cancel_requested {
        inner
            .jobs
            .update(job_id, Box::new(|j| j.mark_cancelled()))
            .await?;
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Completion, CompletionRequest, ProviderError};
    use async_trait::async_trait;

    struct StubLlm;

    #[async_trait]
    impl LlmProvider for StubLlm {
        fn name(&self) -> &str {
            "stub"
        }
        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<Completion, ProviderError> {
            Ok(Completion {
                text: "{}".into(),
                usage: TokenUsage::default(),
            })
        }
    }

    fn service() -> GenerationService {
        GenerationService::builder()
            .llm(Arc::new(StubLlm))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_llm() {
        assert!(GenerationService::builder().build().is_err());
    }

    #[test]
    fn builder_rejects_zero_concurrency() {
        assert!(GenerationService::builder()
            .llm(Arc::new(StubLlm))
            .max_concurrent_jobs(0)
            .build()
            .is_err());
    }

    #[tokio::test]
    async fn submit_rejects_empty_file_list() {
        let err = service()
            .submit(Vec::new(), GenerationConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn all_unusable_files_fail_the_job() {
        let service = service();
        let id = service
            .submit(
                vec![("notes.txt".into(), b"plain text".to_vec())],
                GenerationConfig::default(),
            )
            .await
            .unwrap();

        let job = service.wait_until_terminal(&id, 10).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        let error = job.error.unwrap();
        assert!(error.contains("No usable input"), "got: {error}");
        // The per-file outcome is recorded too.
        assert!(job.files[0].error.is_some());
    }

    #[tokio::test]
    async fn status_for_unknown_job_errors() {
        assert!(matches!(
            service().get_status("missing").await,
            Err(PipelineError::JobNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn edit_requires_completed_job() {
        let service = service();
        let id = service
            .submit(
                vec![("notes.txt".into(), b"x".to_vec())],
                GenerationConfig::default(),
            )
            .await
            .unwrap();
        service.wait_until_terminal(&id, 10).await.unwrap();

        let err = service
            .edit_section(&id, "executive_summary", "shorter")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn undo_with_no_history_errors() {
        let service = service();
        let id = service
            .submit(
                vec![("notes.txt".into(), b"x".to_vec())],
                GenerationConfig::default(),
            )
            .await
            .unwrap();
        service.wait_until_terminal(&id, 10).await.unwrap();
        assert!(service.undo_last_edit(&id).await.is_err());
    }
}
