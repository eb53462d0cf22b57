//! Error types for the briefcraft library.
//!
//! Three distinct error types reflect three distinct failure scopes:
//!
//! * [`PipelineError`] — **Fatal to the job**: generation cannot proceed
//!   (every input unusable, context over budget, the model never produced
//!   valid structured output). Returned as `Err(PipelineError)` from the
//!   pipeline stages and recorded as the job's terminal error.
//!
//! * [`FileError`] — **Non-fatal, per source file**: one upload failed to
//!   parse (wrong extension, corrupt bytes) but the other files are fine.
//!   Stored in the job's per-file status so callers can inspect partial
//!   success rather than losing the whole batch to one bad upload.
//!
//! * [`RenderError`] — **Non-fatal, per output format**: one requested
//!   artifact failed to render while sibling formats succeeded. Recorded
//!   next to the successful artifacts in the job result.
//!
//! The separation lets the terminal job state distinguish "no usable
//! input" from "upstream provider failure" from "internal schema
//! violation" instead of collapsing them into one generic message.

use thiserror::Error;

/// All fatal errors produced by the generation pipeline.
///
/// Per-file failures use [`FileError`] and per-format render failures use
/// [`RenderError`]; both are recorded on the job rather than propagated here.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No parser is registered for the file's extension.
    #[error("Unsupported file format: '.{extension}'\nSupported: .pdf, .docx, .xlsx, .pptx")]
    UnsupportedFormat { extension: String },

    /// Every source file failed to parse; there is nothing to generate from.
    #[error("No usable input: all {total} file(s) failed to parse.\nFirst error: {first_error}")]
    NoUsableInput { total: usize, first_error: String },

    // ── Context errors ────────────────────────────────────────────────────
    /// The assembled context exceeds the hard token cap even after
    /// per-document summarization. Truncating would corrupt citation
    /// integrity, so the job fails instead.
    #[error(
        "Context too large: {tokens} tokens after summarization (limit {limit}).\n\
         Remove documents or upload shorter ones."
    )]
    ContextTooLarge { tokens: usize, limit: usize },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The model failed to produce schema-valid output, including the one
    /// corrective retry.
    #[error("Generation failed during {stage}: {detail}")]
    GenerationFailure { stage: &'static str, detail: String },

    /// The LLM or search provider stayed unreachable through all backoff
    /// attempts.
    #[error("Upstream provider '{provider}' unavailable: {detail}")]
    UpstreamUnavailable { provider: String, detail: String },

    // ── Rendering ─────────────────────────────────────────────────────────
    /// Every requested output format failed to render.
    #[error("All {total} requested output format(s) failed to render.\nFirst error: {first_error}")]
    AllRendersFailed { total: usize, first_error: String },

    // ── Job and edit errors ───────────────────────────────────────────────
    /// The job id is unknown to the job store.
    #[error("Job not found: {id}")]
    JobNotFound { id: String },

    /// A section path does not resolve to an editable node.
    #[error("Section not found: '{path}'")]
    InvalidPath { path: String },

    /// The operation requires a job state it is not in (e.g. editing a job
    /// that has not completed).
    #[error("Invalid job state: {detail}")]
    InvalidState { detail: String },

    /// The job was cancelled at a stage boundary.
    #[error("Job cancelled")]
    Cancelled,

    // ── Infrastructure ────────────────────────────────────────────────────
    /// Object storage rejected an artifact upload.
    #[error("Artifact storage failed: {0}")]
    Storage(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single source file.
///
/// Stored in [`crate::job::FileStatus`](crate::job::FileStatus) when one
/// upload cannot be parsed. The job continues with the remaining files
/// unless ALL files fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// No parser is registered for this extension.
    #[error("'{name}': unsupported format '.{extension}'")]
    UnsupportedFormat { name: String, extension: String },

    /// The bytes could not be read as the declared format.
    #[error("'{name}': parse failed: {detail}")]
    ParseFailure { name: String, detail: String },
}

impl FileError {
    /// The file the error belongs to.
    pub fn file_name(&self) -> &str {
        match self {
            FileError::UnsupportedFormat { name, .. } => name,
            FileError::ParseFailure { name, .. } => name,
        }
    }
}

/// A non-fatal error for a single output format.
///
/// Recorded in the job result while sibling formats proceed.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("{format} rendering failed: {detail}")]
pub struct RenderError {
    pub format: String,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_too_large_display() {
        let e = PipelineError::ContextTooLarge {
            tokens: 200_000,
            limit: 150_000,
        };
        let msg = e.to_string();
        assert!(msg.contains("200000"), "got: {msg}");
        assert!(msg.contains("150000"), "got: {msg}");
    }

    #[test]
    fn unsupported_format_names_extension() {
        let e = PipelineError::UnsupportedFormat {
            extension: "csv".into(),
        };
        assert!(e.to_string().contains(".csv"));
    }

    #[test]
    fn file_error_carries_file_name() {
        let e = FileError::ParseFailure {
            name: "q3-results.xlsx".into(),
            detail: "not a zip archive".into(),
        };
        assert_eq!(e.file_name(), "q3-results.xlsx");
        assert!(e.to_string().contains("q3-results.xlsx"));
    }

    #[test]
    fn render_error_display() {
        let e = RenderError {
            format: "pptx".into(),
            detail: "slide 3 layout failed".into(),
        };
        assert!(e.to_string().contains("pptx"));
        assert!(e.to_string().contains("slide 3"));
    }
}
