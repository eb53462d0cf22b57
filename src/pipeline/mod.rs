//! Pipeline stages for document-to-artifact generation.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations (e.g. a different PDF backend) without touching other
//! stages.
//!
//! ## Data Flow
//!
//! ```text
//! parse ──▶ context ──▶ generate ──▶ render
//! (per-file) (token     (staged LLM  (per-format
//!  text       budget +   calls +      PDF/DOCX/PPTX
//!  extraction) summaries) validation)  artifacts)
//! ```
//!
//! 1. [`parse`]    — extract plain text from each upload via the parser
//!    registry; one bad file never aborts the batch
//! 2. [`context`]  — assemble a token-budgeted context blob, summarizing
//!    oversized documents and merging web-search results
//! 3. [`generate`] — drive the report and presentation LLM calls, validate
//!    the structured output, expose targeted section edits
//! 4. [`render`]   — produce the requested binary artifacts; formats fail
//!    independently
pub mod context;
pub mod generate;
pub mod parse;
pub mod render;
