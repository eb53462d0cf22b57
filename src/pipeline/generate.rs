//! Staged LLM generation: report synthesis, presentation synthesis, and
//! targeted section edits.
//!
//! ## Structured output discipline
//!
//! The model is instructed to return a single JSON document matching the
//! report/presentation schema exactly. Its reply is treated as untrusted:
//! fences are stripped, the JSON is parsed and validated through
//! [`crate::model`], and on any mismatch the call is retried exactly once
//! with a corrective instruction before failing with `GenerationFailure`.
//! Invalid data is never coerced into the typed models.
//!
//! Transport-level failures are a separate class: they retry with backoff
//! inside [`complete_with_retry`] and surface as `UpstreamUnavailable`, so
//! the terminal job state can tell a flaky provider from a model that
//! cannot follow the schema.
//!
//! ## Soft constraints
//!
//! `detail_level` and the slide count range shape the prompt only. No
//! post-hoc validation rejects a short report or an 18-slide deck; both
//! are documented soft contracts.

use crate::config::GenerationConfig;
use crate::error::PipelineError;
use crate::model::{EditRecord, Presentation, Report, SectionPath, Slide};
use crate::pipeline::context::PreparedContext;
use crate::prompts;
use crate::providers::{complete_with_retry, CompletionRequest, LlmProvider, TokenUsage};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Drives every generation-stage LLM call for one job.
pub struct Generator<'a> {
    llm: &'a Arc<dyn LlmProvider>,
    config: &'a GenerationConfig,
}

impl<'a> Generator<'a> {
    pub fn new(llm: &'a Arc<dyn LlmProvider>, config: &'a GenerationConfig) -> Self {
        Self { llm, config }
    }

    /// Synthesise the structured report from the prepared context.
    pub async fn generate_report(
        &self,
        context: &PreparedContext,
    ) -> Result<(Report, TokenUsage), PipelineError> {
        let system = prompts::report_system_prompt(self.config.detail_level);
        let user = prompts::report_user_prompt(
            &context.combined(),
            self.config.custom_instructions.as_deref(),
            self.config.title.as_deref(),
        );

        let (report, usage) = self
            .structured_call(
                "report generation",
                &system,
                &user,
                self.config.report_max_tokens,
                Report::from_llm_json,
            )
            .await?;

        info!(
            "Report generated: '{}', {} sections, {} findings",
            report.title,
            report.sections.len(),
            report.key_findings.len()
        );
        Ok((report, usage))
    }

    /// Synthesise the slide deck from a finished report.
    pub async fn generate_presentation(
        &self,
        report: &Report,
    ) -> Result<(Presentation, TokenUsage), PipelineError> {
        let system = prompts::presentation_system_prompt(self.config.slide_range);
        let user = prompts::presentation_user_prompt(report);

        let (presentation, usage) = self
            .structured_call(
                "presentation generation",
                &system,
                &user,
                self.config.presentation_max_tokens,
                Presentation::from_llm_json,
            )
            .await?;

        info!(
            "Presentation generated: '{}', {} slides",
            presentation.title,
            presentation.slides.len()
        );
        Ok((presentation, usage))
    }

    /// Apply a targeted edit to one report node.
    ///
    /// The node's current content, the user's instruction, and a compact
    /// summary of the surrounding report go to the model; its reply
    /// replaces the node in place. This is the only post-creation mutation
    /// path for report content.
    pub async fn edit_report_section(
        &self,
        report: &mut Report,
        path: &SectionPath,
        instructions: &str,
    ) -> Result<(EditRecord, TokenUsage), PipelineError> {
        let old_content = report
            .node_content(path)
            .ok_or_else(|| PipelineError::InvalidPath {
                path: path.to_string(),
            })?;
        let title = report.node_title(path).unwrap_or_default();
        let context = prompts::edit_context_summary(report);

        let request = CompletionRequest {
            system_prompt: prompts::EDIT_SYSTEM_PROMPT.to_string(),
            user_prompt: prompts::edit_user_prompt(&title, &old_content, instructions, &context),
            max_tokens: self.config.report_max_tokens,
        };
        let completion = complete_with_retry(
            self.llm,
            &request,
            self.config.max_retries,
            self.config.retry_backoff_ms,
        )
        .await?;

        let new_content = strip_code_fences(&completion.text).to_string();
        report.set_node_content(path, &new_content);
        info!("Edited report node '{path}'");

        Ok((
            EditRecord {
                path: path.to_string(),
                old_content,
                new_content,
                applied_at: Utc::now(),
            },
            completion.usage,
        ))
    }

    /// Apply a targeted edit to one slide (`slides.N`).
    ///
    /// Slides are structured values, not prose, so the exchange is
    /// JSON-to-JSON: the current slide is sent serialised and the reply
    /// must parse back into a slide, under the same retry-once policy as
    /// full-deck generation.
    pub async fn edit_slide(
        &self,
        presentation: &mut Presentation,
        index: usize,
        instructions: &str,
    ) -> Result<(EditRecord, TokenUsage), PipelineError> {
        let path = SectionPath::Slide(index);
        let old_content =
            presentation
                .slide_content(index)
                .ok_or_else(|| PipelineError::InvalidPath {
                    path: path.to_string(),
                })?;

        let system = format!(
            "{}\n\nThe section is a presentation slide represented as JSON. \
             Respond with ONLY the revised slide as valid JSON with the same 'type' field schema.",
            prompts::EDIT_SYSTEM_PROMPT
        );
        let user = prompts::edit_user_prompt(
            &format!("Slide {index}"),
            &old_content,
            instructions,
            &format!("Presentation: {} ({} slides)", presentation.title, presentation.slides.len()),
        );

        let (slide, usage) = self
            .structured_call(
                "slide edit",
                &system,
                &user,
                self.config.presentation_max_tokens,
                Slide::from_llm_json,
            )
            .await?;

        let new_content = serde_json::to_string_pretty(&slide)
            .map_err(|e| PipelineError::Internal(e.to_string()))?;
        presentation.set_slide(index, slide);
        info!("Edited slide {index}");

        Ok((
            EditRecord {
                path: path.to_string(),
                old_content,
                new_content,
                applied_at: Utc::now(),
            },
            usage,
        ))
    }

    /// One structured-output exchange: call, parse, validate; on schema
    /// failure retry once with a corrective instruction, then fail.
    async fn structured_call<T>(
        &self,
        stage: &'static str,
        system: &str,
        user: &str,
        max_tokens: usize,
        parse: impl Fn(&str) -> Result<T, String>,
    ) -> Result<(T, TokenUsage), PipelineError> {
        let mut usage = TokenUsage::default();

        let request = CompletionRequest {
            system_prompt: system.to_string(),
            user_prompt: user.to_string(),
            max_tokens,
        };
        let completion = complete_with_retry(
            self.llm,
            &request,
            self.config.max_retries,
            self.config.retry_backoff_ms,
        )
        .await?;
        usage.add(completion.usage);

        let first_error = match parse(strip_code_fences(&completion.text)) {
            Ok(value) => return Ok((value, usage)),
            Err(e) => e,
        };
        warn!("{stage}: schema-invalid output ({first_error}), retrying once");

        let retry_request = CompletionRequest {
            system_prompt: system.to_string(),
            user_prompt: format!("{}{user}", prompts::CORRECTIVE_RETRY_PREFIX),
            max_tokens,
        };
        let retry_completion = complete_with_retry(
            self.llm,
            &retry_request,
            self.config.max_retries,
            self.config.retry_backoff_ms,
        )
        .await?;
        usage.add(retry_completion.usage);

        match parse(strip_code_fences(&retry_completion.text)) {
            Ok(value) => Ok((value, usage)),
            Err(retry_error) => Err(PipelineError::GenerationFailure {
                stage,
                detail: format!(
                    "model returned schema-invalid output twice: {first_error}; then: {retry_error}"
                ),
            }),
        }
    }
}

/// Strip a wrapping markdown code fence, which models emit despite the
/// prompt forbidding it.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map(str::trim_end).unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetailLevel;
    use crate::pipeline::context::DocumentContext;
    use crate::providers::{Completion, ProviderError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns scripted replies in order, then repeats the last.
    struct ScriptedLlm {
        replies: Vec<String>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: replies.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<Completion, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.user_prompt.clone());
            let text = self
                .replies
                .get(n)
                .or_else(|| self.replies.last())
                .cloned()
                .unwrap_or_default();
            Ok(Completion {
                text,
                usage: TokenUsage {
                    input_tokens: 100,
                    output_tokens: 50,
                },
            })
        }
    }

    fn valid_report_json() -> String {
        serde_json::json!({
            "title": "Market Review",
            "executive_summary": "s".repeat(150),
            "sections": [
                {"title": "Overview", "content": "c".repeat(80), "subsections": []}
            ],
            "key_findings": ["Finding one", "Finding two"],
            "recommendations": ["Do something"],
            "sources": ["a.pdf"]
        })
        .to_string()
    }

    fn context() -> PreparedContext {
        PreparedContext {
            documents: vec![DocumentContext {
                name: "a.pdf".into(),
                content: "content".into(),
                token_count: 2,
            }],
            total_tokens: 2,
            was_summarized: false,
            web_search_text: None,
        }
    }

    fn config() -> GenerationConfig {
        let mut c = GenerationConfig::default();
        c.detail_level = DetailLevel::Executive;
        c.retry_backoff_ms = 1;
        c
    }

    #[tokio::test]
    async fn report_parses_on_first_valid_reply() {
        let llm = ScriptedLlm::new(&[&valid_report_json()]);
        let provider: Arc<dyn LlmProvider> = llm.clone();
        let config = config();
        let generator = Generator::new(&provider, &config);

        let (report, usage) = generator.generate_report(&context()).await.unwrap();
        assert_eq!(report.title, "Market Review");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
        assert_eq!(usage.output_tokens, 50);
    }

    #[tokio::test]
    async fn fenced_reply_is_unwrapped() {
        let fenced = format!("```json\n{}\n```", valid_report_json());
        let llm = ScriptedLlm::new(&[&fenced]);
        let provider: Arc<dyn LlmProvider> = llm.clone();
        let config = config();
        let generator = Generator::new(&provider, &config);
        assert!(generator.generate_report(&context()).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_then_valid_uses_corrective_retry() {
        let llm = ScriptedLlm::new(&["this is not json", &valid_report_json()]);
        let provider: Arc<dyn LlmProvider> = llm.clone();
        let config = config();
        let generator = Generator::new(&provider, &config);

        let (report, usage) = generator.generate_report(&context()).await.unwrap();
        assert_eq!(report.title, "Market Review");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
        // Both calls' tokens are accounted for.
        assert_eq!(usage.input_tokens, 200);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[1].starts_with(prompts::CORRECTIVE_RETRY_PREFIX.trim_end_matches('\n')));
    }

    #[tokio::test]
    async fn invalid_twice_is_generation_failure() {
        let llm = ScriptedLlm::new(&["nope", "{\"still\": \"wrong\"}"]);
        let provider: Arc<dyn LlmProvider> = llm.clone();
        let config = config();
        let generator = Generator::new(&provider, &config);

        let err = generator.generate_report(&context()).await.unwrap_err();
        match err {
            PipelineError::GenerationFailure { stage, .. } => {
                assert_eq!(stage, "report generation")
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    fn sample_report() -> Report {
        Report::from_llm_json(&valid_report_json()).unwrap()
    }

    #[tokio::test]
    async fn presentation_generation_validates_deck() {
        let deck = serde_json::json!({
            "title": "Deck",
            "slides": [
                {"type": "title", "title": "Deck", "subtitle": "Q3"},
                {"type": "content", "title": "Numbers", "bullets": ["a"]},
                {"type": "closing", "title": "Thanks"}
            ]
        })
        .to_string();
        let llm = ScriptedLlm::new(&[&deck]);
        let provider: Arc<dyn LlmProvider> = llm.clone();
        let config = config();
        let generator = Generator::new(&provider, &config);

        let (pres, _) = generator
            .generate_presentation(&sample_report())
            .await
            .unwrap();
        assert_eq!(pres.slides.len(), 3);
    }

    #[tokio::test]
    async fn edit_section_replaces_node_and_reports_old_content() {
        let llm = ScriptedLlm::new(&["- Tighter finding one\n- Tighter finding two"]);
        let provider: Arc<dyn LlmProvider> = llm.clone();
        let config = config();
        let generator = Generator::new(&provider, &config);
        let mut report = sample_report();

        let path: SectionPath = "key_findings".parse().unwrap();
        let (record, _) = generator
            .edit_report_section(&mut report, &path, "make these more concise")
            .await
            .unwrap();

        assert_eq!(record.old_content, "Finding one\nFinding two");
        assert_ne!(record.new_content, record.old_content);
        assert_eq!(
            report.key_findings,
            vec!["Tighter finding one".to_string(), "Tighter finding two".to_string()]
        );
    }

    #[tokio::test]
    async fn edit_section_rejects_unknown_path() {
        let llm = ScriptedLlm::new(&["irrelevant"]);
        let provider: Arc<dyn LlmProvider> = llm.clone();
        let config = config();
        let generator = Generator::new(&provider, &config);
        let mut report = sample_report();

        let path = SectionPath::Section(vec![7]);
        let err = generator
            .edit_report_section(&mut report, &path, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPath { .. }));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn edit_slide_round_trips_json() {
        let revised = serde_json::json!({
            "type": "content",
            "title": "Numbers, tightened",
            "bullets": ["one"]
        })
        .to_string();
        let llm = ScriptedLlm::new(&[&revised]);
        let provider: Arc<dyn LlmProvider> = llm.clone();
        let config = config();
        let generator = Generator::new(&provider, &config);

        let mut pres = Presentation {
            title: "Deck".into(),
            slides: vec![
                Slide::Title {
                    title: "Deck".into(),
                    subtitle: None,
                    notes: None,
                },
                Slide::Content {
                    title: "Numbers".into(),
                    bullets: vec!["a".into(), "b".into()],
                    notes: None,
                },
            ],
        };

        let (record, _) = generator
            .edit_slide(&mut pres, 1, "tighten")
            .await
            .unwrap();
        assert_eq!(record.path, "slides.1");
        assert!(record.old_content.contains("Numbers"));
        match &pres.slides[1] {
            Slide::Content { title, bullets, .. } => {
                assert_eq!(title, "Numbers, tightened");
                assert_eq!(bullets.len(), 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn fence_stripping_variants() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }
}
