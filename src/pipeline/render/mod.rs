//! Artifact rendering: three independent renderers over the same
//! structured input.
//!
//! Each requested format is attempted on its own; a failure is recorded as
//! a [`RenderError`] for that format and never blocks sibling formats. The
//! caller decides what zero successes means (the pipeline fails the job).
//!
//! All three renderers are deterministic: the same report, presentation,
//! and brand produce the same bytes, which the round-trip tests rely on.

pub mod docx;
pub mod ooxml;
pub mod pdf;
pub mod pptx;

use crate::config::{BrandConfig, OutputFormat};
use crate::error::RenderError;
use crate::model::{Presentation, Report};
use tracing::{info, warn};

/// Render one format.
///
/// # Errors
/// A [`RenderError`] scoped to this format; `Pptx` additionally requires a
/// presentation to have been generated.
pub fn render_format(
    format: OutputFormat,
    report: &Report,
    presentation: Option<&Presentation>,
    brand: &BrandConfig,
) -> Result<Vec<u8>, RenderError> {
    let result = match format {
        OutputFormat::Pdf => pdf::render_pdf(report, brand),
        OutputFormat::Docx => docx::render_docx(report, brand),
        OutputFormat::Pptx => match presentation {
            Some(pres) => pptx::render_pptx(pres, brand),
            None => Err("no presentation was generated for this job".into()),
        },
    };

    result.map_err(|detail| RenderError {
        format: format.as_str().to_string(),
        detail,
    })
}

/// Render every requested format, isolating failures per format.
pub fn render_all(
    report: &Report,
    presentation: Option<&Presentation>,
    formats: &[OutputFormat],
    brand: &BrandConfig,
) -> (Vec<(OutputFormat, Vec<u8>)>, Vec<RenderError>) {
    let mut artifacts = Vec::new();
    let mut failures = Vec::new();

    for &format in formats {
        match render_format(format, report, presentation, brand) {
            Ok(bytes) => {
                info!("Rendered {}: {} bytes", format.as_str(), bytes.len());
                artifacts.push((format, bytes));
            }
            Err(err) => {
                warn!("{err}");
                failures.push(err);
            }
        }
    }

    (artifacts, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Section, Slide};

    fn report() -> Report {
        Report {
            title: "Test Report".into(),
            executive_summary: "Summary text.".into(),
            sections: vec![Section {
                title: "One".into(),
                content: "Content of section one.".into(),
                subsections: vec![],
            }],
            key_findings: vec!["A".into(), "B".into()],
            recommendations: vec!["C".into()],
            sources: vec![],
        }
    }

    fn presentation() -> Presentation {
        Presentation {
            title: "Deck".into(),
            slides: vec![
                Slide::Title {
                    title: "Deck".into(),
                    subtitle: None,
                    notes: None,
                },
                Slide::Content {
                    title: "One".into(),
                    bullets: vec!["a".into()],
                    notes: None,
                },
                Slide::Closing {
                    title: "Thanks".into(),
                    contact: None,
                    notes: None,
                },
            ],
        }
    }

    #[test]
    fn all_formats_render_independently() {
        let (artifacts, failures) = render_all(
            &report(),
            Some(&presentation()),
            &[OutputFormat::Pdf, OutputFormat::Docx, OutputFormat::Pptx],
            &BrandConfig::default(),
        );
        assert_eq!(artifacts.len(), 3);
        assert!(failures.is_empty());
    }

    #[test]
    fn pptx_without_presentation_fails_alone() {
        let (artifacts, failures) = render_all(
            &report(),
            None,
            &[OutputFormat::Pdf, OutputFormat::Pptx],
            &BrandConfig::default(),
        );
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].0, OutputFormat::Pdf);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].format, "pptx");
    }
}
