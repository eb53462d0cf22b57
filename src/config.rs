//! Configuration types for a generation job.
//!
//! All per-job behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. Keeping every knob in one struct
//! makes it trivial to share configs across tasks, serialise them for
//! logging, and diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Verbosity/depth selector for generated reports.
///
/// Selects prompt guidance only. The model is *asked* to hit the page
/// target but the pipeline never validates page counts; treat this as a
/// soft contract, not a guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Concise summary report, 1-2 pages equivalent.
    Executive,
    /// Balanced report, 3-5 pages equivalent. (default)
    #[default]
    Standard,
    /// In-depth analytical report, 5-10 pages equivalent.
    Comprehensive,
}

impl DetailLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Executive => "executive",
            DetailLevel::Standard => "standard",
            DetailLevel::Comprehensive => "comprehensive",
        }
    }
}

/// A requested output artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Docx,
    Pptx,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
            OutputFormat::Pptx => "pptx",
        }
    }

    /// MIME type recorded with the stored artifact.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            OutputFormat::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }
}

/// Requested slide count range for a generated deck.
///
/// Advisory: the prompt asks the model to stay within the range, and the
/// orchestrator accepts decks outside it rather than rejecting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRange {
    pub min: usize,
    pub max: usize,
}

impl Default for SlideRange {
    fn default() -> Self {
        Self { min: 8, max: 15 }
    }
}

/// An sRGB colour used by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Uppercase hex without '#', the form OOXML attributes want.
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    /// Normalised components for PDF `rg` operators.
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        )
    }
}

/// Brand palette applied by every renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrandConfig {
    /// Headings, title backgrounds, accents.
    pub primary_color: Rgb,
    /// Second-level headings and secondary accents.
    pub secondary_color: Rgb,
    /// Highlights (comparison right column, timeline markers).
    pub accent_color: Rgb,
    /// Short organisation name shown in title blocks and closing slides.
    pub logo_text: Option<String>,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            primary_color: Rgb(37, 99, 235),    // #2563eb
            secondary_color: Rgb(30, 64, 175),  // #1e40af
            accent_color: Rgb(16, 185, 129),    // #10b981
            logo_text: None,
        }
    }
}

/// Configuration for one generation job.
///
/// Built via [`GenerationConfig::builder()`] or
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use briefcraft::{DetailLevel, GenerationConfig, OutputFormat};
///
/// let config = GenerationConfig::builder()
///     .title("Q3 Market Review")
///     .detail_level(DetailLevel::Executive)
///     .output_formats([OutputFormat::Pdf, OutputFormat::Pptx])
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Suggested report title passed to the model. The model may refine it.
    pub title: Option<String>,

    /// Free-text user instructions prepended to the generation prompt.
    pub custom_instructions: Option<String>,

    /// Report depth selector. Default: [`DetailLevel::Standard`].
    pub detail_level: DetailLevel,

    /// Artifact formats to render. Default: `[Pdf]`.
    ///
    /// A presentation is generated only when `Pptx` is requested; the
    /// report alone feeds `Pdf` and `Docx`.
    pub output_formats: Vec<OutputFormat>,

    /// Requested slide count range when a deck is generated.
    pub slide_range: SlideRange,

    /// Optional web search query. When set, results are appended to the
    /// context as a distinct labeled block.
    pub web_query: Option<String>,

    /// Brand palette for the renderers.
    pub brand: BrandConfig,

    /// Maximum tokens the model may generate for the report. Default: 8192.
    ///
    /// Comprehensive reports over large document sets can exceed 6 000
    /// output tokens; setting this too low truncates the JSON mid-object
    /// and burns the corrective retry on a self-inflicted failure.
    pub report_max_tokens: usize,

    /// Maximum tokens for the presentation call. Default: 4096.
    pub presentation_max_tokens: usize,

    /// Maximum tokens per document summarization call. Default: 3000.
    pub summary_max_tokens: usize,

    /// Retry attempts for transient provider failures. Default: 3.
    ///
    /// Most 5xx and timeout errors are transient. Schema-invalid output is
    /// retried separately (exactly once, with a corrective instruction)
    /// and does not consume these attempts.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms, 1 s, 2 s.
    pub retry_backoff_ms: u64,

    /// TTL in seconds for artifact signed URLs. Default: 7 days.
    pub signed_url_ttl_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            title: None,
            custom_instructions: None,
            detail_level: DetailLevel::default(),
            output_formats: vec![OutputFormat::Pdf],
            slide_range: SlideRange::default(),
            web_query: None,
            brand: BrandConfig::default(),
            report_max_tokens: 8192,
            presentation_max_tokens: 4096,
            summary_max_tokens: 3000,
            max_retries: 3,
            retry_backoff_ms: 500,
            signed_url_ttl_secs: 3600 * 24 * 7,
        }
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether the requested formats imply a presentation stage.
    pub fn wants_presentation(&self) -> bool {
        self.output_formats.contains(&OutputFormat::Pptx)
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn custom_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.config.custom_instructions = Some(instructions.into());
        self
    }

    pub fn detail_level(mut self, level: DetailLevel) -> Self {
        self.config.detail_level = level;
        self
    }

    pub fn output_formats(mut self, formats: impl IntoIterator<Item = OutputFormat>) -> Self {
        self.config.output_formats = formats.into_iter().collect();
        self
    }

    pub fn slide_range(mut self, min: usize, max: usize) -> Self {
        self.config.slide_range = SlideRange { min, max };
        self
    }

    pub fn web_query(mut self, query: impl Into<String>) -> Self {
        self.config.web_query = Some(query.into());
        self
    }

    pub fn brand(mut self, brand: BrandConfig) -> Self {
        self.config.brand = brand;
        self
    }

    pub fn report_max_tokens(mut self, n: usize) -> Self {
        self.config.report_max_tokens = n;
        self
    }

    pub fn presentation_max_tokens(mut self, n: usize) -> Self {
        self.config.presentation_max_tokens = n;
        self
    }

    pub fn summary_max_tokens(mut self, n: usize) -> Self {
        self.config.summary_max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn signed_url_ttl_secs(mut self, secs: u64) -> Self {
        self.config.signed_url_ttl_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, PipelineError> {
        let c = &self.config;
        if c.output_formats.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one output format is required".into(),
            ));
        }
        if c.slide_range.min == 0 || c.slide_range.min > c.slide_range.max {
            return Err(PipelineError::InvalidConfig(format!(
                "invalid slide range {}..{}",
                c.slide_range.min, c.slide_range.max
            )));
        }
        if c.report_max_tokens == 0 {
            return Err(PipelineError::InvalidConfig(
                "report_max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
