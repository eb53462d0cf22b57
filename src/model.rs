//! Structured content models: the report tree, the slide deck, and the
//! addressing scheme used for targeted edits.
//!
//! ## Untrusted input
//!
//! The LLM's raw text is an untrusted payload. It is never promoted
//! directly into [`Report`] or [`Presentation`]: generation goes through
//! [`Report::from_llm_json`] / [`Presentation::from_llm_json`], which parse
//! into permissive raw shapes, normalise whitespace, drop blank list
//! entries, map unknown slide types onto the generic content layout, and
//! reject output that misses the structural minimums. A value of these
//! types therefore always satisfies the schema.
//!
//! ## Paths
//!
//! Report nodes are addressed by dotted paths (`executive_summary`,
//! `sections.1.subsections.0`, `key_findings`); slides by `slides.N`.
//! [`SectionPath`] is the parsed form and the unit of targeted edit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Report ───────────────────────────────────────────────────────────────

/// A recursive report section: title, body text, nested subsections.
///
/// Depth is unbounded in the type but practically shallow (2-3 levels);
/// renderers cap heading levels rather than the model capping depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub subsections: Vec<Section>,
}

/// A structured research report produced by the generation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub executive_summary: String,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Report {
    /// Parse and validate raw LLM output into a `Report`.
    ///
    /// # Errors
    /// Returns a human-readable description of the first schema violation,
    /// used verbatim in the corrective retry prompt.
    pub fn from_llm_json(raw: &str) -> Result<Report, String> {
        let mut report: Report =
            serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
        report.normalize();
        report.check()?;
        Ok(report)
    }

    /// Trim titles and drop blank list entries before structural checks.
    fn normalize(&mut self) {
        self.title = self.title.trim().to_string();
        self.key_findings.retain(|f| !f.trim().is_empty());
        self.recommendations.retain(|r| !r.trim().is_empty());
        self.sources.retain(|s| !s.trim().is_empty());
        for f in &mut self.key_findings {
            *f = f.trim().to_string();
        }
        for r in &mut self.recommendations {
            *r = r.trim().to_string();
        }
    }

    /// Structural minimums, mirrored by the generation prompt.
    fn check(&self) -> Result<(), String> {
        if self.title.is_empty() {
            return Err("report title is empty".into());
        }
        if self.executive_summary.trim().len() < 100 {
            return Err("executive summary must be at least 100 characters".into());
        }
        if self.sections.is_empty() {
            return Err("report must have at least 1 section".into());
        }
        if self.key_findings.len() < 2 {
            return Err("report must have at least 2 key findings".into());
        }
        if self.recommendations.is_empty() {
            return Err("report must have at least 1 recommendation".into());
        }
        for (i, s) in self.sections.iter().enumerate() {
            s.check(&format!("sections.{i}"))?;
        }
        Ok(())
    }

    /// Walk `sections`/`subsections` by index sequence.
    pub fn section_at(&self, indices: &[usize]) -> Option<&Section> {
        let (&first, rest) = indices.split_first()?;
        let mut node = self.sections.get(first)?;
        for &i in rest {
            node = node.subsections.get(i)?;
        }
        Some(node)
    }

    fn section_at_mut(&mut self, indices: &[usize]) -> Option<&mut Section> {
        let (&first, rest) = indices.split_first()?;
        let mut node = self.sections.get_mut(first)?;
        for &i in rest {
            node = node.subsections.get_mut(i)?;
        }
        Some(node)
    }

    /// Human-readable title of the node a path points at.
    pub fn node_title(&self, path: &SectionPath) -> Option<String> {
        match path {
            SectionPath::ExecutiveSummary => Some("Executive Summary".into()),
            SectionPath::KeyFindings => Some("Key Findings".into()),
            SectionPath::Recommendations => Some("Recommendations".into()),
            SectionPath::Section(idx) => self.section_at(idx).map(|s| s.title.clone()),
            SectionPath::Slide(_) => None,
        }
    }

    /// Current content of the node a path points at.
    ///
    /// List nodes (`key_findings`, `recommendations`) are joined with
    /// newlines so the edit flow always works on a single string.
    pub fn node_content(&self, path: &SectionPath) -> Option<String> {
        match path {
            SectionPath::ExecutiveSummary => Some(self.executive_summary.clone()),
            SectionPath::KeyFindings => Some(self.key_findings.join("\n")),
            SectionPath::Recommendations => Some(self.recommendations.join("\n")),
            SectionPath::Section(idx) => self.section_at(idx).map(|s| s.content.clone()),
            SectionPath::Slide(_) => None,
        }
    }

    /// Replace the content of the node a path points at.
    ///
    /// This is the only mutation path for generated report content after
    /// creation. List nodes re-parse the replacement as a JSON array or
    /// bullet lines. Returns `false` when the path does not resolve.
    pub fn set_node_content(&mut self, path: &SectionPath, new_content: &str) -> bool {
        match path {
            SectionPath::ExecutiveSummary => {
                self.executive_summary = new_content.to_string();
                true
            }
            SectionPath::KeyFindings => {
                self.key_findings = parse_string_list(new_content);
                true
            }
            SectionPath::Recommendations => {
                self.recommendations = parse_string_list(new_content);
                true
            }
            SectionPath::Section(idx) => match self.section_at_mut(idx) {
                Some(s) => {
                    s.content = new_content.to_string();
                    true
                }
                None => false,
            },
            SectionPath::Slide(_) => false,
        }
    }
}

impl Section {
    fn check(&self, at: &str) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err(format!("{at}: section title is empty"));
        }
        if self.content.trim().len() < 50 {
            return Err(format!("{at}: section content must be at least 50 characters"));
        }
        for (i, sub) in self.subsections.iter().enumerate() {
            if sub.title.trim().is_empty() {
                return Err(format!("{at}.subsections.{i}: subsection title is empty"));
            }
            if sub.content.trim().len() < 30 {
                return Err(format!(
                    "{at}.subsections.{i}: subsection content must be at least 30 characters"
                ));
            }
        }
        Ok(())
    }
}

/// Parse an edited list node: a JSON string array when the model returned
/// one, otherwise one entry per non-blank line with bullet markers removed.
pub(crate) fn parse_string_list(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        if let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed) {
            return items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }
    trimmed
        .lines()
        .map(|l| l.trim().trim_start_matches(['•', '-', '*']).trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

// ── Presentation ─────────────────────────────────────────────────────────

/// One timeline entry on a timeline slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
}

/// A slide, as a closed sum over the supported layouts.
///
/// Dispatch on slide type is a `match`, one render function per variant,
/// so an unhandled layout is a compile error rather than a silent no-op.
/// Unknown types coming from the model never reach this enum: the raw
/// decoding layer folds them into `Content` (the generic layout).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Slide {
    Title {
        title: String,
        #[serde(default)]
        subtitle: Option<String>,
        #[serde(default)]
        notes: Option<String>,
    },
    Section {
        title: String,
        #[serde(default)]
        notes: Option<String>,
    },
    Content {
        title: String,
        #[serde(default)]
        bullets: Vec<String>,
        #[serde(default)]
        notes: Option<String>,
    },
    KeyFindings {
        title: String,
        #[serde(default)]
        findings: Vec<String>,
        #[serde(default)]
        notes: Option<String>,
    },
    StatCallout {
        title: String,
        stat_value: String,
        #[serde(default)]
        stat_context: Option<String>,
        #[serde(default)]
        notes: Option<String>,
    },
    Comparison {
        title: String,
        #[serde(default)]
        left_label: Option<String>,
        #[serde(default)]
        right_label: Option<String>,
        #[serde(default)]
        left_items: Vec<String>,
        #[serde(default)]
        right_items: Vec<String>,
        #[serde(default)]
        notes: Option<String>,
    },
    Timeline {
        title: String,
        #[serde(default)]
        events: Vec<TimelineEvent>,
        #[serde(default)]
        notes: Option<String>,
    },
    Chart {
        title: String,
        #[serde(default)]
        chart_type: Option<String>,
        #[serde(default)]
        chart_title: Option<String>,
        #[serde(default)]
        data_labels: Vec<String>,
        #[serde(default)]
        data_values: Vec<f64>,
        #[serde(default)]
        notes: Option<String>,
    },
    Recommendations {
        title: String,
        #[serde(default)]
        items: Vec<String>,
        #[serde(default)]
        notes: Option<String>,
    },
    Closing {
        title: String,
        #[serde(default)]
        contact: Option<String>,
        #[serde(default)]
        notes: Option<String>,
    },
}

impl Slide {
    /// Parse one slide from raw LLM output, applying the same permissive
    /// decoding and content-layout fallback as full-deck parsing.
    pub fn from_llm_json(raw: &str) -> Result<Slide, String> {
        let raw_slide: RawSlide =
            serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
        raw_slide.into_slide()
    }

    /// The slide's headline text, used for logging and fallbacks.
    pub fn title(&self) -> &str {
        match self {
            Slide::Title { title, .. }
            | Slide::Section { title, .. }
            | Slide::Content { title, .. }
            | Slide::KeyFindings { title, .. }
            | Slide::StatCallout { title, .. }
            | Slide::Comparison { title, .. }
            | Slide::Timeline { title, .. }
            | Slide::Chart { title, .. }
            | Slide::Recommendations { title, .. }
            | Slide::Closing { title, .. } => title,
        }
    }

    /// Speaker notes, when present. Rendered to the notes channel only,
    /// never on-slide.
    pub fn notes(&self) -> Option<&str> {
        match self {
            Slide::Title { notes, .. }
            | Slide::Section { notes, .. }
            | Slide::Content { notes, .. }
            | Slide::KeyFindings { notes, .. }
            | Slide::StatCallout { notes, .. }
            | Slide::Comparison { notes, .. }
            | Slide::Timeline { notes, .. }
            | Slide::Chart { notes, .. }
            | Slide::Recommendations { notes, .. }
            | Slide::Closing { notes, .. } => notes.as_deref(),
        }
    }
}

/// Permissive decoding shape for a slide as the model actually returns it:
/// a flat object with a `type` string and every layout's fields optional.
#[derive(Debug, Deserialize)]
struct RawSlide {
    #[serde(rename = "type", default)]
    slide_type: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    bullets: Option<Vec<String>>,
    #[serde(default)]
    findings: Option<Vec<String>>,
    #[serde(default)]
    items: Option<Vec<String>>,
    #[serde(default)]
    stat_value: Option<String>,
    #[serde(default)]
    stat_context: Option<String>,
    #[serde(default)]
    left_label: Option<String>,
    #[serde(default)]
    right_label: Option<String>,
    #[serde(default)]
    left_items: Option<Vec<String>>,
    #[serde(default)]
    right_items: Option<Vec<String>>,
    #[serde(default)]
    events: Option<Vec<TimelineEvent>>,
    #[serde(default)]
    chart_type: Option<String>,
    #[serde(default)]
    chart_title: Option<String>,
    #[serde(default)]
    data_labels: Option<Vec<String>>,
    #[serde(default)]
    data_values: Option<Vec<f64>>,
    #[serde(default)]
    contact: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

impl RawSlide {
    fn into_slide(self) -> Result<Slide, String> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(format!("slide of type '{}' has an empty title", self.slide_type));
        }
        let notes = self.notes;
        let slide = match self.slide_type.as_str() {
            "title" => Slide::Title {
                title,
                subtitle: self.subtitle,
                notes,
            },
            "section" => Slide::Section { title, notes },
            "key_findings" => Slide::KeyFindings {
                title,
                findings: self.findings.unwrap_or_default(),
                notes,
            },
            "stat_callout" => Slide::StatCallout {
                title,
                stat_value: self.stat_value.unwrap_or_else(|| "—".into()),
                stat_context: self.stat_context,
                notes,
            },
            "comparison" => Slide::Comparison {
                title,
                left_label: self.left_label,
                right_label: self.right_label,
                left_items: self.left_items.unwrap_or_default(),
                right_items: self.right_items.unwrap_or_default(),
                notes,
            },
            "timeline" => Slide::Timeline {
                title,
                events: self.events.unwrap_or_default(),
                notes,
            },
            "chart" => Slide::Chart {
                title,
                chart_type: self.chart_type,
                chart_title: self.chart_title,
                data_labels: self.data_labels.unwrap_or_default(),
                data_values: self.data_values.unwrap_or_default(),
                notes,
            },
            "recommendations" => Slide::Recommendations {
                title,
                items: self.items.unwrap_or_default(),
                notes,
            },
            "closing" => Slide::Closing {
                title,
                contact: self.contact,
                notes,
            },
            // "content" and anything unrecognised: generic bullet layout.
            _ => Slide::Content {
                title,
                bullets: self.bullets.unwrap_or_default(),
                notes,
            },
        };
        Ok(slide)
    }
}

/// A slide deck produced by the presentation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub title: String,
    pub slides: Vec<Slide>,
}

impl Presentation {
    /// Parse and validate raw LLM output into a `Presentation`.
    ///
    /// # Errors
    /// Returns a description of the first schema violation, used verbatim
    /// in the corrective retry prompt.
    pub fn from_llm_json(raw: &str) -> Result<Presentation, String> {
        #[derive(Deserialize)]
        struct RawPresentation {
            #[serde(default)]
            title: String,
            #[serde(default)]
            slides: Vec<RawSlide>,
        }

        let raw_pres: RawPresentation =
            serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;

        let title = raw_pres.title.trim().to_string();
        if title.is_empty() {
            return Err("presentation title is empty".into());
        }
        let slides = raw_pres
            .slides
            .into_iter()
            .map(RawSlide::into_slide)
            .collect::<Result<Vec<_>, _>>()?;

        if slides.len() < 3 {
            return Err(format!(
                "presentation must have at least 3 slides, got {}",
                slides.len()
            ));
        }
        if !slides.iter().any(|s| matches!(s, Slide::Title { .. })) {
            return Err("presentation must have a title slide".into());
        }

        Ok(Presentation { title, slides })
    }

    /// The slide at an index, serialised as pretty JSON for the edit flow.
    pub fn slide_content(&self, index: usize) -> Option<String> {
        self.slides
            .get(index)
            .map(|s| serde_json::to_string_pretty(s).unwrap_or_default())
    }

    /// Replace one slide in place. Returns `false` for an out-of-range index.
    pub fn set_slide(&mut self, index: usize, slide: Slide) -> bool {
        match self.slides.get_mut(index) {
            Some(existing) => {
                *existing = slide;
                true
            }
            None => false,
        }
    }
}

// ── Paths ────────────────────────────────────────────────────────────────

/// Parsed address of one editable node in a report or presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionPath {
    ExecutiveSummary,
    KeyFindings,
    Recommendations,
    /// Index sequence through `sections` and nested `subsections`, e.g.
    /// `sections.1.subsections.0` parses to `Section(vec![1, 0])`.
    Section(Vec<usize>),
    /// `slides.N`
    Slide(usize),
}

impl FromStr for SectionPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            ["executive_summary"] => Ok(SectionPath::ExecutiveSummary),
            ["key_findings"] => Ok(SectionPath::KeyFindings),
            ["recommendations"] => Ok(SectionPath::Recommendations),
            ["slides", n] => n
                .parse()
                .map(SectionPath::Slide)
                .map_err(|_| format!("invalid slide index in '{s}'")),
            ["sections", rest @ ..] if !rest.is_empty() => {
                // Alternating "<index>" and "subsections" segments.
                let mut indices = Vec::new();
                let mut expect_index = true;
                for part in rest {
                    if expect_index {
                        let idx = part
                            .parse()
                            .map_err(|_| format!("invalid index '{part}' in '{s}'"))?;
                        indices.push(idx);
                    } else if *part != "subsections" {
                        return Err(format!("expected 'subsections' in '{s}', got '{part}'"));
                    }
                    expect_index = !expect_index;
                }
                if expect_index {
                    // Path ended on "subsections" with no index following.
                    return Err(format!("dangling 'subsections' in '{s}'"));
                }
                Ok(SectionPath::Section(indices))
            }
            _ => Err(format!("unrecognised section path: '{s}'")),
        }
    }
}

impl fmt::Display for SectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionPath::ExecutiveSummary => write!(f, "executive_summary"),
            SectionPath::KeyFindings => write!(f, "key_findings"),
            SectionPath::Recommendations => write!(f, "recommendations"),
            SectionPath::Slide(n) => write!(f, "slides.{n}"),
            SectionPath::Section(indices) => {
                write!(f, "sections")?;
                for (i, idx) in indices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ".subsections")?;
                    }
                    write!(f, ".{idx}")?;
                }
                Ok(())
            }
        }
    }
}

// ── Edit history ─────────────────────────────────────────────────────────

/// One applied targeted edit. History is append-only; "undo" removes the
/// newest record without restoring prior content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditRecord {
    pub path: String,
    pub old_content: String,
    pub new_content: String,
    pub applied_at: DateTime<Utc>,
}
