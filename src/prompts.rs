//! Prompt construction for every LLM call in the pipeline.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing generation behaviour (adding a
//!    slide type, tightening the JSON contract) requires editing exactly
//!    one place.
//!
//! 2. **Testability**: unit tests can inspect prompts directly without a
//!    live model, so prompt regressions are caught cheaply.
//!
//! The structured-output contract lives in the prompt text AND in the
//! validation layer ([`crate::model`]); the two must stay in sync. The
//! prompt asks for the shape, the validator enforces it, and
//! [`CORRECTIVE_RETRY_PREFIX`] bridges the one retry in between.

use crate::config::{DetailLevel, SlideRange};
use crate::model::Report;

/// System prompt for report synthesis. `{detail}` guidance is appended.
pub const REPORT_SYSTEM_PROMPT: &str = r#"You are an expert research analyst and report writer.

Your task is to synthesize the provided source documents into a well-structured, professional report.

OUTPUT FORMAT: You must respond with ONLY valid JSON matching this exact structure:
{
    "title": "Report Title",
    "executive_summary": "2-3 paragraph executive summary",
    "sections": [
        {
            "title": "Section Title",
            "content": "Section content with full paragraphs. Use complete sentences and professional language.",
            "subsections": [
                {"title": "Subsection Title", "content": "Subsection content", "subsections": []}
            ]
        }
    ],
    "key_findings": ["Key finding 1 - specific and actionable", "Key finding 2 - with supporting context"],
    "recommendations": ["Recommendation 1 - clear and implementable"],
    "sources": ["Source document 1 name"]
}

CRITICAL REQUIREMENTS:
1. Write in professional, clear prose
2. Support all claims with evidence from the source documents
3. Maintain objectivity - present facts, not opinions unless clearly labeled
4. Structure content logically with clear transitions
5. Cite sources when referencing specific information
6. Include at least 2 key findings and at least 1 recommendation
7. Return ONLY the JSON object, no additional text or markdown"#;

/// System prompt for presentation synthesis. Slide range is interpolated.
pub const PRESENTATION_SYSTEM_PROMPT: &str = r#"You are an expert presentation designer.

Convert the provided report into a compelling, professional presentation.

OUTPUT FORMAT: Respond with ONLY valid JSON matching this structure:
{
    "title": "Presentation Title",
    "slides": [
        {"type": "title", "title": "Main Presentation Title", "subtitle": "Subtitle or date"},
        {"type": "section", "title": "Section Divider Title"},
        {"type": "content", "title": "Slide Title", "bullets": ["Point 1", "Point 2"], "notes": "Speaker notes"},
        {"type": "key_findings", "title": "Key Findings", "findings": ["Finding 1", "Finding 2"]},
        {"type": "stat_callout", "title": "Headline Metric", "stat_value": "$4.2M", "stat_context": "Why this number matters"},
        {"type": "comparison", "title": "Before vs After", "left_label": "Before", "right_label": "After", "left_items": ["..."], "right_items": ["..."]},
        {"type": "timeline", "title": "Roadmap", "events": [{"date": "Q1 2026", "description": "Milestone"}]},
        {"type": "chart", "title": "Revenue by Region", "chart_type": "bar", "data_labels": ["EMEA", "APAC"], "data_values": [4.1, 2.7]},
        {"type": "recommendations", "title": "Recommendations", "items": ["Recommendation 1"]},
        {"type": "closing", "title": "Thank You", "contact": "Contact information or next steps"}
    ]
}

GUIDELINES:
1. Start with a title slide and end with a closing slide
2. Use section dividers to organize major topics
3. Keep bullet points concise (1-2 lines each), maximum 6 per content slide
4. Use stat_callout, comparison, timeline, and chart slides when the data warrants it
5. Include speaker notes with additional context
6. Make content visually digestible - avoid text overload

Return ONLY the JSON object."#;

/// System prompt for per-document summarization on the context path.
pub const SUMMARIZE_SYSTEM_PROMPT: &str = r#"Summarize this document comprehensively, preserving:
- Key facts and figures
- Main arguments and conclusions
- Important quotes or data points
- Structure and flow of ideas

Be thorough but concise. Maintain the document's original meaning and intent.
Respond with the summary text only."#;

/// System prompt for targeted section edits.
pub const EDIT_SYSTEM_PROMPT: &str = r#"You are an expert editor revising one section of a professional report.

You will receive the section's current content, the user's revision instructions, and a compact summary of the surrounding report for context.

Rewrite the section according to the instructions while staying consistent with the rest of the report.

Respond with ONLY the revised section content. No preamble, no commentary, no markdown fences."#;

/// Prefix prepended to the user prompt on the single corrective retry after
/// schema-invalid output.
pub const CORRECTIVE_RETRY_PREFIX: &str =
    "Your previous response was invalid JSON or did not match the required schema. \
     Return valid JSON only, exactly matching the structure in the system prompt.\n\n";

/// Per-level guidance appended to the report system prompt.
///
/// Page targets here are advisory wording for the model; nothing validates
/// the resulting length.
pub fn detail_guidance(level: DetailLevel) -> &'static str {
    match level {
        DetailLevel::Executive => {
            "DETAIL LEVEL: EXECUTIVE\n\
             Create a concise executive summary report (1-2 pages equivalent).\n\
             Focus on high-level insights, critical findings that require attention,\n\
             and actionable recommendations. Keep sections brief and impactful."
        }
        DetailLevel::Standard => {
            "DETAIL LEVEL: STANDARD\n\
             Create a balanced report (3-5 pages equivalent).\n\
             Include an executive summary, detailed analysis of key topics,\n\
             supporting evidence and data, and clear recommendations with rationale."
        }
        DetailLevel::Comprehensive => {
            "DETAIL LEVEL: COMPREHENSIVE\n\
             Create an in-depth analytical report (5-10 pages equivalent).\n\
             Provide thorough analysis of all topics, detailed findings with full\n\
             supporting evidence, multiple recommendations with implementation\n\
             considerations, and context where relevant."
        }
    }
}

/// Full system prompt for the report call.
pub fn report_system_prompt(level: DetailLevel) -> String {
    format!("{REPORT_SYSTEM_PROMPT}\n\n{}", detail_guidance(level))
}

/// User prompt for the report call: optional instructions and title hint,
/// then the assembled context.
pub fn report_user_prompt(
    context: &str,
    custom_instructions: Option<&str>,
    title_hint: Option<&str>,
) -> String {
    let mut prompt = String::new();
    if let Some(instructions) = custom_instructions {
        prompt.push_str(&format!("USER INSTRUCTIONS:\n{instructions}\n\n"));
    }
    if let Some(title) = title_hint {
        prompt.push_str(&format!("SUGGESTED TITLE: {title}\n\n"));
    }
    prompt.push_str(&format!(
        "SOURCE DOCUMENTS:\n{context}\n\nGenerate the report now. Remember to output ONLY valid JSON."
    ));
    prompt
}

/// Full system prompt for the presentation call.
pub fn presentation_system_prompt(range: SlideRange) -> String {
    format!(
        "{PRESENTATION_SYSTEM_PROMPT}\n\nSLIDE COUNT: Create between {} and {} slides.",
        range.min, range.max
    )
}

/// User prompt for the presentation call: the report flattened to text.
pub fn presentation_user_prompt(report: &Report) -> String {
    let mut sections_text = String::new();
    for section in &report.sections {
        sections_text.push_str(&format!("\n## {}\n{}\n", section.title, section.content));
        for sub in &section.subsections {
            sections_text.push_str(&format!("\n### {}\n{}\n", sub.title, sub.content));
        }
    }
    let findings = report
        .key_findings
        .iter()
        .map(|f| format!("- {f}"))
        .collect::<Vec<_>>()
        .join("\n");
    let recommendations = report
        .recommendations
        .iter()
        .map(|r| format!("- {r}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Create a presentation from this report:\n\n\
         TITLE: {}\n\n\
         EXECUTIVE SUMMARY:\n{}\n\n\
         SECTIONS:\n{}\n\
         KEY FINDINGS:\n{}\n\n\
         RECOMMENDATIONS:\n{}\n\n\
         Generate the presentation slides now. Return ONLY valid JSON.",
        report.title, report.executive_summary, sections_text, findings, recommendations
    )
}

/// User prompt for a summarization call.
pub fn summarize_user_prompt(file_name: &str, content: &str) -> String {
    format!("DOCUMENT: {file_name}\n---\n{content}")
}

/// Compact report summary sent alongside a targeted edit so the model keeps
/// the section consistent with its siblings.
pub fn edit_context_summary(report: &Report) -> String {
    let summary_excerpt: String = report.executive_summary.chars().take(500).collect();
    let section_titles = report
        .sections
        .iter()
        .map(|s| s.title.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Report Title: {}\n\nExecutive Summary: {summary_excerpt}...\n\n\
         Sections: {section_titles}\n\nKey Findings: {} items",
        report.title,
        report.key_findings.len()
    )
}

/// User prompt for a targeted edit call.
pub fn edit_user_prompt(
    section_title: &str,
    current_content: &str,
    instructions: &str,
    report_context: &str,
) -> String {
    format!(
        "REPORT CONTEXT:\n{report_context}\n\n\
         SECTION: {section_title}\n\n\
         CURRENT CONTENT:\n{current_content}\n\n\
         REVISION INSTRUCTIONS:\n{instructions}\n\n\
         Rewrite the section now."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_prompt_embeds_detail_guidance() {
        let p = report_system_prompt(DetailLevel::Executive);
        assert!(p.contains("EXECUTIVE"));
        assert!(p.contains("ONLY valid JSON"));
    }

    #[test]
    fn presentation_prompt_embeds_slide_range() {
        let p = presentation_system_prompt(SlideRange { min: 5, max: 9 });
        assert!(p.contains("between 5 and 9 slides"));
    }

    #[test]
    fn user_prompt_orders_instructions_first() {
        let p = report_user_prompt("CTX", Some("be brief"), Some("Q3 Review"));
        let instr = p.find("USER INSTRUCTIONS").unwrap();
        let title = p.find("SUGGESTED TITLE").unwrap();
        let docs = p.find("SOURCE DOCUMENTS").unwrap();
        assert!(instr < title && title < docs);
    }

    #[test]
    fn edit_context_truncates_summary() {
        let report = Report {
            title: "T".into(),
            executive_summary: "a".repeat(2000),
            sections: vec![],
            key_findings: vec!["x".into()],
            recommendations: vec![],
            sources: vec![],
        };
        let ctx = edit_context_summary(&report);
        assert!(ctx.len() < 700);
        assert!(ctx.contains("Key Findings: 1 items"));
    }
}
