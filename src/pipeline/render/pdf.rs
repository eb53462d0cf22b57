//! PDF rendering: map a [`Report`] onto styled pages via lopdf.
//!
//! The layout engine is intentionally small: a cursor walks down a
//! US-Letter page, every emitted line checks remaining space and breaks to
//! a new page when needed. Line wrapping uses an average-glyph-width
//! estimate rather than font metrics; Helvetica averages just over half
//! the point size per glyph, and headers/bullets leave enough slack that
//! the estimate never overflows the margin visibly.

use crate::config::{BrandConfig, Rgb};
use crate::model::{Report, Section};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 72.0;
const BODY_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const BODY_SIZE: f32 = 11.0;
const BODY_LEADING: f32 = 14.5;
/// Heading point sizes by depth (capped at three levels).
const HEADING_SIZES: [f32; 3] = [18.0, 15.0, 13.0];

const TEXT_COLOR: Rgb = Rgb(51, 51, 51);
const MUTED_COLOR: Rgb = Rgb(107, 114, 128);

/// Render the report to PDF bytes.
pub fn render_pdf(report: &Report, brand: &BrandConfig) -> Result<Vec<u8>, String> {
    let mut page = PageComposer::new();

    // Title block: brand-coloured title, optional organisation line.
    page.spacer(8.0);
    for line in wrap_text(&report.title, 24.0, BODY_WIDTH) {
        page.line(&line, Font::Bold, 24.0, brand.primary_color, 0.0, 30.0);
    }
    if let Some(ref logo_text) = brand.logo_text {
        page.line(logo_text, Font::Regular, 11.0, MUTED_COLOR, 0.0, 16.0);
    }
    page.spacer(14.0);

    page.heading(1, "Executive Summary", brand);
    page.paragraphs(&report.executive_summary);

    for section in &report.sections {
        render_section(&mut page, section, 1, brand);
    }

    page.heading(1, "Key Findings", brand);
    for finding in &report.key_findings {
        page.bullet(finding, BODY_SIZE, TEXT_COLOR);
    }

    page.heading(1, "Recommendations", brand);
    for recommendation in &report.recommendations {
        page.bullet(recommendation, BODY_SIZE, TEXT_COLOR);
    }

    if !report.sources.is_empty() {
        page.heading(1, "Sources", brand);
        for source in &report.sources {
            page.bullet(source, 9.0, MUTED_COLOR);
        }
    }

    page.finish()
}

fn render_section(page: &mut PageComposer, section: &Section, level: usize, brand: &BrandConfig) {
    page.heading(level, &section.title, brand);
    page.paragraphs(&section.content);
    for sub in &section.subsections {
        render_section(page, sub, level + 1, brand);
    }
}

// ── Page composition ─────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

struct PageComposer {
    finished_pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    cursor_y: f32,
}

impl PageComposer {
    fn new() -> Self {
        Self {
            finished_pages: Vec::new(),
            ops: Vec::new(),
            cursor_y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn break_page(&mut self) {
        self.finished_pages.push(std::mem::take(&mut self.ops));
        self.cursor_y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.cursor_y - height < MARGIN && !self.ops.is_empty() {
            self.break_page();
        }
    }

    fn spacer(&mut self, height: f32) {
        self.cursor_y -= height;
    }

    /// Emit one already-wrapped line at the current cursor.
    fn line(&mut self, text: &str, font: Font, size: f32, color: Rgb, indent: f32, leading: f32) {
        self.ensure_space(leading);
        self.cursor_y -= leading;
        let (r, g, b) = color.to_unit();
        self.ops.extend([
            Operation::new("BT", vec![]),
            Operation::new("rg", vec![r.into(), g.into(), b.into()]),
            Operation::new("Tf", vec![font.resource_name().into(), size.into()]),
            Operation::new("Td", vec![(MARGIN + indent).into(), self.cursor_y.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn heading(&mut self, level: usize, text: &str, brand: &BrandConfig) {
        let depth = level.min(3);
        let size = HEADING_SIZES[depth - 1];
        let color = match depth {
            1 => brand.primary_color,
            2 => brand.secondary_color,
            _ => Rgb(55, 65, 81),
        };
        self.spacer(size * 0.8);
        // Keep the heading attached to at least one following body line.
        self.ensure_space(size * 1.4 + BODY_LEADING);
        for line in wrap_text(text, size, BODY_WIDTH) {
            self.line(&line, Font::Bold, size, color, 0.0, size * 1.4);
        }
        self.spacer(2.0);
    }

    /// Body text split on blank lines into paragraphs.
    fn paragraphs(&mut self, text: &str) {
        for paragraph in text.split("\n\n") {
            let flat = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
            if flat.is_empty() {
                continue;
            }
            for line in wrap_text(&flat, BODY_SIZE, BODY_WIDTH) {
                self.line(&line, Font::Regular, BODY_SIZE, TEXT_COLOR, 0.0, BODY_LEADING);
            }
            self.spacer(6.0);
        }
    }

    /// A bulleted line with hanging indent for wrapped continuations.
    fn bullet(&mut self, text: &str, size: f32, color: Rgb) {
        let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let lines = wrap_text(&flat, size, BODY_WIDTH - 14.0);
        for (i, line) in lines.iter().enumerate() {
            if i == 0 {
                self.line(&format!("\u{2022} {line}"), Font::Regular, size, color, 0.0, size * 1.3);
            } else {
                self.line(line, Font::Regular, size, color, 14.0, size * 1.3);
            }
        }
        self.spacer(3.0);
    }

    /// Assemble the accumulated pages into a PDF document.
    fn finish(mut self) -> Result<Vec<u8>, String> {
        if !self.ops.is_empty() || self.finished_pages.is_empty() {
            self.finished_pages.push(std::mem::take(&mut self.ops));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        let page_count = self.finished_pages.len();
        for operations in self.finished_pages {
            let content = Content { operations };
            let encoded = content
                .encode()
                .map_err(|e| format!("content stream: {e}"))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).map_err(|e| format!("save: {e}"))?;
        Ok(bytes)
    }
}

/// Greedy word wrap using an average Helvetica glyph width of 0.52 em.
fn wrap_text(text: &str, size: f32, width: f32) -> Vec<String> {
    let max_chars = ((width / (size * 0.52)) as usize).max(8);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
