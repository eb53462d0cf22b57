//! PPTX rendering: map each [`Slide`] variant onto a layout-specific
//! builder over a fixed 16:9 canvas.
//!
//! Dispatch is a closed `match` with one builder per variant; the decoding
//! layer already folded unknown slide types into `Content`, so every deck
//! that reaches this module renders without a fallback branch at runtime.
//! Speaker notes go to the slide's notes part only and never appear
//! on-slide.
//!
//! Like the DOCX renderer, parts are hand-assembled XML with all
//! interpolated text escaped. Coordinates are EMU (914,400 per inch) on a
//! 13.33in x 7.5in canvas.

use crate::config::BrandConfig;
use crate::model::{Presentation, Slide, TimelineEvent};
use crate::pipeline::render::ooxml::{relationships_xml, xml_escape, PackageWriter};

const SLIDE_W: i64 = 12_192_000;
const SLIDE_H: i64 = 6_858_000;
const EMU_PER_INCH: f64 = 914_400.0;

/// Light gray used for callout backgrounds and muted panels.
const LIGHT_BG: &str = "F3F4F6";
const TEXT_DARK: &str = "1F2937";
const TEXT_MUTED: &str = "6B7280";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_NOTES_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesMaster";
const REL_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_NOTES_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
const REL_THEME: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";

fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH) as i64
}

/// Render the presentation to PPTX bytes.
pub fn render_pptx(presentation: &Presentation, brand: &BrandConfig) -> Result<Vec<u8>, String> {
    let mut package = PackageWriter::new();

    let slide_count = presentation.slides.len();
    let has_notes = presentation.slides.iter().any(|s| s.notes().is_some());

    package.add_part("[Content_Types].xml", &content_types_xml(presentation, has_notes))?;
    package.add_part(
        "_rels/.rels",
        &relationships_xml(&[(
            "rId1".into(),
            REL_OFFICE_DOCUMENT,
            "ppt/presentation.xml".into(),
        )]),
    )?;
    package.add_part("ppt/presentation.xml", &presentation_xml(slide_count, has_notes))?;
    package.add_part(
        "ppt/_rels/presentation.xml.rels",
        &presentation_rels(slide_count, has_notes),
    )?;

    package.add_part("ppt/theme/theme1.xml", THEME_XML)?;
    package.add_part("ppt/slideMasters/slideMaster1.xml", SLIDE_MASTER_XML)?;
    package.add_part(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        &relationships_xml(&[
            ("rId1".into(), REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml".into()),
            ("rId2".into(), REL_THEME, "../theme/theme1.xml".into()),
        ]),
    )?;
    package.add_part("ppt/slideLayouts/slideLayout1.xml", SLIDE_LAYOUT_XML)?;
    package.add_part(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        &relationships_xml(&[(
            "rId1".into(),
            REL_SLIDE_MASTER,
            "../slideMasters/slideMaster1.xml".into(),
        )]),
    )?;
    if has_notes {
        package.add_part("ppt/notesMasters/notesMaster1.xml", NOTES_MASTER_XML)?;
        package.add_part(
            "ppt/notesMasters/_rels/notesMaster1.xml.rels",
            &relationships_xml(&[("rId1".into(), REL_THEME, "../theme/theme1.xml".into())]),
        )?;
    }

    for (i, slide) in presentation.slides.iter().enumerate() {
        let n = i + 1;
        package.add_part(&format!("ppt/slides/slide{n}.xml"), &slide_xml(slide, brand))?;

        let mut rels = vec![(
            "rId1".to_string(),
            REL_SLIDE_LAYOUT,
            "../slideLayouts/slideLayout1.xml".to_string(),
        )];
        if let Some(notes) = slide.notes() {
            rels.push((
                "rId2".to_string(),
                REL_NOTES_SLIDE,
                format!("../notesSlides/notesSlide{n}.xml"),
            ));
            package.add_part(
                &format!("ppt/notesSlides/notesSlide{n}.xml"),
                &notes_slide_xml(notes),
            )?;
            package.add_part(
                &format!("ppt/notesSlides/_rels/notesSlide{n}.xml.rels"),
                &relationships_xml(&[
                    ("rId1".into(), REL_NOTES_MASTER, "../notesMasters/notesMaster1.xml".into()),
                    ("rId2".into(), REL_SLIDE, format!("../slides/slide{n}.xml")),
                ]),
            )?;
        }
        package.add_part(&format!("ppt/slides/_rels/slide{n}.xml.rels"), &relationships_xml(&rels))?;
    }

    package.finish()
}

// ── Package boilerplate ──────────────────────────────────────────────────

fn content_types_xml(presentation: &Presentation, has_notes: bool) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#,
    );
    if has_notes {
        xml.push_str(
            r#"
<Override PartName="/ppt/notesMasters/notesMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.notesMaster+xml"/>"#,
        );
    }
    for (i, slide) in presentation.slides.iter().enumerate() {
        let n = i + 1;
        xml.push_str(&format!(
            "\n<Override PartName=\"/ppt/slides/slide{n}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slide+xml\"/>"
        ));
        if slide.notes().is_some() {
            xml.push_str(&format!(
                "\n<Override PartName=\"/ppt/notesSlides/notesSlide{n}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml\"/>"
            ));
        }
    }
    xml.push_str("\n</Types>");
    xml
}

fn presentation_xml(slide_count: usize, has_notes: bool) -> String {
    let mut slide_ids = String::new();
    for i in 0..slide_count {
        slide_ids.push_str(&format!(
            r#"<p:sldId id="{}" r:id="rId{}"/>"#,
            256 + i,
            i + 2
        ));
    }
    let notes_master = if has_notes {
        format!(
            r#"<p:notesMasterIdLst><p:notesMasterId r:id="rId{}"/></p:notesMasterIdLst>"#,
            slide_count + 2
        )
    } else {
        String::new()
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
{notes_master}<p:sldIdLst>{slide_ids}</p:sldIdLst>
<p:sldSz cx="{SLIDE_W}" cy="{SLIDE_H}"/><p:notesSz cx="{SLIDE_H}" cy="{SLIDE_W}"/>
</p:presentation>"#
    )
}

fn presentation_rels(slide_count: usize, has_notes: bool) -> String {
    let mut rels: Vec<(String, &str, String)> = vec![(
        "rId1".into(),
        REL_SLIDE_MASTER,
        "slideMasters/slideMaster1.xml".into(),
    )];
    for i in 0..slide_count {
        rels.push((
            format!("rId{}", i + 2),
            REL_SLIDE,
            format!("slides/slide{}.xml", i + 1),
        ));
    }
    if has_notes {
        rels.push((
            format!("rId{}", slide_count + 2),
            REL_NOTES_MASTER,
            "notesMasters/notesMaster1.xml".into(),
        ));
    }
    relationships_xml(&rels)
}

const SLIDE_MASTER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld>
<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>
</p:sldMaster>"#;

const SLIDE_LAYOUT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank">
<p:cSld name="Blank"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld>
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sldLayout>"#;

const NOTES_MASTER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notesMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld>
<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
</p:notesMaster>"#;

/// Minimal Office theme. The slide shapes carry explicit fills and fonts,
/// so the theme exists only to keep the package well-formed for viewers
/// that insist on one.
const THEME_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Brief">
<a:themeElements>
<a:clrScheme name="Brief"><a:dk1><a:srgbClr val="1F2937"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="374151"/></a:dk2><a:lt2><a:srgbClr val="F3F4F6"/></a:lt2><a:accent1><a:srgbClr val="2563EB"/></a:accent1><a:accent2><a:srgbClr val="1E40AF"/></a:accent2><a:accent3><a:srgbClr val="10B981"/></a:accent3><a:accent4><a:srgbClr val="6B7280"/></a:accent4><a:accent5><a:srgbClr val="9CA3AF"/></a:accent5><a:accent6><a:srgbClr val="D1D5DB"/></a:accent6><a:hlink><a:srgbClr val="2563EB"/></a:hlink><a:folHlink><a:srgbClr val="1E40AF"/></a:folHlink></a:clrScheme>
<a:fontScheme name="Brief"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme>
<a:fmtScheme name="Brief">
<a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst>
<a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst>
<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst>
<a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst>
</a:fmtScheme>
</a:themeElements>
</a:theme>"#;

// ── Slide composition ────────────────────────────────────────────────────

/// Paragraph alignment within a text shape.
#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
}

/// One paragraph of styled text inside a shape.
struct Para {
    text: String,
    size_pt: u32,
    bold: bool,
    color: String,
    align: Align,
    bullet: bool,
}

impl Para {
    fn new(text: impl Into<String>, size_pt: u32, bold: bool, color: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size_pt,
            bold,
            color: color.into(),
            align: Align::Left,
            bullet: false,
        }
    }

    fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }

    fn bulleted(mut self) -> Self {
        self.bullet = true;
        self
    }

    fn to_xml(&self) -> String {
        let algn = match self.align {
            Align::Left => "l",
            Align::Center => "ctr",
        };
        let bullet = if self.bullet {
            r#"<a:buChar char="&#8226;"/>"#
        } else {
            "<a:buNone/>"
        };
        let bold = if self.bold { r#" b="1""# } else { "" };
        format!(
            r#"<a:p><a:pPr algn="{algn}">{bullet}</a:pPr><a:r><a:rPr lang="en-US" sz="{}"{bold} dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:latin typeface="Calibri"/></a:rPr><a:t>{}</a:t></a:r></a:p>"#,
            self.size_pt * 100,
            self.color,
            xml_escape(&self.text)
        )
    }
}

/// Accumulates one slide's shape tree.
struct SlideComposer {
    shapes: String,
    next_id: usize,
    background: Option<String>,
}

impl SlideComposer {
    fn new() -> Self {
        Self {
            shapes: String::new(),
            next_id: 2,
            background: None,
        }
    }

    fn background(&mut self, color: &str) {
        self.background = Some(color.to_string());
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// A filled rectangle with no text.
    fn rect(&mut self, x: i64, y: i64, w: i64, h: i64, color: &str) {
        let id = self.next_id();
        self.shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Shape {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{w}" cy="{h}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:solidFill><a:srgbClr val="{color}"/></a:solidFill><a:ln><a:noFill/></a:ln></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/><a:p/></p:txBody></p:sp>"#
        ));
    }

    /// A borderless text box holding the given paragraphs.
    fn text(&mut self, x: i64, y: i64, w: i64, h: i64, paras: &[Para]) {
        if paras.is_empty() {
            return;
        }
        let id = self.next_id();
        let body: String = paras.iter().map(Para::to_xml).collect();
        self.shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Text {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{w}" cy="{h}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square"><a:normAutofit/></a:bodyPr><a:lstStyle/>{body}</p:txBody></p:sp>"#
        ));
    }

    fn finish(self) -> String {
        let bg = match self.background {
            Some(color) => format!(
                r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="{color}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>"#
            ),
            None => String::new(),
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld>{bg}<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{shapes}</p:spTree></p:cSld>
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sld>"#,
            shapes = self.shapes
        )
    }
}

// ── Per-variant builders ─────────────────────────────────────────────────

fn slide_xml(slide: &Slide, brand: &BrandConfig) -> String {
    let mut c = SlideComposer::new();
    match slide {
        Slide::Title { title, subtitle, .. } => build_title(&mut c, title, subtitle.as_deref(), brand),
        Slide::Section { title, .. } => build_section(&mut c, title, brand),
        Slide::Content { title, bullets, .. } => build_content(&mut c, title, bullets, brand),
        Slide::KeyFindings { title, findings, .. } => build_content(&mut c, title, findings, brand),
        Slide::StatCallout {
            title,
            stat_value,
            stat_context,
            ..
        } => build_stat_callout(&mut c, title, stat_value, stat_context.as_deref(), brand),
        Slide::Comparison {
            title,
            left_label,
            right_label,
            left_items,
            right_items,
            ..
        } => build_comparison(
            &mut c,
            title,
            left_label.as_deref(),
            right_label.as_deref(),
            left_items,
            right_items,
            brand,
        ),
        Slide::Timeline { title, events, .. } => build_timeline(&mut c, title, events, brand),
        Slide::Chart {
            title,
            data_labels,
            data_values,
            ..
        } => build_chart(&mut c, title, data_labels, data_values, brand),
        Slide::Recommendations { title, items, .. } => build_content(&mut c, title, items, brand),
        Slide::Closing { title, contact, .. } => build_closing(&mut c, title, contact.as_deref(), brand),
    }
    c.finish()
}

fn build_title(c: &mut SlideComposer, title: &str, subtitle: Option<&str>, brand: &BrandConfig) {
    c.background(&brand.primary_color.to_hex());
    c.text(
        emu(0.8),
        emu(2.5),
        SLIDE_W - emu(1.6),
        emu(1.6),
        &[Para::new(title, 44, true, "FFFFFF").centered()],
    );
    if let Some(subtitle) = subtitle {
        c.text(
            emu(0.8),
            emu(4.2),
            SLIDE_W - emu(1.6),
            emu(0.8),
            &[Para::new(subtitle, 20, false, "E5E7EB").centered()],
        );
    }
    if let Some(ref logo_text) = brand.logo_text {
        c.text(
            emu(0.8),
            emu(6.6),
            SLIDE_W - emu(1.6),
            emu(0.5),
            &[Para::new(logo_text.as_str(), 12, false, "E5E7EB").centered()],
        );
    }
}

fn build_section(c: &mut SlideComposer, title: &str, brand: &BrandConfig) {
    c.rect(0, 0, emu(0.35), SLIDE_H, &brand.primary_color.to_hex());
    c.text(
        emu(1.0),
        emu(3.0),
        SLIDE_W - emu(2.0),
        emu(1.5),
        &[Para::new(title, 36, true, TEXT_DARK)],
    );
}

/// Title bar, accent rule, bulleted body. The shared layout for content,
/// key findings, recommendations, and any unknown variant.
fn build_content(c: &mut SlideComposer, title: &str, bullets: &[String], brand: &BrandConfig) {
    content_header(c, title, brand);
    let paras: Vec<Para> = bullets
        .iter()
        .map(|b| Para::new(b.as_str(), 18, false, TEXT_DARK).bulleted())
        .collect();
    c.text(emu(0.9), emu(1.6), SLIDE_W - emu(1.8), SLIDE_H - emu(2.2), &paras);
}

fn content_header(c: &mut SlideComposer, title: &str, brand: &BrandConfig) {
    c.text(
        emu(0.7),
        emu(0.4),
        SLIDE_W - emu(1.4),
        emu(0.9),
        &[Para::new(title, 28, true, brand.primary_color.to_hex())],
    );
    c.rect(emu(0.7), emu(1.3), emu(2.2), emu(0.05), &brand.accent_color.to_hex());
}

fn build_stat_callout(
    c: &mut SlideComposer,
    title: &str,
    stat_value: &str,
    stat_context: Option<&str>,
    brand: &BrandConfig,
) {
    c.background(LIGHT_BG);
    c.text(
        emu(0.8),
        emu(0.8),
        SLIDE_W - emu(1.6),
        emu(0.8),
        &[Para::new(title, 24, true, TEXT_DARK).centered()],
    );
    c.text(
        emu(0.8),
        emu(2.4),
        SLIDE_W - emu(1.6),
        emu(1.8),
        &[Para::new(stat_value, 72, true, brand.primary_color.to_hex()).centered()],
    );
    if let Some(context) = stat_context {
        c.text(
            emu(1.6),
            emu(4.6),
            SLIDE_W - emu(3.2),
            emu(1.2),
            &[Para::new(context, 16, false, TEXT_MUTED).centered()],
        );
    }
}

fn build_comparison(
    c: &mut SlideComposer,
    title: &str,
    left_label: Option<&str>,
    right_label: Option<&str>,
    left_items: &[String],
    right_items: &[String],
    brand: &BrandConfig,
) {
    content_header(c, title, brand);

    let col_w = emu(5.5);
    let left_x = emu(0.7);
    let right_x = SLIDE_W - emu(0.7) - col_w;

    let columns = [
        (left_x, left_label.unwrap_or("Before"), left_items, brand.primary_color),
        (right_x, right_label.unwrap_or("After"), right_items, brand.accent_color),
    ];
    for (x, label, items, color) in columns {
        c.rect(x, emu(1.6), col_w, emu(0.55), &color.to_hex());
        c.text(
            x,
            emu(1.65),
            col_w,
            emu(0.5),
            &[Para::new(label, 16, true, "FFFFFF").centered()],
        );
        let paras: Vec<Para> = items
            .iter()
            .map(|i| Para::new(i.as_str(), 14, false, TEXT_DARK).bulleted())
            .collect();
        c.text(x + emu(0.1), emu(2.4), col_w - emu(0.2), SLIDE_H - emu(3.0), &paras);
    }
}

/// Horizontal bar with evenly spaced markers, capped at six events so the
/// labels stay readable.
fn build_timeline(c: &mut SlideComposer, title: &str, events: &[TimelineEvent], brand: &BrandConfig) {
    content_header(c, title, brand);

    let shown = &events[..events.len().min(6)];
    if shown.is_empty() {
        return;
    }

    let bar_y = emu(3.6);
    c.rect(emu(0.9), bar_y, SLIDE_W - emu(1.8), emu(0.04), &brand.secondary_color.to_hex());

    let span = SLIDE_W - emu(2.2);
    let step = if shown.len() > 1 {
        span / (shown.len() as i64 - 1)
    } else {
        0
    };
    for (i, event) in shown.iter().enumerate() {
        let cx = emu(1.1) + step * i as i64;
        let marker = emu(0.16);
        c.rect(cx - marker / 2, bar_y - marker / 2 + emu(0.02), marker, marker, &brand.accent_color.to_hex());
        c.text(
            cx - emu(0.9),
            bar_y - emu(0.7),
            emu(1.8),
            emu(0.5),
            &[Para::new(event.date.as_str(), 13, true, TEXT_DARK).centered()],
        );
        c.text(
            cx - emu(0.9),
            bar_y + emu(0.3),
            emu(1.8),
            emu(1.4),
            &[Para::new(event.description.as_str(), 11, false, TEXT_MUTED).centered()],
        );
    }
}

/// Labeled value bars drawn as shapes; no chart part, so the deck stays
/// dependency-free for viewers.
fn build_chart(
    c: &mut SlideComposer,
    title: &str,
    data_labels: &[String],
    data_values: &[f64],
    brand: &BrandConfig,
) {
    content_header(c, title, brand);

    let count = data_labels.len().min(data_values.len()).min(8);
    if count == 0 {
        return;
    }
    let max = data_values[..count]
        .iter()
        .cloned()
        .fold(0.0_f64, f64::max);

    let label_w = emu(2.4);
    let bar_max_w = SLIDE_W - emu(1.8) - label_w - emu(1.2);
    let row_h = emu(0.55);
    for i in 0..count {
        let y = emu(1.8) + row_h * i as i64;
        c.text(
            emu(0.9),
            y,
            label_w,
            row_h,
            &[Para::new(data_labels[i].as_str(), 14, false, TEXT_DARK)],
        );
        let fraction = if max > 0.0 { data_values[i] / max } else { 0.0 };
        let bar_w = ((bar_max_w as f64) * fraction).max(emu(0.05) as f64) as i64;
        c.rect(emu(0.9) + label_w, y + emu(0.08), bar_w, emu(0.3), &brand.primary_color.to_hex());
        c.text(
            emu(0.9) + label_w + bar_w + emu(0.1),
            y,
            emu(1.0),
            row_h,
            &[Para::new(format_value(data_values[i]), 12, false, TEXT_MUTED)],
        );
    }
}

fn build_closing(c: &mut SlideComposer, title: &str, contact: Option<&str>, brand: &BrandConfig) {
    c.background(&brand.primary_color.to_hex());
    c.text(
        emu(0.8),
        emu(2.8),
        SLIDE_W - emu(1.6),
        emu(1.2),
        &[Para::new(title, 40, true, "FFFFFF").centered()],
    );
    if let Some(contact) = contact {
        c.text(
            emu(0.8),
            emu(4.2),
            SLIDE_W - emu(1.6),
            emu(0.8),
            &[Para::new(contact, 18, false, "E5E7EB").centered()],
        );
    }
    if let Some(ref logo_text) = brand.logo_text {
        c.text(
            emu(0.8),
            emu(6.6),
            SLIDE_W - emu(1.6),
            emu(0.5),
            &[Para::new(logo_text.as_str(), 12, false, "E5E7EB").centered()],
        );
    }
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v:.1}")
    }
}

fn notes_slide_xml(notes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notes xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>
<p:sp><p:nvSpPr><p:cNvPr id="2" name="Notes Placeholder"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>
</p:spTree></p:cSld>
</p:notes>"#,
        xml_escape(notes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Rgb;
    use crate::pipeline::parse::{DocumentParser, PptxParser};
    use std::io::Read;

    fn full_deck() -> Presentation {
        Presentation {
            title: "Quarterly Review".into(),
            slides: vec![
                Slide::Title {
                    title: "Quarterly Review".into(),
                    subtitle: Some("Q3 2026".into()),
                    notes: Some("Open with the revenue headline.".into()),
                },
                Slide::Section {
                    title: "Performance".into(),
                    notes: None,
                },
                Slide::Content {
                    title: "Highlights".into(),
                    bullets: vec!["Revenue up 12%".into(), "Churn down".into()],
                    notes: None,
                },
                Slide::KeyFindings {
                    title: "Key Findings".into(),
                    findings: vec!["Margins improved".into()],
                    notes: None,
                },
                Slide::StatCallout {
                    title: "Growth".into(),
                    stat_value: "12%".into(),
                    stat_context: Some("Year over year".into()),
                    notes: None,
                },
                Slide::Comparison {
                    title: "Plan vs Actual".into(),
                    left_label: Some("Plan".into()),
                    right_label: Some("Actual".into()),
                    left_items: vec!["10% growth".into()],
                    right_items: vec!["12% growth".into()],
                    notes: None,
                },
                Slide::Timeline {
                    title: "Roadmap".into(),
                    events: vec![
                        TimelineEvent {
                            date: "Q1".into(),
                            description: "Launch".into(),
                        },
                        TimelineEvent {
                            date: "Q2".into(),
                            description: "Expand".into(),
                        },
                    ],
                    notes: None,
                },
                Slide::Chart {
                    title: "Revenue by Region".into(),
                    chart_type: Some("bar".into()),
                    chart_title: None,
                    data_labels: vec!["EMEA".into(), "APAC".into()],
                    data_values: vec![4.0, 2.5],
                    notes: None,
                },
                Slide::Recommendations {
                    title: "Next Steps".into(),
                    items: vec!["Invest in EMEA".into()],
                    notes: None,
                },
                Slide::Closing {
                    title: "Thank You".into(),
                    contact: Some("insights@example.com".into()),
                    notes: None,
                },
            ],
        }
    }

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.to_vec())).unwrap();
        let mut content = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    #[test]
    fn every_variant_renders_and_parses_back() {
        let bytes = render_pptx(&full_deck(), &BrandConfig::default()).unwrap();
        let text = PptxParser.parse(&bytes).unwrap();

        assert!(text.contains("## Slide 1"));
        assert!(text.contains("## Slide 10"));
        assert!(text.contains("Quarterly Review"));
        assert!(text.contains("Revenue up 12%"));
        assert!(text.contains("Plan vs Actual"));
        assert!(text.contains("insights@example.com"));
    }

    #[test]
    fn notes_go_to_the_notes_part_not_the_slide() {
        let bytes = render_pptx(&full_deck(), &BrandConfig::default()).unwrap();

        let slide1 = part(&bytes, "ppt/slides/slide1.xml");
        assert!(!slide1.contains("Open with the revenue headline."));

        let notes1 = part(&bytes, "ppt/notesSlides/notesSlide1.xml");
        assert!(notes1.contains("Open with the revenue headline."));
    }

    #[test]
    fn canvas_is_16_9() {
        let bytes = render_pptx(&full_deck(), &BrandConfig::default()).unwrap();
        let presentation = part(&bytes, "ppt/presentation.xml");
        assert!(presentation.contains(r#"cx="12192000" cy="6858000""#));
    }

    #[test]
    fn brand_primary_fills_title_background() {
        let brand = BrandConfig {
            primary_color: Rgb(0xAB, 0xCD, 0xEF),
            ..BrandConfig::default()
        };
        let bytes = render_pptx(&full_deck(), &brand).unwrap();
        let slide1 = part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide1.contains("ABCDEF"));
    }

    #[test]
    fn timeline_caps_at_six_markers() {
        let deck = Presentation {
            title: "T".into(),
            slides: vec![
                Slide::Title {
                    title: "T".into(),
                    subtitle: None,
                    notes: None,
                },
                Slide::Timeline {
                    title: "Long Roadmap".into(),
                    events: (0..10)
                        .map(|i| TimelineEvent {
                            date: format!("M{i}"),
                            description: format!("Milestone {i}"),
                        })
                        .collect(),
                    notes: None,
                },
                Slide::Closing {
                    title: "End".into(),
                    contact: None,
                    notes: None,
                },
            ],
        };
        let bytes = render_pptx(&deck, &BrandConfig::default()).unwrap();
        let slide2 = part(&bytes, "ppt/slides/slide2.xml");
        assert!(slide2.contains("M5"));
        assert!(!slide2.contains("Milestone 6"));
    }

    #[test]
    fn chart_bars_scale_to_max_value() {
        let bytes = render_pptx(&full_deck(), &BrandConfig::default()).unwrap();
        let slide8 = part(&bytes, "ppt/slides/slide8.xml");
        // Both labels and a formatted value are present.
        assert!(slide8.contains("EMEA"));
        assert!(slide8.contains("APAC"));
        assert!(slide8.contains("2.5"));
    }

    #[test]
    fn text_is_escaped() {
        let deck = Presentation {
            title: "D".into(),
            slides: vec![
                Slide::Title {
                    title: "A&B <Launch>".into(),
                    subtitle: None,
                    notes: None,
                },
                Slide::Content {
                    title: "X".into(),
                    bullets: vec![],
                    notes: None,
                },
                Slide::Closing {
                    title: "Y".into(),
                    contact: None,
                    notes: None,
                },
            ],
        };
        let bytes = render_pptx(&deck, &BrandConfig::default()).unwrap();
        let slide1 = part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide1.contains("A&amp;B &lt;Launch&gt;"));
    }
}
