//! DOCX rendering: map a [`Report`] onto native WordprocessingML.
//!
//! Output must stay editable in a word processor, so everything is real
//! structure: heading paragraphs reference named styles (never inline
//! size/colour soup), body paragraphs use the Normal style, and list
//! entries use a ListBullet style. Brand colours are baked into the style
//! definitions once, in `styles.xml`.

use crate::config::BrandConfig;
use crate::model::{Report, Section};
use crate::pipeline::render::ooxml::{relationships_xml, xml_escape, PackageWriter};

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

/// Render the report to DOCX bytes.
pub fn render_docx(report: &Report, brand: &BrandConfig) -> Result<Vec<u8>, String> {
    let mut package = PackageWriter::new();

    package.add_part("[Content_Types].xml", CONTENT_TYPES)?;
    package.add_part(
        "_rels/.rels",
        &relationships_xml(&[(
            "rId1".into(),
            REL_OFFICE_DOCUMENT,
            "word/document.xml".into(),
        )]),
    )?;
    package.add_part(
        "word/_rels/document.xml.rels",
        &relationships_xml(&[("rId1".into(), REL_STYLES, "styles.xml".into())]),
    )?;
    package.add_part("word/styles.xml", &styles_xml(brand))?;
    package.add_part("word/document.xml", &document_xml(report, brand))?;

    package.finish()
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#;

/// Style definitions: Calibri defaults, brand-coloured headings, a bullet
/// list style. Sizes are half-points (`w:sz 22` = 11 pt).
fn styles_xml(brand: &BrandConfig) -> String {
    let primary = brand.primary_color.to_hex();
    let secondary = brand.secondary_color.to_hex();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri"/><w:sz w:val="22"/><w:color w:val="333333"/></w:rPr></w:rPrDefault></w:docDefaults>
<w:style w:type="paragraph" w:styleId="Normal" w:default="1"><w:name w:val="Normal"/><w:pPr><w:spacing w:after="160" w:line="276" w:lineRule="auto"/></w:pPr></w:style>
<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:pPr><w:jc w:val="center"/><w:spacing w:after="240"/></w:pPr><w:rPr><w:b/><w:sz w:val="56"/><w:color w:val="{primary}"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:before="360" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/><w:color w:val="{primary}"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:before="280" w:after="80"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:sz w:val="28"/><w:color w:val="{secondary}"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:before="200" w:after="80"/><w:outlineLvl w:val="2"/></w:pPr><w:rPr><w:b/><w:sz w:val="24"/><w:color w:val="374151"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/><w:pPr><w:ind w:left="360" w:hanging="216"/><w:spacing w:after="80"/></w:pPr></w:style>
<w:style w:type="paragraph" w:styleId="Subtle"><w:name w:val="Subtle Reference"/><w:basedOn w:val="Normal"/><w:rPr><w:sz w:val="20"/><w:color w:val="6B7280"/></w:rPr></w:style>
</w:styles>"#
    )
}

fn document_xml(report: &Report, brand: &BrandConfig) -> String {
    let mut body = String::new();

    styled_paragraph(&mut body, "Title", &report.title);
    if let Some(ref logo_text) = brand.logo_text {
        body.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="Subtle"/><w:jc w:val="center"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            xml_escape(logo_text)
        ));
    }

    styled_paragraph(&mut body, "Heading1", "Executive Summary");
    body_paragraphs(&mut body, &report.executive_summary);

    for section in &report.sections {
        section_xml(&mut body, section, 1);
    }

    styled_paragraph(&mut body, "Heading1", "Key Findings");
    for finding in &report.key_findings {
        bullet_paragraph(&mut body, finding, "ListBullet");
    }

    styled_paragraph(&mut body, "Heading1", "Recommendations");
    for recommendation in &report.recommendations {
        bullet_paragraph(&mut body, recommendation, "ListBullet");
    }

    if !report.sources.is_empty() {
        styled_paragraph(&mut body, "Heading1", "Sources");
        for source in &report.sources {
            bullet_paragraph(&mut body, source, "Subtle");
        }
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440"/></w:sectPr></w:body></w:document>"#
    )
}

fn section_xml(body: &mut String, section: &Section, level: usize) {
    // Word defines three heading styles here; deeper nesting reuses Heading3.
    let style = match level {
        1 => "Heading1",
        2 => "Heading2",
        _ => "Heading3",
    };
    styled_paragraph(body, style, &section.title);
    body_paragraphs(body, &section.content);
    for sub in &section.subsections {
        section_xml(body, sub, level + 1);
    }
}

fn styled_paragraph(body: &mut String, style: &str, text: &str) {
    body.push_str(&format!(
        r#"<w:p><w:pPr><w:pStyle w:val="{style}"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        xml_escape(text)
    ));
}

/// Blank-line separated content becomes separate Normal paragraphs.
fn body_paragraphs(body: &mut String, text: &str) {
    for paragraph in text.split("\n\n") {
        let trimmed = paragraph.trim();
        if trimmed.is_empty() {
            continue;
        }
        body.push_str(&format!(
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            xml_escape(trimmed)
        ));
    }
}

fn bullet_paragraph(body: &mut String, text: &str, style: &str) {
    body.push_str(&format!(
        r#"<w:p><w:pPr><w:pStyle w:val="{style}"/></w:pPr><w:r><w:t xml:space="preserve">{} {}</w:t></w:r></w:p>"#,
        '\u{2022}',
        xml_escape(text)
    ));
}
