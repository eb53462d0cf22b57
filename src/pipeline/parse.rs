//! Text extraction: one parser per source format, dispatched through an
//! explicit registry.
//!
//! ## Why plain text?
//!
//! The generation stage consumes a single token-budgeted context blob, so
//! each parser's only job is faithful plain text: page order preserved for
//! PDFs, table rows kept as pipe-delimited lines for DOCX, one line per
//! non-empty spreadsheet row, one line per text-bearing shape for slides.
//! Layout fidelity beyond that adds tokens without adding signal.
//!
//! ## Failure scope
//!
//! A parser failure is scoped to its file: [`parse_all`] records a
//! [`FileError`] for the bad upload and continues with the rest. Only an
//! unsupported extension or corrupt bytes fail a file; a well-formed empty
//! document parses to an empty string.
//!
//! The registry is an explicit table constructed once at startup and
//! passed by reference into the pipeline. No module-level singleton is
//! mutated after startup, so tests can construct isolated registries.

use crate::error::{FileError, PipelineError};
use crate::pipeline::context::estimate_tokens;
use calamine::{Data, Reader, Xlsx};
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::{debug, warn};

/// One uploaded file, parsed. Immutable once constructed; owned by a
/// single generation job.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub raw_bytes: Vec<u8>,
    pub extracted_text: String,
    pub token_estimate: usize,
}

/// A format-specific text extractor.
///
/// # Errors
/// Returns a detail string for corrupt/unreadable bytes; the caller wraps
/// it with the file name into a [`FileError`].
pub trait DocumentParser: Send + Sync {
    /// Lower-case extensions this parser handles, without the dot.
    fn extensions(&self) -> &'static [&'static str];

    fn parse(&self, bytes: &[u8]) -> Result<String, String>;
}

// ── Registry ─────────────────────────────────────────────────────────────

/// Maps lower-cased file extension to parser. Populated once; dispatch is
/// a pure lookup, so new formats are added by registering a parser, never
/// by editing dispatch logic.
pub struct ParserRegistry {
    parsers: HashMap<&'static str, Arc<dyn DocumentParser>>,
}

impl ParserRegistry {
    /// Registry with the four built-in parsers.
    pub fn new() -> Self {
        let mut registry = Self {
            parsers: HashMap::new(),
        };
        registry.register(Arc::new(PdfParser));
        registry.register(Arc::new(DocxParser));
        registry.register(Arc::new(XlsxParser));
        registry.register(Arc::new(PptxParser));
        registry
    }

    pub fn register(&mut self, parser: Arc<dyn DocumentParser>) {
        for ext in parser.extensions() {
            self.parsers.insert(ext, Arc::clone(&parser));
        }
    }

    /// Look up the parser for an extension (with or without leading dot).
    pub fn resolve(&self, extension: &str) -> Result<&Arc<dyn DocumentParser>, PipelineError> {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.parsers
            .get(ext.as_str())
            .ok_or(PipelineError::UnsupportedFormat { extension: ext })
    }

    /// Parse one named file into a [`SourceDocument`].
    pub fn parse_file(&self, name: &str, bytes: &[u8]) -> Result<SourceDocument, FileError> {
        let extension = extension_of(name).unwrap_or_default();
        let parser = self
            .resolve(&extension)
            .map_err(|_| FileError::UnsupportedFormat {
                name: name.to_string(),
                extension: extension.clone(),
            })?;

        let extracted_text = parser
            .parse(bytes)
            .map_err(|detail| FileError::ParseFailure {
                name: name.to_string(),
                detail,
            })?;

        let token_estimate = estimate_tokens(&extracted_text);
        debug!("Parsed '{}': ~{} tokens", name, token_estimate);

        Ok(SourceDocument {
            name: name.to_string(),
            raw_bytes: bytes.to_vec(),
            extracted_text,
            token_estimate,
        })
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse every upload, isolating failures per file.
///
/// Returns the successfully parsed documents alongside the per-file
/// errors; deciding whether zero successes is fatal belongs to the caller.
pub fn parse_all(
    registry: &ParserRegistry,
    files: &[(String, Vec<u8>)],
) -> (Vec<SourceDocument>, Vec<FileError>) {
    let mut documents = Vec::new();
    let mut failures = Vec::new();

    for (name, bytes) in files {
        match registry.parse_file(name, bytes) {
            Ok(doc) => documents.push(doc),
            Err(err) => {
                warn!("{err}");
                failures.push(err);
            }
        }
    }

    (documents, failures)
}

fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

// ── PDF ──────────────────────────────────────────────────────────────────

/// PDF text extraction via lopdf: per-page text in page order, blank-line
/// separated, each page prefixed with a `[Page N]` marker.
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn extensions(&self) -> &'static [&'static str] {
        &["pdf"]
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, String> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| format!("not a valid PDF: {e}"))?;

        let mut parts = Vec::new();
        for (page_num, _object_id) in doc.get_pages() {
            // A page that fails extraction contributes nothing; the rest of
            // the document still parses.
            let page_text = match doc.extract_text(&[page_num]) {
                Ok(text) => text,
                Err(e) => {
                    warn!("PDF page {page_num}: text extraction failed: {e}");
                    continue;
                }
            };
            let trimmed = page_text.trim();
            if !trimmed.is_empty() {
                parts.push(format!("[Page {page_num}]\n{trimmed}"));
            }
        }

        Ok(parts.join("\n\n"))
    }
}

// ── DOCX ─────────────────────────────────────────────────────────────────

/// DOCX extraction: non-empty paragraphs blank-line separated; each table
/// row becomes a pipe-delimited line under a `[Table]` marker, in document
/// order, so table content is never silently dropped.
pub struct DocxParser;

impl DocumentParser for DocxParser {
    fn extensions(&self) -> &'static [&'static str] {
        &["docx"]
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, String> {
        let xml = read_zip_part(bytes, "word/document.xml")?;
        extract_docx_text(&xml)
    }
}

fn extract_docx_text(xml: &str) -> Result<String, String> {
    let mut reader = XmlReader::from_str(xml);

    let mut blocks: Vec<String> = Vec::new();
    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut row_cells: Vec<String> = Vec::new();
    let mut table_rows: Vec<String> = Vec::new();
    let mut in_text = false;
    let mut table_depth = 0usize;
    let mut in_cell = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:p" => paragraph.clear(),
                b"w:tbl" => table_depth += 1,
                b"w:tr" if table_depth == 1 => row_cells.clear(),
                b"w:tc" if table_depth == 1 => {
                    in_cell = true;
                    cell.clear();
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    let text = paragraph.trim();
                    if !text.is_empty() {
                        if in_cell {
                            if !cell.is_empty() {
                                cell.push(' ');
                            }
                            cell.push_str(text);
                        } else if table_depth == 0 {
                            blocks.push(text.to_string());
                        }
                    }
                    paragraph.clear();
                }
                b"w:tc" if table_depth == 1 => {
                    in_cell = false;
                    row_cells.push(cell.trim().to_string());
                }
                b"w:tr" if table_depth == 1 => {
                    let row: Vec<&str> = row_cells
                        .iter()
                        .map(|c| c.as_str())
                        .filter(|c| !c.is_empty())
                        .collect();
                    if !row.is_empty() {
                        table_rows.push(row.join(" | "));
                    }
                }
                b"w:tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 && !table_rows.is_empty() {
                        blocks.push(format!("[Table]\n{}", table_rows.join("\n")));
                        table_rows.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                // Tabs and line breaks inside a run become spaces.
                if matches!(e.name().as_ref(), b"w:tab" | b"w:br") {
                    paragraph.push(' ');
                }
            }
            Ok(Event::Text(t)) if in_text => {
                paragraph.push_str(&t.unescape().unwrap_or_default());
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("malformed document XML: {e}")),
            _ => {}
        }
    }

    Ok(blocks.join("\n\n"))
}

// ── XLSX ─────────────────────────────────────────────────────────────────

/// XLSX extraction via calamine: a `## Sheet: <name>` header per sheet,
/// then one pipe-delimited line per non-empty row. Empty cells render as
/// empty strings, not a "None" placeholder.
pub struct XlsxParser;

impl DocumentParser for XlsxParser {
    fn extensions(&self) -> &'static [&'static str] {
        &["xlsx"]
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, String> {
        let cursor = Cursor::new(bytes.to_vec());
        let mut workbook =
            Xlsx::new(cursor).map_err(|e| format!("not a valid workbook: {e}"))?;

        let sheet_names = workbook.sheet_names().to_owned();
        let mut parts = Vec::new();

        for sheet_name in sheet_names {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| format!("sheet '{sheet_name}': {e}"))?;

            let mut lines = Vec::new();
            for row in range.rows() {
                let cells: Vec<String> = row.iter().map(cell_to_string).collect();
                let line = cells.join(" | ");
                if line.chars().any(|c| c != ' ' && c != '|') {
                    lines.push(line);
                }
            }

            if !lines.is_empty() {
                parts.push(format!("## Sheet: {sheet_name}\n{}", lines.join("\n")));
            }
        }

        Ok(parts.join("\n\n"))
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

// ── PPTX ─────────────────────────────────────────────────────────────────

/// PPTX extraction: a `## Slide <n>` header per slide, then each
/// text-bearing shape's text one line per paragraph, slides in deck order.
pub struct PptxParser;

impl DocumentParser for PptxParser {
    fn extensions(&self) -> &'static [&'static str] {
        &["pptx"]
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| format!("not a valid presentation: {e}"))?;

        let mut slide_parts: Vec<(usize, String)> = archive
            .file_names()
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slide_parts.sort_by_key(|(n, _)| *n);

        let mut parts = Vec::new();
        for (number, part_name) in slide_parts {
            let mut xml = String::new();
            archive
                .by_name(&part_name)
                .map_err(|e| format!("{part_name}: {e}"))?
                .read_to_string(&mut xml)
                .map_err(|e| format!("{part_name}: {e}"))?;

            let lines = extract_drawing_text(&xml)?;
            if !lines.is_empty() {
                parts.push(format!("## Slide {number}\n{}", lines.join("\n")));
            }
        }

        Ok(parts.join("\n\n"))
    }
}

/// `ppt/slides/slide7.xml` → `Some(7)`.
fn slide_number(part_name: &str) -> Option<usize> {
    part_name
        .strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Collect DrawingML paragraph text (`a:p` / `a:t`), one line per paragraph.
fn extract_drawing_text(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = XmlReader::from_str(xml);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"a:t" => in_text = true,
                b"a:p" => line.clear(),
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"a:t" => in_text = false,
                b"a:p" => {
                    let text = line.trim();
                    if !text.is_empty() {
                        lines.push(text.to_string());
                    }
                    line.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                line.push_str(&t.unescape().unwrap_or_default());
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("malformed slide XML: {e}")),
            _ => {}
        }
    }

    Ok(lines)
}

// ── Shared ZIP plumbing ──────────────────────────────────────────────────

/// Read one named part out of an OOXML (ZIP) container.
fn read_zip_part(bytes: &[u8], part: &str) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec()))
        .map_err(|e| format!("not a valid OOXML container: {e}"))?;
    let mut file = archive
        .by_name(part)
        .map_err(|e| format!("missing part '{part}': {e}"))?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| format!("part '{part}' unreadable: {e}"))?;
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    // Minimal hand-assembled OOXML fixtures. Real generated files are
    // exercised by the renderer round-trip tests; these pin down parser
    // behaviour on the smallest well-formed inputs.

    fn build_zip(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        build_zip(&[("word/document.xml", document_xml)])
    }

    fn xlsx_bytes(sheet_xml: &str) -> Vec<u8> {
        build_zip(&[
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#,
            ),
            (
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#,
            ),
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#,
            ),
            ("xl/worksheets/sheet1.xml", sheet_xml),
        ])
    }

    fn pptx_bytes(slides: &[&str]) -> Vec<u8> {
        let parts: Vec<(String, String)> = slides
            .iter()
            .enumerate()
            .map(|(i, body)| (format!("ppt/slides/slide{}.xml", i + 1), body.to_string()))
            .collect();
        let refs: Vec<(&str, &str)> = parts
            .iter()
            .map(|(n, b)| (n.as_str(), b.as_str()))
            .collect();
        build_zip(&refs)
    }

    const EMPTY_DOCX: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body/></w:document>"#;

    const EMPTY_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#;

    const EMPTY_SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><p:cSld><p:spTree/></p:cSld></p:sld>"#;

    fn empty_pdf_bytes() -> Vec<u8> {
        use lopdf::{dictionary, Document, Object, Stream};
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn registry_resolves_known_extensions() {
        let registry = ParserRegistry::new();
        for ext in ["pdf", "docx", "xlsx", "pptx", ".PDF", "Docx"] {
            assert!(registry.resolve(ext).is_ok(), "should resolve {ext}");
        }
    }

    #[test]
    fn registry_rejects_unknown_extension() {
        let registry = ParserRegistry::new();
        match registry.resolve("csv") {
            Err(PipelineError::UnsupportedFormat { extension }) => assert_eq!(extension, "csv"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_documents_parse_to_empty_string() {
        assert_eq!(PdfParser.parse(&empty_pdf_bytes()).unwrap(), "");
        assert_eq!(DocxParser.parse(&docx_bytes(EMPTY_DOCX)).unwrap(), "");
        assert_eq!(XlsxParser.parse(&xlsx_bytes(EMPTY_SHEET)).unwrap(), "");
        assert_eq!(PptxParser.parse(&pptx_bytes(&[EMPTY_SLIDE])).unwrap(), "");
    }

    #[test]
    fn docx_extracts_paragraphs_and_tables() {
        let xml = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">Second </w:t></w:r><w:r><w:t>paragraph.</w:t></w:r></w:p>
<w:tbl><w:tr>
<w:tc><w:p><w:r><w:t>Region</w:t></w:r></w:p></w:tc>
<w:tc><w:p><w:r><w:t>Revenue</w:t></w:r></w:p></w:tc>
</w:tr><w:tr>
<w:tc><w:p><w:r><w:t>EMEA</w:t></w:r></w:p></w:tc>
<w:tc><w:p><w:r><w:t>4.2M</w:t></w:r></w:p></w:tc>
</w:tr></w:tbl>
</w:body></w:document>"#;
        let text = DocxParser.parse(&docx_bytes(xml)).unwrap();
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Second paragraph."));
        assert!(text.contains("[Table]"));
        assert!(text.contains("Region | Revenue"));
        assert!(text.contains("EMEA | 4.2M"));
    }

    #[test]
    fn xlsx_emits_sheet_header_and_rows() {
        let sheet = r#"<?xml version="1.0"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1">
<c r="A1" t="inlineStr"><is><t>Product</t></is></c>
<c r="B1" t="inlineStr"><is><t>Units</t></is></c>
</row>
<row r="2">
<c r="A2" t="inlineStr"><is><t>Widget</t></is></c>
<c r="B2"><v>42</v></c>
</row>
</sheetData></worksheet>"#;
        let text = XlsxParser.parse(&xlsx_bytes(sheet)).unwrap();
        assert!(text.starts_with("## Sheet: Data"), "got: {text}");
        assert!(text.contains("Product | Units"));
        assert!(text.contains("Widget | 42"));
        // Empty cells must not surface as a placeholder word.
        assert!(!text.contains("None"));
    }

    #[test]
    fn pptx_orders_slides_and_headers() {
        let slide = |body: &str| {
            format!(
                r#"<?xml version="1.0"?>
<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
<p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{body}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
            )
        };
        let s1 = slide("Opening");
        let s2 = slide("Body slide");
        let text = PptxParser.parse(&pptx_bytes(&[&s1, &s2])).unwrap();
        let first = text.find("## Slide 1").unwrap();
        let second = text.find("## Slide 2").unwrap();
        assert!(first < second);
        assert!(text.contains("Opening"));
        assert!(text.contains("Body slide"));
    }

    #[test]
    fn pdf_extracts_generated_text() {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal("Revenue grew strongly")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let text = PdfParser.parse(&bytes).unwrap();
        assert!(text.contains("[Page 1]"), "got: {text}");
        assert!(text.contains("Revenue grew strongly"), "got: {text}");
    }

    #[test]
    fn corrupt_bytes_fail_per_file() {
        let registry = ParserRegistry::new();
        let files = vec![
            ("bad.xlsx".to_string(), b"garbage".to_vec()),
            ("note.docx".to_string(), docx_bytes(EMPTY_DOCX)),
        ];
        let (documents, failures) = parse_all(&registry, &files);
        assert_eq!(documents.len(), 1);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].file_name(), "bad.xlsx");
    }

    #[test]
    fn extension_is_case_insensitive_in_parse_file() {
        let registry = ParserRegistry::new();
        let doc = registry
            .parse_file("Memo.DOCX", &docx_bytes(EMPTY_DOCX))
            .unwrap();
        assert_eq!(doc.extracted_text, "");
        assert_eq!(doc.token_estimate, 0);
    }
}
