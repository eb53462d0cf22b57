//! Shared OOXML plumbing for the DOCX and PPTX renderers.
//!
//! Both formats are ZIP containers of XML parts. The renderers assemble
//! each part as a string (escaping all interpolated text) and hand the
//! part list to [`PackageWriter`]. Hand-assembled XML keeps the output
//! byte-deterministic for a given input, which the round-trip tests rely
//! on.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Escape text for XML content and attribute values.
pub fn xml_escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

/// Writes named XML parts into a ZIP container.
pub struct PackageWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl PackageWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    pub fn add_part(&mut self, name: &str, content: &str) -> Result<(), String> {
        self.zip
            .start_file(name.to_string(), SimpleFileOptions::default())
            .map_err(|e| format!("zip part '{name}': {e}"))?;
        self.zip
            .write_all(content.as_bytes())
            .map_err(|e| format!("zip part '{name}': {e}"))?;
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>, String> {
        self.zip
            .finish()
            .map(Cursor::into_inner)
            .map_err(|e| format!("zip finalise: {e}"))
    }
}

impl Default for PackageWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// A `_rels` part from (id, type, target) triples.
pub fn relationships_xml(rels: &[(String, &str, String)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (id, rel_type, target) in rels {
        xml.push_str(&format!(
            r#"<Relationship Id="{id}" Type="{rel_type}" Target="{target}"/>"#
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn escape_handles_markup_characters() {
        assert_eq!(xml_escape("a < b & c > \"d\""), "a &lt; b &amp; c &gt; &quot;d&quot;");
        assert_eq!(xml_escape("plain"), "plain");
    }

    #[test]
    fn package_round_trips_parts() {
        let mut writer = PackageWriter::new();
        writer.add_part("word/document.xml", "<w:document/>").unwrap();
        let bytes = writer.finish().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "<w:document/>");
    }
}
