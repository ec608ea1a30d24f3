//! OOXML packaging helpers shared by the renderers.
//!
//! An OOXML document is a zip archive of XML parts. Parts are stored
//! uncompressed; the documents this service emits are small and the
//! archives stay greppable in tests.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::RenderError;

pub(crate) const RELS_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-package.relationships+xml";

/// Assemble (part name, xml) pairs into the final archive bytes.
pub(crate) fn write_package(parts: &[(String, String)]) -> Result<Vec<u8>, RenderError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, xml) in parts {
        writer
            .start_file(name.as_str(), options)
            .map_err(|error| RenderError::Package(error.to_string()))?;
        writer
            .write_all(xml.as_bytes())
            .map_err(|error| RenderError::Package(error.to_string()))?;
    }

    writer
        .finish()
        .map(|cursor| cursor.into_inner())
        .map_err(|error| RenderError::Package(error.to_string()))
}

/// Escape text for use in XML content and attribute values.
pub(crate) fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub(crate) const XML_DECL: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>";

/// The package-level relationships part pointing at the main document part.
pub(crate) fn package_rels(main_part: &str) -> String {
    format!(
        "{XML_DECL}\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"{main_part}\"/>\
</Relationships>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml("a<b>&\"c'"),
            "a&lt;b&gt;&amp;&quot;c&apos;"
        );
        assert_eq!(escape_xml("plain"), "plain");
    }

    #[test]
    fn test_write_package_starts_with_zip_magic() {
        let parts = vec![("part.xml".to_string(), "<x/>".to_string())];
        let bytes = write_package(&parts).unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");
    }

    #[test]
    fn test_stored_parts_are_greppable() {
        let parts = vec![(
            "[Content_Types].xml".to_string(),
            "<Types>marker-content</Types>".to_string(),
        )];
        let bytes = write_package(&parts).unwrap();
        let haystack = String::from_utf8_lossy(&bytes);
        assert!(haystack.contains("marker-content"));
    }
}
