//! Word-processor renderer
//!
//! Builds a `.docx` from a titled, sectioned outline. Sections nest; each
//! carries a heading and a list of content blocks (paragraphs, listings,
//! tables, page breaks, empty lines). The page header and footer bands and
//! the page geometry come from the request.

use docforge_core::ArtifactKind;
use serde::Deserialize;
use serde_json::Value;

use crate::ooxml::{RELS_CONTENT_TYPE, XML_DECL, escape_xml, write_package};
use crate::{RenderError, Renderer};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentSpec {
    title: String,
    #[serde(default)]
    header: Option<BandSpec>,
    #[serde(default)]
    footer: Option<BandSpec>,
    sections: Vec<SectionSpec>,
    #[serde(default)]
    word_config: DocumentOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BandSpec {
    text: String,
    #[serde(default)]
    alignment: Alignment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    fn jc(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectionSpec {
    #[serde(default)]
    heading: Option<String>,
    #[serde(default)]
    heading_level: Option<u8>,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    sub_sections: Vec<SectionSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ContentBlock {
    Paragraph {
        #[serde(default)]
        text: String,
    },
    Listing {
        #[serde(default)]
        items: Vec<String>,
    },
    Table {
        #[serde(default)]
        headers: Vec<String>,
        #[serde(default)]
        rows: Vec<RowSpec>,
    },
    PageBreak,
    EmptyLine,
}

#[derive(Debug, Deserialize)]
struct RowSpec {
    #[serde(default)]
    cells: Vec<CellText>,
}

#[derive(Debug, Deserialize)]
struct CellText {
    #[serde(default)]
    text: Option<String>,
}

/// Page and typography options; absent request fields fall back to these
/// defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentOptions {
    pub font_size: u8,
    pub line_height: LineHeight,
    pub show_page_number: bool,
    pub show_table_of_content: bool,
    pub page_orientation: PageOrientation,
    pub margins: MarginPreset,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            font_size: 12,
            line_height: LineHeight::Single,
            show_page_number: false,
            show_table_of_content: false,
            page_orientation: PageOrientation::Portrait,
            margins: MarginPreset::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub enum LineHeight {
    #[default]
    #[serde(rename = "1")]
    Single,
    #[serde(rename = "1.15")]
    Relaxed,
    #[serde(rename = "1.25")]
    Loose,
    #[serde(rename = "1.5")]
    OneAndHalf,
    #[serde(rename = "2")]
    Double,
}

impl LineHeight {
    /// Line spacing in twentieths of a point with `lineRule="auto"`.
    fn twips(self) -> u32 {
        match self {
            LineHeight::Single => 240,
            LineHeight::Relaxed => 276,
            LineHeight::Loose => 300,
            LineHeight::OneAndHalf => 360,
            LineHeight::Double => 480,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginPreset {
    #[default]
    Normal,
    Narrow,
    Moderate,
    Wide,
    Mirrored,
}

impl MarginPreset {
    /// (top, right, bottom, left) in twips.
    fn twips(self) -> (u32, u32, u32, u32) {
        match self {
            MarginPreset::Normal => (1440, 1440, 1440, 1440),
            MarginPreset::Narrow => (720, 720, 720, 720),
            MarginPreset::Moderate => (1440, 1080, 1440, 1080),
            MarginPreset::Wide => (1440, 2880, 1440, 2880),
            MarginPreset::Mirrored => (1440, 1260, 1440, 1890),
        }
    }
}

pub struct DocumentRenderer;

impl Renderer for DocumentRenderer {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Document
    }

    fn primary_field(&self) -> &'static str {
        "sections"
    }

    fn primary_label(&self) -> &'static str {
        "Sections data"
    }

    fn render(&self, spec: &Value) -> Result<Vec<u8>, RenderError> {
        let spec: DocumentSpec = serde_json::from_value(spec.clone())
            .map_err(|error| RenderError::InvalidSpec(error.to_string()))?;
        build_document(&spec)
    }
}

fn build_document(spec: &DocumentSpec) -> Result<Vec<u8>, RenderError> {
    let parts = vec![
        ("[Content_Types].xml".to_string(), content_types()),
        ("_rels/.rels".to_string(), crate::ooxml::package_rels("word/document.xml")),
        ("word/document.xml".to_string(), document_xml(spec)),
        ("word/_rels/document.xml.rels".to_string(), document_rels()),
        (
            "word/header1.xml".to_string(),
            band_xml("w:hdr", spec.header.as_ref(), false, &spec.word_config),
        ),
        (
            "word/footer1.xml".to_string(),
            band_xml(
                "w:ftr",
                spec.footer.as_ref(),
                spec.word_config.show_page_number,
                &spec.word_config,
            ),
        ),
    ];

    write_package(&parts)
}

fn content_types() -> String {
    format!(
        "{XML_DECL}\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"{RELS_CONTENT_TYPE}\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
<Override PartName=\"/word/header1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml\"/>\
<Override PartName=\"/word/footer1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml\"/>\
</Types>"
    )
}

fn document_rels() -> String {
    format!(
        "{XML_DECL}\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/header\" Target=\"header1.xml\"/>\
<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer\" Target=\"footer1.xml\"/>\
</Relationships>"
    )
}

fn document_xml(spec: &DocumentSpec) -> String {
    let options = &spec.word_config;
    let mut body = String::new();

    // Document title, two steps above the base size
    body.push_str(&paragraph_xml(
        &spec.title,
        ParagraphFormat {
            bold: true,
            half_points: half_points(options.font_size) + 16,
            jc: Some("center"),
            ..ParagraphFormat::with_options(options)
        },
    ));

    if options.show_table_of_content {
        body.push_str(&toc_xml(spec, options));
    }

    for section in &spec.sections {
        body.push_str(&section_xml(section, 1, options));
    }

    body.push_str(&sect_pr(options));

    format!(
        "{XML_DECL}\
<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" \
xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
<w:body>{body}</w:body></w:document>"
    )
}

/// Naive table of contents: one line per heading, indented by depth.
fn toc_xml(spec: &DocumentSpec, options: &DocumentOptions) -> String {
    let mut xml = paragraph_xml(
        "Table of Contents",
        ParagraphFormat {
            bold: true,
            half_points: half_points(options.font_size) + 8,
            ..ParagraphFormat::with_options(options)
        },
    );

    fn walk(sections: &[SectionSpec], depth: u8, options: &DocumentOptions, xml: &mut String) {
        for section in sections {
            if let Some(heading) = &section.heading {
                xml.push_str(&paragraph_xml(
                    heading,
                    ParagraphFormat {
                        indent_twips: Some(u32::from(depth.saturating_sub(1)) * 360),
                        ..ParagraphFormat::with_options(options)
                    },
                ));
            }
            walk(&section.sub_sections, depth + 1, options, xml);
        }
    }

    walk(&spec.sections, 1, options, &mut xml);
    xml.push_str("<w:p/>");
    xml
}

fn section_xml(section: &SectionSpec, depth: u8, options: &DocumentOptions) -> String {
    let mut xml = String::new();

    if let Some(heading) = &section.heading {
        let level = section.heading_level.unwrap_or(depth).clamp(1, 4);
        xml.push_str(&paragraph_xml(
            heading,
            ParagraphFormat {
                bold: true,
                half_points: heading_half_points(options.font_size, level),
                ..ParagraphFormat::with_options(options)
            },
        ));
    }

    for block in &section.content {
        xml.push_str(&block_xml(block, options));
    }

    for sub in &section.sub_sections {
        xml.push_str(&section_xml(sub, depth + 1, options));
    }

    xml
}

fn block_xml(block: &ContentBlock, options: &DocumentOptions) -> String {
    match block {
        ContentBlock::Paragraph { text } => {
            paragraph_xml(text, ParagraphFormat::with_options(options))
        }
        ContentBlock::Listing { items } => items
            .iter()
            .map(|item| {
                paragraph_xml(
                    &format!("\u{2022} {item}"),
                    ParagraphFormat {
                        indent_twips: Some(720),
                        ..ParagraphFormat::with_options(options)
                    },
                )
            })
            .collect(),
        ContentBlock::Table { headers, rows } => table_xml(headers, rows, options),
        ContentBlock::PageBreak => "<w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>".to_string(),
        ContentBlock::EmptyLine => "<w:p/>".to_string(),
    }
}

fn table_xml(headers: &[String], rows: &[RowSpec], options: &DocumentOptions) -> String {
    let mut xml = String::from(
        "<w:tbl><w:tblPr><w:tblW w:w=\"0\" w:type=\"auto\"/>\
<w:tblBorders>\
<w:top w:val=\"single\" w:sz=\"4\"/><w:left w:val=\"single\" w:sz=\"4\"/>\
<w:bottom w:val=\"single\" w:sz=\"4\"/><w:right w:val=\"single\" w:sz=\"4\"/>\
<w:insideH w:val=\"single\" w:sz=\"4\"/><w:insideV w:val=\"single\" w:sz=\"4\"/>\
</w:tblBorders></w:tblPr>",
    );

    let cell = |text: &str, bold: bool| {
        format!(
            "<w:tc><w:tcPr/>{}</w:tc>",
            paragraph_xml(
                text,
                ParagraphFormat {
                    bold,
                    ..ParagraphFormat::with_options(options)
                }
            )
        )
    };

    if !headers.is_empty() {
        xml.push_str("<w:tr>");
        for header in headers {
            xml.push_str(&cell(header, true));
        }
        xml.push_str("</w:tr>");
    }

    for row in rows {
        xml.push_str("<w:tr>");
        for cell_text in &row.cells {
            xml.push_str(&cell(cell_text.text.as_deref().unwrap_or(""), false));
        }
        xml.push_str("</w:tr>");
    }

    xml.push_str("</w:tbl>");
    xml
}

fn sect_pr(options: &DocumentOptions) -> String {
    // A4 geometry, swapped for landscape
    let (width, height) = match options.page_orientation {
        PageOrientation::Portrait => (11906, 16838),
        PageOrientation::Landscape => (16838, 11906),
    };
    let orient = match options.page_orientation {
        PageOrientation::Portrait => "",
        PageOrientation::Landscape => " w:orient=\"landscape\"",
    };
    let (top, right, bottom, left) = options.margins.twips();

    format!(
        "<w:sectPr>\
<w:headerReference w:type=\"default\" r:id=\"rId1\"/>\
<w:footerReference w:type=\"default\" r:id=\"rId2\"/>\
<w:pgSz w:w=\"{width}\" w:h=\"{height}\"{orient}/>\
<w:pgMar w:top=\"{top}\" w:right=\"{right}\" w:bottom=\"{bottom}\" w:left=\"{left}\" w:header=\"708\" w:footer=\"708\" w:gutter=\"0\"/>\
</w:sectPr>"
    )
}

fn band_xml(
    element: &str,
    band: Option<&BandSpec>,
    page_number: bool,
    options: &DocumentOptions,
) -> String {
    let jc = band.map(|b| b.alignment).unwrap_or_default().jc();
    let mut runs = String::new();

    if let Some(band) = band {
        runs.push_str(&run_xml(
            &band.text,
            false,
            half_points(options.font_size).saturating_sub(2),
        ));
    }
    if page_number {
        if band.is_some() {
            runs.push_str(&run_xml(" ", false, half_points(options.font_size)));
        }
        runs.push_str(
            "<w:r><w:fldChar w:fldCharType=\"begin\"/></w:r>\
<w:r><w:instrText xml:space=\"preserve\"> PAGE </w:instrText></w:r>\
<w:r><w:fldChar w:fldCharType=\"end\"/></w:r>",
        );
    }

    format!(
        "{XML_DECL}\
<{element} xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
<w:p><w:pPr><w:jc w:val=\"{jc}\"/></w:pPr>{runs}</w:p></{element}>"
    )
}

struct ParagraphFormat {
    bold: bool,
    half_points: u32,
    jc: Option<&'static str>,
    indent_twips: Option<u32>,
    line_twips: u32,
}

impl ParagraphFormat {
    fn with_options(options: &DocumentOptions) -> Self {
        Self {
            bold: false,
            half_points: half_points(options.font_size),
            jc: None,
            indent_twips: None,
            line_twips: options.line_height.twips(),
        }
    }
}

fn half_points(points: u8) -> u32 {
    u32::from(points) * 2
}

/// Heading sizes step down toward the base font size.
fn heading_half_points(base: u8, level: u8) -> u32 {
    let bump = match level {
        1 => 8,
        2 => 4,
        3 => 2,
        _ => 1,
    };
    half_points(base) + bump * 2
}

fn paragraph_xml(text: &str, format: ParagraphFormat) -> String {
    let mut p_pr = format!(
        "<w:spacing w:line=\"{}\" w:lineRule=\"auto\"/>",
        format.line_twips
    );
    if let Some(indent) = format.indent_twips {
        p_pr.push_str(&format!("<w:ind w:left=\"{indent}\"/>"));
    }
    if let Some(jc) = format.jc {
        p_pr.push_str(&format!("<w:jc w:val=\"{jc}\"/>"));
    }

    format!(
        "<w:p><w:pPr>{p_pr}</w:pPr>{}</w:p>",
        run_xml(text, format.bold, format.half_points)
    )
}

fn run_xml(text: &str, bold: bool, half_points: u32) -> String {
    let bold_tag = if bold { "<w:b/>" } else { "" };
    format!(
        "<w:r><w:rPr>{bold_tag}<w:sz w:val=\"{half_points}\"/><w:szCs w:val=\"{half_points}\"/></w:rPr>\
<w:t xml:space=\"preserve\">{}</w:t></w:r>",
        escape_xml(text)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_spec() -> Value {
        json!({
            "title": "T",
            "sections": [{
                "heading": "H",
                "headingLevel": 1,
                "content": [{"type": "paragraph", "text": "hello"}]
            }],
            "header": {"text": "H", "alignment": "left"},
            "footer": {"text": "F", "alignment": "left"},
            "wordConfig": {}
        })
    }

    #[test]
    fn test_render_produces_zip_with_document_marker() {
        let bytes = DocumentRenderer.render(&sample_spec()).unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");

        let haystack = String::from_utf8_lossy(&bytes);
        assert!(haystack.contains("wordprocessingml.document.main+xml"));
        assert!(haystack.contains("hello"));
    }

    #[test]
    fn test_content_block_variants() {
        let spec = json!({
            "title": "Blocks",
            "sections": [{
                "heading": "All",
                "content": [
                    {"type": "paragraph", "text": "para"},
                    {"type": "listing", "items": ["one", "two"]},
                    {"type": "table", "headers": ["A"], "rows": [{"cells": [{"text": "v"}]}]},
                    {"type": "pageBreak"},
                    {"type": "emptyLine"}
                ]
            }]
        });

        let bytes = DocumentRenderer.render(&spec).unwrap();
        let haystack = String::from_utf8_lossy(&bytes);
        assert!(haystack.contains("para"));
        assert!(haystack.contains("\u{2022} one"));
        assert!(haystack.contains("<w:tbl>"));
        assert!(haystack.contains("w:type=\"page\""));
    }

    #[test]
    fn test_landscape_swaps_page_size() {
        let portrait = sect_pr(&DocumentOptions::default());
        assert!(portrait.contains("w:w=\"11906\" w:h=\"16838\""));

        let landscape = sect_pr(&DocumentOptions {
            page_orientation: PageOrientation::Landscape,
            ..DocumentOptions::default()
        });
        assert!(landscape.contains("w:w=\"16838\" w:h=\"11906\""));
        assert!(landscape.contains("w:orient=\"landscape\""));
    }

    #[test]
    fn test_page_number_field_in_footer() {
        let with_number = band_xml(
            "w:ftr",
            None,
            true,
            &DocumentOptions::default(),
        );
        assert!(with_number.contains("fldCharType=\"begin\""));
        assert!(with_number.contains(" PAGE "));

        let without = band_xml("w:ftr", None, false, &DocumentOptions::default());
        assert!(!without.contains("fldChar"));
    }

    #[test]
    fn test_toc_lists_nested_headings() {
        let spec: DocumentSpec = serde_json::from_value(json!({
            "title": "Doc",
            "sections": [{
                "heading": "Top",
                "subSections": [{"heading": "Nested"}]
            }],
            "wordConfig": {"showTableOfContent": true}
        }))
        .unwrap();

        let toc = toc_xml(&spec, &spec.word_config);
        assert!(toc.contains("Table of Contents"));
        assert!(toc.contains("Top"));
        assert!(toc.contains("Nested"));
    }

    #[test]
    fn test_line_height_values_parse() {
        let options: DocumentOptions =
            serde_json::from_value(json!({"lineHeight": "1.5"})).unwrap();
        assert_eq!(options.line_height, LineHeight::OneAndHalf);
        assert_eq!(options.line_height.twips(), 360);
    }

    #[test]
    fn test_malformed_spec_is_invalid() {
        let result = DocumentRenderer.render(&json!({"sections": []}));
        // Missing required title
        assert!(matches!(result, Err(RenderError::InvalidSpec(_))));
    }
}
