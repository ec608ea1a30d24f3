//! Presentation renderer
//!
//! Builds a `.pptx` deck from a list of slides. Three slide shapes are
//! supported: a title slide, a section header, and title-with-bullets.

use docforge_core::ArtifactKind;
use serde::Deserialize;
use serde_json::Value;

use crate::ooxml::{RELS_CONTENT_TYPE, XML_DECL, escape_xml, write_package};
use crate::{RenderError, Renderer};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PresentationSpec {
    slides: Vec<SlideSpec>,
    #[serde(default)]
    slide_config: PresentationOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlideSpec {
    #[serde(default, rename = "type")]
    slide_type: SlideType,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    subtitle: Option<String>,
    #[serde(default)]
    content: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
enum SlideType {
    Title,
    #[default]
    TitleAndContent,
    SectionHeader,
}

/// Deck-wide options; absent request fields fall back to these defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresentationOptions {
    pub font_family: String,
    pub title_font_size: u32,
    pub body_font_size: u32,
}

impl Default for PresentationOptions {
    fn default() -> Self {
        Self {
            font_family: "Calibri".to_string(),
            title_font_size: 36,
            body_font_size: 18,
        }
    }
}

// 16:9 slide surface, in EMU.
const SLIDE_CX: u64 = 12_192_000;
const SLIDE_CY: u64 = 6_858_000;

pub struct PresentationRenderer;

impl Renderer for PresentationRenderer {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Presentation
    }

    fn primary_field(&self) -> &'static str {
        "slides"
    }

    fn primary_label(&self) -> &'static str {
        "Slides data"
    }

    fn render(&self, spec: &Value) -> Result<Vec<u8>, RenderError> {
        let spec: PresentationSpec = serde_json::from_value(spec.clone())
            .map_err(|error| RenderError::InvalidSpec(error.to_string()))?;
        build_deck(&spec)
    }
}

fn build_deck(spec: &PresentationSpec) -> Result<Vec<u8>, RenderError> {
    let slide_count = spec.slides.len();

    let mut parts = Vec::new();
    parts.push(("[Content_Types].xml".to_string(), content_types(slide_count)));
    parts.push(("_rels/.rels".to_string(), crate::ooxml::package_rels("ppt/presentation.xml")));
    parts.push(("ppt/presentation.xml".to_string(), presentation_xml(slide_count)));
    parts.push(("ppt/_rels/presentation.xml.rels".to_string(), presentation_rels(slide_count)));
    parts.push(("ppt/slideMasters/slideMaster1.xml".to_string(), SLIDE_MASTER.to_string()));
    parts.push((
        "ppt/slideMasters/_rels/slideMaster1.xml.rels".to_string(),
        SLIDE_MASTER_RELS.to_string(),
    ));
    parts.push(("ppt/slideLayouts/slideLayout1.xml".to_string(), SLIDE_LAYOUT.to_string()));
    parts.push((
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels".to_string(),
        SLIDE_LAYOUT_RELS.to_string(),
    ));
    parts.push(("ppt/theme/theme1.xml".to_string(), THEME.to_string()));

    for (index, slide) in spec.slides.iter().enumerate() {
        let number = index + 1;
        parts.push((
            format!("ppt/slides/slide{number}.xml"),
            slide_xml(slide, &spec.slide_config),
        ));
        parts.push((
            format!("ppt/slides/_rels/slide{number}.xml.rels"),
            SLIDE_RELS.to_string(),
        ));
    }

    write_package(&parts)
}

fn content_types(slide_count: usize) -> String {
    let mut xml = format!(
        "{XML_DECL}\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"{RELS_CONTENT_TYPE}\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/ppt/presentation.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml\"/>\
<Override PartName=\"/ppt/slideMasters/slideMaster1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml\"/>\
<Override PartName=\"/ppt/slideLayouts/slideLayout1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml\"/>\
<Override PartName=\"/ppt/theme/theme1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.theme+xml\"/>"
    );
    for number in 1..=slide_count {
        xml.push_str(&format!(
            "<Override PartName=\"/ppt/slides/slide{number}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slide+xml\"/>"
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn presentation_xml(slide_count: usize) -> String {
    let mut xml = format!(
        "{XML_DECL}\
<p:presentation xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" \
xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
<p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
<p:sldIdLst>"
    );
    for index in 0..slide_count {
        xml.push_str(&format!(
            "<p:sldId id=\"{}\" r:id=\"rId{}\"/>",
            256 + index,
            index + 2
        ));
    }
    xml.push_str(&format!(
        "</p:sldIdLst>\
<p:sldSz cx=\"{SLIDE_CX}\" cy=\"{SLIDE_CY}\"/>\
<p:notesSz cx=\"6858000\" cy=\"9144000\"/>\
</p:presentation>"
    ));
    xml
}

fn presentation_rels(slide_count: usize) -> String {
    let mut xml = format!(
        "{XML_DECL}\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster\" Target=\"slideMasters/slideMaster1.xml\"/>"
    );
    for index in 0..slide_count {
        xml.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide\" Target=\"slides/slide{}.xml\"/>",
            index + 2,
            index + 1
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn slide_xml(slide: &SlideSpec, options: &PresentationOptions) -> String {
    let mut shapes = String::new();
    let title_size = options.title_font_size * 100;
    let body_size = options.body_font_size * 100;

    match slide.slide_type {
        SlideType::Title => {
            if let Some(title) = &slide.title {
                shapes.push_str(&text_shape(
                    2,
                    "Title",
                    (914_400, 2_130_425, SLIDE_CX as i64 - 1_828_800, 1_325_563),
                    &[paragraph(title, title_size + 800, true, options, false)],
                ));
            }
            if let Some(subtitle) = &slide.subtitle {
                shapes.push_str(&text_shape(
                    3,
                    "Subtitle",
                    (914_400, 3_886_200, SLIDE_CX as i64 - 1_828_800, 1_000_000),
                    &[paragraph(subtitle, body_size + 600, false, options, false)],
                ));
            }
        }
        SlideType::SectionHeader => {
            if let Some(title) = &slide.title {
                shapes.push_str(&text_shape(
                    2,
                    "Section Title",
                    (722_313, 2_906_714, 9_144_000, 1_362_075),
                    &[paragraph(title, title_size, true, options, false)],
                ));
            }
            if let Some(subtitle) = &slide.subtitle {
                shapes.push_str(&text_shape(
                    3,
                    "Section Text",
                    (722_313, 4_400_000, 9_144_000, 900_000),
                    &[paragraph(subtitle, body_size, false, options, false)],
                ));
            }
        }
        SlideType::TitleAndContent => {
            if let Some(title) = &slide.title {
                shapes.push_str(&text_shape(
                    2,
                    "Title",
                    (838_200, 365_125, SLIDE_CX as i64 - 1_676_400, 1_325_563),
                    &[paragraph(title, title_size, true, options, false)],
                ));
            }
            if !slide.content.is_empty() {
                let paragraphs: Vec<String> = slide
                    .content
                    .iter()
                    .map(|line| paragraph(line, body_size, false, options, true))
                    .collect();
                shapes.push_str(&text_shape(
                    3,
                    "Content",
                    (838_200, 1_825_625, SLIDE_CX as i64 - 1_676_400, 4_351_338),
                    &paragraphs,
                ));
            }
        }
    }

    format!(
        "{XML_DECL}\
<p:sld xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\">\
<p:cSld><p:spTree>\
<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>\
{shapes}\
</p:spTree></p:cSld>\
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>\
</p:sld>"
    )
}

fn paragraph(
    text: &str,
    size_centipoints: u32,
    bold: bool,
    options: &PresentationOptions,
    bullet: bool,
) -> String {
    let bold_attr = if bold { " b=\"1\"" } else { "" };
    let p_pr = if bullet {
        "<a:pPr><a:buChar char=\"\u{2022}\"/></a:pPr>".to_string()
    } else {
        String::new()
    };
    format!(
        "<a:p>{p_pr}<a:r><a:rPr lang=\"en-US\" sz=\"{size_centipoints}\"{bold_attr}>\
<a:latin typeface=\"{}\"/></a:rPr><a:t>{}</a:t></a:r></a:p>",
        escape_xml(&options.font_family),
        escape_xml(text)
    )
}

fn text_shape(id: u32, name: &str, frame: (i64, i64, i64, i64), paragraphs: &[String]) -> String {
    let (x, y, cx, cy) = frame;
    format!(
        "<p:sp><p:nvSpPr><p:cNvPr id=\"{id}\" name=\"{name}\"/><p:cNvSpPr><a:spLocks noGrp=\"1\"/></p:cNvSpPr><p:nvPr/></p:nvSpPr>\
<p:spPr><a:xfrm><a:off x=\"{x}\" y=\"{y}\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></p:spPr>\
<p:txBody><a:bodyPr wrap=\"square\"/><a:lstStyle/>{}</p:txBody></p:sp>",
        paragraphs.concat()
    )
}

const SLIDE_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout\" Target=\"../slideLayouts/slideLayout1.xml\"/>\
</Relationships>";

const SLIDE_MASTER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<p:sldMaster xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\">\
<p:cSld><p:bg><p:bgRef idx=\"1001\"><a:schemeClr val=\"bg1\"/></p:bgRef></p:bg>\
<p:spTree><p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld>\
<p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" accent3=\"accent3\" accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/>\
<p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst>\
</p:sldMaster>";

const SLIDE_MASTER_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout\" Target=\"../slideLayouts/slideLayout1.xml\"/>\
<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme\" Target=\"../theme/theme1.xml\"/>\
</Relationships>";

const SLIDE_LAYOUT: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<p:sldLayout xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" type=\"blank\">\
<p:cSld name=\"Blank\">\
<p:spTree><p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/></p:spTree></p:cSld>\
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>\
</p:sldLayout>";

const SLIDE_LAYOUT_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster\" Target=\"../slideMasters/slideMaster1.xml\"/>\
</Relationships>";

const THEME: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<a:theme xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" name=\"Office\">\
<a:themeElements>\
<a:clrScheme name=\"Office\">\
<a:dk1><a:sysClr val=\"windowText\" lastClr=\"000000\"/></a:dk1>\
<a:lt1><a:sysClr val=\"window\" lastClr=\"FFFFFF\"/></a:lt1>\
<a:dk2><a:srgbClr val=\"44546A\"/></a:dk2>\
<a:lt2><a:srgbClr val=\"E7E6E6\"/></a:lt2>\
<a:accent1><a:srgbClr val=\"4472C4\"/></a:accent1>\
<a:accent2><a:srgbClr val=\"ED7D31\"/></a:accent2>\
<a:accent3><a:srgbClr val=\"A5A5A5\"/></a:accent3>\
<a:accent4><a:srgbClr val=\"FFC000\"/></a:accent4>\
<a:accent5><a:srgbClr val=\"5B9BD5\"/></a:accent5>\
<a:accent6><a:srgbClr val=\"70AD47\"/></a:accent6>\
<a:hlink><a:srgbClr val=\"0563C1\"/></a:hlink>\
<a:folHlink><a:srgbClr val=\"954F72\"/></a:folHlink>\
</a:clrScheme>\
<a:fontScheme name=\"Office\">\
<a:majorFont><a:latin typeface=\"Calibri Light\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:majorFont>\
<a:minorFont><a:latin typeface=\"Calibri\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:minorFont>\
</a:fontScheme>\
<a:fmtScheme name=\"Office\">\
<a:fillStyleLst>\
<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
</a:fillStyleLst>\
<a:lnStyleLst>\
<a:ln><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln>\
<a:ln><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln>\
<a:ln><a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill></a:ln>\
</a:lnStyleLst>\
<a:effectStyleLst>\
<a:effectStyle><a:effectLst/></a:effectStyle>\
<a:effectStyle><a:effectLst/></a:effectStyle>\
<a:effectStyle><a:effectLst/></a:effectStyle>\
</a:effectStyleLst>\
<a:bgFillStyleLst>\
<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
<a:solidFill><a:schemeClr val=\"phClr\"/></a:solidFill>\
</a:bgFillStyleLst>\
</a:fmtScheme>\
</a:themeElements>\
</a:theme>";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_spec() -> Value {
        json!({
            "slides": [
                {"type": "title", "title": "Launch Review", "subtitle": "Q2"},
                {"type": "titleAndContent", "title": "Highlights", "content": ["Shipped", "On time"]},
                {"type": "sectionHeader", "title": "Appendix"}
            ]
        })
    }

    #[test]
    fn test_render_produces_zip_with_presentation_marker() {
        let bytes = PresentationRenderer.render(&sample_spec()).unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");

        let haystack = String::from_utf8_lossy(&bytes);
        assert!(haystack.contains("presentationml.presentation.main+xml"));
        assert!(haystack.contains("Launch Review"));
        assert!(haystack.contains("Highlights"));
    }

    #[test]
    fn test_one_slide_part_per_slide() {
        let bytes = PresentationRenderer.render(&sample_spec()).unwrap();
        let haystack = String::from_utf8_lossy(&bytes);
        assert!(haystack.contains("ppt/slides/slide3.xml"));
        assert!(!haystack.contains("ppt/slides/slide4.xml"));
    }

    #[test]
    fn test_bullets_only_on_content_slides() {
        let slide = slide_xml(
            &SlideSpec {
                slide_type: SlideType::TitleAndContent,
                title: Some("T".to_string()),
                subtitle: None,
                content: vec!["first".to_string()],
            },
            &PresentationOptions::default(),
        );
        assert!(slide.contains("buChar"));

        let title_slide = slide_xml(
            &SlideSpec {
                slide_type: SlideType::Title,
                title: Some("T".to_string()),
                subtitle: None,
                content: Vec::new(),
            },
            &PresentationOptions::default(),
        );
        assert!(!title_slide.contains("buChar"));
    }

    #[test]
    fn test_malformed_spec_is_invalid() {
        let result = PresentationRenderer.render(&json!({"slides": 7}));
        assert!(matches!(result, Err(RenderError::InvalidSpec(_))));
    }
}
