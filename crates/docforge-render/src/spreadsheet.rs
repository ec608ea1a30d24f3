//! Spreadsheet renderer
//!
//! Builds an `.xlsx` workbook from sheets of tables. Each table is placed
//! at its start cell with an optional merged title row, a header row, and
//! typed data rows (static values or formulas).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use docforge_core::ArtifactKind;
use serde::Deserialize;
use serde_json::Value;

use crate::ooxml::{RELS_CONTENT_TYPE, XML_DECL, escape_xml, write_package};
use crate::{RenderError, Renderer};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetSpec {
    sheets_data: Vec<SheetData>,
    #[serde(default)]
    excel_configs: SpreadsheetOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetData {
    sheet_name: String,
    #[serde(default)]
    tables: Vec<TableSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableSpec {
    #[serde(default)]
    title: Option<String>,
    start_cell: String,
    #[serde(default)]
    rows: Vec<Vec<CellSpec>>,
    #[serde(default)]
    columns: Vec<ColumnSpec>,
    #[serde(default)]
    skip_header: bool,
}

#[derive(Debug, Deserialize)]
struct CellSpec {
    #[serde(default, rename = "type")]
    cell_type: CellType,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CellType {
    #[default]
    StaticValue,
    Formula,
}

#[derive(Debug, Deserialize)]
struct ColumnSpec {
    name: String,
    #[serde(default, rename = "type")]
    column_type: ColumnType,
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ColumnType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
    Percent,
    Currency,
}

/// Workbook-wide formatting options. Field defaults double as the merge
/// base: absent request fields deserialize to these values.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpreadsheetOptions {
    pub font_family: String,
    pub table_title_font_size: u8,
    pub header_font_size: u8,
    pub font_size: u8,
    pub auto_fit_column_width: bool,
    pub auto_filter: bool,
    pub wrap_text: bool,
    pub border_style: Option<String>,
}

impl Default for SpreadsheetOptions {
    fn default() -> Self {
        Self {
            font_family: "Calibri".to_string(),
            table_title_font_size: 13,
            header_font_size: 11,
            font_size: 11,
            auto_fit_column_width: true,
            auto_filter: false,
            wrap_text: false,
            border_style: None,
        }
    }
}

// Style slots in cellXfs; custom column formats are appended after these.
const XF_BODY: usize = 0;
const XF_HEADER: usize = 1;
const XF_TITLE: usize = 2;
const XF_NUMBER: usize = 3;
const XF_PERCENT: usize = 4;
const XF_CURRENCY: usize = 5;
const XF_DATE: usize = 6;
const XF_FIXED: usize = 7;

pub struct SpreadsheetRenderer;

impl Renderer for SpreadsheetRenderer {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Spreadsheet
    }

    fn primary_field(&self) -> &'static str {
        "sheetsData"
    }

    fn primary_label(&self) -> &'static str {
        "Sheets data"
    }

    fn render(&self, spec: &Value) -> Result<Vec<u8>, RenderError> {
        let spec: SpreadsheetSpec = serde_json::from_value(spec.clone())
            .map_err(|error| RenderError::InvalidSpec(error.to_string()))?;
        build_workbook(&spec)
    }
}

fn build_workbook(spec: &SpreadsheetSpec) -> Result<Vec<u8>, RenderError> {
    let custom_formats = collect_custom_formats(spec);

    let mut parts = Vec::new();
    parts.push(("[Content_Types].xml".to_string(), content_types(spec.sheets_data.len())));
    parts.push(("_rels/.rels".to_string(), crate::ooxml::package_rels("xl/workbook.xml")));
    parts.push(("xl/workbook.xml".to_string(), workbook_xml(&spec.sheets_data)));
    parts.push(("xl/_rels/workbook.xml.rels".to_string(), workbook_rels(spec.sheets_data.len())));
    parts.push((
        "xl/styles.xml".to_string(),
        styles_xml(&spec.excel_configs, &custom_formats),
    ));

    for (index, sheet) in spec.sheets_data.iter().enumerate() {
        parts.push((
            format!("xl/worksheets/sheet{}.xml", index + 1),
            worksheet_xml(sheet, &spec.excel_configs, &custom_formats)?,
        ));
    }

    write_package(&parts)
}

fn collect_custom_formats(spec: &SpreadsheetSpec) -> Vec<String> {
    let mut formats = Vec::new();
    for sheet in &spec.sheets_data {
        for table in &sheet.tables {
            for column in &table.columns {
                if let Some(format) = &column.format {
                    if !formats.contains(format) {
                        formats.push(format.clone());
                    }
                }
            }
        }
    }
    formats
}

fn content_types(sheet_count: usize) -> String {
    let mut xml = format!(
        "{XML_DECL}\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"{RELS_CONTENT_TYPE}\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
<Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>"
    );
    for index in 1..=sheet_count {
        xml.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{index}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>"
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn workbook_xml(sheets: &[SheetData]) -> String {
    let mut xml = format!(
        "{XML_DECL}\
<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"><sheets>"
    );
    for (index, sheet) in sheets.iter().enumerate() {
        let id = index + 1;
        xml.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{id}\" r:id=\"rId{id}\"/>",
            escape_xml(&sheet.sheet_name)
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels(sheet_count: usize) -> String {
    let mut xml = format!(
        "{XML_DECL}\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">"
    );
    for index in 1..=sheet_count {
        xml.push_str(&format!(
            "<Relationship Id=\"rId{index}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet{index}.xml\"/>"
        ));
    }
    xml.push_str(&format!(
        "<Relationship Id=\"rId{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>",
        sheet_count + 1
    ));
    xml.push_str("</Relationships>");
    xml
}

fn styles_xml(options: &SpreadsheetOptions, custom_formats: &[String]) -> String {
    let font_name = escape_xml(&options.font_family);
    let border_id = if options.border_style.is_some() { 1 } else { 0 };
    let alignment = if options.wrap_text {
        "<alignment wrapText=\"1\"/>"
    } else {
        ""
    };
    let apply_alignment = if options.wrap_text {
        " applyAlignment=\"1\""
    } else {
        ""
    };

    let mut xml = format!(
        "{XML_DECL}\
<styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">"
    );

    if !custom_formats.is_empty() {
        xml.push_str(&format!("<numFmts count=\"{}\">", custom_formats.len()));
        for (index, format) in custom_formats.iter().enumerate() {
            xml.push_str(&format!(
                "<numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                164 + index,
                escape_xml(format)
            ));
        }
        xml.push_str("</numFmts>");
    }

    xml.push_str(&format!(
        "<fonts count=\"3\">\
<font><sz val=\"{body}\"/><name val=\"{font_name}\"/></font>\
<font><b/><sz val=\"{header}\"/><name val=\"{font_name}\"/></font>\
<font><b/><sz val=\"{title}\"/><name val=\"{font_name}\"/></font>\
</fonts>\
<fills count=\"2\">\
<fill><patternFill patternType=\"none\"/></fill>\
<fill><patternFill patternType=\"gray125\"/></fill>\
</fills>",
        body = options.font_size,
        header = options.header_font_size,
        title = options.table_title_font_size,
    ));

    let border_style = options
        .border_style
        .as_deref()
        .map(normalize_border_style)
        .unwrap_or("thin");
    xml.push_str(&format!(
        "<borders count=\"2\">\
<border><left/><right/><top/><bottom/><diagonal/></border>\
<border><left style=\"{s}\"/><right style=\"{s}\"/><top style=\"{s}\"/><bottom style=\"{s}\"/><diagonal/></border>\
</borders>",
        s = border_style
    ));

    let xf = |num_fmt: usize, font: usize| {
        let apply_fmt = if num_fmt != 0 { " applyNumberFormat=\"1\"" } else { "" };
        format!(
            "<xf numFmtId=\"{num_fmt}\" fontId=\"{font}\" fillId=\"0\" borderId=\"{border_id}\" applyFont=\"1\"{apply_fmt}{apply_alignment}>{alignment}</xf>"
        )
    };

    xml.push_str(&format!(
        "<cellXfs count=\"{}\">",
        XF_FIXED + custom_formats.len()
    ));
    xml.push_str(&xf(0, 0)); // body
    xml.push_str(&xf(0, 1)); // header
    xml.push_str(&xf(0, 2)); // title
    xml.push_str(&xf(1, 0)); // number
    xml.push_str(&xf(10, 0)); // percent
    xml.push_str(&xf(5, 0)); // currency
    xml.push_str(&xf(14, 0)); // date
    for index in 0..custom_formats.len() {
        xml.push_str(&xf(164 + index, 0));
    }
    xml.push_str("</cellXfs></styleSheet>");
    xml
}

fn normalize_border_style(style: &str) -> &'static str {
    match style {
        "thin" => "thin",
        "medium" => "medium",
        "thick" => "thick",
        "dashed" => "dashed",
        "dotted" => "dotted",
        "double" => "double",
        "hair" => "hair",
        _ => "thin",
    }
}

enum CellContent {
    InlineStr(String),
    Number(String),
    Bool(bool),
    Formula(String),
}

struct SheetCell {
    style: usize,
    content: CellContent,
}

fn worksheet_xml(
    sheet: &SheetData,
    options: &SpreadsheetOptions,
    custom_formats: &[String],
) -> Result<String, RenderError> {
    // (row, col) -> cell, kept ordered so emission is deterministic
    let mut cells: BTreeMap<u32, BTreeMap<u32, SheetCell>> = BTreeMap::new();
    let mut widths: BTreeMap<u32, usize> = BTreeMap::new();
    let mut merges: Vec<String> = Vec::new();
    let mut auto_filter: Option<String> = None;

    for table in &sheet.tables {
        let (start_col, start_row) = parse_cell_ref(&table.start_cell)?;
        let mut row_index = start_row;
        let span = table.columns.len() as u32;

        if let Some(title) = &table.title {
            cells.entry(row_index).or_default().insert(
                start_col,
                SheetCell {
                    style: XF_TITLE,
                    content: CellContent::InlineStr(title.clone()),
                },
            );
            if span > 1 {
                merges.push(format!(
                    "{}:{}",
                    cell_ref(start_col, row_index),
                    cell_ref(start_col + span - 1, row_index)
                ));
            }
            row_index += 1;
        }

        let header_row = row_index;
        if !table.skip_header && !table.columns.is_empty() {
            for (offset, column) in table.columns.iter().enumerate() {
                let col = start_col + offset as u32;
                track_width(&mut widths, col, column.name.len());
                cells.entry(row_index).or_default().insert(
                    col,
                    SheetCell {
                        style: XF_HEADER,
                        content: CellContent::InlineStr(column.name.clone()),
                    },
                );
            }
            row_index += 1;
        }

        for row in &table.rows {
            for (offset, cell) in row.iter().enumerate() {
                let col = start_col + offset as u32;
                let column = table.columns.get(offset);
                let rendered = render_cell(cell, column, custom_formats);
                if let CellContent::InlineStr(text) = &rendered.content {
                    track_width(&mut widths, col, text.len());
                } else if let CellContent::Number(text) = &rendered.content {
                    track_width(&mut widths, col, text.len());
                }
                cells.entry(row_index).or_default().insert(col, rendered);
            }
            row_index += 1;
        }

        // Matches the original behavior: the last table's range wins.
        if options.auto_filter && !table.columns.is_empty() && row_index > header_row {
            auto_filter = Some(format!(
                "{}:{}",
                cell_ref(start_col, header_row),
                cell_ref(start_col + span.saturating_sub(1), row_index - 1)
            ));
        }
    }

    let mut xml = format!(
        "{XML_DECL}\
<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">"
    );

    if options.auto_fit_column_width && !widths.is_empty() {
        xml.push_str("<cols>");
        for (col, width) in &widths {
            xml.push_str(&format!(
                "<col min=\"{col}\" max=\"{col}\" width=\"{}\" customWidth=\"1\"/>",
                width + 2
            ));
        }
        xml.push_str("</cols>");
    }

    xml.push_str("<sheetData>");
    for (row, row_cells) in &cells {
        xml.push_str(&format!("<row r=\"{row}\">"));
        for (col, cell) in row_cells {
            let r = cell_ref(*col, *row);
            let s = cell.style;
            match &cell.content {
                CellContent::InlineStr(text) => xml.push_str(&format!(
                    "<c r=\"{r}\" s=\"{s}\" t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                    escape_xml(text)
                )),
                CellContent::Number(value) => {
                    xml.push_str(&format!("<c r=\"{r}\" s=\"{s}\"><v>{value}</v></c>"));
                }
                CellContent::Bool(value) => xml.push_str(&format!(
                    "<c r=\"{r}\" s=\"{s}\" t=\"b\"><v>{}</v></c>",
                    if *value { 1 } else { 0 }
                )),
                CellContent::Formula(formula) => xml.push_str(&format!(
                    "<c r=\"{r}\" s=\"{s}\"><f>{}</f></c>",
                    escape_xml(formula)
                )),
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");

    if let Some(range) = auto_filter {
        xml.push_str(&format!("<autoFilter ref=\"{range}\"/>"));
    }
    if !merges.is_empty() {
        xml.push_str(&format!("<mergeCells count=\"{}\">", merges.len()));
        for merge in &merges {
            xml.push_str(&format!("<mergeCell ref=\"{merge}\"/>"));
        }
        xml.push_str("</mergeCells>");
    }

    xml.push_str("</worksheet>");
    Ok(xml)
}

fn track_width(widths: &mut BTreeMap<u32, usize>, col: u32, len: usize) {
    let entry = widths.entry(col).or_insert(0);
    if len > *entry {
        *entry = len;
    }
}

fn render_cell(
    cell: &CellSpec,
    column: Option<&ColumnSpec>,
    custom_formats: &[String],
) -> SheetCell {
    let column_type = column.map(|c| c.column_type).unwrap_or_default();
    let style = column
        .and_then(|c| c.format.as_ref())
        .and_then(|format| custom_formats.iter().position(|f| f == format))
        .map(|index| XF_FIXED + index)
        .unwrap_or(match column_type {
            ColumnType::Number => XF_NUMBER,
            ColumnType::Percent => XF_PERCENT,
            ColumnType::Currency => XF_CURRENCY,
            ColumnType::Date => XF_DATE,
            ColumnType::String | ColumnType::Boolean => XF_BODY,
        });

    if cell.cell_type == CellType::Formula {
        let formula = value_to_text(&cell.value);
        return SheetCell {
            style,
            content: CellContent::Formula(formula),
        };
    }

    let content = match column_type {
        ColumnType::Number => match value_as_f64(&cell.value) {
            Some(number) => CellContent::Number(format!("{}", number.round())),
            None => CellContent::InlineStr(value_to_text(&cell.value)),
        },
        ColumnType::Percent | ColumnType::Currency => match value_as_f64(&cell.value) {
            Some(number) => CellContent::Number(number.to_string()),
            None => CellContent::InlineStr(value_to_text(&cell.value)),
        },
        ColumnType::Boolean => CellContent::Bool(value_truthy(&cell.value)),
        ColumnType::Date => match value_as_date_serial(&cell.value) {
            Some(serial) => CellContent::Number(serial.to_string()),
            None => CellContent::InlineStr(value_to_text(&cell.value)),
        },
        ColumnType::String => CellContent::InlineStr(value_to_text(&cell.value)),
    };

    SheetCell { style, content }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn value_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty() && text != "false" && text != "0",
        _ => false,
    }
}

/// Excel serial day for an ISO `YYYY-MM-DD` value (epoch 1899-12-30).
fn value_as_date_serial(value: &Value) -> Option<i64> {
    let text = value.as_str()?;
    let date = NaiveDate::parse_from_str(text.get(..10)?, "%Y-%m-%d").ok()?;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    Some((date - epoch).num_days())
}

/// Convert a column letter prefix and row digits (e.g. `B3`) to indices.
fn parse_cell_ref(cell: &str) -> Result<(u32, u32), RenderError> {
    let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let digits = &cell[letters.len()..];

    if letters.is_empty() || digits.is_empty() {
        return Err(RenderError::InvalidSpec(format!(
            "invalid start cell reference: {cell:?}"
        )));
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }

    let row: u32 = digits
        .parse()
        .map_err(|_| RenderError::InvalidSpec(format!("invalid start cell reference: {cell:?}")))?;

    Ok((col, row))
}

fn cell_ref(col: u32, row: u32) -> String {
    let mut letters = String::new();
    let mut remaining = col;
    while remaining > 0 {
        let rem = (remaining - 1) % 26;
        letters.insert(0, (b'A' + rem as u8) as char);
        remaining = (remaining - 1) / 26;
    }
    format!("{letters}{row}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_spec() -> Value {
        json!({
            "sheetsData": [{
                "sheetName": "Quarterly",
                "tables": [{
                    "title": "Revenue",
                    "startCell": "A1",
                    "columns": [
                        {"name": "Region", "type": "string"},
                        {"name": "Total", "type": "number"}
                    ],
                    "rows": [
                        [{"type": "static_value", "value": "EMEA"}, {"type": "static_value", "value": 1200}],
                        [{"type": "static_value", "value": "APAC"}, {"type": "formula", "value": "SUM(B2:B2)"}]
                    ]
                }]
            }]
        })
    }

    #[test]
    fn test_render_produces_zip_with_workbook_marker() {
        let bytes = SpreadsheetRenderer.render(&sample_spec()).unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");

        let haystack = String::from_utf8_lossy(&bytes);
        assert!(haystack.contains("spreadsheetml.sheet.main+xml"));
        assert!(haystack.contains("Quarterly"));
        assert!(haystack.contains("EMEA"));
    }

    #[test]
    fn test_formula_cells_emit_formulas() {
        let bytes = SpreadsheetRenderer.render(&sample_spec()).unwrap();
        let haystack = String::from_utf8_lossy(&bytes);
        assert!(haystack.contains("<f>SUM(B2:B2)</f>"));
    }

    #[test]
    fn test_malformed_spec_is_invalid() {
        let result = SpreadsheetRenderer.render(&json!({"sheetsData": "not-an-array"}));
        assert!(matches!(result, Err(RenderError::InvalidSpec(_))));
    }

    #[test]
    fn test_options_merge_over_defaults() {
        let options: SpreadsheetOptions =
            serde_json::from_value(json!({"autoFilter": true})).unwrap();
        assert!(options.auto_filter);
        // Untouched fields keep their defaults
        assert_eq!(options.font_family, "Calibri");
        assert_eq!(options.font_size, 11);
        assert!(options.auto_fit_column_width);
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1").unwrap(), (1, 1));
        assert_eq!(parse_cell_ref("B3").unwrap(), (2, 3));
        assert_eq!(parse_cell_ref("AA10").unwrap(), (27, 10));
        assert!(parse_cell_ref("42").is_err());
        assert!(parse_cell_ref("B").is_err());
    }

    #[test]
    fn test_cell_ref_round_trip() {
        for (col, row, expected) in [(1, 1, "A1"), (26, 2, "Z2"), (27, 3, "AA3"), (52, 9, "AZ9")] {
            assert_eq!(cell_ref(col, row), expected);
            assert_eq!(parse_cell_ref(expected).unwrap(), (col, row));
        }
    }

    #[test]
    fn test_date_serial_epoch() {
        assert_eq!(value_as_date_serial(&json!("1900-01-01")), Some(2));
        assert_eq!(value_as_date_serial(&json!("not a date")), None);
    }
}
