//! Minimal Office Open XML spreadsheet writer.
//!
//! Produces a single-sheet workbook with a bold header row. Text cells are
//! written as inline strings so no shared-string table is needed.

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use bitalign_core::AlignedPair;
use bitalign_core::text_processing::strip_xml_illegal;

use crate::ReportError;
use crate::export::{ExportOptions, format_score, headers};

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Excel refuses cells longer than this; the writer keeps them and warns.
const EXCEL_CELL_LIMIT: usize = 32_767;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

// Style 0 is the default cell, style 1 uses the bold font for headers.
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

const HEADER_STYLE: &str = "1";

enum Cell {
    Text(String),
    Number(f64),
}

fn xml_err(e: impl std::fmt::Display) -> ReportError {
    ReportError::Xml(e.to_string())
}

/// Spreadsheet column letters for a zero-based column index (`0` is `A`).
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

/// Whether `s` starts with an OOXML character escape such as `_x000D_`.
fn starts_with_escape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 7
        && b[0] == b'_'
        && b[1] == b'x'
        && b[2..6].iter().all(u8::is_ascii_hexdigit)
        && b[6] == b'_'
}

/// Encode text for a string cell.
///
/// XML parsers fold `\r` into `\n`, so carriage returns are written as
/// `_x000D_`. A literal `_xHHHH_` in the text gets its underscore escaped as
/// `_x005F_` so readers do not decode it.
fn encode_cell_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        match c {
            '\r' => out.push_str("_x000D_"),
            '_' if starts_with_escape(&text[i..]) => out.push_str("_x005F_"),
            _ => out.push(c),
        }
    }
    out
}

fn text_cell(text: &str) -> Cell {
    let cleaned = strip_xml_illegal(text);
    let len = cleaned.chars().count();
    if len > EXCEL_CELL_LIMIT {
        tracing::warn!(len, limit = EXCEL_CELL_LIMIT, "cell exceeds Excel length limit");
    }
    Cell::Text(encode_cell_text(&cleaned))
}

fn data_rows(pairs: &[AlignedPair], options: &ExportOptions) -> Vec<Vec<Cell>> {
    pairs
        .iter()
        .map(|pair| {
            let mut row = vec![text_cell(&pair.source), text_cell(&pair.target)];
            if options.include_scores {
                row.push(Cell::Number(pair.score));
            }
            row
        })
        .collect()
}

fn write_cell<W: Write>(
    writer: &mut Writer<W>,
    reference: &str,
    cell: &Cell,
    style: Option<&str>,
) -> Result<(), ReportError> {
    let mut start = BytesStart::new("c");
    start.push_attribute(("r", reference));
    if let Some(style) = style {
        start.push_attribute(("s", style));
    }
    match cell {
        Cell::Text(text) => {
            start.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(start)).map_err(xml_err)?;
            writer
                .write_event(Event::Start(BytesStart::new("is")))
                .map_err(xml_err)?;
            let mut t = BytesStart::new("t");
            t.push_attribute(("xml:space", "preserve"));
            writer.write_event(Event::Start(t)).map_err(xml_err)?;
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_err)?;
            writer
                .write_event(Event::End(BytesEnd::new("t")))
                .map_err(xml_err)?;
            writer
                .write_event(Event::End(BytesEnd::new("is")))
                .map_err(xml_err)?;
        }
        Cell::Number(value) => {
            writer.write_event(Event::Start(start)).map_err(xml_err)?;
            writer
                .write_event(Event::Start(BytesStart::new("v")))
                .map_err(xml_err)?;
            let value = format_score(*value);
            writer
                .write_event(Event::Text(BytesText::new(&value)))
                .map_err(xml_err)?;
            writer
                .write_event(Event::End(BytesEnd::new("v")))
                .map_err(xml_err)?;
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new("c")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_row<W: Write>(
    writer: &mut Writer<W>,
    row_number: usize,
    cells: &[Cell],
    style: Option<&str>,
) -> Result<(), ReportError> {
    let row_attr = row_number.to_string();
    let mut row = BytesStart::new("row");
    row.push_attribute(("r", row_attr.as_str()));
    writer.write_event(Event::Start(row)).map_err(xml_err)?;
    for (col, cell) in cells.iter().enumerate() {
        let reference = format!("{}{}", column_name(col), row_number);
        write_cell(writer, &reference, cell, style)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("row")))
        .map_err(xml_err)?;
    Ok(())
}

fn sheet_xml(header: &[&str], rows: &[Vec<Cell>]) -> Result<Vec<u8>, ReportError> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_err)?;

    let mut worksheet = BytesStart::new("worksheet");
    worksheet.push_attribute(("xmlns", NS_MAIN));
    worksheet.push_attribute(("xmlns:r", NS_REL));
    writer.write_event(Event::Start(worksheet)).map_err(xml_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("sheetData")))
        .map_err(xml_err)?;

    let header_cells: Vec<Cell> = header.iter().map(|h| Cell::Text(h.to_string())).collect();
    write_row(&mut writer, 1, &header_cells, Some(HEADER_STYLE))?;
    for (i, row) in rows.iter().enumerate() {
        write_row(&mut writer, i + 2, row, None)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("sheetData")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("worksheet")))
        .map_err(xml_err)?;
    Ok(writer.into_inner())
}

fn write_workbook<W: Write + Seek>(
    out: W,
    header: &[&str],
    rows: &[Vec<Cell>],
) -> Result<W, ReportError> {
    let sheet = sheet_xml(header, rows)?;
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut zip = ZipWriter::new(out);
    let parts: [(&str, &[u8]); 6] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", ROOT_RELS.as_bytes()),
        ("xl/workbook.xml", WORKBOOK.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes()),
        ("xl/styles.xml", STYLES.as_bytes()),
        ("xl/worksheets/sheet1.xml", &sheet),
    ];
    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body)?;
    }
    Ok(zip.finish()?)
}

/// Write aligned pairs as a single-sheet XLSX workbook.
pub fn export_xlsx(
    pairs: &[AlignedPair],
    path: &Path,
    options: &ExportOptions,
) -> Result<(), ReportError> {
    let file = File::create(path)?;
    let rows = data_rows(pairs, options);
    write_workbook(file, &headers(options), &rows)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(2), "C");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn test_sheet_header_is_bold_inline_string() {
        let xml = sheet_xml(&["English Paragraph", "Chinese Paragraph"], &[]).unwrap();
        let xml = String::from_utf8(xml).unwrap();
        assert!(xml.contains(
            r#"<c r="A1" s="1" t="inlineStr"><is><t xml:space="preserve">English Paragraph</t></is></c>"#
        ));
        assert!(xml.contains(r#"<c r="B1" s="1" t="inlineStr">"#));
        assert!(!xml.contains(r#"r="2""#));
    }

    #[test]
    fn test_sheet_escapes_and_numbers() {
        let rows = vec![vec![
            Cell::Text("a < b & c".to_string()),
            Cell::Text("猫".to_string()),
            Cell::Number(0.5),
        ]];
        let xml = String::from_utf8(sheet_xml(&["x", "y", "z"], &rows).unwrap()).unwrap();
        assert!(xml.contains("a &lt; b &amp; c"));
        assert!(xml.contains(r#"<row r="2"><c r="A2" t="inlineStr">"#));
        assert!(xml.contains(r#"<c r="C2"><v>0.5</v></c>"#));
    }

    #[test]
    fn test_text_cell_strips_control_chars() {
        match text_cell("a\u{0}b\u{b}c\td") {
            Cell::Text(t) => assert_eq!(t, "abc\td"),
            Cell::Number(_) => panic!("expected text cell"),
        }
    }

    #[test]
    fn test_carriage_returns_are_escaped() {
        assert_eq!(encode_cell_text("line one\r\nline two"), "line one_x000D_\nline two");
        assert_eq!(encode_cell_text("A\r"), "A_x000D_");
        assert_eq!(encode_cell_text("plain_text"), "plain_text");
    }

    #[test]
    fn test_literal_escape_sequences_are_protected() {
        assert_eq!(encode_cell_text("id_x0041_b"), "id_x005F_x0041_b");
        assert_eq!(encode_cell_text("_x12_"), "_x12_");
        assert_eq!(encode_cell_text("_xZZZZ_"), "_xZZZZ_");
        assert_eq!(encode_cell_text("猫_x000d_"), "猫_x005F_x000d_");
    }

    #[test]
    fn test_sheet_never_contains_raw_carriage_return() {
        let rows = vec![vec![text_cell("a\r\nb"), text_cell("c\r"), Cell::Number(1e-231)]];
        let xml = String::from_utf8(sheet_xml(&["x", "y", "z"], &rows).unwrap()).unwrap();
        assert!(!xml.contains('\r'));
        assert!(xml.contains("a_x000D_\nb"));
        assert!(xml.contains(r#"<c r="C2"><v>1e-231</v></c>"#));
    }

    #[test]
    fn test_workbook_has_all_parts() {
        let cursor = write_workbook(Cursor::new(Vec::new()), &["x", "y"], &[]).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap();
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/styles.xml",
            "xl/worksheets/sheet1.xml",
        ] {
            let mut body = String::new();
            archive
                .by_name(name)
                .unwrap()
                .read_to_string(&mut body)
                .unwrap();
            assert!(body.starts_with("<?xml"), "{name} is not XML");
        }
    }
}
