//! Sheet replacement at the xlsx package level
//!
//! An .xlsx file is a zip of XML parts. Replacing one worksheet only needs its
//! `<sheetData>` rewritten; every other part (formulas, styles, dates, shared
//! strings, charts) is copied byte for byte. A sheet that does not exist yet
//! gets a new part plus entries in `workbook.xml`, its rels and
//! `[Content_Types].xml`.

use crate::error::{GrigliaError, GrigliaResult};
use crate::excel::writer::SheetData;
use crate::types::CellValue;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const WORKSHEET_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

/// Copy `source` to `output` with `sheet` replacing (or added as) the
/// worksheet of the same name. `source` itself is never written.
pub fn replace_sheet(source: &Path, output: &Path, sheet: &SheetData) -> GrigliaResult<()> {
    let file = File::open(source)?;
    let mut archive = ZipArchive::new(file).map_err(|e| package_error(source, e))?;

    let workbook_xml = read_part(&mut archive, WORKBOOK_PART, source)?;
    let rels_xml = read_part(&mut archive, WORKBOOK_RELS_PART, source)?;
    let sheets = parse_sheets(&workbook_xml).map_err(|e| package_error(source, e))?;
    let rels = parse_relationships(&rels_xml).map_err(|e| package_error(source, e))?;

    let existing = sheets
        .iter()
        .find(|s| s.name == sheet.name)
        .and_then(|s| rels.iter().find(|r| r.id == s.rel_id))
        .map(|rel| part_name(&rel.target));

    let mut updated: HashMap<String, Vec<u8>> = HashMap::new();
    match existing {
        Some(part) => {
            debug!(sheet = %sheet.name, part = %part, "rewriting sheet data");
            let xml = read_part(&mut archive, &part, source)?;
            let patched = splice_sheet_data(&xml, &sheet.rows).map_err(|e| package_error(source, e))?;
            updated.insert(part, patched.into_bytes());
        }
        None => {
            let names: Vec<String> = archive.file_names().map(str::to_string).collect();
            let content_types = read_part(&mut archive, CONTENT_TYPES_PART, source)?;
            let added = add_sheet(&workbook_xml, &rels_xml, &content_types, &sheets, &rels, &names, sheet)
                .map_err(|e| package_error(source, e))?;
            debug!(sheet = %sheet.name, part = %added.part, "adding sheet part");
            updated.insert(WORKBOOK_PART.to_string(), added.workbook.into_bytes());
            updated.insert(WORKBOOK_RELS_PART.to_string(), added.rels.into_bytes());
            updated.insert(CONTENT_TYPES_PART.to_string(), added.content_types.into_bytes());
            updated.insert(added.part, added.sheet.into_bytes());
        }
    }

    write_package(&mut archive, output, updated).map_err(|e| package_error(output, e))
}

fn package_error(path: &Path, e: impl Display) -> GrigliaError {
    GrigliaError::Package(format!("{}: {}", path.display(), e))
}

fn read_part(archive: &mut ZipArchive<File>, name: &str, path: &Path) -> GrigliaResult<String> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| package_error(path, format!("{}: {}", name, e)))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Stream every entry to `output`, swapping in `updated` parts and appending
/// the ones the source does not have.
fn write_package(
    archive: &mut ZipArchive<File>,
    output: &Path,
    mut updated: HashMap<String, Vec<u8>>,
) -> Result<(), String> {
    let out = File::create(output).map_err(|e| e.to_string())?;
    let mut zip = ZipWriter::new(out);
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let file = archive.by_index(i).map_err(|e| e.to_string())?;
        let name = file.name().to_string();
        match updated.remove(&name) {
            Some(bytes) => {
                zip.start_file(name, options).map_err(|e| e.to_string())?;
                zip.write_all(&bytes).map_err(|e| e.to_string())?;
            }
            None => zip.raw_copy_file(file).map_err(|e| e.to_string())?,
        }
    }

    let mut added: Vec<(String, Vec<u8>)> = updated.into_iter().collect();
    added.sort();
    for (name, bytes) in added {
        zip.start_file(name, options).map_err(|e| e.to_string())?;
        zip.write_all(&bytes).map_err(|e| e.to_string())?;
    }

    zip.finish().map_err(|e| e.to_string())?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// workbook.xml and its relationships
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct SheetEntry {
    name: String,
    sheet_id: u32,
    rel_id: String,
    /// Qualified name of the relationship attribute, usually `r:id`.
    rel_attr: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Relationship {
    id: String,
    target: String,
}

fn parse_sheets(xml: &str) -> Result<Vec<SheetEntry>, String> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut entry = SheetEntry {
                    name: String::new(),
                    sheet_id: 0,
                    rel_id: String::new(),
                    rel_attr: "r:id".to_string(),
                };
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| e.to_string())?;
                    let value = attr.decode_and_unescape_value(reader.decoder()).map_err(|e| e.to_string())?.into_owned();
                    match attr.key.as_ref() {
                        b"name" => entry.name = value,
                        b"sheetId" => entry.sheet_id = value.parse().unwrap_or(0),
                        _ if attr.key.local_name().as_ref() == b"id" => {
                            entry.rel_id = value;
                            entry.rel_attr = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                        }
                        _ => {}
                    }
                }
                sheets.push(entry);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>, String> {
    let mut reader = Reader::from_str(xml);
    let mut rels = Vec::new();
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = String::new();
                let mut target = String::new();
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| e.to_string())?;
                    match attr.key.as_ref() {
                        b"Id" => id = attr.decode_and_unescape_value(reader.decoder()).map_err(|e| e.to_string())?.into_owned(),
                        b"Target" => {
                            target = attr.decode_and_unescape_value(reader.decoder()).map_err(|e| e.to_string())?.into_owned()
                        }
                        _ => {}
                    }
                }
                rels.push(Relationship { id, target });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// Zip entry name of a relationship target from `xl/_rels/workbook.xml.rels`.
fn part_name(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Element spans
// ─────────────────────────────────────────────────────────────────────────────

/// Byte range of one element, start tag through end tag.
#[derive(Debug, Clone, PartialEq)]
struct ElementSpan {
    start: usize,
    end: usize,
    qname: String,
    self_closing: bool,
}

impl ElementSpan {
    /// `x` for `x:sheetData`, empty for an unprefixed name.
    fn prefix(&self) -> &str {
        self.qname.split_once(':').map(|(p, _)| p).unwrap_or("")
    }
}

fn find_element(xml: &str, local: &[u8]) -> Result<Option<ElementSpan>, String> {
    let mut reader = Reader::from_str(xml);
    let mut open: Option<(usize, Vec<u8>, usize)> = None;
    let mut depth = 0usize;

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|e| e.to_string())?;
        let after = reader.buffer_position() as usize;
        match event {
            Event::Start(e) => {
                depth += 1;
                if open.is_none() && e.local_name().as_ref() == local {
                    open = Some((before, e.name().as_ref().to_vec(), depth));
                }
            }
            Event::Empty(e) if open.is_none() && e.local_name().as_ref() == local => {
                return Ok(Some(ElementSpan {
                    start: before,
                    end: after,
                    qname: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    self_closing: true,
                }));
            }
            Event::End(e) => {
                if let Some((start, qname, open_depth)) = &open {
                    if depth == *open_depth && e.name().as_ref() == qname.as_slice() {
                        return Ok(Some(ElementSpan {
                            start: *start,
                            end: after,
                            qname: String::from_utf8_lossy(qname).into_owned(),
                            self_closing: false,
                        }));
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Insert `content` as the last child of the element named `local`.
fn append_child(xml: &str, local: &[u8], content: &str) -> Result<String, String> {
    let span = find_element(xml, local)?
        .ok_or_else(|| format!("no <{}> element", String::from_utf8_lossy(local)))?;
    let mut out = String::with_capacity(xml.len() + content.len() + span.qname.len() + 3);
    if span.self_closing {
        out.push_str(&xml[..span.start]);
        out.push_str(&format!("<{q}>{c}</{q}>", q = span.qname, c = content));
    } else {
        let close = span.end - span.qname.len() - 3;
        out.push_str(&xml[..close]);
        out.push_str(content);
        out.push_str(&xml[close..span.end]);
    }
    out.push_str(&xml[span.end..]);
    Ok(out)
}

// ─────────────────────────────────────────────────────────────────────────────
// Worksheet content
// ─────────────────────────────────────────────────────────────────────────────

/// Replace the `<sheetData>` of a worksheet part, keeping everything else.
fn splice_sheet_data(xml: &str, rows: &[Vec<CellValue>]) -> Result<String, String> {
    let data = find_element(xml, b"sheetData")?.ok_or("worksheet has no <sheetData>")?;
    let mut out = String::with_capacity(xml.len());
    out.push_str(&xml[..data.start]);
    out.push_str(&sheet_data_xml(data.prefix(), rows));
    out.push_str(&xml[data.end..]);

    // The old used range no longer holds; Excel recomputes it when absent.
    match find_element(&out, b"dimension")? {
        Some(dim) => {
            let mut trimmed = String::with_capacity(out.len());
            trimmed.push_str(&out[..dim.start]);
            trimmed.push_str(&dimension_xml(dim.prefix(), rows));
            trimmed.push_str(&out[dim.end..]);
            Ok(trimmed)
        }
        None => Ok(out),
    }
}

fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

fn dimension_xml(prefix: &str, rows: &[Vec<CellValue>]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let reference = if rows.is_empty() || width == 0 {
        "A1".to_string()
    } else {
        format!("A1:{}{}", column_letters(width - 1), rows.len())
    };
    format!("<{} ref=\"{}\"/>", qualified(prefix, "dimension"), reference)
}

/// Cells as inline strings and plain numbers; no shared-string or style
/// entries are needed.
fn sheet_data_xml(prefix: &str, rows: &[Vec<CellValue>]) -> String {
    let sheet_data = qualified(prefix, "sheetData");
    let row_tag = qualified(prefix, "row");
    let c = qualified(prefix, "c");
    let v = qualified(prefix, "v");
    let is = qualified(prefix, "is");
    let t = qualified(prefix, "t");

    let mut out = format!("<{}>", sheet_data);
    for (row_idx, row) in rows.iter().enumerate() {
        let number = row_idx + 1;
        out.push_str(&format!("<{} r=\"{}\">", row_tag, number));
        for (col_idx, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letters(col_idx), number);
            match cell {
                CellValue::Empty => {}
                CellValue::Number(n) => {
                    out.push_str(&format!("<{c} r=\"{r}\"><{v}>{n}</{v}></{c}>", c = c, r = reference, v = v, n = n));
                }
                CellValue::Text(s) => {
                    out.push_str(&format!(
                        "<{c} r=\"{r}\" t=\"inlineStr\"><{is}><{t} xml:space=\"preserve\">{s}</{t}></{is}></{c}>",
                        c = c,
                        r = reference,
                        is = is,
                        t = t,
                        s = escape(s.as_str())
                    ));
                }
            }
        }
        out.push_str(&format!("</{}>", row_tag));
    }
    out.push_str(&format!("</{}>", sheet_data));
    out
}

/// 0 → `A`, 25 → `Z`, 26 → `AA`.
fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// New sheet
// ─────────────────────────────────────────────────────────────────────────────

struct AddedSheet {
    part: String,
    sheet: String,
    workbook: String,
    rels: String,
    content_types: String,
}

fn add_sheet(
    workbook_xml: &str,
    rels_xml: &str,
    content_types: &str,
    sheets: &[SheetEntry],
    rels: &[Relationship],
    part_names: &[String],
    sheet: &SheetData,
) -> Result<AddedSheet, String> {
    let sheet_number = (1..)
        .find(|n| !part_names.iter().any(|p| p == &format!("xl/worksheets/sheet{}.xml", n)))
        .unwrap_or(1);
    let part = format!("xl/worksheets/sheet{}.xml", sheet_number);
    let rel_id = (1..)
        .map(|n| format!("rId{}", n))
        .find(|id| !rels.iter().any(|r| &r.id == id))
        .unwrap_or_else(|| "rId1".to_string());
    let sheet_id = sheets.iter().map(|s| s.sheet_id).max().unwrap_or(0) + 1;
    let rel_attr = sheets
        .first()
        .map(|s| s.rel_attr.as_str())
        .unwrap_or("r:id");

    let sheets_span = find_element(workbook_xml, b"sheets")?.ok_or("workbook has no <sheets>")?;
    let sheet_tag = qualified(sheets_span.prefix(), "sheet");
    let workbook = append_child(
        workbook_xml,
        b"sheets",
        &format!(
            "<{} name=\"{}\" sheetId=\"{}\" {}=\"{}\"/>",
            sheet_tag,
            escape(sheet.name.as_str()),
            sheet_id,
            rel_attr,
            rel_id
        ),
    )?;
    let rels = append_child(
        rels_xml,
        b"Relationships",
        &format!(
            "<Relationship Id=\"{}\" Type=\"{}\" Target=\"worksheets/sheet{}.xml\"/>",
            rel_id, WORKSHEET_REL_TYPE, sheet_number
        ),
    )?;
    let content_types = append_child(
        content_types,
        b"Types",
        &format!(
            "<Override PartName=\"/{}\" ContentType=\"{}\"/>",
            part, WORKSHEET_CONTENT_TYPE
        ),
    )?;

    let sheet_xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
         {}{}\
         <pageMargins left=\"0.7\" right=\"0.7\" top=\"0.75\" bottom=\"0.75\" header=\"0.3\" footer=\"0.3\"/>\
         </worksheet>",
        dimension_xml("", &sheet.rows),
        sheet_data_xml("", &sheet.rows)
    );

    Ok(AddedSheet {
        part,
        sheet: sheet_xml,
        workbook,
        rels,
        content_types,
    })
}
