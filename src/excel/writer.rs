//! Workbook writing with rust_xlsxwriter

use crate::error::{GrigliaError, GrigliaResult};
use crate::types::{CellValue, ExpandedRow, MappingTable, EXPANDED_HEADER, MAPPING_HEADER};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::path::Path;

pub const EXPANDED_SHEET: &str = "Expanded_Mapped";
pub const MAPPING_SHEET: &str = "tb_de_para";

/// One worksheet to be written: a name and its rows from A1.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetData {
    pub fn new(name: &str, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.to_string(),
            rows,
        }
    }

    /// A header row followed by text rows.
    pub fn from_text_rows<'a, I>(name: &str, header: &[&str], rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<&'a str>>,
    {
        let mut all = vec![header.iter().map(|h| CellValue::from(*h)).collect::<Vec<_>>()];
        all.extend(
            rows.into_iter()
                .map(|row| row.into_iter().map(text_cell).collect::<Vec<_>>()),
        );
        Self::new(name, all)
    }
}

fn text_cell(s: &str) -> CellValue {
    if s.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(s.to_string())
    }
}

/// The `Expanded_Mapped` sheet.
pub fn expanded_sheet(rows: &[ExpandedRow]) -> SheetData {
    SheetData::from_text_rows(
        EXPANDED_SHEET,
        &EXPANDED_HEADER,
        rows.iter().map(|row| row.to_record().to_vec()),
    )
}

/// The `tb_de_para` sheet.
pub fn mapping_sheet(table: &MappingTable) -> SheetData {
    SheetData::from_text_rows(
        MAPPING_SHEET,
        &MAPPING_HEADER,
        table.records.iter().map(|rec| rec.to_record().to_vec()),
    )
}

/// Write `sheets` as a new workbook at `path`, replacing any existing file.
pub fn write_workbook(path: &Path, sheets: &[SheetData]) -> GrigliaResult<()> {
    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name).map_err(|e| {
            GrigliaError::Export(format!("Failed to set worksheet name '{}': {}", sheet.name, e))
        })?;
        write_rows(worksheet, &sheet.rows)?;
    }

    // An xlsx file needs at least one sheet.
    if sheets.is_empty() {
        workbook.add_worksheet();
    }

    workbook
        .save(path)
        .map_err(|e| GrigliaError::Export(format!("Failed to save {}: {}", path.display(), e)))
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<CellValue>]) -> GrigliaResult<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        let excel_row = row_idx as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let excel_col = col_idx as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet
                        .write_string(excel_row, excel_col, s)
                        .map_err(|e| GrigliaError::Export(format!("Failed to write text: {}", e)))?;
                }
                CellValue::Number(n) => {
                    worksheet
                        .write_number(excel_row, excel_col, *n)
                        .map_err(|e| GrigliaError::Export(format!("Failed to write number: {}", e)))?;
                }
            }
        }
    }
    Ok(())
}

/// Write the expanded dataset to its own workbook.
pub fn write_expanded(path: &Path, rows: &[ExpandedRow]) -> GrigliaResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    write_workbook(path, &[expanded_sheet(rows)])
}
