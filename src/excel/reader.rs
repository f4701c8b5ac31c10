//! Worksheet reading on top of calamine
//!
//! calamine reads the cell store directly, so rows and columns marked hidden
//! in the workbook are returned like any other cell. Callers never have to
//! unhide anything before reading.

use crate::error::{GrigliaError, GrigliaResult};
use crate::excel::writer::EXPANDED_SHEET;
use crate::types::{CellValue, ExpandedRow};
use calamine::{open_workbook, Data, ExcelDateTime, Range, Reader, Xlsx};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

type XlsxFile = Xlsx<BufReader<File>>;

/// Convert a calamine cell into a `CellValue`.
///
/// Date cells become ISO text (`2024-03-01`, or `2024-03-01 08:30:00` when a
/// time is set) instead of their serial number.
pub fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) if dt.is_datetime() => CellValue::Text(iso_text(dt)),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        other => CellValue::Text(other.to_string()),
    }
}

fn iso_text(dt: &ExcelDateTime) -> String {
    let (year, month, day, hour, minute, second, _) = dt.to_ymd_hms_milli();
    if (hour, minute, second) == (0, 0, 0) {
        format!("{:04}-{:02}-{:02}", year, month, day)
    } else {
        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            year, month, day, hour, minute, second
        )
    }
}

/// Dense, 0-based copy of a worksheet from A1 to its last used cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn from_range(range: &Range<Data>) -> Self {
        let Some((last_row, last_col)) = range.end() else {
            return Self::default();
        };

        let rows = (0..=last_row)
            .map(|row| {
                (0..=last_col)
                    .map(|col| range.get_value((row, col)).map(cell_value).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { rows }
    }

    /// Cell at a 0-based position; anything outside the used area is `Empty`.
    pub fn get(&self, row: usize, col: usize) -> CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or_default()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }
}

/// Open an .xlsx workbook for reading.
pub fn open(path: &Path) -> GrigliaResult<XlsxFile> {
    if !path.exists() {
        return Err(GrigliaError::MissingSourceFile(path.to_path_buf()));
    }
    open_workbook(path).map_err(|e| {
        GrigliaError::Excel(format!("Failed to open {}: {}", path.display(), e))
    })
}

/// Read one sheet, or `None` when the workbook has no sheet of that name.
pub fn read_sheet(path: &Path, sheet: &str) -> GrigliaResult<Option<Grid>> {
    let mut workbook = open(path)?;
    if !workbook.sheet_names().iter().any(|name| name == sheet) {
        return Ok(None);
    }
    let range = workbook.worksheet_range(sheet).map_err(|e| {
        GrigliaError::Excel(format!("Failed to read sheet '{}' in {}: {}", sheet, path.display(), e))
    })?;
    Ok(Some(Grid::from_range(&range)))
}

/// Read back the `Expanded_Mapped` sheet of an expanded workbook.
///
/// Columns are positional, in the order the sheet is written.
pub fn read_expanded(path: &Path) -> GrigliaResult<Vec<ExpandedRow>> {
    let grid = read_sheet(path, EXPANDED_SHEET)?.ok_or_else(|| GrigliaError::MissingSheet {
        path: path.to_path_buf(),
        tried: vec![EXPANDED_SHEET.to_string()],
    })?;
    Ok(grid
        .rows()
        .iter()
        .skip(1)
        .map(|row| row.iter().map(CellValue::to_text).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .map(|cells| ExpandedRow::from_record(&cells))
        .collect())
}

/// A sheet whose first row is a header, read as trimmed text.
#[derive(Debug, Clone, Default)]
pub struct HeaderTable {
    sheet: String,
    columns: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl HeaderTable {
    pub fn from_grid(sheet: &str, grid: &Grid) -> Self {
        let mut columns = HashMap::new();
        let mut rows = Vec::new();

        if let Some((header, body)) = grid.rows().split_first() {
            for (idx, cell) in header.iter().enumerate() {
                let name = cell.to_text();
                if !name.is_empty() {
                    // Duplicate headers keep their first column.
                    columns.entry(name.to_lowercase()).or_insert(idx);
                }
            }
            rows = body
                .iter()
                .map(|row| row.iter().map(CellValue::to_text).collect())
                .collect();
        }

        Self {
            sheet: sheet.to_string(),
            columns,
            rows,
        }
    }

    /// Column index by header name, case-insensitive.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.get(&name.trim().to_lowercase()).copied()
    }

    pub fn require_column(&self, name: &str) -> GrigliaResult<usize> {
        self.column(name).ok_or_else(|| GrigliaError::MissingColumn {
            sheet: self.sheet.clone(),
            column: name.to_string(),
        })
    }

    /// Value of a named column for every row; absent columns read as `""`.
    pub fn values(&self, column: Option<usize>) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |row| {
            column
                .and_then(|idx| row.get(idx))
                .map(String::as_str)
                .unwrap_or("")
        })
    }

    /// Rows with every cell empty are dropped.
    pub fn non_blank_rows(&self) -> impl Iterator<Item = &Vec<String>> {
        self.rows.iter().filter(|row| row.iter().any(|c| !c.is_empty()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
