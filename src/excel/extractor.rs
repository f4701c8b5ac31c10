//! Grid worksheet extraction
//!
//! A grid workbook carries one worksheet whose header band encodes the model
//! and its column groups by position:
//!
//! | row | column 4            | columns 4, 5, 6 ...     |
//! |-----|---------------------|-------------------------|
//! | 11  | model name          |                         |
//! | 12  | model code          |                         |
//! | 13  |                     | version                 |
//! | 14  |                     | SINCOM                  |
//! | 15  |                     | volume head             |
//!
//! Columns 1 and 2 of every other row hold the packet and code. The group
//! band ends at the first column whose volume-head cell is empty.

use crate::config::GridLayout;
use crate::error::{GrigliaError, GrigliaResult};
use crate::excel::reader::{self, Grid};
use crate::types::{CellValue, ColumnGroup};
use calamine::Reader;
use std::path::{Path, PathBuf};

pub const MODEL_NAME_ROW: u32 = 11;
pub const MODEL_CODE_ROW: u32 = 12;
pub const VERSION_ROW: u32 = 13;
pub const SINCOM_ROW: u32 = 14;
pub const VOLUME_HEAD_ROW: u32 = 15;

pub const PACKET_COLUMN: u32 = 1;
pub const CODE_COLUMN: u32 = 2;
pub const FIRST_GROUP_COLUMN: u32 = 4;

/// First row scanned for data; rows 12-15 are header rows and never data.
pub const FIRST_DATA_ROW: u32 = 11;

/// The grid worksheet of one source workbook.
#[derive(Debug, Clone)]
pub struct WorksheetHandle {
    path: PathBuf,
    sheet_name: String,
    grid: Grid,
}

impl WorksheetHandle {
    /// Open `path` and load the first sheet from `sheet_names` that exists.
    pub fn open(path: &Path, sheet_names: &[String]) -> GrigliaResult<Self> {
        let mut workbook = reader::open(path)?;
        let available = workbook.sheet_names().to_vec();

        let sheet_name = sheet_names
            .iter()
            .find(|wanted| available.iter().any(|name| name == *wanted))
            .cloned()
            .ok_or_else(|| GrigliaError::MissingSheet {
                path: path.to_path_buf(),
                tried: sheet_names.to_vec(),
            })?;

        let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
            GrigliaError::Excel(format!(
                "Failed to read sheet '{}' in {}: {}",
                sheet_name,
                path.display(),
                e
            ))
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            sheet_name,
            grid: Grid::from_range(&range),
        })
    }

    /// Build a handle over cells already in memory.
    pub fn from_grid(path: impl Into<PathBuf>, sheet_name: &str, grid: Grid) -> Self {
        Self {
            path: path.into(),
            sheet_name: sheet_name.to_string(),
            grid,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Cell at a 1-based worksheet position.
    pub fn cell(&self, row: u32, col: u32) -> CellValue {
        if row == 0 || col == 0 {
            return CellValue::Empty;
        }
        self.grid.get((row - 1) as usize, (col - 1) as usize)
    }

    /// Last worksheet row holding any cell (1-based), 0 for an empty sheet.
    pub fn last_row(&self) -> u32 {
        self.grid.height() as u32
    }

    pub fn model_name(&self) -> String {
        self.cell(MODEL_NAME_ROW, FIRST_GROUP_COLUMN).to_text()
    }

    pub fn model_code(&self) -> String {
        self.cell(MODEL_CODE_ROW, FIRST_GROUP_COLUMN).to_text()
    }

    /// Column groups from column 4 rightwards, up to the first empty volume head.
    pub fn column_groups(&self) -> Vec<ColumnGroup> {
        let model_code = self.model_code();
        let model = self.model_name();

        let mut groups = Vec::new();
        let mut col = FIRST_GROUP_COLUMN;
        loop {
            let volume_head = self.cell(VOLUME_HEAD_ROW, col);
            if volume_head.is_empty() {
                break;
            }
            groups.push(ColumnGroup {
                column: col,
                version: self.cell(VERSION_ROW, col).to_text(),
                volume_head: volume_head.to_text(),
                sincom: self.cell(SINCOM_ROW, col).to_text(),
                model_code: model_code.clone(),
                model: model.clone(),
            });
            col += 1;
        }
        groups
    }

    /// The total-volume cell: row 15 of the rightmost column in the group band.
    ///
    /// `Empty` when the sheet has no column groups.
    pub fn total_volume_cell(&self) -> CellValue {
        match self.column_groups().last() {
            Some(group) => self.cell(VOLUME_HEAD_ROW, group.column),
            None => CellValue::Empty,
        }
    }
}

/// Open the grid worksheet with the default sheet names.
pub fn extract(path: &Path) -> GrigliaResult<WorksheetHandle> {
    extract_with(path, &GridLayout::default())
}

pub fn extract_with(path: &Path, layout: &GridLayout) -> GrigliaResult<WorksheetHandle> {
    WorksheetHandle::open(path, &layout.sheet_names)
}

/// Model code carried by the file name: its first three characters.
pub fn file_model(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.chars().take(3).collect()
}
