//! Shared fixtures: grid workbooks and De_Para workbooks built with rust_xlsxwriter

#![allow(dead_code)] // each test binary uses a different subset

use calamine::{open_workbook, Reader, Xlsx};
use griglia::excel::writer::{write_workbook, SheetData};
use griglia::types::CellValue;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

pub const PRIMARY_SHEET: &str = "Griglia Mondo - Volumi";
pub const FALLBACK_SHEET: &str = "Grid World - Volume";

/// A grid workbook laid out like the downloaded "Griglia" files.
///
/// Header band on rows 11-15 from column D, data rows from row 16.
pub struct GridFixture {
    sheet: String,
    model_name: String,
    model_code: String,
    groups: Vec<(String, String, f64)>,
    rows: Vec<(String, String, Vec<String>)>,
    dates: Vec<(usize, usize, ExcelDateTime)>,
    hide_data: bool,
}

impl GridFixture {
    pub fn new(model_code: &str) -> Self {
        Self {
            sheet: PRIMARY_SHEET.to_string(),
            model_name: format!("MODEL {}", model_code),
            model_code: model_code.to_string(),
            groups: Vec::new(),
            rows: Vec::new(),
            dates: Vec::new(),
            hide_data: false,
        }
    }

    pub fn sheet(mut self, name: &str) -> Self {
        self.sheet = name.to_string();
        self
    }

    /// Add a column group; the last group's volume head is the workbook total.
    pub fn group(mut self, version: &str, sincom: &str, volume_head: f64) -> Self {
        self.groups
            .push((version.to_string(), sincom.to_string(), volume_head));
        self
    }

    pub fn row(mut self, packet: &str, code: &str, values: &[&str]) -> Self {
        self.rows.push((
            packet.to_string(),
            code.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        ));
        self
    }

    /// Put a date-formatted cell in data row `row`, group `group` (both 0-based).
    pub fn date(mut self, row: usize, group: usize, ymd: (u16, u8, u8)) -> Self {
        let date = ExcelDateTime::from_ymd(ymd.0, ymd.1, ymd.2).unwrap();
        self.dates.push((row, group, date));
        self
    }

    /// Mark every data row and the group columns hidden.
    pub fn hidden(mut self) -> Self {
        self.hide_data = true;
        self
    }

    pub fn write(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.set_name(&self.sheet).unwrap();

        ws.write_string(0, 0, "Griglia").unwrap();
        ws.write_string(10, 3, &self.model_name).unwrap();
        ws.write_string(11, 3, &self.model_code).unwrap();

        for (i, (version, sincom, head)) in self.groups.iter().enumerate() {
            let col = 3 + i as u16;
            ws.write_string(12, col, version).unwrap();
            if !sincom.is_empty() {
                ws.write_string(13, col, sincom).unwrap();
            }
            ws.write_number(14, col, *head).unwrap();
            if self.hide_data {
                ws.set_column_hidden(col).unwrap();
            }
        }

        for (i, (packet, code, values)) in self.rows.iter().enumerate() {
            let row = 15 + i as u32;
            if !packet.is_empty() {
                ws.write_string(row, 0, packet).unwrap();
            }
            if !code.is_empty() {
                ws.write_string(row, 1, code).unwrap();
            }
            for (j, value) in values.iter().enumerate() {
                if !value.is_empty() {
                    ws.write_string(row, 3 + j as u16, value).unwrap();
                }
            }
            if self.hide_data {
                ws.set_row_hidden(row).unwrap();
            }
        }

        let date_format = Format::new().set_num_format("dd/mm/yyyy");
        for (row, group, date) in &self.dates {
            ws.write_datetime_with_format(15 + *row as u32, 3 + *group as u16, date, &date_format)
                .unwrap();
        }

        workbook.save(&path).unwrap();
        path
    }
}

/// A workbook with a single sheet that is not a grid.
pub fn write_other_workbook(dir: &Path, file_name: &str) -> PathBuf {
    let path = dir.join(file_name);
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name("Summary").unwrap();
    ws.write_string(0, 0, "nothing to see").unwrap();
    workbook.save(&path).unwrap();
    path
}

fn text_row(cells: &[&str]) -> Vec<CellValue> {
    cells
        .iter()
        .map(|c| {
            if c.is_empty() {
                CellValue::Empty
            } else {
                CellValue::from(*c)
            }
        })
        .collect()
}

/// A De_Para workbook: `Coded` with (Italian, English) terms, and optionally
/// an existing `tb_de_para` sheet.
pub fn write_de_para(
    dir: &Path,
    file_name: &str,
    terms: &[(&str, &str)],
    mapping: Option<&[[&str; 6]]>,
) -> PathBuf {
    let path = dir.join(file_name);

    let mut coded = vec![text_row(&["Codice", "Griglia Italiano", "Griglia Inglês"])];
    for (i, (ita, eng)) in terms.iter().enumerate() {
        let mut row = vec![CellValue::Number((i + 1) as f64)];
        row.extend(text_row(&[ita, eng]));
        coded.push(row);
    }
    let mut sheets = vec![SheetData::new("Coded", coded)];

    if let Some(records) = mapping {
        let mut rows = vec![text_row(&[
            "Multivalues",
            "Griglia Italiano",
            "Griglia Inglês",
            "Model",
            "Resp.1",
            "Resp.2",
        ])];
        rows.extend(records.iter().map(|r| text_row(r)));
        sheets.push(SheetData::new("tb_de_para", rows));
    }

    write_workbook(&path, &sheets).unwrap();
    path
}

/// A De_Para workbook whose `Coded` sheet also carries a date column and a
/// formula column, the way the live file does.
pub fn write_formatted_de_para(dir: &Path, file_name: &str, terms: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(file_name);
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name("Coded").unwrap();

    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let date = ExcelDateTime::from_ymd(2024, 3, 1).unwrap();

    for (col, header) in ["Codice", "Griglia Italiano", "Griglia Inglês", "Data", "Etichetta"]
        .iter()
        .enumerate()
    {
        ws.write_string(0, col as u16, *header).unwrap();
    }
    for (i, (ita, eng)) in terms.iter().enumerate() {
        let row = 1 + i as u32;
        ws.write_number(row, 0, (i + 1) as f64).unwrap();
        ws.write_string(row, 1, *ita).unwrap();
        if !eng.is_empty() {
            ws.write_string(row, 2, *eng).unwrap();
        }
        ws.write_datetime_with_format(row, 3, &date, &date_format)
            .unwrap();
        ws.write_formula(row, 4, format!("=B{0}&\"/\"&C{0}", row + 1).as_str())
            .unwrap();
    }

    workbook.save(&path).unwrap();
    path
}

/// Sheet names in workbook order.
pub fn sheet_names(path: &Path) -> Vec<String> {
    let workbook: Xlsx<BufReader<File>> = open_workbook(path).unwrap();
    workbook.sheet_names().to_vec()
}

/// Raw bytes of one part of an .xlsx package.
pub fn package_part(path: &Path, name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    part.read_to_end(&mut bytes).unwrap();
    bytes
}
