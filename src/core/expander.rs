//! Row expansion: grid rows × column groups → flat rows

use crate::config::GridLayout;
use crate::core::{skip_workbook, SkippedFile};
use crate::error::GrigliaResult;
use crate::excel::extractor::{
    CODE_COLUMN, FIRST_DATA_ROW, MODEL_CODE_ROW, PACKET_COLUMN, VOLUME_HEAD_ROW,
};
use crate::excel::{extract_with, file_model, WorksheetHandle};
use crate::types::{ExpandedRow, VolumeAggregate};
use std::path::{Path, PathBuf};
use tracing::info;

/// Expanded rows plus per-file bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct ExpansionReport {
    pub rows: Vec<ExpandedRow>,
    pub processed: Vec<ProcessedFile>,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProcessedFile {
    pub path: PathBuf,
    pub file_model: String,
    pub groups: usize,
    pub data_rows: usize,
    pub rows: usize,
}

/// Expand every workbook, in the given order.
pub fn expand(paths: &[PathBuf], aggregates: &VolumeAggregate) -> GrigliaResult<Vec<ExpandedRow>> {
    Ok(expand_with_report(paths, aggregates, &GridLayout::default())?.rows)
}

pub fn expand_with_report(
    paths: &[PathBuf],
    aggregates: &VolumeAggregate,
    layout: &GridLayout,
) -> GrigliaResult<ExpansionReport> {
    let mut report = ExpansionReport::default();

    for path in paths {
        let model = file_model(path);
        info!(file = %display_name(path), model = %model, "processing workbook");

        let handle = match extract_with(path, layout) {
            Ok(handle) => handle,
            Err(e) => {
                skip_workbook(&mut report.skipped, path, e, "expansion")?;
                continue;
            }
        };

        let (rows, data_rows) = expand_workbook(&handle, &model, aggregates, layout.max_row);
        report.processed.push(ProcessedFile {
            path: path.clone(),
            file_model: model,
            groups: handle.column_groups().len(),
            data_rows,
            rows: rows.len(),
        });
        report.rows.extend(rows);
    }

    Ok(report)
}

/// Cross-join the qualifying rows of one worksheet with its column groups.
///
/// Returns the expanded rows and the number of qualifying data rows. Rows
/// 12-15 are header rows and are never read as data.
pub fn expand_workbook(
    handle: &WorksheetHandle,
    file_model: &str,
    aggregates: &VolumeAggregate,
    max_row: u32,
) -> (Vec<ExpandedRow>, usize) {
    let groups = handle.column_groups();
    let volume_tt = aggregates.total(&handle.model_code()).to_string();
    let last_row = max_row.min(handle.last_row());

    let mut rows = Vec::new();
    let mut data_rows = 0;

    for row in FIRST_DATA_ROW..=last_row {
        if (MODEL_CODE_ROW..=VOLUME_HEAD_ROW).contains(&row) {
            continue;
        }

        let packet = handle.cell(row, PACKET_COLUMN).to_text();
        let code = handle.cell(row, CODE_COLUMN).to_text();
        if packet.is_empty() && code.is_empty() {
            continue;
        }
        data_rows += 1;

        let concat = format!("{}{}", packet, code).trim().to_string();

        for group in &groups {
            let value = handle.cell(row, group.column).to_text();
            rows.push(ExpandedRow {
                packet: packet.clone(),
                code: code.clone(),
                concat: concat.clone(),
                version: group.version.clone(),
                volume_head: group.volume_head.clone(),
                volume: value.clone(),
                volume_tt: volume_tt.clone(),
                sincom: group.sincom.clone(),
                model_code: group.model_code.clone(),
                model: group.model.clone(),
                multivalue: value,
                file_model: file_model.to_string(),
            });
        }
    }

    (rows, data_rows)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
