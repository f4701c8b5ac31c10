//! Per-model total volume aggregation
//!
//! Runs over every workbook before expansion: each expanded row carries the
//! sum of the distinct totals of its model, so the whole folder has to be seen
//! first.

use crate::config::GridLayout;
use crate::core::{skip_workbook, SkippedFile};
use crate::error::{GrigliaError, GrigliaResult};
use crate::excel::{extract_with, WorksheetHandle};
use crate::types::VolumeAggregate;
use std::path::PathBuf;
use tracing::debug;

/// Aggregate plus the workbooks that could not be read.
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    pub aggregate: VolumeAggregate,
    pub skipped: Vec<SkippedFile>,
}

/// Sum of distinct total volumes per model code. Unreadable workbooks are
/// logged and left out.
pub fn aggregate(paths: &[PathBuf]) -> GrigliaResult<VolumeAggregate> {
    Ok(aggregate_with_report(paths, &GridLayout::default())?.aggregate)
}

pub fn aggregate_with_report(
    paths: &[PathBuf],
    layout: &GridLayout,
) -> GrigliaResult<AggregateReport> {
    let mut report = AggregateReport::default();

    for path in paths {
        let outcome = extract_with(path, layout).and_then(|handle| workbook_total(&handle));
        match outcome {
            Ok(Some((model_code, total))) => {
                debug!(path = %path.display(), model = %model_code, total, "total volume");
                report.aggregate.insert(model_code, total);
            }
            Ok(None) => {
                debug!(path = %path.display(), "no total volume");
            }
            Err(e) => skip_workbook(&mut report.skipped, path, e, "volume aggregation")?,
        }
    }

    Ok(report)
}

/// The (model code, total) pair of one workbook.
///
/// `None` when the total cell is empty or zero. A total that is not a number
/// is an error for this workbook.
pub fn workbook_total(handle: &WorksheetHandle) -> GrigliaResult<Option<(String, i64)>> {
    let cell = handle.total_volume_cell();
    if cell.is_empty() {
        return Ok(None);
    }

    let total = cell.as_integer().ok_or_else(|| GrigliaError::InvalidTotal {
        path: handle.path().to_path_buf(),
        value: cell.to_text(),
    })?;

    if total == 0 {
        return Ok(None);
    }
    Ok(Some((handle.model_code(), total)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::Grid;
    use crate::types::CellValue;

    fn handle(model_code: &str, heads: &[CellValue]) -> WorksheetHandle {
        let mut rows = vec![vec![CellValue::Empty; 3 + heads.len()]; 15];
        rows[11][3] = CellValue::from(model_code);
        for (i, head) in heads.iter().enumerate() {
            rows[14][3 + i] = head.clone();
        }
        WorksheetHandle::from_grid("x.xlsx", "Grid World - Volume", Grid::from_rows(rows))
    }

    #[test]
    fn test_total_is_last_group_head() {
        let h = handle("226", &[100.0.into(), 250.0.into()]);
        assert_eq!(workbook_total(&h).unwrap(), Some(("226".to_string(), 250)));
    }

    #[test]
    fn test_zero_or_missing_total_is_ignored() {
        assert_eq!(workbook_total(&handle("226", &[0.0.into()])).unwrap(), None);
        assert_eq!(workbook_total(&handle("226", &[])).unwrap(), None);
    }

    #[test]
    fn test_text_total_is_rejected() {
        let err = workbook_total(&handle("226", &["TOTAL".into()])).unwrap_err();
        assert!(matches!(err, GrigliaError::InvalidTotal { .. }));
    }
}
