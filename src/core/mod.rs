//! Expansion and synchronization engine

pub mod aggregator;
pub mod expander;
pub mod pipeline;
pub mod synchronizer;

pub use aggregator::{aggregate, aggregate_with_report, AggregateReport};
pub use expander::{expand, expand_with_report, ExpansionReport, ProcessedFile};
pub use pipeline::{run_pipeline, run_pipeline_with, run_sync, RunSummary, SyncStatus};
pub use synchronizer::{synchronize, synchronize_with, SyncOutcome, SyncPlan};

use crate::error::{GrigliaError, GrigliaResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A workbook left out of a pass, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

impl SkippedFile {
    pub fn new(path: &Path, error: &GrigliaError) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: error.to_string(),
        }
    }
}

/// Leave a workbook out of a pass when `error` only concerns that workbook;
/// any other error ends the pass.
pub(crate) fn skip_workbook(
    skipped: &mut Vec<SkippedFile>,
    path: &Path,
    error: GrigliaError,
    stage: &str,
) -> GrigliaResult<()> {
    if !error.is_per_file() {
        return Err(error);
    }
    warn!(path = %path.display(), error = %error, stage, "skipping workbook");
    skipped.push(SkippedFile::new(path, &error));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workbook_level_error_is_recorded() {
        let mut skipped = Vec::new();
        let err = GrigliaError::InvalidTotal {
            path: PathBuf::from("226.xlsx"),
            value: "TOTAL".to_string(),
        };
        skip_workbook(&mut skipped, Path::new("226.xlsx"), err, "aggregation").unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].path, PathBuf::from("226.xlsx"));
        assert!(skipped[0].reason.contains("TOTAL"));
    }

    #[test]
    fn test_other_errors_end_the_pass() {
        let mut skipped = Vec::new();
        let err = GrigliaError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "output folder is read-only",
        ));
        let result = skip_workbook(&mut skipped, Path::new("226.xlsx"), err, "expansion");
        assert!(matches!(result, Err(GrigliaError::Io(_))));
        assert!(skipped.is_empty());
    }
}
