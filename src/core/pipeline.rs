//! Full run: aggregate → expand → write → synchronize

use crate::config::RunConfig;
use crate::core::synchronizer::{synchronize_with, NoUpdate, SyncStats};
use crate::core::{
    aggregate_with_report, expand_with_report, ProcessedFile, SkippedFile, SyncOutcome,
};
use crate::error::{GrigliaError, GrigliaResult};
use crate::excel::{find_workbooks, reader, write_expanded};
use crate::persist::{WorkbookSink, XlsxSink};
use crate::types::ExpandedRow;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// What happened to the De_Para workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
    /// No translation file was given.
    Skipped,
    NoNewData {
        reason: NoUpdate,
        stats: SyncStats,
    },
    Appended {
        count: usize,
        path: PathBuf,
        fallback: bool,
        stats: SyncStats,
    },
    /// Synchronization aborted; the expanded file is still written.
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input_dir: PathBuf,
    pub output_file: PathBuf,
    pub workbooks: usize,
    pub processed: Vec<ProcessedFile>,
    pub skipped: Vec<SkippedFile>,
    pub rows: usize,
    pub volume_totals: BTreeMap<String, i64>,
    pub sync: SyncStatus,
}

/// Run everything described by `config`.
pub fn run_pipeline(config: &RunConfig) -> GrigliaResult<RunSummary> {
    run_pipeline_with(config, &XlsxSink)
}

/// Input checks are fatal. After that only a failed write of the expanded
/// workbook is; synchronization problems end up in `RunSummary::sync`.
pub fn run_pipeline_with(config: &RunConfig, sink: &dyn WorkbookSink) -> GrigliaResult<RunSummary> {
    config.validate()?;
    let input_dir = config.require_input_dir()?;
    let output_file = config.output_path()?;

    let paths = find_workbooks(input_dir)?;
    if paths.is_empty() {
        return Err(GrigliaError::NoWorkbooks(input_dir.to_path_buf()));
    }
    fs::create_dir_all(config.require_output_dir()?)?;
    info!(workbooks = paths.len(), dir = %input_dir.display(), "starting run");

    let aggregated = aggregate_with_report(&paths, &config.layout)?;
    let expanded = expand_with_report(&paths, &aggregated.aggregate, &config.layout)?;

    write_expanded(&output_file, &expanded.rows)?;
    info!(rows = expanded.rows.len(), path = %output_file.display(), "expanded file saved");

    let sync = match &config.translation_file {
        Some(translation) => sync_status(&expanded.rows, translation, sink),
        None => {
            info!("no De_Para file given, skipping synchronization");
            SyncStatus::Skipped
        }
    };

    Ok(RunSummary {
        input_dir: input_dir.to_path_buf(),
        output_file,
        workbooks: paths.len(),
        processed: expanded.processed,
        skipped: merge_skipped(aggregated.skipped, expanded.skipped),
        rows: expanded.rows.len(),
        volume_totals: aggregated.aggregate.sums(),
        sync,
    })
}

/// Synchronize an already written expanded workbook.
pub fn run_sync(
    expanded_file: &Path,
    translation_file: &Path,
    sink: &dyn WorkbookSink,
) -> GrigliaResult<SyncStatus> {
    let rows = reader::read_expanded(expanded_file)?;
    info!(rows = rows.len(), path = %expanded_file.display(), "loaded expanded rows");
    let outcome = synchronize_with(&rows, translation_file, sink)?;
    Ok(status_of(outcome))
}

fn sync_status(rows: &[ExpandedRow], translation: &Path, sink: &dyn WorkbookSink) -> SyncStatus {
    match synchronize_with(rows, translation, sink) {
        Ok(outcome) => status_of(outcome),
        Err(e) => {
            error!(path = %translation.display(), error = %e, "De_Para synchronization aborted");
            SyncStatus::Failed {
                error: e.to_string(),
            }
        }
    }
}

fn status_of(outcome: SyncOutcome) -> SyncStatus {
    match outcome.persisted {
        Some(persisted) if outcome.no_update.is_none() => SyncStatus::Appended {
            count: outcome.appended.len(),
            fallback: persisted.is_fallback(),
            path: persisted.path().to_path_buf(),
            stats: outcome.stats,
        },
        _ => SyncStatus::NoNewData {
            reason: outcome.no_update.unwrap_or(NoUpdate::AllKnown),
            stats: outcome.stats,
        },
    }
}

/// A workbook failing both passes is reported once.
fn merge_skipped(first: Vec<SkippedFile>, second: Vec<SkippedFile>) -> Vec<SkippedFile> {
    let mut merged = first;
    for skip in second {
        if !merged.iter().any(|s| s.path == skip.path) {
            merged.push(skip);
        }
    }
    merged.sort_by(|a, b| a.path.cmp(&b.path));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skip(path: &str, reason: &str) -> SkippedFile {
        SkippedFile {
            path: PathBuf::from(path),
            reason: reason.to_string(),
        }
    }

    #[test]
    fn test_merge_skipped_reports_each_file_once() {
        let merged = merge_skipped(
            vec![skip("b.xlsx", "no sheet"), skip("c.xlsx", "bad total")],
            vec![skip("b.xlsx", "no sheet"), skip("a.xlsx", "corrupt")],
        );
        let paths: Vec<&Path> = merged.iter().map(|s| s.path.as_path()).collect();
        assert_eq!(paths, vec![Path::new("a.xlsx"), Path::new("b.xlsx"), Path::new("c.xlsx")]);
    }

    #[test]
    fn test_run_requires_input_dir() {
        let err = run_pipeline(&RunConfig::default()).unwrap_err();
        assert!(matches!(err, GrigliaError::Config(_)));
    }
}
