//! Writing the mapping sheet back, with a fallback target
//!
//! The live De_Para workbook is often open in Excel while a run happens. The
//! `tb_de_para` sheet is replaced in place when possible, leaving every other
//! sheet of the workbook untouched; otherwise the rows appended by this run go
//! to `<stem>_updated_tb_de_para.xlsx` next to it.

use crate::error::{GrigliaError, GrigliaResult};
use crate::excel::package;
use crate::excel::writer::{self, mapping_sheet, SheetData};
use crate::types::{MappingRecord, MappingTable};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where workbooks get stored.
pub trait WorkbookSink {
    /// Store `sheets` as a new workbook at `path`.
    fn write(&self, path: &Path, sheets: &[SheetData]) -> GrigliaResult<()>;

    /// Replace (or add) one sheet of the existing workbook at `path`.
    fn replace_sheet(&self, path: &Path, sheet: &SheetData) -> GrigliaResult<()>;
}

/// Writes real .xlsx files: first to a scratch file beside the target, then
/// renamed over it, so a failed write never leaves a truncated workbook.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxSink;

impl WorkbookSink for XlsxSink {
    fn write(&self, path: &Path, sheets: &[SheetData]) -> GrigliaResult<()> {
        through_scratch(path, |scratch| writer::write_workbook(scratch, sheets))
    }

    fn replace_sheet(&self, path: &Path, sheet: &SheetData) -> GrigliaResult<()> {
        through_scratch(path, |scratch| package::replace_sheet(path, scratch, sheet))
    }
}

fn through_scratch<F>(path: &Path, write: F) -> GrigliaResult<()>
where
    F: FnOnce(&Path) -> GrigliaResult<()>,
{
    let scratch = scratch_path(path);
    if let Err(e) = write(&scratch) {
        let _ = fs::remove_file(&scratch);
        return Err(e);
    }
    fs::rename(&scratch, path).map_err(|e| {
        let _ = fs::remove_file(&scratch);
        GrigliaError::WriteConflict {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
    })
}

fn scratch_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.griglia-tmp.xlsx", stem))
}

/// Where the mapping table ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum PersistOutcome {
    /// `tb_de_para` was replaced inside the live workbook.
    Primary { path: PathBuf },
    /// The live workbook could not be written; the appended rows are in `path`.
    Fallback { path: PathBuf, reason: String },
}

impl PersistOutcome {
    pub fn path(&self) -> &Path {
        match self {
            PersistOutcome::Primary { path } | PersistOutcome::Fallback { path, .. } => path,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PersistOutcome::Fallback { .. })
    }
}

/// `De_Para.xlsx` → `De_Para_updated_tb_de_para.xlsx` in the same folder.
pub fn fallback_path(target: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "De_Para".to_string());
    target.with_file_name(format!("{}_updated_tb_de_para.xlsx", stem))
}

/// Persist `table` into `target` as real .xlsx files.
pub fn persist(
    table: &MappingTable,
    appended: &[MappingRecord],
    target: &Path,
) -> GrigliaResult<PersistOutcome> {
    persist_with(table, appended, target, &XlsxSink)
}

/// Replace the `tb_de_para` sheet of `target` with the whole `table`. When
/// that fails, only `appended` is written to a sibling file.
///
/// Only a failure of the fallback write is an error.
pub fn persist_with(
    table: &MappingTable,
    appended: &[MappingRecord],
    target: &Path,
    sink: &dyn WorkbookSink,
) -> GrigliaResult<PersistOutcome> {
    match sink.replace_sheet(target, &mapping_sheet(table)) {
        Ok(()) => {
            info!(path = %target.display(), rows = table.len(), "tb_de_para updated in place");
            Ok(PersistOutcome::Primary {
                path: target.to_path_buf(),
            })
        }
        Err(e) => {
            let fallback = fallback_path(target);
            warn!(
                path = %target.display(),
                error = %e,
                fallback = %fallback.display(),
                rows = appended.len(),
                "could not update the De_Para workbook, writing appended rows to fallback file"
            );
            let new_rows = MappingTable::new(appended.to_vec());
            sink.write(&fallback, &[mapping_sheet(&new_rows)])?;
            Ok(PersistOutcome::Fallback {
                path: fallback,
                reason: e.to_string(),
            })
        }
    }
}
