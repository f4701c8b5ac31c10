//! Source workbook discovery

use crate::error::{GrigliaError, GrigliaResult};
use std::fs;
use std::path::{Path, PathBuf};

/// `.xlsx` files directly inside `dir`, sorted by file name.
///
/// Office lock files (`~$name.xlsx`) and sub-folders are ignored.
pub fn find_workbooks(dir: &Path) -> GrigliaResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(GrigliaError::MissingSourceFile(dir.to_path_buf()));
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("~$") {
            continue;
        }
        let is_xlsx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
        if is_xlsx {
            found.push(path);
        }
    }

    found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(found)
}
