use std::path::PathBuf;
use thiserror::Error;

pub type GrigliaResult<T> = Result<T, GrigliaError>;

#[derive(Error, Debug)]
pub enum GrigliaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Excel read error: {0}")]
    Excel(String),

    #[error("Excel write error: {0}")]
    Export(String),

    #[error("Workbook package error: {0}")]
    Package(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Per-workbook: neither grid sheet name exists.
    #[error("{}: no worksheet named {}", .path.display(), .tried.join(" or "))]
    MissingSheet { path: PathBuf, tried: Vec<String> },

    #[error("No .xlsx workbooks found in {}", .0.display())]
    NoWorkbooks(PathBuf),

    #[error("File not found: {}", .0.display())]
    MissingSourceFile(PathBuf),

    #[error("{}: sheet '{sheet}' not found", .path.display())]
    MissingTranslationSheet { path: PathBuf, sheet: String },

    #[error("Sheet '{sheet}' has no column '{column}'")]
    MissingColumn { sheet: String, column: String },

    #[error("{}: total volume '{value}' is not a number", .path.display())]
    InvalidTotal { path: PathBuf, value: String },

    #[error("Cannot write {}: {reason}", .path.display())]
    WriteConflict { path: PathBuf, reason: String },
}

impl GrigliaError {
    /// Errors that only cost the current workbook, not the run.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            GrigliaError::MissingSheet { .. }
                | GrigliaError::InvalidTotal { .. }
                | GrigliaError::MissingSourceFile(_)
                | GrigliaError::Excel(_)
        )
    }
}
