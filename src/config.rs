//! Run configuration
//!
//! Everything can be given on the command line; a YAML file (`griglia.yaml`)
//! saves retyping folders between runs. Command-line values win.
//!
//! ```yaml
//! input_dir: downloads/griglie
//! translation_file: De_Para.xlsx
//! output_dir: out
//! layout:
//!   sheet_names: ["Griglia Mondo - Volumi", "Grid World - Volume"]
//!   max_row: 10000
//! ```

use crate::error::{GrigliaError, GrigliaResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default name of the expanded workbook inside the output folder.
pub const DEFAULT_OUTPUT_FILE: &str = "Expanded_Mapped_File.xlsx";

/// Grid sheet names, primary first.
pub const DEFAULT_SHEET_NAMES: [&str; 2] = ["Griglia Mondo - Volumi", "Grid World - Volume"];

/// Last worksheet row scanned for data.
pub const DEFAULT_MAX_ROW: u32 = 10_000;

/// Where the grid lives inside each source workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    /// Candidate worksheet names, tried in order.
    pub sheet_names: Vec<String>,
    /// Inclusive upper bound of the data rows (1-based).
    pub max_row: u32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            sheet_names: DEFAULT_SHEET_NAMES.iter().map(|s| s.to_string()).collect(),
            max_row: DEFAULT_MAX_ROW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub input_dir: Option<PathBuf>,
    pub translation_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub output_file_name: String,
    pub layout: GridLayout,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            translation_file: None,
            output_dir: None,
            output_file_name: DEFAULT_OUTPUT_FILE.to_string(),
            layout: GridLayout::default(),
        }
    }
}

impl RunConfig {
    /// Load a YAML configuration file.
    pub fn load(path: &Path) -> GrigliaResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GrigliaError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: RunConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay command-line values on top of this configuration.
    pub fn with_overrides(
        mut self,
        input_dir: Option<PathBuf>,
        output_dir: Option<PathBuf>,
        translation_file: Option<PathBuf>,
    ) -> Self {
        if input_dir.is_some() {
            self.input_dir = input_dir;
        }
        if output_dir.is_some() {
            self.output_dir = output_dir;
        }
        if translation_file.is_some() {
            self.translation_file = translation_file;
        }
        self
    }

    pub fn validate(&self) -> GrigliaResult<()> {
        if self.layout.sheet_names.is_empty() {
            return Err(GrigliaError::Config(
                "layout.sheet_names must name at least one worksheet".to_string(),
            ));
        }
        if self.layout.max_row < 16 {
            return Err(GrigliaError::Config(format!(
                "layout.max_row must be at least 16 (got {})",
                self.layout.max_row
            )));
        }
        if self.output_file_name.trim().is_empty() {
            return Err(GrigliaError::Config("output_file_name is empty".to_string()));
        }
        Ok(())
    }

    pub fn require_input_dir(&self) -> GrigliaResult<&Path> {
        self.input_dir
            .as_deref()
            .ok_or_else(|| GrigliaError::Config("no input folder given".to_string()))
    }

    pub fn require_output_dir(&self) -> GrigliaResult<&Path> {
        self.output_dir
            .as_deref()
            .ok_or_else(|| GrigliaError::Config("no output folder given".to_string()))
    }

    /// Full path of the expanded workbook.
    pub fn output_path(&self) -> GrigliaResult<PathBuf> {
        Ok(self.require_output_dir()?.join(&self.output_file_name))
    }
}
