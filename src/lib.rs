//! Griglia - grid workbook expansion and De_Para synchronization
//!
//! Reads a folder of "Griglia Mondo - Volumi" workbooks, flattens each grid
//! into one row per (data row, column group), and keeps the bilingual
//! `tb_de_para` mapping sheet up to date with the codes found.
//!
//! # Pipeline
//!
//! 1. Volume aggregation: distinct total volumes summed per model code
//! 2. Row expansion: every qualifying row × every column group
//! 3. `Expanded_Mapped` workbook written to the output folder
//! 4. Synchronization: new codes matched against the `Coded` sheet and
//!    appended to `tb_de_para`, with a fallback file if the workbook is locked
//!
//! # Example
//!
//! ```no_run
//! use griglia::core::{aggregate, expand, synchronize};
//! use griglia::excel::{find_workbooks, write_expanded};
//! use std::path::Path;
//!
//! let paths = find_workbooks(Path::new("downloads"))?;
//! let totals = aggregate(&paths)?;
//! let rows = expand(&paths, &totals)?;
//! write_expanded(Path::new("out/Expanded_Mapped_File.xlsx"), &rows)?;
//!
//! let outcome = synchronize(&rows, Path::new("De_Para.xlsx"))?;
//! println!("Appended {} rows", outcome.appended_count());
//! # Ok::<(), griglia::error::GrigliaError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod persist;
pub mod types;

// Re-export commonly used types
pub use error::{GrigliaError, GrigliaResult};
pub use types::{CellValue, ColumnGroup, ExpandedRow, MappingRecord, MappingTable, VolumeAggregate};
