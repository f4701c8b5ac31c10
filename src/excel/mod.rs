//! Excel input/output
//!
//! - Read: grid workbooks and De_Para sheets through calamine
//! - Write: new workbooks through rust_xlsxwriter
//! - Patch: one sheet of an existing workbook, at the zip/XML level

pub mod discovery;
pub mod extractor;
pub mod package;
pub mod reader;
pub mod writer;

pub use discovery::find_workbooks;
pub use extractor::{extract, extract_with, file_model, WorksheetHandle};
pub use reader::{Grid, HeaderTable};
pub use writer::{write_expanded, write_workbook, SheetData, EXPANDED_SHEET, MAPPING_SHEET};
