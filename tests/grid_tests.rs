//! Grid workbook tests: extraction, volume aggregation and row expansion
//! against real .xlsx files

mod common;

use common::{write_other_workbook, GridFixture, FALLBACK_SHEET, PRIMARY_SHEET};
use griglia::config::GridLayout;
use griglia::core::{aggregate, aggregate_with_report, expand, expand_with_report};
use griglia::error::GrigliaError;
use griglia::excel::{extract, file_model, find_workbooks, reader, write_expanded};
use griglia::types::{CellValue, EXPANDED_HEADER};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn model_226() -> GridFixture {
    GridFixture::new("226")
        .group("V1", "S-100", 100.0)
        .group("V2", "S-200", 250.0)
        .row("Leva cambio", "LC", &["XR5", "XR7"])
        .row("Volante", "", &["V-1", ""])
        .row("", "K9", &["12", "13.5"])
}

// ═══════════════════════════════════════════════════════════════════════════
// EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_extract_primary_sheet() {
    let dir = TempDir::new().unwrap();
    let path = model_226().write(dir.path(), "226_Griglia.xlsx");

    let handle = extract(&path).unwrap();
    assert_eq!(handle.sheet_name(), PRIMARY_SHEET);
    assert_eq!(handle.model_name(), "MODEL 226");
    assert_eq!(handle.model_code(), "226");

    let groups = handle.column_groups();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].column, 4);
    assert_eq!(groups[0].version, "V1");
    assert_eq!(groups[0].sincom, "S-100");
    assert_eq!(groups[0].volume_head, "100");
    assert_eq!(groups[1].version, "V2");
    assert_eq!(handle.total_volume_cell(), CellValue::Number(250.0));
}

#[test]
fn test_extract_english_sheet_name() {
    let dir = TempDir::new().unwrap();
    let path = model_226()
        .sheet(FALLBACK_SHEET)
        .write(dir.path(), "226_Grid.xlsx");

    let handle = extract(&path).unwrap();
    assert_eq!(handle.sheet_name(), FALLBACK_SHEET);
    assert_eq!(handle.column_groups().len(), 2);
}

#[test]
fn test_extract_without_grid_sheet() {
    let dir = TempDir::new().unwrap();
    let path = write_other_workbook(dir.path(), "226_other.xlsx");

    let err = extract(&path).unwrap_err();
    assert!(matches!(err, GrigliaError::MissingSheet { .. }));
    assert!(err.is_per_file());
    assert!(err.to_string().contains("Griglia Mondo - Volumi"));
}

#[test]
fn test_extract_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = extract(&dir.path().join("nope.xlsx")).unwrap_err();
    assert!(matches!(err, GrigliaError::MissingSourceFile(_)));
}

#[test]
fn test_hidden_rows_and_columns_are_read() {
    let dir = TempDir::new().unwrap();
    let visible = model_226().write(dir.path(), "226_visible.xlsx");
    let hidden = model_226().hidden().write(dir.path(), "226_hidden.xlsx");

    let totals = aggregate(&[visible.clone()]).unwrap();
    let from_visible = expand(&[visible], &totals).unwrap();
    let from_hidden = expand(&[hidden], &totals).unwrap();

    assert_eq!(from_visible.len(), 6);
    assert_eq!(from_hidden, from_visible);
}

#[test]
fn test_file_model_from_name() {
    assert_eq!(file_model(std::path::Path::new("/tmp/312_Griglia.xlsx")), "312");
    assert_eq!(file_model(std::path::Path::new("ab")), "ab");
}

// ═══════════════════════════════════════════════════════════════════════════
// AGGREGATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_duplicate_totals_count_once() {
    let dir = TempDir::new().unwrap();
    let a = GridFixture::new("226")
        .group("V1", "", 5.0)
        .write(dir.path(), "226_a.xlsx");
    let b = GridFixture::new("226")
        .group("V1", "", 5.0)
        .write(dir.path(), "226_b.xlsx");
    let c = GridFixture::new("226")
        .group("V9", "", 3.0)
        .write(dir.path(), "226_c.xlsx");
    let other = GridFixture::new("312")
        .group("V1", "", 40.0)
        .write(dir.path(), "312_a.xlsx");

    let totals = aggregate(&[a, b, c, other]).unwrap();
    assert_eq!(totals.total("226"), 8);
    assert_eq!(totals.total("312"), 40);
    assert_eq!(totals.total("999"), 0);
}

#[test]
fn test_aggregation_skips_unreadable_workbooks() {
    let dir = TempDir::new().unwrap();
    let good = GridFixture::new("226")
        .group("V1", "", 7.0)
        .write(dir.path(), "226_good.xlsx");
    let no_sheet = write_other_workbook(dir.path(), "226_summary.xlsx");
    let corrupt = dir.path().join("226_corrupt.xlsx");
    fs::write(&corrupt, b"not a zip archive").unwrap();

    let report = aggregate_with_report(
        &[corrupt.clone(), good, no_sheet.clone()],
        &GridLayout::default(),
    )
    .unwrap();
    assert_eq!(report.aggregate.total("226"), 7);
    let skipped: Vec<_> = report.skipped.iter().map(|s| s.path.clone()).collect();
    assert_eq!(skipped, vec![corrupt, no_sheet]);
}

#[test]
fn test_zero_total_is_ignored() {
    let dir = TempDir::new().unwrap();
    let zero = GridFixture::new("226")
        .group("V1", "", 0.0)
        .write(dir.path(), "226_zero.xlsx");

    let totals = aggregate(&[zero]).unwrap();
    assert!(totals.sums().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════
// EXPANSION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_two_groups_three_rows_give_six_rows() {
    let dir = TempDir::new().unwrap();
    let path = model_226().write(dir.path(), "226_Griglia.xlsx");
    let paths = vec![path];

    let totals = aggregate(&paths).unwrap();
    let rows = expand(&paths, &totals).unwrap();

    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r.volume_tt == "250"));
    assert!(rows.iter().all(|r| r.file_model == "226"));
    assert!(rows.iter().all(|r| r.model == "MODEL 226"));

    let first = &rows[0];
    assert_eq!(first.packet, "Leva cambio");
    assert_eq!(first.code, "LC");
    assert_eq!(first.concat, "Leva cambioLC");
    assert_eq!(first.version, "V1");
    assert_eq!(first.sincom, "S-100");
    assert_eq!(first.volume_head, "100");
    assert_eq!(first.volume, "XR5");
    assert_eq!(first.multivalue, "XR5");
    assert_eq!(rows[1].version, "V2");
    assert_eq!(rows[1].multivalue, "XR7");

    // Code-only row: Concat is the code alone, numbers keep their text form.
    assert_eq!(rows[4].concat, "K9");
    assert_eq!(rows[4].multivalue, "12");
    assert_eq!(rows[5].multivalue, "13.5");

    // Empty data cell still produces a row.
    assert_eq!(rows[3].packet, "Volante");
    assert_eq!(rows[3].multivalue, "");
}

#[test]
fn test_date_cells_expand_as_iso_text() {
    let dir = TempDir::new().unwrap();
    let paths = vec![GridFixture::new("226")
        .group("V1", "", 100.0)
        .row("Data consegna", "DC", &["", ""])
        .date(0, 0, (2024, 3, 1))
        .write(dir.path(), "226_dates.xlsx")];

    let rows = expand(&paths, &aggregate(&paths).unwrap()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].volume, "2024-03-01");
    assert_eq!(rows[0].multivalue, "2024-03-01");
}

#[test]
fn test_zero_groups_give_zero_rows() {
    let dir = TempDir::new().unwrap();
    let path = GridFixture::new("226")
        .row("Leva cambio", "LC", &[])
        .write(dir.path(), "226_empty.xlsx");

    let report = expand_with_report(
        &[path],
        &aggregate(&[]).unwrap(),
        &GridLayout::default(),
    )
    .unwrap();
    assert!(report.rows.is_empty());
    assert_eq!(report.processed.len(), 1);
    assert_eq!(report.processed[0].groups, 0);
    assert_eq!(report.processed[0].data_rows, 1);
}

#[test]
fn test_expansion_order_follows_file_name() {
    let dir = TempDir::new().unwrap();
    GridFixture::new("312")
        .group("A", "", 10.0)
        .row("Motore", "M", &["M-1"])
        .write(dir.path(), "312_Griglia.xlsx");
    model_226().write(dir.path(), "226_Griglia.xlsx");
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    fs::write(dir.path().join("~$226_Griglia.xlsx"), "lock").unwrap();

    let paths = find_workbooks(dir.path()).unwrap();
    assert_eq!(paths.len(), 2);

    let totals = aggregate(&paths).unwrap();
    let first = expand(&paths, &totals).unwrap();
    let second = expand(&paths, &totals).unwrap();
    assert_eq!(first, second);

    let models: Vec<&str> = first.iter().map(|r| r.file_model.as_str()).collect();
    assert_eq!(models, vec!["226", "226", "226", "226", "226", "226", "312"]);
    assert_eq!(first[6].volume_tt, "10");
}

#[test]
fn test_expanded_workbook_round_trip() {
    let dir = TempDir::new().unwrap();
    let paths = vec![model_226().write(dir.path(), "226_Griglia.xlsx")];
    let rows = expand(&paths, &aggregate(&paths).unwrap()).unwrap();

    let output = dir.path().join("out").join("Expanded_Mapped_File.xlsx");
    write_expanded(&output, &rows).unwrap();

    let grid = reader::read_sheet(&output, "Expanded_Mapped").unwrap().unwrap();
    let header: Vec<String> = grid.rows()[0].iter().map(|c| c.to_text()).collect();
    assert_eq!(header, EXPANDED_HEADER.to_vec());
    assert_eq!(grid.height(), 7);

    assert_eq!(reader::read_expanded(&output).unwrap(), rows);
}
