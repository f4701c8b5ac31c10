//! De_Para synchronization
//!
//! Reconciles the expanded rows with the bilingual `Coded` sheet and appends
//! the codes not yet recorded to `tb_de_para`. The pass is idempotent: every
//! appended Multivalue lands in Resp.1 or Resp.2, and values already present
//! there are filtered out on the next run.
//!
//! Values are compared in normalized form (trimmed, lowercase) throughout.

use crate::error::{GrigliaError, GrigliaResult};
use crate::excel::reader::{self, HeaderTable};
use crate::excel::MAPPING_SHEET;
use crate::persist::{persist_with, PersistOutcome, WorkbookSink, XlsxSink};
use crate::types::{ExpandedRow, MappingRecord, MappingTable, TranslationEntry};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use tracing::info;

pub const TRANSLATION_SHEET: &str = "Coded";
pub const ITALIAN_COLUMN: &str = "Griglia Italiano";
pub const ENGLISH_COLUMN: &str = "Griglia Inglês";

pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

//==============================================================================
// Loading
//==============================================================================

/// Read the `Coded` sheet: distinct (Italian, English) pairs, rows with
/// neither term dropped.
pub fn load_translations(path: &Path) -> GrigliaResult<Vec<TranslationEntry>> {
    if !path.is_file() {
        return Err(GrigliaError::MissingSourceFile(path.to_path_buf()));
    }
    let grid = reader::read_sheet(path, TRANSLATION_SHEET)?.ok_or_else(|| {
        GrigliaError::MissingTranslationSheet {
            path: path.to_path_buf(),
            sheet: TRANSLATION_SHEET.to_string(),
        }
    })?;
    translations_from_table(&HeaderTable::from_grid(TRANSLATION_SHEET, &grid))
}

pub fn translations_from_table(table: &HeaderTable) -> GrigliaResult<Vec<TranslationEntry>> {
    let italian = table.require_column(ITALIAN_COLUMN)?;
    let english = table.require_column(ENGLISH_COLUMN)?;

    let mut seen = HashSet::new();
    let entries = table
        .values(Some(italian))
        .zip(table.values(Some(english)))
        .filter(|(ita, eng)| !ita.is_empty() || !eng.is_empty())
        .map(|(ita, eng)| TranslationEntry {
            italian: ita.to_string(),
            english: eng.to_string(),
        })
        .filter(|entry| seen.insert(entry.clone()))
        .collect();
    Ok(entries)
}

/// Read `tb_de_para`; a workbook without it starts from an empty table.
pub fn load_mapping_table(path: &Path) -> GrigliaResult<MappingTable> {
    match reader::read_sheet(path, MAPPING_SHEET)? {
        Some(grid) => Ok(mapping_from_table(&HeaderTable::from_grid(MAPPING_SHEET, &grid))),
        None => {
            info!(path = %path.display(), "sheet 'tb_de_para' not found, a new one will be created");
            Ok(MappingTable::default())
        }
    }
}

/// Columns are matched by header name; a missing column reads as empty.
pub fn mapping_from_table(table: &HeaderTable) -> MappingTable {
    let col = |name: &str| table.column(name);
    let [mv, ita, eng, model, resp1, resp2] = [
        col("Multivalues"),
        col(ITALIAN_COLUMN),
        col(ENGLISH_COLUMN),
        col("Model"),
        col("Resp.1"),
        col("Resp.2"),
    ];
    let cell = |row: &Vec<String>, idx: Option<usize>| {
        idx.and_then(|i| row.get(i)).cloned().unwrap_or_default()
    };

    let records = table
        .non_blank_rows()
        .map(|row| MappingRecord {
            multivalue: cell(row, mv),
            italian: cell(row, ita),
            english: cell(row, eng),
            model: cell(row, model),
            resp1: cell(row, resp1),
            resp2: cell(row, resp2),
        })
        .collect();
    MappingTable::new(records)
}

//==============================================================================
// Planning
//==============================================================================

/// Why a pass appended nothing. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoUpdate {
    /// No Packet matched an Italian or English term.
    NoMatchingPackets,
    /// Every matching Multivalue is already a Resp.1/Resp.2 value.
    NoNewValues,
    /// New values exist but none joined with the `Coded` sheet.
    NoTranslationMatch,
    /// All grouped records had blank responses.
    NoResponses,
    /// All records were suppressed as already known.
    AllKnown,
}

impl fmt::Display for NoUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            NoUpdate::NoMatchingPackets => "no rows matched a 'Coded' term",
            NoUpdate::NoNewValues => "no new values were found to add",
            NoUpdate::NoTranslationMatch => {
                "new values found, but they did not match any entry in the 'Coded' sheet"
            }
            NoUpdate::NoResponses => "no candidate record had a response",
            NoUpdate::AllKnown => "all generated records already exist",
        };
        f.write_str(msg)
    }
}

/// Row counts after each stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub input_rows: usize,
    pub matching_rows: usize,
    pub new_rows: usize,
    pub candidates: usize,
    pub grouped: usize,
    pub with_response: usize,
    pub appended: usize,
}

/// Records to append, computed without touching any file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub records: Vec<MappingRecord>,
    pub stats: SyncStats,
    pub no_update: Option<NoUpdate>,
}

impl SyncPlan {
    fn nothing(stats: SyncStats, reason: NoUpdate) -> Self {
        info!(%reason, "no update to tb_de_para");
        Self {
            records: Vec::new(),
            stats,
            no_update: Some(reason),
        }
    }
}

type GroupKey = (String, String, String, String);

/// Compute the records to append to `existing`.
pub fn plan(
    rows: &[ExpandedRow],
    translations: &[TranslationEntry],
    existing: &MappingTable,
) -> SyncPlan {
    let mut stats = SyncStats {
        input_rows: rows.len(),
        ..Default::default()
    };

    let existing_values: HashSet<String> = existing
        .responses()
        .map(normalize)
        .filter(|v| !v.is_empty())
        .collect();

    let by_italian = index_terms(translations, |t| &t.italian);
    let by_english = index_terms(translations, |t| &t.english);

    // Only rows whose Packet is a known term in either language.
    let matching: Vec<&ExpandedRow> = rows
        .iter()
        .filter(|row| {
            let packet = normalize(&row.packet);
            by_italian.contains_key(&packet) || by_english.contains_key(&packet)
        })
        .collect();
    stats.matching_rows = matching.len();
    info!(kept = matching.len(), of = rows.len(), "rows matching a 'Coded' term");
    if matching.is_empty() {
        return SyncPlan::nothing(stats, NoUpdate::NoMatchingPackets);
    }

    let fresh: Vec<&ExpandedRow> = matching
        .into_iter()
        .filter(|row| !existing_values.contains(&normalize(&row.multivalue)))
        .collect();
    stats.new_rows = fresh.len();
    if fresh.is_empty() {
        return SyncPlan::nothing(stats, NoUpdate::NoNewValues);
    }
    let unique: HashSet<&str> = fresh.iter().map(|r| r.multivalue.as_str()).collect();
    info!(values = unique.len(), "new unique values to process");

    // Italian matches answer Resp.1, English matches answer Resp.2.
    let mut candidates = Vec::new();
    for (index, italian_side) in [(&by_italian, true), (&by_english, false)] {
        for row in &fresh {
            let Some(entries) = index.get(&normalize(&row.packet)) else {
                continue;
            };
            for entry in entries {
                let (resp1, resp2) = if italian_side {
                    (row.multivalue.clone(), String::new())
                } else {
                    (String::new(), row.multivalue.clone())
                };
                candidates.push(MappingRecord {
                    multivalue: row.multivalue.clone(),
                    italian: entry.italian.clone(),
                    english: entry.english.clone(),
                    model: row.file_model.clone(),
                    resp1,
                    resp2,
                });
            }
        }
    }
    stats.candidates = candidates.len();
    if candidates.is_empty() {
        return SyncPlan::nothing(stats, NoUpdate::NoTranslationMatch);
    }

    // One record per (Multivalue, Italian, English, model), first non-blank
    // response of each side. Groups iterate in key order.
    let mut groups: BTreeMap<GroupKey, (String, String)> = BTreeMap::new();
    for c in candidates {
        let key = (c.multivalue, c.italian, c.english, c.model);
        let slot = groups.entry(key).or_default();
        if slot.0.is_empty() {
            slot.0 = c.resp1.trim().to_string();
        }
        if slot.1.is_empty() {
            slot.1 = c.resp2.trim().to_string();
        }
    }
    stats.grouped = groups.len();

    let mut records: Vec<MappingRecord> = groups
        .into_iter()
        .map(|((multivalue, italian, english, model), (resp1, resp2))| MappingRecord {
            multivalue,
            italian,
            english,
            model,
            resp1,
            resp2,
        })
        .filter(MappingRecord::has_response)
        .collect();
    stats.with_response = records.len();
    if records.is_empty() {
        return SyncPlan::nothing(stats, NoUpdate::NoResponses);
    }
    info!(records = records.len(), "records generated before final check");

    // A Resp.1 containing any recorded value counts as already known.
    records.retain(|rec| {
        let resp1 = normalize(&rec.resp1);
        !existing_values.iter().any(|known| resp1.contains(known.as_str()))
    });

    let mut seen = HashSet::new();
    records.retain(|rec| seen.insert(rec.multivalue.clone()));

    stats.appended = records.len();
    if records.is_empty() {
        return SyncPlan::nothing(stats, NoUpdate::AllKnown);
    }
    info!(records = records.len(), of = stats.with_response, "records are truly new");

    SyncPlan {
        records,
        stats,
        no_update: None,
    }
}

fn index_terms<'a, F>(translations: &'a [TranslationEntry], term: F) -> HashMap<String, Vec<&'a TranslationEntry>>
where
    F: Fn(&'a TranslationEntry) -> &'a String,
{
    let mut index: HashMap<String, Vec<&TranslationEntry>> = HashMap::new();
    for entry in translations {
        let key = normalize(term(entry));
        if !key.is_empty() {
            index.entry(key).or_default().push(entry);
        }
    }
    index
}

//==============================================================================
// Synchronization
//==============================================================================

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Prior rows followed by the appended ones.
    pub table: MappingTable,
    pub appended: Vec<MappingRecord>,
    pub stats: SyncStats,
    pub no_update: Option<NoUpdate>,
    /// `None` when nothing was written.
    pub persisted: Option<PersistOutcome>,
}

impl SyncOutcome {
    pub fn appended_count(&self) -> usize {
        self.appended.len()
    }
}

/// Synchronize `rows` into the De_Para workbook at `translation_file`.
pub fn synchronize(rows: &[ExpandedRow], translation_file: &Path) -> GrigliaResult<SyncOutcome> {
    synchronize_with(rows, translation_file, &XlsxSink)
}

/// Loading failures are fatal; everything after loading only narrows the
/// result, and a failed in-place write falls back to a sibling file.
pub fn synchronize_with(
    rows: &[ExpandedRow],
    translation_file: &Path,
    sink: &dyn WorkbookSink,
) -> GrigliaResult<SyncOutcome> {
    let translations = load_translations(translation_file)?;
    let mut table = load_mapping_table(translation_file)?;
    info!(
        terms = translations.len(),
        existing = table.len(),
        "loaded De_Para workbook"
    );

    let SyncPlan {
        records,
        stats,
        no_update,
    } = plan(rows, &translations, &table);

    if no_update.is_some() {
        return Ok(SyncOutcome {
            table,
            appended: Vec::new(),
            stats,
            no_update,
            persisted: None,
        });
    }

    table.records.extend(records.iter().cloned());
    let persisted = persist_with(&table, &records, translation_file, sink)?;

    Ok(SyncOutcome {
        table,
        appended: records,
        stats,
        no_update: None,
        persisted: Some(persisted),
    })
}
