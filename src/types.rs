use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

//==============================================================================
// Cell values
//==============================================================================

/// A worksheet cell as the engine sees it.
///
/// Booleans, dates and error cells arrive as `Text` in their displayed form;
/// only plain numbers stay numeric.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Trimmed text form. `Empty` becomes `""`, integral numbers lose the `.0`.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => format_number(*n),
        }
    }

    /// True for `Empty` and for text that is blank after trimming.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Integer coercion used for total-volume cells.
    ///
    /// Fractions are truncated toward zero. Returns `None` for empty cells and
    /// for text that is not a number.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            CellValue::Number(_) => None,
            CellValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

//==============================================================================
// Grid layout
//==============================================================================

/// One metadata column of a grid worksheet header band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroup {
    /// 1-based worksheet column.
    pub column: u32,
    pub version: String,
    pub volume_head: String,
    pub sincom: String,
    pub model_code: String,
    pub model: String,
}

//==============================================================================
// Expanded rows
//==============================================================================

/// Header of the `Expanded_Mapped` sheet. `Concat` appears twice on purpose.
pub const EXPANDED_HEADER: [&str; 13] = [
    "Packet",
    "Code",
    "Concat",
    "Version",
    "Volume Head",
    "Volume",
    "Volume TT",
    "SINCOM",
    "Model code",
    "Model",
    "Concat",
    "Multivalues",
    "File_Model",
];

/// One flattened (data row, column group) pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ExpandedRow {
    pub packet: String,
    pub code: String,
    pub concat: String,
    pub version: String,
    pub volume_head: String,
    pub volume: String,
    pub volume_tt: String,
    pub sincom: String,
    pub model_code: String,
    pub model: String,
    pub multivalue: String,
    pub file_model: String,
}

impl ExpandedRow {
    /// Cells in `EXPANDED_HEADER` order.
    pub fn to_record(&self) -> [&str; 13] {
        [
            self.packet.as_str(),
            self.code.as_str(),
            self.concat.as_str(),
            self.version.as_str(),
            self.volume_head.as_str(),
            self.volume.as_str(),
            self.volume_tt.as_str(),
            self.sincom.as_str(),
            self.model_code.as_str(),
            self.model.as_str(),
            self.concat.as_str(),
            self.multivalue.as_str(),
            self.file_model.as_str(),
        ]
    }

    /// Rebuild a row from cells in `EXPANDED_HEADER` order. Missing trailing
    /// cells read as empty.
    pub fn from_record(cells: &[String]) -> Self {
        let cell = |i: usize| cells.get(i).cloned().unwrap_or_default();
        Self {
            packet: cell(0),
            code: cell(1),
            concat: cell(2),
            version: cell(3),
            volume_head: cell(4),
            volume: cell(5),
            volume_tt: cell(6),
            sincom: cell(7),
            model_code: cell(8),
            model: cell(9),
            multivalue: cell(11),
            file_model: cell(12),
        }
    }
}

//==============================================================================
// Volume aggregate
//==============================================================================

/// Distinct total-volume values per model code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeAggregate {
    totals: BTreeMap<String, BTreeSet<i64>>,
}

impl VolumeAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one total. Repeating a value for the same model is a no-op.
    pub fn insert(&mut self, model_code: impl Into<String>, total: i64) {
        self.totals.entry(model_code.into()).or_default().insert(total);
    }

    /// Sum of the distinct totals for a model, 0 when the model is unknown.
    pub fn total(&self, model_code: &str) -> i64 {
        self.totals
            .get(model_code)
            .map(|set| set.iter().sum())
            .unwrap_or(0)
    }

    pub fn sums(&self) -> BTreeMap<String, i64> {
        self.totals
            .keys()
            .map(|model| (model.clone(), self.total(model)))
            .collect()
    }
}

//==============================================================================
// De_Para tables
//==============================================================================

/// A row of the `Coded` sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationEntry {
    pub italian: String,
    pub english: String,
}

/// Header of the `tb_de_para` sheet.
pub const MAPPING_HEADER: [&str; 6] = [
    "Multivalues",
    "Griglia Italiano",
    "Griglia Inglês",
    "Model",
    "Resp.1",
    "Resp.2",
];

/// A row of the `tb_de_para` sheet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MappingRecord {
    pub multivalue: String,
    pub italian: String,
    pub english: String,
    pub model: String,
    pub resp1: String,
    pub resp2: String,
}

impl MappingRecord {
    pub fn to_record(&self) -> [&str; 6] {
        [
            self.multivalue.as_str(),
            self.italian.as_str(),
            self.english.as_str(),
            self.model.as_str(),
            self.resp1.as_str(),
            self.resp2.as_str(),
        ]
    }

    /// At least one response is non-blank.
    pub fn has_response(&self) -> bool {
        !self.resp1.trim().is_empty() || !self.resp2.trim().is_empty()
    }
}

/// The `tb_de_para` sheet: prior rows followed by appended ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    pub records: Vec<MappingRecord>,
}

impl MappingTable {
    pub fn new(records: Vec<MappingRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every Resp.1 and Resp.2 value already recorded, as raw strings.
    pub fn responses(&self) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .flat_map(|r| [r.resp1.as_str(), r.resp2.as_str()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text_coercion() {
        assert_eq!(CellValue::Empty.to_text(), "");
        assert_eq!(CellValue::from("  Leva cambio ").to_text(), "Leva cambio");
        assert_eq!(CellValue::Number(1200.0).to_text(), "1200");
        assert_eq!(CellValue::Number(2.5).to_text(), "2.5");
    }

    #[test]
    fn test_cell_is_empty() {
        assert!(CellValue::Empty.is_empty());
        assert!(CellValue::from("   ").is_empty());
        assert!(!CellValue::Number(0.0).is_empty());
        assert!(!CellValue::from("x").is_empty());
    }

    #[test]
    fn test_cell_as_integer() {
        assert_eq!(CellValue::Number(15000.0).as_integer(), Some(15000));
        assert_eq!(CellValue::Number(7.9).as_integer(), Some(7));
        assert_eq!(CellValue::from(" 300 ").as_integer(), Some(300));
        assert_eq!(CellValue::from("12.0").as_integer(), Some(12));
        assert_eq!(CellValue::from("TOTAL").as_integer(), None);
        assert_eq!(CellValue::Empty.as_integer(), None);
    }

    #[test]
    fn test_aggregate_sums_distinct_values() {
        let mut agg = VolumeAggregate::new();
        agg.insert("226", 5);
        agg.insert("226", 5);
        agg.insert("226", 3);
        assert_eq!(agg.total("226"), 8);
        assert_eq!(agg.total("999"), 0);
        assert_eq!(agg.sums().get("226"), Some(&8));
    }

    #[test]
    fn test_expanded_row_record_round_trip() {
        let row = ExpandedRow {
            packet: "Leva cambio".to_string(),
            code: "LC1".to_string(),
            concat: "Leva cambioLC1".to_string(),
            multivalue: "XR5".to_string(),
            file_model: "226".to_string(),
            ..Default::default()
        };
        let cells: Vec<String> = row.to_record().iter().map(|s| s.to_string()).collect();
        assert_eq!(cells[2], cells[10]);
        assert_eq!(ExpandedRow::from_record(&cells), row);
    }

    #[test]
    fn test_mapping_record_has_response() {
        let mut rec = MappingRecord::default();
        assert!(!rec.has_response());
        rec.resp2 = "  ".to_string();
        assert!(!rec.has_response());
        rec.resp2 = "XR5".to_string();
        assert!(rec.has_response());
    }
}
