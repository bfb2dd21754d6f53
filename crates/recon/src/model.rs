use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single cell as handed over by a sheet reader.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Text form of the cell. Empty cells and blank strings yield `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) if s.trim().is_empty() => None,
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        }
    }

    /// Numeric form of the cell. Text is parsed after trimming; anything
    /// that does not parse to a finite number yields `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Integral form of the cell, used for serial numbers.
    pub fn as_integer(&self) -> Option<i64> {
        self.as_number()
            .filter(|n| n.fract() == 0.0 && n.abs() < 9.0e15)
            .map(|n| n as i64)
    }
}

/// Integers render without decimals, everything else as-is.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One row of the first sheet: `(header, value)` pairs in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    pub cells: Vec<(String, CellValue)>,
}

impl SheetRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, header: &str, value: CellValue) -> Self {
        self.cells.push((header.to_string(), value));
        self
    }

    pub fn push(&mut self, header: impl Into<String>, value: CellValue) {
        self.cells.push((header.into(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|(_, v)| matches!(v, CellValue::Empty))
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

pub const DEFAULT_UNIT: &str = "N/A";

/// Per-field percentage changes from the most recent reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeAnnotation {
    #[serde(rename = "QuantityChange", default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(rename = "RateChange", default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    #[serde(rename = "AmountChange", default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

impl ChangeAnnotation {
    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.rate.is_none() && self.amount.is_none()
    }
}

/// One line item in the fixed six-field schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(rename = "SerialNumber")]
    pub serial_number: Option<i64>,
    #[serde(rename = "Material")]
    pub material: Option<String>,
    #[serde(rename = "Unit")]
    pub unit: String,
    #[serde(rename = "Quantity")]
    pub quantity: Option<f64>,
    #[serde(rename = "Rate")]
    pub rate: Option<f64>,
    #[serde(rename = "Amount")]
    pub amount: Option<f64>,
    #[serde(flatten)]
    pub change: ChangeAnnotation,
}

impl Default for CanonicalRecord {
    fn default() -> Self {
        Self {
            serial_number: None,
            material: None,
            unit: DEFAULT_UNIT.to_string(),
            quantity: None,
            rate: None,
            amount: None,
            change: ChangeAnnotation::default(),
        }
    }
}

impl CanonicalRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            material: self.material.clone(),
            unit: self.unit.clone(),
        }
    }
}

/// Identity key used to match records across submissions.
/// `SerialNumber` is deliberately not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub material: Option<String>,
    pub unit: String,
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.material.as_deref().unwrap_or("<none>"), self.unit)
    }
}

/// Fields a manual edit may overwrite. `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordPatch {
    #[serde(rename = "SerialNumber")]
    pub serial_number: Option<i64>,
    #[serde(rename = "Material")]
    pub material: Option<String>,
    #[serde(rename = "Unit")]
    pub unit: Option<String>,
    #[serde(rename = "Quantity")]
    pub quantity: Option<f64>,
    #[serde(rename = "Rate")]
    pub rate: Option<f64>,
    #[serde(rename = "Amount")]
    pub amount: Option<f64>,
    #[serde(rename = "QuantityChange")]
    pub quantity_change: Option<String>,
    #[serde(rename = "RateChange")]
    pub rate_change: Option<String>,
    #[serde(rename = "AmountChange")]
    pub amount_change: Option<String>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the provided fields into `record`. An empty annotation string
    /// clears that annotation.
    pub fn apply(&self, record: &mut CanonicalRecord) {
        if let Some(sno) = self.serial_number {
            record.serial_number = Some(sno);
        }
        if let Some(ref material) = self.material {
            record.material = Some(material.clone());
        }
        if let Some(ref unit) = self.unit {
            record.unit = unit.clone();
        }
        if let Some(q) = self.quantity {
            record.quantity = Some(q);
        }
        if let Some(r) = self.rate {
            record.rate = Some(r);
        }
        if let Some(a) = self.amount {
            record.amount = Some(a);
        }
        let set = |slot: &mut Option<String>, value: &Option<String>| {
            if let Some(v) = value {
                *slot = if v.is_empty() { None } else { Some(v.clone()) };
            }
        };
        set(&mut record.change.quantity, &self.quantity_change);
        set(&mut record.change.rate, &self.rate_change);
        set(&mut record.change.amount, &self.amount_change);
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// The persisted unit: one per uploaded source name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDocument {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    /// Bumped on every write; the store rejects writes built on a stale copy.
    pub revision: u64,
    pub records: Vec<CanonicalRecord>,
}

// ---------------------------------------------------------------------------
// Reconciliation output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconOutcome {
    Created,
    Merged,
}

impl std::fmt::Display for ReconOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub incoming: usize,
    pub matched: usize,
    /// Matched records where at least one numeric field moved.
    pub changed: usize,
    pub carried: usize,
    pub dropped: usize,
    pub appended: usize,
    pub duplicate_incoming_keys: usize,
    pub duplicate_prior_keys: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub outcome: ReconOutcome,
    pub summary: ReconSummary,
    pub document: DatasetDocument,
}
