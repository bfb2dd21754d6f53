use serde::Serialize;

use crate::delta::is_change;
use crate::model::{CanonicalRecord, DatasetDocument};
use crate::normalize::Field;

/// A record whose last reconciliation moved the watched field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub dataset: String,
    pub serial_number: Option<i64>,
    pub material: Option<String>,
    pub unit: String,
    pub field: &'static str,
    /// Value now stored.
    pub current: Option<f64>,
    /// Stored percentage string, e.g. `"10.00"`.
    pub change: String,
}

/// Scan documents for records whose change annotation on `field` is
/// non-zero. Only Quantity, Rate and Amount carry annotations; other
/// fields yield nothing.
pub fn discrepancies(documents: &[DatasetDocument], field: Field) -> Vec<Discrepancy> {
    let mut out = Vec::new();
    for doc in documents {
        for rec in &doc.records {
            let Some((current, change)) = watched(rec, field) else {
                continue;
            };
            if !is_change(change) {
                continue;
            }
            out.push(Discrepancy {
                dataset: doc.name.clone(),
                serial_number: rec.serial_number,
                material: rec.material.clone(),
                unit: rec.unit.clone(),
                field: field.name(),
                current,
                change: change.unwrap_or_default().to_string(),
            });
        }
    }
    out
}

fn watched(rec: &CanonicalRecord, field: Field) -> Option<(Option<f64>, Option<&str>)> {
    match field {
        Field::Quantity => Some((rec.quantity, rec.change.quantity.as_deref())),
        Field::Rate => Some((rec.rate, rec.change.rate.as_deref())),
        Field::Amount => Some((rec.amount, rec.change.amount.as_deref())),
        Field::SerialNumber | Field::Material | Field::Unit => None,
    }
}
