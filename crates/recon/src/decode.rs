use crate::model::{CanonicalRecord, CellValue, SheetRow, DEFAULT_UNIT};
use crate::normalize::{normalize, Field};

/// Decode sheet rows into canonical records, one per row, in order.
///
/// Unrecognized columns are dropped. Missing or unparseable values become
/// `None`; a missing unit becomes `"N/A"`. When two columns normalize to the
/// same field, the rightmost one wins. Never fails.
pub fn decode(rows: &[SheetRow]) -> Vec<CanonicalRecord> {
    rows.iter().map(decode_row).collect()
}

pub fn decode_row(row: &SheetRow) -> CanonicalRecord {
    let mut record = CanonicalRecord::default();
    let mut unit: Option<String> = None;

    for (header, value) in &row.cells {
        let Some(field) = normalize(header) else {
            continue;
        };
        assign(&mut record, &mut unit, field, value);
    }

    record.unit = unit.unwrap_or_else(|| DEFAULT_UNIT.to_string());
    record
}

fn assign(record: &mut CanonicalRecord, unit: &mut Option<String>, field: Field, value: &CellValue) {
    match field {
        Field::SerialNumber => record.serial_number = value.as_integer(),
        Field::Material => record.material = value.as_text(),
        Field::Unit => *unit = value.as_text(),
        Field::Quantity => record.quantity = value.as_number(),
        Field::Rate => record.rate = value.as_number(),
        Field::Amount => record.amount = value.as_number(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    #[test]
    fn decodes_messy_headers() {
        let row = SheetRow::new()
            .with(" S No ", num(1.0))
            .with("MATERIAL", text("Cement"))
            .with("Unit", text("bag"))
            .with("Quantity ", num(10.0))
            .with("rate", num(50.0))
            .with("A mount", num(500.0));
        let recs = decode(&[row]);
        assert_eq!(recs.len(), 1);
        let r = &recs[0];
        assert_eq!(r.serial_number, Some(1));
        assert_eq!(r.material.as_deref(), Some("Cement"));
        assert_eq!(r.unit, "bag");
        assert_eq!(r.quantity, Some(10.0));
        assert_eq!(r.rate, Some(50.0));
        assert_eq!(r.amount, Some(500.0));
        assert!(r.change.is_empty());
    }

    #[test]
    fn missing_fields_default() {
        let row = SheetRow::new().with("Material", text("Sand"));
        let r = decode_row(&row);
        assert_eq!(r.serial_number, None);
        assert_eq!(r.unit, "N/A");
        assert_eq!(r.quantity, None);
        assert_eq!(r.rate, None);
        assert_eq!(r.amount, None);
    }

    #[test]
    fn unknown_columns_are_dropped() {
        let row = SheetRow::new()
            .with("Foo", text("ignored"))
            .with("Remarks", text("also ignored"))
            .with("Unit", text("kg"));
        let r = decode_row(&row);
        assert_eq!(r.unit, "kg");
        assert_eq!(r.material, None);
    }

    #[test]
    fn empty_unit_falls_back() {
        let row = SheetRow::new().with("Unit", text("")).with("Rate", CellValue::Empty);
        let r = decode_row(&row);
        assert_eq!(r.unit, "N/A");
        assert_eq!(r.rate, None);
    }

    #[test]
    fn blank_unit_and_material_count_as_missing() {
        let row = SheetRow::new().with("Material", text("  ")).with("Unit", text(" \t "));
        let r = decode_row(&row);
        assert_eq!(r.unit, "N/A");
        assert_eq!(r.material, None);
    }

    #[test]
    fn text_numbers_parse_and_junk_becomes_null() {
        let row = SheetRow::new()
            .with("sno", text("7"))
            .with("Quantity", text(" 12.5"))
            .with("Rate", text("TBD"))
            .with("Amount", CellValue::Bool(true));
        let r = decode_row(&row);
        assert_eq!(r.serial_number, Some(7));
        assert_eq!(r.quantity, Some(12.5));
        assert_eq!(r.rate, None);
        assert_eq!(r.amount, None);
    }

    #[test]
    fn zero_is_kept() {
        let row = SheetRow::new().with("Quantity", num(0.0));
        assert_eq!(decode_row(&row).quantity, Some(0.0));
    }

    #[test]
    fn rightmost_duplicate_column_wins() {
        let row = SheetRow::new().with("Rate", num(1.0)).with("RATE", num(2.0));
        assert_eq!(decode_row(&row).rate, Some(2.0));
    }

    #[test]
    fn numeric_material_becomes_text() {
        let row = SheetRow::new().with("Material", num(4020.0));
        assert_eq!(decode_row(&row).material.as_deref(), Some("4020"));
    }

    #[test]
    fn one_record_per_row_in_order() {
        let rows: Vec<SheetRow> = ["A", "B", "C"]
            .iter()
            .map(|m| SheetRow::new().with("Material", text(m)))
            .chain(std::iter::once(SheetRow::new()))
            .collect();
        let recs = decode(&rows);
        assert_eq!(recs.len(), 4);
        let names: Vec<_> = recs.iter().map(|r| r.material.clone()).collect();
        assert_eq!(
            names,
            vec![Some("A".into()), Some("B".into()), Some("C".into()), None]
        );
    }
}
