// Excel sheet reading (xlsx, xls, xlsb, ods)
//
// Only the first worksheet, by position, is read. Row 1 is the header row.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use ratebook_recon::model::{CellValue, SheetRow};
use ratebook_recon::ReconError;

/// Maximum data rows read from a sheet (prevents DoS from huge files)
const MAX_ROWS: usize = 65536;

/// Maximum columns read per row
const MAX_COLS: usize = 256;

/// Read the first worksheet of an Excel/ODS workbook into header-keyed rows.
///
/// Empty cells are left out of their row and rows with no data are skipped,
/// so a sheet with only a header row yields no rows.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<SheetRow>, ReconError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ReconError::Decode(format!("failed to open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReconError::Decode("workbook contains no sheets".to_string()))?
        .map_err(|e| ReconError::Decode(format!("failed to read first sheet: {e}")))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header_row) => header_row.iter().take(MAX_COLS).map(header_text).collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for (row_idx, cells) in sheet_rows.enumerate() {
        if row_idx >= MAX_ROWS {
            log::warn!("sheet truncated at {MAX_ROWS} data rows");
            break;
        }

        let mut row = SheetRow::new();
        for (col_idx, cell) in cells.iter().take(MAX_COLS).enumerate() {
            let value = cell_value(cell);
            if value == CellValue::Empty {
                continue;
            }
            let header = headers.get(col_idx).cloned().unwrap_or_default();
            row.push(header, value);
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(rows)
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        CellValue::Empty => String::new(),
        other => other.as_text().unwrap_or_default(),
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        // Error cells carry no usable value.
        Data::Error(_) => CellValue::Empty,
        // Dates stay serial numbers, as Excel stores them.
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
