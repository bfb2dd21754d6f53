// CSV/TSV sheet reading

use ratebook_recon::model::{CellValue, SheetRow};
use ratebook_recon::ReconError;

/// Read delimited text into header-keyed rows.
///
/// The first record is the header row. Empty fields are left out of the
/// row, and records with no non-empty field are skipped. Bytes that are not
/// UTF-8 are decoded as Windows-1252.
pub fn read_rows(bytes: &[u8]) -> Result<Vec<SheetRow>, ReconError> {
    let content = decode_text(bytes);
    let delimiter = sniff_delimiter(&content);
    read_rows_with_delimiter(&content, delimiter)
}

pub fn read_rows_with_delimiter(content: &str, delimiter: u8) -> Result<Vec<SheetRow>, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(first) => first
            .map_err(|e| ReconError::Decode(e.to_string()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect(),
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| ReconError::Decode(e.to_string()))?;
        let mut row = SheetRow::new();
        for (col_idx, field) in record.iter().enumerate() {
            if field.is_empty() {
                continue;
            }
            let header = headers.get(col_idx).cloned().unwrap_or_default();
            row.push(header, CellValue::Text(field.to_string()));
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(rows)
}

/// Delimiters a rate sheet export may use, in tie-break order.
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// How many leading lines to inspect when guessing the delimiter.
const SNIFF_LINES: usize = 10;

/// Guess the field delimiter from the header row and the lines after it.
///
/// A candidate must split the header into at least two columns. It then
/// scores one point per sampled line with the header's column count. Lines
/// holding decimal commas (`12,5` under `;`) disagree with the header under
/// `,` and so lose to `;`. Falls back to `,`.
fn sniff_delimiter(content: &str) -> u8 {
    let sample: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(SNIFF_LINES).collect();
    let Some((header, body)) = sample.split_first() else {
        return b',';
    };

    DELIMITERS
        .iter()
        .filter_map(|&delim| {
            let columns = field_count(header, delim);
            if columns < 2 {
                return None;
            }
            let agreeing = body.iter().filter(|line| field_count(line, delim) == columns).count();
            Some((delim, agreeing, columns))
        })
        // Most agreeing lines, then most columns; `max_by` keeps the last
        // maximum, so iterate in reverse to let earlier candidates win ties.
        .rev()
        .max_by(|a, b| (a.1, a.2).cmp(&(b.1, b.2)))
        .map_or(b',', |(delim, _, _)| delim)
}

/// Fields on one line under `delim`, honoring quotes.
fn field_count(line: &str, delim: u8) -> usize {
    csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map_or(0, |r| r.len())
}

/// UTF-8 if valid, otherwise Windows-1252 (common for Excel-exported CSVs).
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    #[test]
    fn test_reads_header_keyed_rows() {
        let rows = read_rows(b"S No,Material,Unit,Quantity\n1,Cement,bag,10\n2,Steel,,5\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].cells,
            vec![
                ("S No".to_string(), text("1")),
                ("Material".to_string(), text("Cement")),
                ("Unit".to_string(), text("bag")),
                ("Quantity".to_string(), text("10")),
            ]
        );
        // Empty Unit is omitted
        assert_eq!(rows[1].cells.len(), 3);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let rows = read_rows(b"Material,Rate\nCement,50\n,\nSteel,80\n").unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_header_only_and_empty_input() {
        assert!(read_rows(b"Material,Rate\n").unwrap().is_empty());
        assert!(read_rows(b"").unwrap().is_empty());
    }

    #[test]
    fn test_bom_stripped_from_first_header() {
        let rows = read_rows("\u{feff}Material,Rate\nCement,50\n".as_bytes()).unwrap();
        assert_eq!(rows[0].cells[0].0, "Material");
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "Béton" with é as 0xE9
        let bytes = b"Material;Rate\nB\xe9ton;50\n";
        let rows = read_rows(bytes).unwrap();
        assert_eq!(rows[0].cells[0].1, text("Béton"));
    }

    #[test]
    fn test_extra_columns_without_header() {
        let rows = read_rows(b"Material,Rate\nCement,50,extra\n").unwrap();
        assert_eq!(rows[0].cells[2], (String::new(), text("extra")));
    }

    #[test]
    fn test_sniff_semicolon_export() {
        let content = "S No;Material;Unit;Rate\n1;Cement;bag;50\n2;Sand;m3;30\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_export() {
        let content = "S No,Material,Unit,Rate\n1,Cement,bag,50\n2,Sand,m3,30\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_export() {
        let content = "S No\tMaterial\tUnit\tRate\n1\tCement\tbag\t50\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_decimal_commas() {
        // European export: decimal commas inside unquoted values
        let content = "Material;Unit;Quantity;Rate\nCement;bag;12,5;50,25\nSand;m3;4;30,5\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_single_column_falls_back_to_comma() {
        assert_eq!(sniff_delimiter("Material\nCement\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }
}
