// Upload entry point: raw file bytes -> rows -> reconciliation -> store

use std::path::Path;

use ratebook_recon::ingest::{self, dataset_name_from_path};
use ratebook_recon::model::SheetRow;
use ratebook_recon::{DatasetStore, ReconError, ReconPolicy, ReconResult};

/// Spreadsheet container formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    /// xlsx, xlsm, xls, xlsb or ods; calamine sniffs which.
    Workbook,
    /// Delimited text, delimiter sniffed.
    Delimited,
}

impl SheetFormat {
    /// Guess from the file extension. Anything that isn't csv/tsv/txt is
    /// handed to the workbook reader.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") | Some("tsv") | Some("txt") => Self::Delimited,
            _ => Self::Workbook,
        }
    }
}

/// Parse file bytes into rows of the first sheet.
pub fn read_rows(bytes: &[u8], format: SheetFormat) -> Result<Vec<SheetRow>, ReconError> {
    match format {
        SheetFormat::Workbook => crate::xlsx::read_first_sheet(bytes),
        SheetFormat::Delimited => crate::csv::read_rows(bytes),
    }
}

/// Upload raw bytes under `name`. A decode failure writes nothing.
pub fn upload_bytes<S: DatasetStore + ?Sized>(
    store: &mut S,
    name: &str,
    bytes: &[u8],
    format: SheetFormat,
    policy: &ReconPolicy,
) -> Result<ReconResult, ReconError> {
    let rows = read_rows(bytes, format)?;
    ingest::upload(store, name, &rows, policy)
}

/// Upload a file from disk. The dataset name defaults to the file name up
/// to its first `.`.
pub fn upload_file<S: DatasetStore + ?Sized>(
    store: &mut S,
    path: &Path,
    name: Option<&str>,
    policy: &ReconPolicy,
) -> Result<ReconResult, ReconError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ReconError::Decode(format!("cannot read {}: {e}", path.display())))?;
    let name = match name {
        Some(n) => n.to_string(),
        None => {
            let file_name = path.file_name().and_then(|f| f.to_str()).unwrap_or_default();
            dataset_name_from_path(file_name)
        }
    };
    upload_bytes(store, &name, &bytes, SheetFormat::from_path(path), policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratebook_recon::{MemoryStore, ReconOutcome};

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SheetFormat::from_path(Path::new("a.CSV")), SheetFormat::Delimited);
        assert_eq!(SheetFormat::from_path(Path::new("a.tsv")), SheetFormat::Delimited);
        assert_eq!(SheetFormat::from_path(Path::new("a.xlsx")), SheetFormat::Workbook);
        assert_eq!(SheetFormat::from_path(Path::new("a.ods")), SheetFormat::Workbook);
        assert_eq!(SheetFormat::from_path(Path::new("noext")), SheetFormat::Workbook);
    }

    #[test]
    fn test_decode_failure_writes_nothing() {
        let mut store = MemoryStore::new();
        let err = upload_bytes(
            &mut store,
            "Acme",
            b"\x00\x01garbage",
            SheetFormat::Workbook,
            &ReconPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::Decode(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_upload_file_names_dataset_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Acme.march.csv");
        std::fs::write(&path, "Material,Unit,Quantity,Rate,Amount\nCement,bag,10,50,500\n").unwrap();

        let mut store = MemoryStore::new();
        let result = upload_file(&mut store, &path, None, &ReconPolicy::default()).unwrap();
        assert_eq!(result.outcome, ReconOutcome::Created);
        assert_eq!(result.document.name, "Acme");
        assert_eq!(result.document.records[0].amount, Some(500.0));
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let mut store = MemoryStore::new();
        let err = upload_file(&mut store, Path::new("/nonexistent/x.csv"), None, &ReconPolicy::default())
            .unwrap_err();
        assert!(matches!(err, ReconError::Decode(_)));
    }
}
