//! Entry points: upload, list, delete and manual edit.
//!
//! Each takes the store explicitly. An upload is one fetch, merge and write; if
//! the write fails nothing has been persisted.

use chrono::Utc;

use crate::config::ReconPolicy;
use crate::decode::decode;
use crate::engine::reconcile;
use crate::error::ReconError;
use crate::model::{DatasetDocument, RecordPatch, ReconResult, SheetRow};
use crate::store::DatasetStore;

/// Decode `rows` and reconcile them into the dataset called `name`.
pub fn upload<S: DatasetStore + ?Sized>(
    store: &mut S,
    name: &str,
    rows: &[SheetRow],
    policy: &ReconPolicy,
) -> Result<ReconResult, ReconError> {
    let incoming = decode(rows);
    log::debug!("decoded {} row(s) for '{name}'", incoming.len());

    let prior = store.find_by_name(name)?;
    let mut result = reconcile(name, incoming, prior.as_ref(), policy, Utc::now());
    result.document = store.upsert(&result.document)?;

    log::info!(
        "{} dataset '{}' (revision {}, {} record(s))",
        result.outcome,
        result.document.name,
        result.document.revision,
        result.document.records.len()
    );
    Ok(result)
}

/// Datasets whose name matches `search`, case-insensitively.
pub fn list_datasets<S: DatasetStore + ?Sized>(store: &S, search: &str) -> Result<Vec<DatasetDocument>, ReconError> {
    Ok(store.find_by_search(search, true)?)
}

/// Fetch one dataset by exact name.
pub fn get_dataset<S: DatasetStore + ?Sized>(store: &S, name: &str) -> Result<Option<DatasetDocument>, ReconError> {
    Ok(store.find_by_name(name)?)
}

/// `Ok(false)` when there was nothing to delete.
pub fn delete_dataset<S: DatasetStore + ?Sized>(store: &mut S, name: &str) -> Result<bool, ReconError> {
    let found = store.delete_by_name(name)?;
    if found {
        log::info!("deleted dataset '{name}'");
    } else {
        log::debug!("delete: no dataset named '{name}'");
    }
    Ok(found)
}

/// Manual correction of one record, matched by serial number rather than
/// by `(Material, Unit)`.
pub fn update_record<S: DatasetStore + ?Sized>(
    store: &mut S,
    name: &str,
    serial_number: i64,
    patch: &RecordPatch,
) -> Result<bool, ReconError> {
    let found = store.update_single_record(name, serial_number, patch)?;
    if found {
        log::info!("updated record {serial_number} in '{name}'");
    }
    Ok(found)
}

/// Dataset name for an uploaded file: everything before the first `.` of
/// the file name.
pub fn dataset_name_from_path(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.split('.').next().unwrap_or(base).to_string()
}
