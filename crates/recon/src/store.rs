//! Dataset store seam.
//!
//! The engine never talks to storage itself; callers hand it a
//! [`DatasetStore`] they constructed. `MemoryStore` backs tests and
//! one-shot runs; the SQLite store lives in `ratebook-io`.

use std::collections::BTreeMap;

use chrono::Utc;
use regex::{Regex, RegexBuilder};

use crate::error::StoreError;
use crate::model::{DatasetDocument, RecordPatch};

/// Document storage keyed by dataset name. Every call is atomic for the
/// single document it touches.
pub trait DatasetStore {
    fn find_by_name(&self, name: &str) -> Result<Option<DatasetDocument>, StoreError>;

    /// Write `document` if the stored revision is `document.revision - 1`
    /// (nothing stored counts as revision 0). Otherwise
    /// [`StoreError::Conflict`] and nothing is written.
    fn upsert(&mut self, document: &DatasetDocument) -> Result<DatasetDocument, StoreError>;

    /// Documents whose name matches `pattern`, ordered by name.
    /// See [`NameFilter`] for the matching rules.
    fn find_by_search(&self, pattern: &str, case_insensitive: bool) -> Result<Vec<DatasetDocument>, StoreError>;

    /// `Ok(false)` when no such dataset exists.
    fn delete_by_name(&mut self, name: &str) -> Result<bool, StoreError>;

    /// Merge `patch` into the first record with `serial_number`.
    /// `Ok(false)` when the dataset or the record does not exist.
    fn update_single_record(
        &mut self,
        name: &str,
        serial_number: i64,
        patch: &RecordPatch,
    ) -> Result<bool, StoreError>;
}

/// Name matcher for searches.
///
/// The pattern is a regular expression matched anywhere in the name. A
/// pattern that does not compile is matched as a literal substring. A blank
/// pattern matches everything.
#[derive(Debug, Clone)]
pub struct NameFilter {
    regex: Option<Regex>,
}

impl NameFilter {
    pub fn new(pattern: &str, case_insensitive: bool) -> Self {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Self { regex: None };
        }
        let build = |p: &str| RegexBuilder::new(p).case_insensitive(case_insensitive).build();
        let regex = match build(pattern) {
            Ok(re) => re,
            Err(e) => {
                log::debug!("search pattern '{pattern}' is not a valid regex ({e}); matching literally");
                // An escaped pattern always compiles.
                match build(&regex::escape(pattern)) {
                    Ok(re) => re,
                    Err(_) => return Self { regex: None },
                }
            }
        };
        Self { regex: Some(regex) }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().map_or(true, |re| re.is_match(name))
    }
}

/// Check the compare-and-swap rule shared by store implementations.
pub fn check_revision(name: &str, stored: Option<u64>, incoming: u64) -> Result<(), StoreError> {
    let found = stored.unwrap_or(0);
    let expected = incoming.saturating_sub(1);
    if incoming == 0 || found != expected {
        return Err(StoreError::Conflict {
            name: name.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    documents: BTreeMap<String, DatasetDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DatasetStore for MemoryStore {
    fn find_by_name(&self, name: &str) -> Result<Option<DatasetDocument>, StoreError> {
        Ok(self.documents.get(name).cloned())
    }

    fn upsert(&mut self, document: &DatasetDocument) -> Result<DatasetDocument, StoreError> {
        let stored = self.documents.get(&document.name).map(|d| d.revision);
        check_revision(&document.name, stored, document.revision)?;
        self.documents.insert(document.name.clone(), document.clone());
        Ok(document.clone())
    }

    fn find_by_search(&self, pattern: &str, case_insensitive: bool) -> Result<Vec<DatasetDocument>, StoreError> {
        let filter = NameFilter::new(pattern, case_insensitive);
        Ok(self
            .documents
            .values()
            .filter(|d| filter.matches(&d.name))
            .cloned()
            .collect())
    }

    fn delete_by_name(&mut self, name: &str) -> Result<bool, StoreError> {
        Ok(self.documents.remove(name).is_some())
    }

    fn update_single_record(
        &mut self,
        name: &str,
        serial_number: i64,
        patch: &RecordPatch,
    ) -> Result<bool, StoreError> {
        let Some(doc) = self.documents.get_mut(name) else {
            return Ok(false);
        };
        let Some(record) = doc.records.iter_mut().find(|r| r.serial_number == Some(serial_number)) else {
            return Ok(false);
        };
        patch.apply(record);
        doc.revision += 1;
        doc.timestamp = Utc::now();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CanonicalRecord;

    fn doc(name: &str, revision: u64) -> DatasetDocument {
        DatasetDocument {
            name: name.into(),
            timestamp: Utc::now(),
            revision,
            records: vec![CanonicalRecord {
                serial_number: Some(1),
                material: Some("Cement".into()),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn filter_is_contains_not_prefix() {
        let f = NameFilter::new("cme", true);
        assert!(f.matches("Acme"));
        assert!(!f.matches("Globex"));
    }

    #[test]
    fn filter_case_sensitivity() {
        assert!(NameFilter::new("ACME", true).matches("acme-north"));
        assert!(!NameFilter::new("ACME", false).matches("acme-north"));
    }

    #[test]
    fn filter_regex_and_literal_fallback() {
        assert!(NameFilter::new("^ac.*th$", true).matches("acme-north"));
        assert!(!NameFilter::new("^north", true).matches("acme-north"));
        // Unbalanced paren: literal match.
        assert!(NameFilter::new("q1 (", true).matches("Q1 (draft"));
        assert!(!NameFilter::new("q1 (", true).matches("Q1 draft"));
    }

    #[test]
    fn blank_filter_matches_all() {
        assert!(NameFilter::new("   ", true).matches("anything"));
        assert!(NameFilter::new("", false).matches(""));
    }

    #[test]
    fn revision_rule() {
        assert!(check_revision("a", None, 1).is_ok());
        assert!(check_revision("a", Some(1), 2).is_ok());
        assert_eq!(
            check_revision("a", Some(2), 2),
            Err(StoreError::Conflict { name: "a".into(), expected: 1, found: 2 })
        );
        assert!(check_revision("a", None, 0).is_err());
        assert!(check_revision("a", Some(1), 1).is_err());
    }

    #[test]
    fn memory_store_upsert_and_conflict() {
        let mut store = MemoryStore::new();
        store.upsert(&doc("Acme", 1)).unwrap();
        assert!(matches!(store.upsert(&doc("Acme", 1)), Err(StoreError::Conflict { .. })));
        store.upsert(&doc("Acme", 2)).unwrap();
        assert_eq!(store.find_by_name("Acme").unwrap().unwrap().revision, 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_store_delete() {
        let mut store = MemoryStore::new();
        store.upsert(&doc("Acme", 1)).unwrap();
        assert!(store.delete_by_name("Acme").unwrap());
        assert!(!store.delete_by_name("Acme").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn memory_store_update_by_serial() {
        let mut store = MemoryStore::new();
        store.upsert(&doc("Acme", 1)).unwrap();
        let patch = RecordPatch {
            rate: Some(51.0),
            ..Default::default()
        };
        assert!(store.update_single_record("Acme", 1, &patch).unwrap());
        assert!(!store.update_single_record("Acme", 2, &patch).unwrap());
        assert!(!store.update_single_record("Globex", 1, &patch).unwrap());
        let stored = store.find_by_name("Acme").unwrap().unwrap();
        assert_eq!(stored.records[0].rate, Some(51.0));
        assert_eq!(stored.revision, 2);
    }

    #[test]
    fn memory_store_search_is_ordered() {
        let mut store = MemoryStore::new();
        for name in ["beta", "Alpha", "alpine"] {
            store.upsert(&doc(name, 1)).unwrap();
        }
        let names: Vec<_> = store
            .find_by_search("AL", true)
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "alpine"]);
    }
}
