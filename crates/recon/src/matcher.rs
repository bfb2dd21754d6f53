use std::collections::HashMap;

use crate::model::{CanonicalRecord, RecordKey};

/// First-occurrence index over a record sequence.
#[derive(Debug, Default)]
pub struct KeyIndex {
    first: HashMap<RecordKey, usize>,
    duplicates: Vec<(RecordKey, usize)>,
}

impl KeyIndex {
    pub fn build(records: &[CanonicalRecord]) -> Self {
        let mut index = Self::default();
        for (i, rec) in records.iter().enumerate() {
            let key = rec.key();
            if index.first.contains_key(&key) {
                index.duplicates.push((key, i));
            } else {
                index.first.insert(key, i);
            }
        }
        index
    }

    /// Position of the first record carrying `key`.
    pub fn get(&self, key: &RecordKey) -> Option<usize> {
        self.first.get(key).copied()
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.first.contains_key(key)
    }

    /// Later occurrences of keys already seen, with their positions.
    pub fn duplicates(&self) -> &[(RecordKey, usize)] {
        &self.duplicates
    }
}

/// Result of matching prior records against incoming ones.
#[derive(Debug)]
pub struct KeyMatch {
    /// For each prior record, in prior order: the incoming position it
    /// matched, if any.
    pub prior: Vec<Option<usize>>,
    /// Incoming positions whose key does not occur in the prior set, first
    /// occurrence per key, in incoming order.
    pub incoming_only: Vec<usize>,
    pub duplicate_incoming_keys: usize,
    pub duplicate_prior_keys: usize,
}

/// Match by exact `(Material, Unit)`. Iteration is driven by the prior set:
/// each prior record takes the first incoming record with its key, so prior
/// duplicates all match the same incoming row.
pub fn match_by_key(prior: &[CanonicalRecord], incoming: &[CanonicalRecord]) -> KeyMatch {
    let incoming_index = KeyIndex::build(incoming);
    let prior_index = KeyIndex::build(prior);

    for (key, pos) in incoming_index.duplicates() {
        log::warn!("duplicate key {key} in upload at row {}; first occurrence wins", pos + 1);
    }
    for (key, pos) in prior_index.duplicates() {
        log::warn!("duplicate key {key} in stored dataset at record {}; each copy takes the same update", pos + 1);
    }

    // Every prior record looks up its own match, duplicates included.
    let prior_matches = prior.iter().map(|rec| incoming_index.get(&rec.key())).collect();

    let incoming_only = incoming
        .iter()
        .enumerate()
        .filter(|(i, rec)| {
            let key = rec.key();
            !prior_index.contains(&key) && incoming_index.get(&key) == Some(*i)
        })
        .map(|(i, _)| i)
        .collect();

    KeyMatch {
        prior: prior_matches,
        incoming_only,
        duplicate_incoming_keys: incoming_index.duplicates().len(),
        duplicate_prior_keys: prior_index.duplicates().len(),
    }
}
