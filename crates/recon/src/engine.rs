use chrono::{DateTime, Utc};

use crate::config::{ReconPolicy, UnmatchedIncoming};
use crate::delta::{delta_with, is_change};
use crate::matcher::match_by_key;
use crate::model::{
    CanonicalRecord, ChangeAnnotation, DatasetDocument, ReconOutcome, ReconResult, ReconSummary,
};

/// Reconcile an upload against the stored copy of the same dataset.
///
/// With no prior document this is a plain create. Otherwise every prior
/// record is visited in order: a record whose `(Material, Unit)` occurs in
/// `incoming` takes the new Quantity/Rate/Amount and gets fresh change
/// annotations; any other record is carried through untouched. What happens
/// to incoming records with no prior counterpart is decided by
/// [`ReconPolicy::unmatched_incoming`].
///
/// Pure: the caller loads `prior` and persists the result.
pub fn reconcile(
    name: &str,
    incoming: Vec<CanonicalRecord>,
    prior: Option<&DatasetDocument>,
    policy: &ReconPolicy,
    now: DateTime<Utc>,
) -> ReconResult {
    match prior {
        None => create(name, incoming, now),
        Some(prior) => merge(prior, incoming, policy, now),
    }
}

fn create(name: &str, mut incoming: Vec<CanonicalRecord>, now: DateTime<Utc>) -> ReconResult {
    // Nothing to compare against yet.
    for rec in &mut incoming {
        rec.change = ChangeAnnotation::default();
    }

    let summary = ReconSummary {
        incoming: incoming.len(),
        ..Default::default()
    };

    ReconResult {
        outcome: ReconOutcome::Created,
        summary,
        document: DatasetDocument {
            name: name.to_string(),
            timestamp: now,
            revision: 1,
            records: incoming,
        },
    }
}

fn merge(
    prior: &DatasetDocument,
    incoming: Vec<CanonicalRecord>,
    policy: &ReconPolicy,
    now: DateTime<Utc>,
) -> ReconResult {
    let key_match = match_by_key(&prior.records, &incoming);

    let mut summary = ReconSummary {
        incoming: incoming.len(),
        duplicate_incoming_keys: key_match.duplicate_incoming_keys,
        duplicate_prior_keys: key_match.duplicate_prior_keys,
        ..Default::default()
    };

    let mut records: Vec<CanonicalRecord> = Vec::with_capacity(prior.records.len());
    for (old, matched) in prior.records.iter().zip(&key_match.prior) {
        match matched {
            Some(i) => {
                let updated = apply_update(old, &incoming[*i], policy);
                summary.matched += 1;
                if has_movement(&updated.change) {
                    summary.changed += 1;
                }
                records.push(updated);
            }
            None => {
                summary.carried += 1;
                records.push(old.clone());
            }
        }
    }

    let (appended, dropped) = unmatched_incoming(policy.unmatched_incoming, &key_match.incoming_only, &incoming);
    summary.dropped = dropped;
    summary.appended = appended.len();
    records.extend(appended);

    log::info!(
        "merged '{}': {} matched ({} changed), {} carried, {} dropped, {} appended",
        prior.name,
        summary.matched,
        summary.changed,
        summary.carried,
        summary.dropped,
        summary.appended
    );

    ReconResult {
        outcome: ReconOutcome::Merged,
        summary,
        document: DatasetDocument {
            name: prior.name.clone(),
            timestamp: now,
            revision: prior.revision + 1,
            records,
        },
    }
}

/// New numeric values and their deltas on top of the stored record.
/// Serial number and identity fields stay as stored.
fn apply_update(old: &CanonicalRecord, new: &CanonicalRecord, policy: &ReconPolicy) -> CanonicalRecord {
    let quantity = delta_with(new.quantity, old.quantity, policy.zero_baseline);
    let rate = delta_with(new.rate, old.rate, policy.zero_baseline);
    let amount = delta_with(new.amount, old.amount, policy.zero_baseline);

    log::debug!(
        "updating {}: quantity {:?} -> {:?} ({}%), rate {:?} -> {:?} ({}%), amount {:?} -> {:?} ({}%)",
        old.key(),
        old.quantity,
        new.quantity,
        quantity.percentage,
        old.rate,
        new.rate,
        rate.percentage,
        old.amount,
        new.amount,
        amount.percentage
    );

    CanonicalRecord {
        quantity: new.quantity,
        rate: new.rate,
        amount: new.amount,
        change: ChangeAnnotation {
            quantity: Some(quantity.percentage),
            rate: Some(rate.percentage),
            amount: Some(amount.percentage),
        },
        ..old.clone()
    }
}

/// Policy hook for incoming records with no stored counterpart.
/// Returns the records to append and the number discarded.
pub fn unmatched_incoming(
    policy: UnmatchedIncoming,
    incoming_only: &[usize],
    incoming: &[CanonicalRecord],
) -> (Vec<CanonicalRecord>, usize) {
    match policy {
        UnmatchedIncoming::Drop => {
            for &i in incoming_only {
                log::debug!("dropping unmatched upload row {}: {}", i + 1, incoming[i].key());
            }
            (Vec::new(), incoming_only.len())
        }
        UnmatchedIncoming::Append => {
            let appended = incoming_only
                .iter()
                .map(|&i| CanonicalRecord {
                    change: ChangeAnnotation::default(),
                    ..incoming[i].clone()
                })
                .collect();
            (appended, 0)
        }
    }
}

fn has_movement(change: &ChangeAnnotation) -> bool {
    is_change(change.quantity.as_deref())
        || is_change(change.rate.as_deref())
        || is_change(change.amount.as_deref())
}
