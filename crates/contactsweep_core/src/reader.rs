//! Snapshot reader over the contact store's phone number table.
//!
//! # Responsibility
//! - Pull `(name, number, owner)` triples into memory for one run.
//! - Skip malformed rows instead of failing the read.
//!
//! # Invariants
//! - Pure read; never mutates the store.
//! - Does not check capabilities; callers gate it before reading.
//! - Output order is whatever the store returned and carries no meaning.

use crate::model::contact::{ContactRecord, OwnerId};
use crate::store::{ContactStore, PhoneRow, StoreResult};
use log::debug;

/// In-memory copy of the valid phone rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub records: Vec<ContactRecord>,
    /// Rows dropped for a missing number or a missing/unparsable owner id.
    pub skipped: usize,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Reads a `Snapshot` from any `ContactStore`.
pub struct SnapshotReader<'s, S: ContactStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: ContactStore + ?Sized> SnapshotReader<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Queries the phone table once and converts valid rows.
    ///
    /// # Errors
    /// - Propagates store failures unchanged; individual bad rows never fail.
    pub fn read(&self) -> StoreResult<Snapshot> {
        let rows = self.store.query_phone_rows()?;
        let mut snapshot = Snapshot {
            records: Vec::with_capacity(rows.len()),
            skipped: 0,
        };

        for row in rows {
            match record_from_row(row) {
                Some(record) => snapshot.records.push(record),
                None => snapshot.skipped += 1,
            }
        }

        debug!(
            "event=snapshot_read module=reader status=ok records={} skipped={}",
            snapshot.records.len(),
            snapshot.skipped
        );
        Ok(snapshot)
    }
}

/// Converts one raw row, or `None` when the row is unusable.
///
/// A missing display name becomes an empty string rather than a skip.
pub fn record_from_row(row: PhoneRow) -> Option<ContactRecord> {
    let phone_number = row.number?;
    let owner_id = OwnerId::parse(row.owner_id.as_deref()?)?;
    Some(ContactRecord {
        owner_id,
        display_name: row.display_name.unwrap_or_default(),
        phone_number,
    })
}
