//! SQLite-backed contact store.
//!
//! # Responsibility
//! - Read `phone_numbers` rows without interpreting them.
//! - Resolve owner ids to `raw_contacts` rows and delete them one at a time.
//! - Offer a seeding path for imports and fixtures.
//!
//! # Invariants
//! - Deleting a raw contact cascades to its phone rows (`foreign_keys=ON`).
//! - Each delete is its own statement; there is no plan-wide transaction.

use super::{ContactStore, PhoneRow, StoreResult};
use crate::model::contact::{OwnerId, RawContactId};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Import shape for one contact with its phone numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub owner_id: OwnerId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub numbers: Vec<String>,
}

/// Contact store over an open, migrated connection.
pub struct SqliteContactStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Inserts one raw contact plus one phone row per number.
    ///
    /// Returns the created raw contact id.
    pub fn insert_contact(&self, contact: &NewContact) -> StoreResult<RawContactId> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO raw_contacts (owner_id) VALUES (?1);",
            [contact.owner_id.value()],
        )?;
        let raw_contact_id = RawContactId(tx.last_insert_rowid());
        for number in &contact.numbers {
            tx.execute(
                "INSERT INTO phone_numbers (raw_contact_id, number, owner_id, display_name)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    raw_contact_id.0,
                    number.as_str(),
                    contact.owner_id.to_string(),
                    contact.display_name.as_deref(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(raw_contact_id)
    }

    /// Counts rows in the raw identity table.
    pub fn raw_contact_count(&self) -> StoreResult<u64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM raw_contacts;", [], |row| {
                row.get::<_, i64>(0)
            })?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Returns whether any raw contact row belongs to `owner_id`.
    pub fn owner_exists(&self, owner_id: OwnerId) -> StoreResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM raw_contacts WHERE owner_id = ?1 LIMIT 1;",
                [owner_id.value()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

impl ContactStore for SqliteContactStore<'_> {
    fn query_phone_rows(&self) -> StoreResult<Vec<PhoneRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT number, CAST(owner_id AS TEXT), display_name
             FROM phone_numbers
             ORDER BY id ASC;",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PhoneRow {
                number: cell_text(row.get_ref(0)?),
                owner_id: cell_text(row.get_ref(1)?),
                // Unreadable names still count as present, just empty.
                display_name: match row.get_ref(2)? {
                    ValueRef::Null => None,
                    other => Some(cell_text(other).unwrap_or_default()),
                },
            })
        })?;
        let mut phone_rows = Vec::new();
        for row in rows {
            phone_rows.push(row?);
        }
        Ok(phone_rows)
    }

    fn query_raw_contact_ids(&self, owner_id: OwnerId) -> StoreResult<Vec<RawContactId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM raw_contacts WHERE owner_id = ?1 ORDER BY id ASC;")?;
        let ids = stmt.query_map([owner_id.value()], |row| row.get::<_, i64>(0))?;
        let mut raw_ids = Vec::new();
        for id in ids {
            raw_ids.push(RawContactId(id?));
        }
        Ok(raw_ids)
    }

    fn delete_raw_contact(&self, raw_contact_id: RawContactId) -> StoreResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM raw_contacts WHERE id = ?1;", [raw_contact_id.0])?;
        Ok(changed)
    }
}

/// Reads a cell as text; blobs and invalid UTF-8 read as `None`.
///
/// Numeric cells are rendered in decimal so imported integer columns stay usable.
fn cell_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => None,
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok().map(str::to_string),
        ValueRef::Integer(number) => Some(number.to_string()),
        ValueRef::Real(number) => Some(number.to_string()),
    }
}
