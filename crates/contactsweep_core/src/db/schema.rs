//! Contact schema steps, tracked through `PRAGMA user_version`.
//!
//! Step `n` in `SCHEMA_STEPS` upgrades a database from version `n` to `n + 1`.
//! Steps are append-only.

use super::{DbError, DbResult};
use rusqlite::Connection;

const SCHEMA_STEPS: [&str; 2] = [
    include_str!("sql/0001_contacts.sql"),
    include_str!("sql/0002_owner_index.sql"),
];

/// Schema version this build writes and understands.
pub fn schema_version() -> u32 {
    SCHEMA_STEPS.len() as u32
}

/// Brings `conn` up to `schema_version()`; returns how many steps ran.
pub(crate) fn upgrade(conn: &mut Connection) -> DbResult<u32> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let supported = schema_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    let pending = &SCHEMA_STEPS[found as usize..];
    if pending.is_empty() {
        return Ok(0);
    }
    let tx = conn.transaction()?;
    for (offset, step) in pending.iter().enumerate() {
        tx.execute_batch(step)?;
        tx.pragma_update(None, "user_version", found + offset as u32 + 1)?;
    }
    tx.commit()?;
    Ok(pending.len() as u32)
}
