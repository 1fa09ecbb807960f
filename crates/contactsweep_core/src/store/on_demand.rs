//! Contact store that opens its database on first use.
//!
//! # Invariants
//! - Nothing touches the database file until the first store call, so a run
//!   rejected by the capability gate never creates or migrates it.
//! - An open failure is reported by that call as `StoreError::Db`.

use super::{ContactStore, PhoneRow, SqliteContactStore, StoreError, StoreResult};
use crate::db::open_db;
use crate::model::contact::{OwnerId, RawContactId};
use once_cell::unsync::OnceCell;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub struct OnDemandSqliteStore {
    db_path: PathBuf,
    conn: OnceCell<Connection>,
}

impl OnDemandSqliteStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            conn: OnceCell::new(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn is_open(&self) -> bool {
        self.conn.get().is_some()
    }

    fn store(&self) -> StoreResult<SqliteContactStore<'_>> {
        let conn = self
            .conn
            .get_or_try_init(|| open_db(&self.db_path))
            .map_err(StoreError::from)?;
        Ok(SqliteContactStore::new(conn))
    }
}

impl ContactStore for OnDemandSqliteStore {
    fn query_phone_rows(&self) -> StoreResult<Vec<PhoneRow>> {
        self.store()?.query_phone_rows()
    }

    fn query_raw_contact_ids(&self, owner_id: OwnerId) -> StoreResult<Vec<RawContactId>> {
        self.store()?.query_raw_contact_ids(owner_id)
    }

    fn delete_raw_contact(&self, raw_contact_id: RawContactId) -> StoreResult<usize> {
        self.store()?.delete_raw_contact(raw_contact_id)
    }
}
