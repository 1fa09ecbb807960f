//! Contact store contracts and the SQLite reference implementation.
//!
//! # Responsibility
//! - Expose the enumerate/resolve/delete primitives the engine consumes.
//! - Keep SQL and platform store details behind `ContactStore`.
//!
//! # Invariants
//! - Phone rows are returned raw; validation is the reader's concern.
//! - `StoreError::RowRejected` is the only non-fatal error: it describes one
//!   row the store refused to delete while staying usable.

use crate::db::DbError;
use crate::model::contact::{OwnerId, RawContactId};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod on_demand;
pub mod sqlite_store;

pub use on_demand::OnDemandSqliteStore;
pub use sqlite_store::{NewContact, SqliteContactStore};

pub type StoreResult<T> = Result<T, StoreError>;

/// One row of the phone number table, exactly as the store returned it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneRow {
    pub number: Option<String>,
    pub owner_id: Option<String>,
    pub display_name: Option<String>,
}

/// Contact store failures.
#[derive(Debug)]
pub enum StoreError {
    /// Store is unreachable or refused the whole operation.
    Unavailable(String),
    /// Underlying database transport error.
    Db(DbError),
    /// One row could not be deleted; the store remains usable.
    RowRejected {
        raw_contact_id: RawContactId,
        reason: String,
    },
    /// The caller tore down the operation.
    Cancelled,
}

impl StoreError {
    /// Returns whether this error must end a deduplication run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::RowRejected { .. })
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "contact store unavailable: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::RowRejected {
                raw_contact_id,
                reason,
            } => write!(f, "raw contact {raw_contact_id} rejected: {reason}"),
            Self::Cancelled => write!(f, "contact store operation cancelled"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Unavailable(_) | Self::RowRejected { .. } | Self::Cancelled => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Primitives over the two logical contact tables.
///
/// All calls are blocking from the caller's point of view.
pub trait ContactStore {
    /// Enumerates the phone number table.
    fn query_phone_rows(&self) -> StoreResult<Vec<PhoneRow>>;

    /// Resolves one contact to its deletable raw identity rows.
    fn query_raw_contact_ids(&self, owner_id: OwnerId) -> StoreResult<Vec<RawContactId>>;

    /// Deletes one raw identity row and returns the affected row count.
    fn delete_raw_contact(&self, raw_contact_id: RawContactId) -> StoreResult<usize>;
}

impl<T: ContactStore + ?Sized> ContactStore for &T {
    fn query_phone_rows(&self) -> StoreResult<Vec<PhoneRow>> {
        (**self).query_phone_rows()
    }

    fn query_raw_contact_ids(&self, owner_id: OwnerId) -> StoreResult<Vec<RawContactId>> {
        (**self).query_raw_contact_ids(owner_id)
    }

    fn delete_raw_contact(&self, raw_contact_id: RawContactId) -> StoreResult<usize> {
        (**self).delete_raw_contact(raw_contact_id)
    }
}
