//! Connection bootstrap for the contact database.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`, so deleting a raw contact
//!   cascades to its phone rows.
//! - Returned connections carry the current contact schema.

use super::schema::upgrade;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a contact database file and brings its schema up to date.
///
/// # Side effects
/// - Creates the file when missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        error!("event=db_open module=db status=error mode=file error_code=db_path_empty");
        return Err(DbError::EmptyPath);
    }
    open_with("file", || Connection::open(path))
}

/// Opens an in-memory contact database with the current schema.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    opener: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let result = opener().map_err(DbError::from).and_then(|mut conn| {
        let steps = bootstrap_connection(&mut conn)?;
        Ok((conn, steps))
    });

    match &result {
        Ok((_, steps)) => info!(
            "event=db_open module=db status=ok mode={mode} schema_steps={steps} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error={}",
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result.map(|(conn, _)| conn)
}

/// Returns the number of schema steps applied.
fn bootstrap_connection(conn: &mut Connection) -> DbResult<u32> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    upgrade(conn)
}
