//! Backends that execute one deduplication run per service call.

use crate::capability::GrantedCapabilities;
use crate::dedup::{CancelToken, DedupEngine, DedupPreview, PreviewError};
use crate::outcome::OutcomeStatus;
use crate::store::OnDemandSqliteStore;
use std::path::{Path, PathBuf};

/// Executes one run; implementations own how the store is reached.
pub trait DedupRunner: Send + Sync {
    fn run(&self, cancel: &CancelToken) -> OutcomeStatus;
}

impl<F> DedupRunner for F
where
    F: Fn(&CancelToken) -> OutcomeStatus + Send + Sync,
{
    fn run(&self, cancel: &CancelToken) -> OutcomeStatus {
        self(cancel)
    }
}

/// Runs the engine against the SQLite contact database, opened per call.
///
/// The engine's capability gate runs before the store is first touched, so a
/// denied run never opens or creates the database file.
#[derive(Debug, Clone)]
pub struct SqliteDedupRunner {
    db_path: PathBuf,
    capabilities: GrantedCapabilities,
}

impl SqliteDedupRunner {
    pub fn new(db_path: impl Into<PathBuf>, capabilities: GrantedCapabilities) -> Self {
        Self {
            db_path: db_path.into(),
            capabilities,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Dry run against the configured database.
    pub fn preview(&self) -> Result<DedupPreview, PreviewError> {
        let store = OnDemandSqliteStore::new(self.db_path.clone());
        DedupEngine::new(&store, &self.capabilities).preview()
    }
}

impl DedupRunner for SqliteDedupRunner {
    fn run(&self, cancel: &CancelToken) -> OutcomeStatus {
        let store = OnDemandSqliteStore::new(self.db_path.clone());
        DedupEngine::new(&store, &self.capabilities).run(cancel)
    }
}
