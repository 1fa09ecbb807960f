//! Core logic for ContactSweep duplicate-contact removal.
//!
//! Pipeline per call: capability gate, snapshot read, grouping by
//! normalized `(number, name)`, survivor selection, then one delete per raw
//! contact row. The service boundary reduces the outcome to a 3-way code.

pub mod capability;
pub mod config;
pub mod db;
pub mod dedup;
pub mod logging;
pub mod model;
pub mod outcome;
pub mod reader;
pub mod service;
pub mod store;

pub use capability::{
    first_missing, parse_capability, Capability, CapabilityChecker, CapabilityError,
    GrantedCapabilities,
};
pub use config::{ConfigError, DedupConfig};
pub use dedup::{
    CancelToken, DedupEngine, DedupPreview, DedupReport, DeletionPlan, DuplicateGroups,
    PreviewError, PreviewGroup,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::contact::{
    normalize_display_name, normalize_phone_digits, ContactRecord, NormalizedKey, OwnerId,
    RawContactId,
};
pub use outcome::{DedupError, OutcomeStatus, StatusCode};
pub use reader::{Snapshot, SnapshotReader};
pub use service::{DedupRunner, DedupService, ServiceConnection, ServiceError, SqliteDedupRunner};
pub use store::{
    ContactStore, NewContact, OnDemandSqliteStore, PhoneRow, SqliteContactStore, StoreError,
    StoreResult,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
