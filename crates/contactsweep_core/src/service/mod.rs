//! Service boundary for deduplication calls.
//!
//! # Responsibility
//! - Model the bind/connect style remote service as explicit handles.
//! - Serialize invocations so only one run touches the store at a time.
//! - Reduce outcomes to the 3-way wire status code.
//!
//! # Invariants
//! - A service must be started before `connect` succeeds.
//! - Connection handles are released on every exit path (`Drop`).

pub mod dedup_service;
pub mod runner;

pub use dedup_service::{DedupService, ServiceConnection, ServiceError};
pub use runner::{DedupRunner, SqliteDedupRunner};
