//! Duplicate detection and removal.
//!
//! # Responsibility
//! - Group snapshot records by `NormalizedKey`.
//! - Select survivors and build the ordered deletion plan.
//! - Drive store deletions and fold the run into one `OutcomeStatus`.
//!
//! # Invariants
//! - Permission checks happen before any store I/O.
//! - The survivor of a group is always its maximum `OwnerId`.
//! - Nothing survives past the returned outcome; runs are stateless.

mod cancel;
mod engine;
mod plan;

pub use cancel::CancelToken;
pub use engine::{DedupEngine, DedupPreview, DedupReport, PreviewError, PreviewGroup};
pub use plan::{DeletionPlan, DuplicateGroups};
