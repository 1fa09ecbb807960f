//! Deduplication run orchestration.
//!
//! # Responsibility
//! - Gate on capabilities, read a snapshot, plan, then delete plan owners.
//! - Absorb per-row delete anomalies; stop on hard store failures.
//! - Map cancellation to an `Error` outcome, never a partial `Success`.
//!
//! # Invariants
//! - One run is single-threaded; reads and deletes never overlap.
//! - Deletions are applied one raw row at a time without a plan-wide
//!   transaction. A crash or hard failure mid-plan leaves the store
//!   partially deduplicated; the next run picks up the remaining groups.

use super::cancel::CancelToken;
use super::plan::{DeletionPlan, DuplicateGroups};
use crate::capability::{first_missing, Capability, CapabilityChecker};
use crate::model::contact::{NormalizedKey, OwnerId};
use crate::outcome::{DedupError, OutcomeStatus};
use crate::reader::SnapshotReader;
use crate::store::{ContactStore, StoreError};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Counters collected during one run, logged when it ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    pub records_read: usize,
    pub rows_skipped: usize,
    pub duplicate_groups: usize,
    pub planned_owners: usize,
    pub owners_processed: usize,
    pub raw_rows_deleted: usize,
    pub row_anomalies: usize,
}

/// One duplicate group as shown to a user before removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewGroup {
    pub key: NormalizedKey,
    pub survivor: OwnerId,
    pub removed: Vec<OwnerId>,
}

/// Dry-run result: what a run would delete right now.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupPreview {
    pub records_read: usize,
    pub rows_skipped: usize,
    pub groups: Vec<PreviewGroup>,
    pub plan: DeletionPlan,
}

impl DedupPreview {
    pub fn has_duplicates(&self) -> bool {
        !self.plan.is_empty()
    }
}

/// Failure of a dry run.
#[derive(Debug)]
pub enum PreviewError {
    PermissionDenied(Capability),
    Store(StoreError),
}

impl Display for PreviewError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied(missing) => write!(f, "permission denied: missing `{missing}`"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PreviewError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PermissionDenied(_) => None,
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for PreviewError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Runs duplicate removal against one store.
///
/// The engine holds only borrowed collaborators; groups and plans live on
/// the stack of a single `run` call.
pub struct DedupEngine<'a, S: ContactStore + ?Sized, C: CapabilityChecker + ?Sized> {
    store: &'a S,
    checker: &'a C,
}

impl<'a, S: ContactStore + ?Sized, C: CapabilityChecker + ?Sized> DedupEngine<'a, S, C> {
    pub fn new(store: &'a S, checker: &'a C) -> Self {
        Self { store, checker }
    }

    /// Executes one full deduplication run.
    ///
    /// # Contract
    /// - Missing read or write capability returns `PermissionDenied` before
    ///   the store is touched.
    /// - Empty plan returns `NoDuplicatesFound`.
    /// - `Success.deleted_count` counts plan owners processed, not raw rows.
    pub fn run(&self, cancel: &CancelToken) -> OutcomeStatus {
        self.run_with_report(cancel).0
    }

    /// Same as `run`, also returning the run counters.
    pub fn run_with_report(&self, cancel: &CancelToken) -> (OutcomeStatus, DedupReport) {
        let run_id = Uuid::new_v4();
        let started_at = Instant::now();
        info!("event=dedup_run module=dedup status=start run_id={run_id}");

        let mut report = DedupReport::default();
        let outcome = self.run_inner(run_id, cancel, &mut report);
        let duration_ms = started_at.elapsed().as_millis();

        match &outcome {
            OutcomeStatus::Success { .. } | OutcomeStatus::NoDuplicatesFound => info!(
                "event=dedup_run module=dedup status=ok run_id={run_id} outcome={} duration_ms={duration_ms} records={} skipped={} groups={} planned={} processed={} rows_deleted={} anomalies={}",
                outcome.label(),
                report.records_read,
                report.rows_skipped,
                report.duplicate_groups,
                report.planned_owners,
                report.owners_processed,
                report.raw_rows_deleted,
                report.row_anomalies
            ),
            OutcomeStatus::PermissionDenied { missing } => warn!(
                "event=dedup_run module=dedup status=denied run_id={run_id} duration_ms={duration_ms} missing={missing}"
            ),
            OutcomeStatus::Error(err) => error!(
                "event=dedup_run module=dedup status=error run_id={run_id} duration_ms={duration_ms} processed={} planned={} error={err}",
                report.owners_processed, report.planned_owners
            ),
        }

        (outcome, report)
    }

    /// Computes groups and the plan without deleting anything.
    pub fn preview(&self) -> Result<DedupPreview, PreviewError> {
        if let Some(missing) = first_missing(&self.checker) {
            return Err(PreviewError::PermissionDenied(missing));
        }

        let snapshot = SnapshotReader::new(self.store).read()?;
        let groups = DuplicateGroups::from_records(&snapshot.records);
        let preview_groups = groups
            .duplicates()
            .map(|(key, ranked)| PreviewGroup {
                key: key.clone(),
                survivor: ranked[0],
                removed: ranked[1..].to_vec(),
            })
            .collect();

        Ok(DedupPreview {
            records_read: snapshot.records.len(),
            rows_skipped: snapshot.skipped,
            groups: preview_groups,
            plan: DeletionPlan::from_groups(&groups),
        })
    }

    fn run_inner(
        &self,
        run_id: Uuid,
        cancel: &CancelToken,
        report: &mut DedupReport,
    ) -> OutcomeStatus {
        if let Some(missing) = first_missing(&self.checker) {
            return OutcomeStatus::PermissionDenied { missing };
        }
        if cancel.is_cancelled() {
            return OutcomeStatus::Error(DedupError::Cancelled);
        }

        let snapshot = match SnapshotReader::new(self.store).read() {
            Ok(snapshot) => snapshot,
            Err(err) => return OutcomeStatus::Error(err.into()),
        };
        report.records_read = snapshot.records.len();
        report.rows_skipped = snapshot.skipped;

        let groups = DuplicateGroups::from_records(&snapshot.records);
        let plan = DeletionPlan::from_groups(&groups);
        report.duplicate_groups = groups.duplicate_count();
        report.planned_owners = plan.len();

        if plan.is_empty() {
            return OutcomeStatus::NoDuplicatesFound;
        }

        match self.execute_plan(run_id, &plan, cancel, report) {
            Ok(()) => OutcomeStatus::Success {
                deleted_count: report.owners_processed,
            },
            Err(err) => OutcomeStatus::Error(err),
        }
    }

    fn execute_plan(
        &self,
        run_id: Uuid,
        plan: &DeletionPlan,
        cancel: &CancelToken,
        report: &mut DedupReport,
    ) -> Result<(), DedupError> {
        for owner_id in plan.iter() {
            if cancel.is_cancelled() {
                return Err(DedupError::Cancelled);
            }

            let raw_contact_ids = self.store.query_raw_contact_ids(owner_id)?;
            if raw_contact_ids.is_empty() {
                report.row_anomalies += 1;
                warn!(
                    "event=dedup_delete module=dedup status=skipped run_id={run_id} owner_id={owner_id} reason=no_raw_contacts"
                );
            }

            for raw_contact_id in raw_contact_ids {
                match self.store.delete_raw_contact(raw_contact_id) {
                    Ok(1) => report.raw_rows_deleted += 1,
                    Ok(rows) => {
                        report.raw_rows_deleted += rows;
                        report.row_anomalies += 1;
                        warn!(
                            "event=dedup_delete module=dedup status=mismatch run_id={run_id} owner_id={owner_id} raw_contact_id={raw_contact_id} expected=1 actual={rows}"
                        );
                    }
                    Err(err) if !err.is_fatal() => {
                        report.row_anomalies += 1;
                        warn!(
                            "event=dedup_delete module=dedup status=rejected run_id={run_id} owner_id={owner_id} raw_contact_id={raw_contact_id} error={err}"
                        );
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            report.owners_processed += 1;
            debug!(
                "event=dedup_delete module=dedup status=ok run_id={run_id} owner_id={owner_id} processed={}/{}",
                report.owners_processed,
                plan.len()
            );
        }
        Ok(())
    }
}
