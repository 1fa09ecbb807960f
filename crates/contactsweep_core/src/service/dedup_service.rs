//! In-process deduplication service and its connection handles.
//!
//! # Invariants
//! - At most one run is in flight per service; a concurrent call is
//!   rejected with `DedupError::Busy` (wire code 2).
//! - `stop` cancels the in-flight run; the run then reports `Error`.
//! - `active_connections` counts live `ServiceConnection` handles.

use super::runner::DedupRunner;
use crate::dedup::CancelToken;
use crate::outcome::{DedupError, OutcomeStatus, StatusCode};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Service lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceError {
    NotRunning,
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotRunning => write!(f, "deduplication service is not running"),
        }
    }
}

impl Error for ServiceError {}

struct ServiceInner {
    runner: Arc<dyn DedupRunner>,
    running: AtomicBool,
    connections: AtomicUsize,
    in_flight: Mutex<Option<CancelToken>>,
}

impl ServiceInner {
    fn in_flight_slot(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight slot when a call ends, including on unwind.
struct InFlightGuard<'a> {
    inner: &'a ServiceInner,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        *self.inner.in_flight_slot() = None;
    }
}

/// Deduplication service; clones share one lifecycle.
#[derive(Clone)]
pub struct DedupService {
    inner: Arc<ServiceInner>,
}

impl DedupService {
    /// Creates a stopped service over `runner`.
    pub fn new(runner: Arc<dyn DedupRunner>) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                runner,
                running: AtomicBool::new(false),
                connections: AtomicUsize::new(0),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Makes the service reachable. Idempotent.
    pub fn start(&self) {
        if !self.inner.running.swap(true, Ordering::SeqCst) {
            info!("event=service_start module=service status=ok");
        }
    }

    /// Makes the service unreachable and cancels any in-flight run.
    pub fn stop(&self) {
        if self.inner.running.swap(false, Ordering::SeqCst) {
            let cancelled = self.cancel_in_flight();
            info!("event=service_stop module=service status=ok cancelled_in_flight={cancelled}");
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn active_connections(&self) -> usize {
        self.inner.connections.load(Ordering::SeqCst)
    }

    /// Returns whether a run is currently executing.
    pub fn is_busy(&self) -> bool {
        self.inner.in_flight_slot().is_some()
    }

    /// Requests cancellation of the in-flight run, if any.
    pub fn cancel_in_flight(&self) -> bool {
        match self.inner.in_flight_slot().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Opens a connection handle to a running service.
    ///
    /// # Errors
    /// - `ServiceError::NotRunning` when `start` has not been called.
    pub fn connect(&self) -> Result<ServiceConnection, ServiceError> {
        if !self.is_running() {
            warn!("event=service_connect module=service status=error error_code=not_running");
            return Err(ServiceError::NotRunning);
        }
        let active = self.inner.connections.fetch_add(1, Ordering::SeqCst) + 1;
        info!("event=service_connect module=service status=ok active={active}");
        Ok(ServiceConnection {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Connects, runs `f`, and releases the connection on every path.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&ServiceConnection) -> T,
    ) -> Result<T, ServiceError> {
        let connection = self.connect()?;
        Ok(f(&connection))
    }
}

/// Live client handle; dropping it disconnects.
pub struct ServiceConnection {
    inner: Arc<ServiceInner>,
}

impl ServiceConnection {
    /// Remote call: runs deduplication once and returns the wire code.
    pub fn remove_duplicates(&self) -> StatusCode {
        self.remove_duplicates_outcome().status_code()
    }

    /// Same as `remove_duplicates`, keeping the full outcome.
    pub fn remove_duplicates_outcome(&self) -> OutcomeStatus {
        if !self.inner.running.load(Ordering::SeqCst) {
            return OutcomeStatus::Error(DedupError::Unavailable(
                ServiceError::NotRunning.to_string(),
            ));
        }

        let token = {
            let mut slot = self.inner.in_flight_slot();
            if slot.is_some() {
                warn!("event=service_call module=service status=rejected error_code=busy");
                return OutcomeStatus::Error(DedupError::Busy);
            }
            let token = CancelToken::new();
            *slot = Some(token.clone());
            token
        };
        let _guard = InFlightGuard { inner: &self.inner };

        self.inner.runner.run(&token)
    }

    /// Releases this connection explicitly.
    pub fn disconnect(self) {}
}

impl Drop for ServiceConnection {
    fn drop(&mut self) {
        let remaining = self.inner.connections.fetch_sub(1, Ordering::SeqCst) - 1;
        info!("event=service_disconnect module=service status=ok active={remaining}");
    }
}
