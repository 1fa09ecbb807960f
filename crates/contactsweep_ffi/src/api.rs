//! FFI use-case API for mobile callers.
//!
//! # Responsibility
//! - Expose the duplicate-removal call with its 3-way status code.
//! - Own the process-wide service instance behind the bindings.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - `remove_duplicate_contacts` returns only `0`, `1` or `2`.
//! - At most one run executes per process; reconfiguring is refused while
//!   one is in flight.

use contactsweep_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    DedupConfig, DedupPreview, DedupService, GrantedCapabilities, SqliteDedupRunner, StatusCode,
};
use log::{error, info};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

static SERVICE_STATE: Mutex<Option<ServiceState>> = Mutex::new(None);
// Held for the whole of a run, across service replacement.
static RUN_GATE: Mutex<()> = Mutex::new(());

struct ServiceState {
    service: DedupService,
    runner: Arc<SqliteDedupRunner>,
}

/// Minimal health-check API.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - `level`: `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory for rolling logs.
/// - Returns empty string on success and the error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Result of one duplicate-removal call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupActionResponse {
    /// Wire status: `0` success, `1` no duplicates, `2` error.
    pub code: i32,
    /// Short notification text for the UI.
    pub message: String,
}

/// One duplicate group in a preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroupItem {
    pub number_digits: String,
    pub display_name: String,
    pub survivor_owner_id: i64,
    pub removed_owner_ids: Vec<i64>,
}

/// Dry-run envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePreviewResponse {
    pub ok: bool,
    pub groups: Vec<DuplicateGroupItem>,
    pub message: String,
}

/// Configures and starts the deduplication service.
///
/// Replaces a previously configured service, stopping it first.
///
/// # FFI contract
/// - Sync call; does not touch the contact database.
/// - Refused with a busy error while a removal run is in progress.
/// - Returns empty string on success and the error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_dedup_service(db_path: String, granted_capabilities: Vec<String>) -> String {
    let config = DedupConfig {
        db_path: db_path.trim().into(),
        granted_capabilities,
        ..DedupConfig::default()
    };
    match install_service(&config) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Removes duplicate contacts and returns the wire status code.
///
/// # FFI contract
/// - Sync call, DB-backed, blocking; call off the UI thread.
/// - At most one run per process: a concurrent call returns `2`, even
///   across a reconfiguration.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn remove_duplicate_contacts() -> i32 {
    call_remove_duplicates().as_i32()
}

/// Same as `remove_duplicate_contacts`, with the user-facing notification.
#[flutter_rust_bridge::frb(sync)]
pub fn remove_duplicate_contacts_with_message() -> DedupActionResponse {
    let code = call_remove_duplicates();
    DedupActionResponse {
        code: code.as_i32(),
        message: code.notification().to_string(),
    }
}

/// Lists what `remove_duplicate_contacts` would delete, without deleting.
#[flutter_rust_bridge::frb(sync)]
pub fn preview_duplicate_contacts() -> DuplicatePreviewResponse {
    let runner = match with_service_state(|state| Arc::clone(&state.runner)) {
        Ok(runner) => runner,
        Err(err) => return preview_failure(err),
    };
    match runner.preview() {
        Ok(preview) => to_preview_response(preview),
        Err(err) => preview_failure(format!("preview failed: {err}")),
    }
}

/// Stops the service, cancelling any in-flight run.
///
/// Returns `false` when no service was configured.
#[flutter_rust_bridge::frb(sync)]
pub fn stop_dedup_service() -> bool {
    match lock_state().take() {
        Some(state) => {
            state.service.stop();
            true
        }
        None => false,
    }
}

fn lock_state() -> MutexGuard<'static, Option<ServiceState>> {
    SERVICE_STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Takes the run gate without blocking; `None` while a run holds it.
fn try_run_gate() -> Option<MutexGuard<'static, ()>> {
    match RUN_GATE.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}

fn install_service(config: &DedupConfig) -> Result<(), String> {
    config.validate().map_err(|err| err.to_string())?;
    let capabilities = config.capabilities().map_err(|err| err.to_string())?;

    let Some(_gate) = try_run_gate() else {
        info!("event=ffi_configure module=ffi status=busy");
        return Err("dedup service busy: a removal run is in progress".to_string());
    };
    let state = build_state(config, capabilities);
    let mut slot = lock_state();
    if let Some(previous) = slot.replace(state) {
        previous.service.stop();
    }
    info!("event=ffi_configure module=ffi status=ok");
    Ok(())
}

fn build_state(config: &DedupConfig, capabilities: GrantedCapabilities) -> ServiceState {
    let runner = Arc::new(SqliteDedupRunner::new(config.db_path.clone(), capabilities));
    let service = DedupService::new(runner.clone());
    service.start();
    ServiceState { service, runner }
}

/// Runs `f` on the configured service, configuring from env on first use.
fn with_service_state<T>(f: impl FnOnce(&ServiceState) -> T) -> Result<T, String> {
    let mut slot = lock_state();
    if slot.is_none() {
        let config = DedupConfig::default()
            .with_env_overrides()
            .map_err(|err| format!("dedup config invalid: {err}"))?;
        let capabilities = config.capabilities().map_err(|err| err.to_string())?;
        *slot = Some(build_state(&config, capabilities));
    }
    match slot.as_ref() {
        Some(state) => Ok(f(state)),
        None => Err("dedup service unavailable".to_string()),
    }
}

fn call_remove_duplicates() -> StatusCode {
    let Some(_gate) = try_run_gate() else {
        info!("event=ffi_remove_duplicates module=ffi status=busy");
        return StatusCode::Error;
    };
    // Clone the handle so the state lock is not held during the run.
    let service = match with_service_state(|state| state.service.clone()) {
        Ok(service) => service,
        Err(err) => {
            error!("event=ffi_remove_duplicates module=ffi status=error error={err}");
            return StatusCode::Error;
        }
    };
    match service.with_connection(|connection| connection.remove_duplicates()) {
        Ok(code) => code,
        Err(err) => {
            error!("event=ffi_remove_duplicates module=ffi status=error error={err}");
            StatusCode::Error
        }
    }
}

fn to_preview_response(preview: DedupPreview) -> DuplicatePreviewResponse {
    let message = if preview.has_duplicates() {
        format!(
            "Found {} duplicate group(s); {} contact(s) would be removed.",
            preview.groups.len(),
            preview.plan.len()
        )
    } else {
        StatusCode::NoDuplicatesFound.notification().to_string()
    };
    let groups = preview
        .groups
        .into_iter()
        .map(|group| DuplicateGroupItem {
            number_digits: group.key.digits,
            display_name: group.key.name,
            survivor_owner_id: group.survivor.value(),
            removed_owner_ids: group.removed.into_iter().map(|id| id.value()).collect(),
        })
        .collect();
    DuplicatePreviewResponse {
        ok: true,
        groups,
        message,
    }
}

fn preview_failure(message: String) -> DuplicatePreviewResponse {
    DuplicatePreviewResponse {
        ok: false,
        groups: Vec::new(),
        message,
    }
}
