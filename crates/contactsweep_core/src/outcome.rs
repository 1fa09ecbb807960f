//! Deduplication outcome and the 3-way wire status code.
//!
//! # Invariants
//! - `PermissionDenied` and every `Error` map to `StatusCode::Error` (2);
//!   the wire format does not distinguish them.
//! - Unknown wire values decode as `StatusCode::Error`.

use crate::capability::Capability;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Terminal failure of one deduplication run.
#[derive(Debug)]
pub enum DedupError {
    /// Store raised on query or on a delete that left it unusable.
    Store(StoreError),
    /// The run was cancelled by its caller before completing.
    Cancelled,
    /// Another run is already in flight against the same service.
    Busy,
    /// Boundary could not reach a running service or backend.
    Unavailable(String),
}

impl Display for DedupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Cancelled => write!(f, "deduplication run cancelled"),
            Self::Busy => write!(f, "another deduplication run is in progress"),
            Self::Unavailable(message) => write!(f, "deduplication unavailable: {message}"),
        }
    }
}

impl Error for DedupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Cancelled | Self::Busy | Self::Unavailable(_) => None,
        }
    }
}

impl From<StoreError> for DedupError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Cancelled => Self::Cancelled,
            other => Self::Store(other),
        }
    }
}

/// Result of one invocation; computed once and never retained.
#[derive(Debug)]
pub enum OutcomeStatus {
    Success { deleted_count: usize },
    NoDuplicatesFound,
    PermissionDenied { missing: Capability },
    Error(DedupError),
}

impl OutcomeStatus {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Success { .. } => StatusCode::Success,
            Self::NoDuplicatesFound => StatusCode::NoDuplicatesFound,
            Self::PermissionDenied { .. } | Self::Error(_) => StatusCode::Error,
        }
    }

    /// Short label used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::NoDuplicatesFound => "no_duplicates",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::Error(_) => "error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl Display for OutcomeStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success { deleted_count } => {
                write!(f, "removed {deleted_count} duplicate contact(s)")
            }
            Self::NoDuplicatesFound => write!(f, "no duplicate contacts found"),
            Self::PermissionDenied { missing } => {
                write!(f, "permission denied: missing `{missing}`")
            }
            Self::Error(err) => write!(f, "deduplication failed: {err}"),
        }
    }
}

/// Integer status code crossing the service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Success,
    NoDuplicatesFound,
    Error,
}

impl StatusCode {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::NoDuplicatesFound => 1,
            Self::Error => 2,
        }
    }

    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::NoDuplicatesFound,
            _ => Self::Error,
        }
    }

    /// Short user-facing notification text for this code.
    pub fn notification(self) -> &'static str {
        match self {
            Self::Success => "Duplicates removed",
            Self::NoDuplicatesFound => "No duplicates found",
            Self::Error => "Error during removal",
        }
    }
}

impl From<&OutcomeStatus> for StatusCode {
    fn from(value: &OutcomeStatus) -> Self {
        value.status_code()
    }
}
