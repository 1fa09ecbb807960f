//! Contact store capability declarations and checks.
//!
//! # Responsibility
//! - Name the capabilities a deduplication run needs.
//! - Abstract platform permission queries behind `CapabilityChecker`.
//!
//! # Invariants
//! - Capability ids are lowercase and matched exactly.
//! - A run consults the checker once, before any store I/O.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Capability on the external contact store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    ReadContacts,
    WriteContacts,
}

/// Config string value for contact read capability.
pub const CAPABILITY_READ_CONTACTS: &str = "read_contacts";
/// Config string value for contact write capability.
pub const CAPABILITY_WRITE_CONTACTS: &str = "write_contacts";

impl Capability {
    /// Capabilities a deduplication run requires, in check order.
    pub const REQUIRED_FOR_DEDUP: [Capability; 2] =
        [Capability::ReadContacts, Capability::WriteContacts];

    /// Stable string id used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadContacts => CAPABILITY_READ_CONTACTS,
            Self::WriteContacts => CAPABILITY_WRITE_CONTACTS,
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses one capability from its configuration string.
pub fn parse_capability(value: &str) -> Result<Capability, CapabilityError> {
    match value.trim() {
        "" => Err(CapabilityError::Empty),
        CAPABILITY_READ_CONTACTS => Ok(Capability::ReadContacts),
        CAPABILITY_WRITE_CONTACTS => Ok(Capability::WriteContacts),
        other => Err(CapabilityError::Unsupported(other.to_string())),
    }
}

/// Capability parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    Empty,
    Unsupported(String),
}

impl Display for CapabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "capability value must not be empty"),
            Self::Unsupported(value) => write!(f, "capability is unsupported: {value}"),
        }
    }
}

impl Error for CapabilityError {}

/// Permission query seam; platform adapters implement this.
pub trait CapabilityChecker {
    fn has_capability(&self, capability: Capability) -> bool;
}

impl<T: CapabilityChecker + ?Sized> CapabilityChecker for &T {
    fn has_capability(&self, capability: Capability) -> bool {
        (**self).has_capability(capability)
    }
}

/// Returns the first required capability that is not granted.
pub fn first_missing(checker: &impl CapabilityChecker) -> Option<Capability> {
    Capability::REQUIRED_FOR_DEDUP
        .into_iter()
        .find(|capability| !checker.has_capability(*capability))
}

/// Fixed capability set, typically built from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantedCapabilities {
    granted: BTreeSet<Capability>,
}

impl GrantedCapabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            granted: Capability::REQUIRED_FOR_DEDUP.into_iter().collect(),
        }
    }

    pub fn from_capabilities(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            granted: capabilities.into_iter().collect(),
        }
    }

    /// Parses configuration strings; the first invalid value fails the whole set.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, CapabilityError> {
        let granted = values
            .iter()
            .map(|value| parse_capability(value.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { granted })
    }

    pub fn grant(&mut self, capability: Capability) {
        self.granted.insert(capability);
    }

    pub fn revoke(&mut self, capability: Capability) {
        self.granted.remove(&capability);
    }
}

impl CapabilityChecker for GrantedCapabilities {
    fn has_capability(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }
}
