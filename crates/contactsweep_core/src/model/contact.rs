//! Contact record and matching key.
//!
//! # Invariants
//! - `OwnerId` values are unique per contact and assigned monotonically by
//!   the store, so the maximum id in a group is the newest contact.
//! - Phone normalization keeps ASCII decimal digits only.
//! - Name normalization trims outer whitespace only; no case folding and no
//!   internal whitespace collapsing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

static NON_DIGIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9]+").expect("valid non-digit regex"));

/// Identifier of a logical contact (the owner of phone rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub i64);

impl OwnerId {
    /// Parses a store-provided owner id column value.
    ///
    /// Accepts an optionally padded base-10 `i64`; anything else is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse::<i64>().ok().map(Self)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one deletable row in the raw identity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawContactId(pub i64);

impl Display for RawContactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One phone-number row tied to its owning contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub owner_id: OwnerId,
    /// May be empty; an empty name is still a valid key component.
    pub display_name: String,
    /// Raw, unnormalized number as stored.
    pub phone_number: String,
}

impl ContactRecord {
    pub fn new(
        owner_id: OwnerId,
        display_name: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            owner_id,
            display_name: display_name.into(),
            phone_number: phone_number.into(),
        }
    }

    /// Returns the matching key for this record.
    pub fn key(&self) -> NormalizedKey {
        NormalizedKey::from_record(self)
    }
}

/// Matching key `(digits-only number, trimmed name)`.
///
/// Field order makes `Ord` sort by number first, then name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NormalizedKey {
    pub digits: String,
    pub name: String,
}

impl NormalizedKey {
    pub fn new(phone_number: &str, display_name: &str) -> Self {
        Self {
            digits: normalize_phone_digits(phone_number),
            name: normalize_display_name(display_name).to_string(),
        }
    }

    pub fn from_record(record: &ContactRecord) -> Self {
        Self::new(&record.phone_number, &record.display_name)
    }
}

/// Strips every character that is not an ASCII decimal digit.
///
/// No length or country-code validation is performed.
pub fn normalize_phone_digits(raw: &str) -> String {
    NON_DIGIT_RE.replace_all(raw, "").into_owned()
}

/// Trims leading and trailing whitespace, leaving everything else intact.
pub fn normalize_display_name(raw: &str) -> &str {
    raw.trim()
}
