//! Contact domain model used by snapshot reading and deduplication.
//!
//! # Responsibility
//! - Define the transient records pulled from the contact store.
//! - Define the normalized matching key shared by grouping and tests.
//!
//! # Invariants
//! - Records are never persisted by core; they live for one run only.
//! - Two records are duplicates iff their `NormalizedKey` values are equal.

pub mod contact;
