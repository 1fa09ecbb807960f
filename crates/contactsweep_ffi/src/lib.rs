//! Flutter-facing bindings for ContactSweep core.

pub mod api;
