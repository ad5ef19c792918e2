//! Daily capacity accounting.
//!
//! # Responsibility
//! - Report planned load against the configured per-date budget.
//!
//! # Invariants
//! - Reports are advisory; nothing here blocks a state mutation.
//! - Tombstoned tasks never count toward load.

pub mod guard;
