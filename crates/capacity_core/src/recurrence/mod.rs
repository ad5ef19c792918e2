//! Recurrence expansion and series replenishment.
//!
//! # Responsibility
//! - Compute the calendar dates a rule occupies within a closed range.
//! - Plan the instances needed to keep every series materialized up to a horizon.
//!
//! # Invariants
//! - Both entry points are pure: no I/O, no dependence on "today".
//! - Iteration is bounded by an explicit span limit, not only by date comparison.

pub mod expand;
pub mod replenish;
