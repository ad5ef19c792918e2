//! Planner domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by planner business logic.
//! - Keep recurrence rules strongly typed so invalid shapes are unrepresentable.
//!
//! # Invariants
//! - Every task and project is identified by a stable UUID.
//! - Series membership is decided by signature equality only.
//! - Deletion of tasks is represented by soft-delete tombstones.

pub mod project;
pub mod rule;
pub mod settings;
pub mod task;
