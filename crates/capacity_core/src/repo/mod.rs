//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the persistence contract the planner core depends on.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes must enforce model `validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Each task write is all-or-nothing; no partially written instance exists.

pub mod error;
pub mod memory;
pub mod project_repo;
pub mod settings_repo;
pub mod task_repo;
