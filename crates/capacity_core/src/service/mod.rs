//! Planner use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep hosts decoupled from storage details.

pub mod project_service;
pub mod recurrence_service;
pub mod task_service;
