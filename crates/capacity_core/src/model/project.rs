//! Project (task container) domain model.
//!
//! # Invariants
//! - Projects own no tasks; tasks point at projects through `project_id`.
//! - Templates are projects with status `template`; their linked tasks are steps.

use crate::model::task::{now_epoch_ms, ProjectId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Project lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Archived,
    /// Reusable step list instantiated into new active projects.
    Template,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Template => "template",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "archived" => Some(Self::Archived),
            "template" => Some(Self::Template),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectValidationError {
    NilId,
    BlankTitle,
}

impl Display for ProjectValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "project id must not be nil"),
            Self::BlankTitle => write!(f, "project title must not be blank"),
        }
    }
}

impl Error for ProjectValidationError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub description: Option<String>,
    /// Display color, opaque to core.
    pub color: Option<String>,
    pub status: ProjectStatus,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Project {
    /// Creates an active project with a generated stable ID.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            color: None,
            status: ProjectStatus::Active,
            created_at: now_epoch_ms(),
        }
    }

    pub fn is_template(&self) -> bool {
        self.status == ProjectStatus::Template
    }

    pub fn validate(&self) -> Result<(), ProjectValidationError> {
        if self.id.is_nil() {
            return Err(ProjectValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(ProjectValidationError::BlankTitle);
        }
        Ok(())
    }
}
