use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::OperationKind;

/// Step of a per-space operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Create,
    ImportContent,
    Export,
    Delete,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::ImportContent => write!(f, "import_content"),
            Self::Export => write!(f, "export"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceFailure {
    pub space_id: String,
    pub title: String,
    pub stage: Stage,
    pub message: String,
}

/// A destination space created during import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedSpaceRecord {
    pub old_id: String,
    pub new_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    pub operation: OperationKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub succeeded: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub created: Vec<CreatedSpaceRecord>,
    pub failures: Vec<SpaceFailure>,
}

impl OperationReport {
    pub fn start(operation: OperationKind, total: usize) -> Self {
        let now = Utc::now();
        Self {
            operation,
            started_at: now,
            finished_at: now,
            total,
            succeeded: 0,
            created: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn record_failure(
        &mut self,
        space_id: &str,
        title: &str,
        stage: Stage,
        message: impl Into<String>,
    ) {
        self.failures.push(SpaceFailure {
            space_id: space_id.to_string(),
            title: title.to_string(),
            stage,
            message: message.into(),
        });
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
