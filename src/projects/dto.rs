use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::projects::repo_types::{Project, ProjectChanges, ProjectStatus};

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: String,
    pub budget: i64,
    pub tech_stack: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProjectRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<i64>,
    pub tech_stack: Option<Vec<String>>,
    pub status: Option<ProjectStatus>,
}

impl From<UpdateProjectRequest> for ProjectChanges {
    fn from(r: UpdateProjectRequest) -> Self {
        Self {
            title: r.title,
            description: r.description,
            budget: r.budget,
            tech_stack: r.tech_stack,
            status: r.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub status: Option<ProjectStatus>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
            status: None,
        }
    }
}

fn default_limit() -> i64 {
    100
}

/// A project as returned to a particular caller.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: i64,
    pub tech_stack: Vec<String>,
    pub status: ProjectStatus,
    pub created_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
}

impl ProjectView {
    pub fn new(p: Project, is_completed: bool) -> Self {
        Self {
            id: p.id,
            title: p.title,
            description: p.description,
            budget: p.budget,
            tech_stack: p.tech_stack,
            status: p.status,
            created_by: p.created_by,
            created_at: p.created_at,
            updated_at: p.updated_at,
            is_completed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompletedProjectView {
    #[serde(flatten)]
    pub project: ProjectView,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UpdateOutcome {
    Updated {
        #[serde(flatten)]
        project: ProjectView,
        message: &'static str,
    },
    Unchanged {
        id: Uuid,
        message: &'static str,
    },
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: Uuid,
    pub message: &'static str,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CompleteResponse {
    pub id: Uuid,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
    pub message: &'static str,
}
