use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectStatus {
    Open,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Open => "OPEN",
            ProjectStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(ProjectStatus::Open),
            "COMPLETED" => Ok(ProjectStatus::Completed),
            other => anyhow::bail!("unknown project status {:?}", other),
        }
    }
}

/// A project as the services see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: i64,
    pub tech_stack: Vec<String>,
    pub status: ProjectStatus,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

/// Raw `projects` row; status is stored as text.
#[derive(Debug, FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: i64,
    pub tech_stack: Vec<String>,
    pub status: String,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
}

impl TryFrom<ProjectRow> for Project {
    type Error = anyhow::Error;

    fn try_from(r: ProjectRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            title: r.title,
            description: r.description,
            budget: r.budget,
            tech_stack: r.tech_stack,
            status: r.status.parse()?,
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub budget: i64,
    pub tech_stack: Vec<String>,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<i64>,
    pub tech_stack: Option<Vec<String>>,
    pub status: Option<ProjectStatus>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.budget.is_none()
            && self.tech_stack.is_none()
            && self.status.is_none()
    }

    pub fn apply(self, p: &mut Project, at: OffsetDateTime) {
        if let Some(v) = self.title {
            p.title = v;
        }
        if let Some(v) = self.description {
            p.description = v;
        }
        if let Some(v) = self.budget {
            p.budget = v;
        }
        if let Some(v) = self.tech_stack {
            p.tech_stack = v;
        }
        if let Some(v) = self.status {
            p.status = v;
        }
        p.updated_at = Some(at);
    }
}

/// Listing query. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub created_by: Option<Uuid>,
    pub skip: i64,
    pub limit: Option<i64>,
}

/// One (user, project) completion.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Completion {
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub completed_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_roundtrip() {
        for s in [ProjectStatus::Open, ProjectStatus::Completed] {
            assert_eq!(s.as_str().parse::<ProjectStatus>().unwrap(), s);
        }
        assert!("open".parse::<ProjectStatus>().is_err());
        assert_eq!(serde_json::to_string(&ProjectStatus::Completed).unwrap(), "\"COMPLETED\"");
    }

    #[test]
    fn empty_changes() {
        assert!(ProjectChanges::default().is_empty());
        let c = ProjectChanges { budget: Some(10), ..Default::default() };
        assert!(!c.is_empty());
    }
}
