use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::StoreResult,
    projects::repo_types::{NewProject, Project, ProjectChanges, ProjectFilter, ProjectRow},
};

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// New projects start as `OPEN`.
    async fn create_project(&self, new: NewProject) -> StoreResult<Project>;
    async fn list_projects(&self, filter: &ProjectFilter) -> StoreResult<Vec<Project>>;
    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>>;
    /// Projects among `ids` that still exist, in no particular order.
    async fn get_projects(&self, ids: &[Uuid]) -> StoreResult<Vec<Project>>;
    /// Returns `None` when the project does not exist.
    async fn update_project(
        &self,
        id: Uuid,
        changes: ProjectChanges,
        updated_at: OffsetDateTime,
    ) -> StoreResult<Option<Project>>;
    /// Returns whether a row was removed. Completion marks on the project go
    /// with it.
    async fn delete_project(&self, id: Uuid) -> StoreResult<bool>;
}

const COLUMNS: &str =
    "id, title, description, budget, tech_stack, status, created_by, created_at, updated_at";

#[derive(Clone)]
pub struct PgProjectStore {
    db: PgPool,
}

impl PgProjectStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_projects(rows: Vec<ProjectRow>) -> StoreResult<Vec<Project>> {
    let projects = rows
        .into_iter()
        .map(Project::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(projects)
}

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            r#"
            INSERT INTO projects (title, description, budget, tech_stack, status, created_by, created_at)
            VALUES ($1, $2, $3, $4, 'OPEN', $5, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.budget)
        .bind(&new.tech_stack)
        .bind(new.created_by)
        .bind(new.created_at)
        .fetch_one(&self.db)
        .await?;
        Ok(row.try_into()?)
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> StoreResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM projects
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR created_by = $2)
            ORDER BY created_at DESC
            OFFSET $3
            LIMIT $4
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.created_by)
        .bind(filter.skip)
        .bind(filter.limit)
        .fetch_all(&self.db)
        .await?;
        into_projects(rows)
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Project::try_from).transpose()?)
    }

    async fn get_projects(&self, ids: &[Uuid]) -> StoreResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {COLUMNS} FROM projects WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await?;
        into_projects(rows)
    }

    async fn update_project(
        &self,
        id: Uuid,
        changes: ProjectChanges,
        updated_at: OffsetDateTime,
    ) -> StoreResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            r#"
            UPDATE projects
               SET title       = COALESCE($2, title),
                   description = COALESCE($3, description),
                   budget      = COALESCE($4, budget),
                   tech_stack  = COALESCE($5, tech_stack),
                   status      = COALESCE($6, status),
                   updated_at  = $7
             WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.budget)
        .bind(changes.tech_stack)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(updated_at)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Project::try_from).transpose()?)
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
