use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{error::StoreResult, projects::repo_types::Completion};

/// Per-user completion marks, unique per (user, project).
#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// Inserts the mark unless it exists. Returns `true` only for a new row,
    /// and `StoreError::MissingReference` when the project is gone.
    async fn mark_completed(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<bool>;
    /// Subset of `project_ids` the user has completed.
    async fn completed_among(&self, user_id: Uuid, project_ids: &[Uuid]) -> StoreResult<HashSet<Uuid>>;
    /// The user's marks, most recent first.
    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Completion>>;
}

#[derive(Clone)]
pub struct PgCompletionStore {
    db: PgPool,
}

impl PgCompletionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CompletionStore for PgCompletionStore {
    async fn mark_completed(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO project_completions (user_id, project_id, completed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, project_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .bind(at)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn completed_among(&self, user_id: Uuid, project_ids: &[Uuid]) -> StoreResult<HashSet<Uuid>> {
        if project_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT project_id
              FROM project_completions
             WHERE user_id = $1 AND project_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(project_ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Completion>> {
        let rows = sqlx::query_as::<_, Completion>(
            r#"
            SELECT user_id, project_id, completed_at
              FROM project_completions
             WHERE user_id = $1
             ORDER BY completed_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
