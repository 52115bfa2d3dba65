use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    error::{StoreError, StoreResult},
    projects::{
        completions::CompletionStore,
        repo::ProjectStore,
        repo_types::{Completion, NewProject, Project, ProjectChanges, ProjectFilter, ProjectStatus},
    },
};

/// Process-local store backing all three store traits. Used by the test
/// suite and when no `DATABASE_URL` is configured.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    emails: HashMap<String, Uuid>,
    // insertion order; listing relies on it to break created_at ties
    projects: Vec<Project>,
    completions: BTreeMap<(Uuid, Uuid), OffsetDateTime>,
}

impl MemoryStore {
    pub async fn user_count(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn completion_count(&self, project_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .completions
            .keys()
            .filter(|(_, p)| *p == project_id)
            .count()
    }

    /// Writes a completion mark without checking the project exists.
    pub async fn insert_completion(&self, user_id: Uuid, project_id: Uuid, at: OffsetDateTime) {
        self.inner
            .write()
            .await
            .completions
            .entry((user_id, project_id))
            .or_insert(at);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.emails.contains_key(&new.email) {
            return Err(StoreError::Duplicate);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            created_at: new.created_at,
        };
        inner.emails.insert(user.email.clone(), user.id);
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .emails
            .get(email)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        let project = Project {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            budget: new.budget,
            tech_stack: new.tech_stack,
            status: ProjectStatus::Open,
            created_by: new.created_by,
            created_at: new.created_at,
            updated_at: None,
        };
        self.inner.write().await.projects.push(project.clone());
        Ok(project)
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> StoreResult<Vec<Project>> {
        let inner = self.inner.read().await;
        let mut matching: Vec<&Project> = inner
            .projects
            .iter()
            .rev()
            .filter(|p| filter.status.map_or(true, |s| p.status == s))
            .filter(|p| filter.created_by.map_or(true, |u| p.created_by == u))
            .collect();
        // stable: equal timestamps stay newest-inserted first
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let skip = filter.skip.max(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(matching.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let inner = self.inner.read().await;
        Ok(inner.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn get_projects(&self, ids: &[Uuid]) -> StoreResult<Vec<Project>> {
        let wanted: HashSet<&Uuid> = ids.iter().collect();
        let inner = self.inner.read().await;
        Ok(inner
            .projects
            .iter()
            .filter(|p| wanted.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn update_project(
        &self,
        id: Uuid,
        changes: ProjectChanges,
        updated_at: OffsetDateTime,
    ) -> StoreResult<Option<Project>> {
        let mut inner = self.inner.write().await;
        let Some(project) = inner.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        changes.apply(project, updated_at);
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.projects.len();
        inner.projects.retain(|p| p.id != id);
        if inner.projects.len() == before {
            return Ok(false);
        }
        inner.completions.retain(|(_, p), _| *p != id);
        Ok(true)
    }
}

#[async_trait]
impl CompletionStore for MemoryStore {
    async fn mark_completed(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        at: OffsetDateTime,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        if !inner.projects.iter().any(|p| p.id == project_id) {
            return Err(StoreError::MissingReference);
        }
        if inner.completions.contains_key(&(user_id, project_id)) {
            return Ok(false);
        }
        inner.completions.insert((user_id, project_id), at);
        Ok(true)
    }

    async fn completed_among(&self, user_id: Uuid, project_ids: &[Uuid]) -> StoreResult<HashSet<Uuid>> {
        let inner = self.inner.read().await;
        Ok(project_ids
            .iter()
            .filter(|p| inner.completions.contains_key(&(user_id, **p)))
            .copied()
            .collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Completion>> {
        let inner = self.inner.read().await;
        let mut out: Vec<Completion> = inner
            .completions
            .range((user_id, Uuid::nil())..=(user_id, Uuid::from_u128(u128::MAX)))
            .map(|(&(user_id, project_id), &completed_at)| Completion {
                user_id,
                project_id,
                completed_at,
            })
            .collect();
        out.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(out)
    }
}
