use std::collections::HashMap;

use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::CurrentUser,
    error::AppError,
    projects::{
        dto::{
            CompleteResponse, CompletedProjectView, CreateProjectRequest, DeletedResponse,
            ListQuery, ProjectView, UpdateOutcome, UpdateProjectRequest,
        },
        repo_types::{NewProject, Project, ProjectChanges, ProjectFilter},
    },
    state::AppState,
};

pub const MAX_PAGE_SIZE: i64 = 100;

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".into()));
    }
    Ok(())
}

fn validate_budget(budget: i64) -> Result<(), AppError> {
    if budget <= 0 {
        return Err(AppError::Validation("budget must be greater than 0".into()));
    }
    Ok(())
}

fn validate_tech_stack(tech_stack: &[String]) -> Result<(), AppError> {
    if tech_stack.is_empty() {
        return Err(AppError::Validation("tech_stack must have at least one entry".into()));
    }
    Ok(())
}

fn validate_changes(changes: &ProjectChanges) -> Result<(), AppError> {
    if let Some(t) = &changes.title {
        validate_title(t)?;
    }
    if let Some(b) = changes.budget {
        validate_budget(b)?;
    }
    if let Some(ts) = &changes.tech_stack {
        validate_tech_stack(ts)?;
    }
    Ok(())
}

/// Malformed ids read the same as unknown ones.
pub fn parse_project_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}

async fn load(state: &AppState, id: Uuid) -> Result<Project, AppError> {
    state.projects.get_project(id).await?.ok_or(AppError::NotFound)
}

async fn load_owned(
    state: &AppState,
    id: Uuid,
    user: &CurrentUser,
    denied: &'static str,
) -> Result<Project, AppError> {
    let project = load(state, id).await?;
    if project.created_by != user.id {
        warn!(project_id = %id, user_id = %user.id, owner = %project.created_by, "non-owner mutation");
        return Err(AppError::Forbidden(denied));
    }
    Ok(project)
}

/// Pairs each project with the caller's completion flag. Anonymous callers
/// get `false` everywhere without touching the completion store.
async fn annotate(
    state: &AppState,
    user: Option<&CurrentUser>,
    projects: Vec<Project>,
) -> Result<Vec<ProjectView>, AppError> {
    let done = match user {
        Some(u) if !projects.is_empty() => {
            let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
            state.completions.completed_among(u.id, &ids).await?
        }
        _ => Default::default(),
    };
    Ok(projects
        .into_iter()
        .map(|p| {
            let is_completed = done.contains(&p.id);
            ProjectView::new(p, is_completed)
        })
        .collect())
}

pub async fn create_project(
    state: &AppState,
    user: &CurrentUser,
    req: CreateProjectRequest,
) -> Result<ProjectView, AppError> {
    validate_title(&req.title)?;
    validate_budget(req.budget)?;
    validate_tech_stack(&req.tech_stack)?;

    let project = state
        .projects
        .create_project(NewProject {
            title: req.title,
            description: req.description,
            budget: req.budget,
            tech_stack: req.tech_stack,
            created_by: user.id,
            created_at: OffsetDateTime::now_utc(),
        })
        .await?;
    info!(project_id = %project.id, user_id = %user.id, "project created");
    Ok(ProjectView::new(project, false))
}

pub async fn list_projects(
    state: &AppState,
    user: Option<&CurrentUser>,
    q: ListQuery,
) -> Result<Vec<ProjectView>, AppError> {
    if q.skip < 0 {
        return Err(AppError::Validation("skip must be >= 0".into()));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&q.limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    let projects = state
        .projects
        .list_projects(&ProjectFilter {
            status: q.status,
            created_by: None,
            skip: q.skip,
            limit: Some(q.limit),
        })
        .await?;
    annotate(state, user, projects).await
}

pub async fn get_project(
    state: &AppState,
    user: Option<&CurrentUser>,
    id: Uuid,
) -> Result<ProjectView, AppError> {
    let project = load(state, id).await?;
    let mut views = annotate(state, user, vec![project]).await?;
    views.pop().ok_or(AppError::NotFound)
}

pub async fn update_project(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
    req: UpdateProjectRequest,
) -> Result<UpdateOutcome, AppError> {
    let changes = ProjectChanges::from(req);
    validate_changes(&changes)?;
    load_owned(state, id, user, "Only the project creator can edit this project").await?;

    if changes.is_empty() {
        return Ok(UpdateOutcome::Unchanged {
            id,
            message: "No updates provided",
        });
    }

    let updated = state
        .projects
        .update_project(id, changes, OffsetDateTime::now_utc())
        .await?
        .ok_or(AppError::NotFound)?;
    info!(project_id = %id, user_id = %user.id, "project updated");

    let mut views = annotate(state, Some(user), vec![updated]).await?;
    let project = views.pop().ok_or(AppError::NotFound)?;
    Ok(UpdateOutcome::Updated {
        project,
        message: "Project updated successfully",
    })
}

pub async fn delete_project(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
) -> Result<DeletedResponse, AppError> {
    load_owned(state, id, user, "Only the project creator can delete this project").await?;

    if !state.projects.delete_project(id).await? {
        return Err(AppError::NotFound);
    }
    info!(project_id = %id, user_id = %user.id, "project deleted");

    Ok(DeletedResponse {
        id,
        message: "Project deleted successfully",
    })
}

pub async fn mark_completed(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
) -> Result<CompleteResponse, AppError> {
    load(state, id).await?;

    // a delete racing past the load above surfaces as MissingReference -> 404
    let inserted = state
        .completions
        .mark_completed(user.id, id, OffsetDateTime::now_utc())
        .await?;
    let message = if inserted {
        info!(project_id = %id, user_id = %user.id, "project marked completed");
        "Project marked as completed"
    } else {
        "Already completed"
    };
    Ok(CompleteResponse {
        id,
        is_completed: true,
        message,
    })
}

pub async fn my_projects(state: &AppState, user: &CurrentUser) -> Result<Vec<ProjectView>, AppError> {
    let projects = state
        .projects
        .list_projects(&ProjectFilter {
            created_by: Some(user.id),
            ..Default::default()
        })
        .await?;
    annotate(state, Some(user), projects).await
}

/// Completed projects, most recent completion first. Marks pointing at
/// projects that no longer exist are skipped.
pub async fn my_completed_projects(
    state: &AppState,
    user: &CurrentUser,
) -> Result<Vec<CompletedProjectView>, AppError> {
    let completions = state.completions.list_for_user(user.id).await?;
    if completions.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = completions.iter().map(|c| c.project_id).collect();
    let mut by_id: HashMap<Uuid, Project> = state
        .projects
        .get_projects(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    Ok(completions
        .into_iter()
        .filter_map(|c| {
            by_id.remove(&c.project_id).map(|p| CompletedProjectView {
                project: ProjectView::new(p, true),
                completed_at: c.completed_at,
            })
        })
        .collect())
}
