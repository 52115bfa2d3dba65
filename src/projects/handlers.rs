use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::{AuthUser, MaybeAuthUser},
    error::AppError,
    extract::{ApiJson, ApiQuery},
    state::AppState,
};

use super::dto::{
    CompleteResponse, CompletedProjectView, CreateProjectRequest, DeletedResponse, ListQuery,
    ProjectView, UpdateOutcome, UpdateProjectRequest,
};
use super::services::{self, parse_project_id};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects))
        .route("/projects/:id", get(get_project))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", post(create_project))
        .route(
            "/projects/:id",
            put(update_project)
                .patch(update_project)
                .delete(delete_project),
        )
        .route(
            "/projects/:id/complete",
            patch(mark_completed).post(mark_completed),
        )
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/projects/user/me", get(my_projects))
        .route("/projects/completed/me", get(my_completed_projects))
}

// --- handlers ---

#[instrument(skip(state, user))]
pub async fn list_projects(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> Result<Json<Vec<ProjectView>>, AppError> {
    let items = services::list_projects(&state, user.as_ref(), q).await?;
    Ok(Json(items))
}

#[instrument(skip(state, user, payload))]
pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectView>), AppError> {
    let view = services::create_project(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state, user))]
pub async fn get_project(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectView>, AppError> {
    let id = parse_project_id(&id)?;
    let view = services::get_project(&state, user.as_ref(), id).await?;
    Ok(Json(view))
}

#[instrument(skip(state, user, payload))]
pub async fn update_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateProjectRequest>,
) -> Result<Json<UpdateOutcome>, AppError> {
    let id = parse_project_id(&id)?;
    let outcome = services::update_project(&state, &user, id, payload).await?;
    Ok(Json(outcome))
}

#[instrument(skip(state, user))]
pub async fn delete_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    let id = parse_project_id(&id)?;
    Ok(Json(services::delete_project(&state, &user, id).await?))
}

#[instrument(skip(state, user))]
pub async fn mark_completed(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CompleteResponse>, AppError> {
    let id = parse_project_id(&id)?;
    Ok(Json(services::mark_completed(&state, &user, id).await?))
}

#[instrument(skip(state, user))]
pub async fn my_projects(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ProjectView>>, AppError> {
    Ok(Json(services::my_projects(&state, &user).await?))
}

#[instrument(skip(state, user))]
pub async fn my_completed_projects(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<CompletedProjectView>>, AppError> {
    Ok(Json(services::my_completed_projects(&state, &user).await?))
}
