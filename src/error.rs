use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced to HTTP callers. Messages are fixed so they never leak
/// internal state.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Could not validate credentials")]
    Unauthenticated,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User with this email already exists")]
    Conflict,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Project not found")]
    NotFound,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(e) = &self {
            error!(error = ?e, "internal error");
        }
        let status = self.status();
        let body = Json(json!({ "detail": self.to_string() }));
        match self {
            AppError::Unauthenticated => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}

/// Failures reported by the store backends.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate key")]
    Duplicate,

    /// A row referenced by the write no longer exists.
    #[error("missing referenced row")]
    MissingReference,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            // 23505 = unique_violation
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Duplicate
            }
            // 23503 = foreign_key_violation
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                StoreError::MissingReference
            }
            _ => StoreError::Other(e.into()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AppError::Conflict,
            StoreError::MissingReference => AppError::NotFound,
            StoreError::Other(e) => AppError::Internal(e),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
