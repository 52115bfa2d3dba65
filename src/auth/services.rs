use anyhow::Context;
use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, SignupRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo_types::NewUser,
    },
    error::{AppError, StoreError},
    state::AppState,
};

/// A freshly authenticated user together with its session token.
#[derive(Debug)]
pub struct Session {
    pub user: PublicUser,
    pub token: String,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn validate_signup(req: &SignupRequest) -> Result<(), AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::Validation("Invalid email".into()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("password must not be empty".into()));
    }
    Ok(())
}

async fn hash_off_thread(plain: String, cost: u32) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&plain, cost))
        .await
        .context("password hashing task")??;
    Ok(hash)
}

async fn verify_off_thread(plain: String, hash: String) -> Result<bool, AppError> {
    let ok = tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .context("password verification task")?;
    Ok(ok)
}

pub async fn signup(state: &AppState, req: SignupRequest) -> Result<Session, AppError> {
    validate_signup(&req)?;

    if state.users.find_by_email(&req.email).await?.is_some() {
        warn!(email = %req.email, "email already registered");
        return Err(AppError::Conflict);
    }

    let password_hash = hash_off_thread(req.password, state.config.bcrypt_cost).await?;
    let user = state
        .users
        .create_user(NewUser {
            name: req.name,
            email: req.email,
            password_hash,
            created_at: OffsetDateTime::now_utc(),
        })
        .await
        .map_err(|e| {
            if matches!(e, StoreError::Duplicate) {
                warn!("email registered concurrently");
            }
            AppError::from(e)
        })?;

    let token = JwtKeys::from_ref(state).sign(user.id, &user.email)?;
    info!(user_id = %user.id, "user registered");
    Ok(Session {
        user: user.into(),
        token,
    })
}

pub async fn login(state: &AppState, req: LoginRequest) -> Result<Session, AppError> {
    let Some(user) = state.users.find_by_email(&req.email).await? else {
        // same bcrypt work as a real check, so latency does not reveal the email
        let _ = hash_off_thread(req.password, state.config.bcrypt_cost).await;
        warn!("login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_off_thread(req.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(state).sign(user.id, &user.email)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Session {
        user: user.into(),
        token,
    })
}
