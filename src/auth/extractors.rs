use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{auth::jwt::JwtKeys, error::AppError, state::AppState};

/// Identity resolved from a valid session token.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Requires a valid session; rejects with 401 otherwise.
pub struct AuthUser(pub CurrentUser);

/// Resolves the session if there is one; never rejects.
pub struct MaybeAuthUser(pub Option<CurrentUser>);

fn cookie_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Candidate tokens in the order they are tried: session cookie, then
/// `Authorization: Bearer`.
pub(crate) fn tokens_from_headers<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Vec<&'a str> {
    cookie_token(headers, cookie_name)
        .into_iter()
        .chain(bearer_token(headers))
        .collect()
}

/// Token → claims → user lookup. A cookie token that fails to verify falls
/// through to the header. Every failure collapses to `None`; storage
/// failures are logged but still read as "no identity".
pub(crate) async fn resolve(parts: &Parts, state: &AppState) -> Option<CurrentUser> {
    let keys = JwtKeys::from_ref(state);
    let claims = tokens_from_headers(&parts.headers, &state.config.cookie.name)
        .into_iter()
        .find_map(|token| match keys.verify(token) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(reason = %e, "rejected session token");
                None
            }
        })?;

    match state.users.find_by_id(claims.sub).await {
        Ok(Some(user)) => Some(CurrentUser {
            id: user.id,
            email: user.email,
            name: user.name,
        }),
        Ok(None) => {
            warn!(user_id = %claims.sub, "token for unknown user");
            None
        }
        Err(e) => {
            error!(error = %e, user_id = %claims.sub, "user lookup failed");
            None
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .await
            .map(AuthUser)
            .ok_or(AppError::Unauthenticated)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(resolve(parts, state).await))
    }
}
