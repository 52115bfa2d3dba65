use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, SignupRequest},
        extractors::{AuthUser, CurrentUser},
        services::{self, Session},
    },
    config::CookieConfig,
    error::AppError,
    extract::ApiJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

/// `Set-Cookie` value carrying the session token. `SameSite=None` lets a
/// frontend on another origin send it back.
pub(crate) fn session_cookie(cfg: &CookieConfig, token: &str, max_age_secs: u64) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=None; Path=/; Max-Age={}",
        cfg.name, token, max_age_secs
    );
    if cfg.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_headers(value: String) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("set-cookie header: {}", e)))?;
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

fn session_response(
    state: &AppState,
    session: Session,
    message: &'static str,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    let max_age = (state.config.jwt.ttl_minutes.max(0) as u64) * 60;
    let headers = cookie_headers(session_cookie(&state.config.cookie, &session.token, max_age))?;
    Ok((
        headers,
        Json(AuthResponse {
            success: true,
            message,
            user: session.user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), AppError> {
    let session = services::signup(&state, payload).await?;
    let (headers, body) = session_response(&state, session, "User created successfully")?;
    Ok((StatusCode::CREATED, headers, body))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), AppError> {
    let session = services::login(&state, payload).await?;
    session_response(&state, session, "Login successful")
}

/// Expires the cookie on the client. The token itself stays valid until `exp`.
#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<MessageResponse>), AppError> {
    let headers = cookie_headers(session_cookie(&state.config.cookie, "", 0))?;
    Ok((
        headers,
        Json(MessageResponse {
            success: true,
            message: "Logged out successfully",
        }),
    ))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<CurrentUser> {
    Json(user)
}
