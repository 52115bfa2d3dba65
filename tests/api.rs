use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use freelance_hub::{app::build_app, config::AppConfig, state::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> Router {
    let config = AppConfig::from_lookup(|key| match key {
        "JWT_SECRET" => Some("integration-secret".into()),
        "BCRYPT_COST" => Some("4".into()),
        _ => None,
    })
    .expect("config");
    build_app(AppState::in_memory(config))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::COOKIE, format!("access_token={}", t));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, value)
}

fn session_token(headers: &HeaderMap) -> String {
    let cookie = headers
        .get(header::SET_COOKIE)
        .expect("set-cookie")
        .to_str()
        .unwrap();
    cookie
        .strip_prefix("access_token=")
        .and_then(|rest| rest.split(';').next())
        .expect("access_token cookie")
        .to_string()
}

async fn signup(app: &Router, name: &str, email: &str) -> (String, Value) {
    let (status, headers, body) = send(
        app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "name": name, "email": email, "password": "hunter2-but-longer" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (session_token(&headers), body)
}

fn project_body(title: &str) -> Value {
    json!({
        "title": title,
        "description": "Port the billing service",
        "budget": 1500,
        "tech_stack": ["rust", "axum"]
    })
}

#[tokio::test]
async fn health_and_banner() {
    let app = test_app();
    let (status, _, body) = send(&app, Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Backend running");

    let (status, _, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signup_sets_cookie_and_hides_hash() {
    let app = test_app();
    let (status, headers, body) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "name": "Linus", "email": "linus@example.com", "password": "penguin" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=None"));
    assert!(cookie.contains("Secure"));
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["name"], "Linus");
    assert_eq!(body["user"]["email"], "linus@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(!body.to_string().contains("penguin"));
}

#[tokio::test]
async fn session_resolves_through_cookie_and_bearer() {
    let app = test_app();
    let (token, created) = signup(&app, "Ada", "ada@example.com").await;

    let (status, _, me) = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], created["user"]["id"]);
    assert_eq!(me["name"], "Ada");

    let req = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_signup_is_conflict() {
    let app = test_app();
    signup(&app, "Ada", "ada@example.com").await;
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "name": "Other Ada", "email": "ada@example.com", "password": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "User with this email already exists");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = test_app();
    signup(&app, "Ada", "ada@example.com").await;

    let (s1, _, wrong_pw) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "nope" })),
    )
    .await;
    let (s2, _, unknown) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "ghost@example.com", "password": "hunter2-but-longer" })),
    )
    .await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw, unknown);
    assert_eq!(wrong_pw["detail"], "Invalid email or password");

    let (status, headers, body) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "hunter2-but-longer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    let token = session_token(&headers);
    let (status, _, _) = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn logout_expires_cookie() {
    let app = test_app();
    let (status, headers, body) = send(&app, Method::POST, "/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("access_token=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let app = test_app();
    let (status, headers, body) =
        send(&app, Method::POST, "/projects", None, Some(project_body("x"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers.get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    assert_eq!(body["detail"], "Could not validate credentials");

    let (status, _, _) = send(&app, Method::GET, "/projects/user/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // An invalid token on a public route just reads as anonymous.
    let (status, _, _) = send(&app, Method::GET, "/projects", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn project_lifecycle() {
    let app = test_app();
    let (owner, _) = signup(&app, "Owner", "owner@example.com").await;
    let (worker, _) = signup(&app, "Worker", "worker@example.com").await;

    let (status, _, created) =
        send(&app, Method::POST, "/projects", Some(&owner), Some(project_body("Billing"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "OPEN");
    assert_eq!(created["isCompleted"], false);
    let id = created["id"].as_str().unwrap().to_string();

    // mark complete twice
    let uri = format!("/projects/{}/complete", id);
    let (status, _, first) = send(&app, Method::PATCH, &uri, Some(&worker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"], "Project marked as completed");
    let (status, _, second) = send(&app, Method::POST, &uri, Some(&worker), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["isCompleted"], true);
    assert_eq!(second["message"], "Already completed");

    // completion flag is per caller
    let (_, _, anon) = send(&app, Method::GET, "/projects", None, None).await;
    assert_eq!(anon[0]["isCompleted"], false);
    let (_, _, as_worker) = send(&app, Method::GET, "/projects", Some(&worker), None).await;
    assert_eq!(as_worker[0]["isCompleted"], true);
    let (_, _, as_owner) = send(&app, Method::GET, &format!("/projects/{}", id), Some(&owner), None).await;
    assert_eq!(as_owner["isCompleted"], false);

    let (_, _, done) = send(&app, Method::GET, "/projects/completed/me", Some(&worker), None).await;
    assert_eq!(done.as_array().unwrap().len(), 1);
    assert_eq!(done[0]["id"], id.as_str());
    assert!(done[0]["completed_at"].is_string());

    // only the owner edits
    let item = format!("/projects/{}", id);
    let (status, _, body) =
        send(&app, Method::PUT, &item, Some(&worker), Some(json!({ "budget": 1 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Only the project creator can edit this project");

    let (status, _, body) =
        send(&app, Method::PATCH, &item, Some(&owner), Some(json!({ "budget": 2500 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["budget"], 2500);
    assert_eq!(body["title"], "Billing");
    assert_eq!(body["message"], "Project updated successfully");
    assert!(body["updated_at"].is_string());

    let (status, _, body) = send(&app, Method::PUT, &item, Some(&owner), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "No updates provided");

    let (status, _, _) =
        send(&app, Method::PUT, &item, Some(&owner), Some(json!({ "budget": -5 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, _, mine) = send(&app, Method::GET, "/projects/user/me", Some(&owner), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    let (_, _, theirs) = send(&app, Method::GET, "/projects/user/me", Some(&worker), None).await;
    assert!(theirs.as_array().unwrap().is_empty());

    // delete cascades
    let (status, _, _) = send(&app, Method::DELETE, &item, Some(&worker), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, body) = send(&app, Method::DELETE, &item, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Project deleted successfully");

    let (status, _, _) = send(&app, Method::GET, &item, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, _, done) = send(&app, Method::GET, "/projects/completed/me", Some(&worker), None).await;
    assert!(done.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_and_unknown_ids_are_not_found() {
    let app = test_app();
    let (token, _) = signup(&app, "Ada", "ada@example.com").await;

    let (status, _, body) = send(&app, Method::GET, "/projects/not-a-uuid", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Project not found");

    let unknown = format!("/projects/{}/complete", uuid::Uuid::new_v4());
    let (status, _, _) = send(&app, Method::PATCH, &unknown, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_rejects_invalid_payloads() {
    let app = test_app();
    let (token, _) = signup(&app, "Ada", "ada@example.com").await;

    for bad in [
        json!({ "title": "", "description": "d", "budget": 10, "tech_stack": ["go"] }),
        json!({ "title": "t", "description": "d", "budget": 0, "tech_stack": ["go"] }),
        json!({ "title": "t", "description": "d", "budget": 10, "tech_stack": [] }),
    ] {
        let (status, _, _) = send(&app, Method::POST, "/projects", Some(&token), Some(bad)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    let (_, _, all) = send(&app, Method::GET, "/projects", None, None).await;
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_supports_status_filter_and_pagination() {
    let app = test_app();
    let (token, _) = signup(&app, "Ada", "ada@example.com").await;
    let mut ids = Vec::new();
    for i in 0..3 {
        let (_, _, p) = send(
            &app,
            Method::POST,
            "/projects",
            Some(&token),
            Some(project_body(&format!("p{}", i))),
        )
        .await;
        ids.push(p["id"].as_str().unwrap().to_string());
    }
    send(
        &app,
        Method::PATCH,
        &format!("/projects/{}", ids[1]),
        Some(&token),
        Some(json!({ "status": "COMPLETED" })),
    )
    .await;

    let (_, _, completed) = send(&app, Method::GET, "/projects?status=COMPLETED", None, None).await;
    assert_eq!(completed.as_array().unwrap().len(), 1);
    assert_eq!(completed[0]["id"], ids[1].as_str());

    let (_, _, page) = send(&app, Method::GET, "/projects?skip=0&limit=2", None, None).await;
    assert_eq!(page.as_array().unwrap().len(), 2);

    let (status, _, _) = send(&app, Method::GET, "/projects?limit=500", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn undecodable_bodies_and_queries_answer_422_with_detail() {
    let app = test_app();
    let (token, _) = signup(&app, "Ada", "ada@example.com").await;

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/projects",
        Some(&token),
        Some(json!({ "title": "t", "description": "d", "tech_stack": ["go"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("budget"), "{body}");

    let (status, _, body) = send(&app, Method::GET, "/projects?status=DONE", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string(), "{body}");

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "email": "x@example.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("name"), "{body}");
}
