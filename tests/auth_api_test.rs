mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{TestApp, PASSWORD};

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["pose_model_loaded"], true);
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new().await;
    let token = app.register("Athlete@Example.com").await;

    let (status, me) = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "athlete@example.com");
    assert_eq!(me["full_name"], "Test Athlete");

    let (status, login) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "athlete@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["token_type"], "Bearer");
    assert!(login["refresh_token"].is_string());
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = TestApp::new().await;
    app.register("dup@example.com").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "dup@example.com", "password": PASSWORD, "full_name": "Again" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_weak_password_rejected() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "weak@example.com", "password": "short", "full_name": "Weak" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    let details = body["details"].as_array().unwrap();
    assert!(details.len() >= 3, "{details:?}");
    assert!(details.contains(&json!("Password must be at least 8 characters long")));
}

#[tokio::test]
async fn test_wrong_password_unauthorized() {
    let app = TestApp::new().await;
    app.register("wrong@example.com").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "wrong@example.com", "password": "Not!TheP4ssword" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_need_token() {
    let app = TestApp::new().await;

    for uri in ["/api/v1/auth/me", "/api/v1/user/profile", "/api/v1/dashboard", "/api/v1/plans"] {
        let (status, _) = app.request(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri} should require a token");
    }

    let (status, _) = app.get("/api/v1/user/profile", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::new().await;
    let token = app.register("logout@example.com").await;

    let (status, _) = app.post("/api/v1/auth/logout", &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/v1/auth/me", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_issues_access_token() {
    let app = TestApp::new().await;
    let (_, registered) = app
        .request(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({ "email": "refresh@example.com", "password": PASSWORD, "full_name": "Refresh" })),
        )
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": registered["refresh_token"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let access = body["access_token"].as_str().unwrap();
    let (status, _) = app.get("/api/v1/auth/me", access).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_rate_limited() {
    let app = TestApp::build(None, |config| config.auth_rate_limit = 2).await;
    let attempt = json!({ "email": "nobody@example.com", "password": PASSWORD });

    for _ in 0..2 {
        let (status, _) = app
            .request(Method::POST, "/api/v1/auth/login", None, Some(attempt.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, _) = app
        .request(Method::POST, "/api/v1/auth/login", None, Some(attempt))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}
