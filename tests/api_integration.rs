//! Router-level integration tests
//!
//! Drives the axum router directly with `tower::ServiceExt::oneshot` against
//! in-memory SQLite: the beacon endpoint, the onboarding/auth gate, and the
//! dashboard read endpoints.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

use pagetally::analytics::DateRangeSelector;
use pagetally::analytics::TopPagesPaginator;
use pagetally::api::{create_router, AppState};
use pagetally::auth::SessionService;
use pagetally::storage::{SqliteStorage, Storage};

async fn test_app() -> (Router, Arc<SqliteStorage>) {
    let storage = SqliteStorage::new("sqlite::memory:", 1)
        .await
        .expect("failed to open in-memory sqlite");
    storage.init().await.expect("failed to init schema");
    let storage = Arc::new(storage);

    let state = Arc::new(AppState::new(storage.clone() as Arc<dyn Storage>, true));
    (create_router(state), storage)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

/// Stand-in for the connect info the real listener attaches to every request.
fn test_addr() -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000)))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .extension(test_addr())
        .body(Body::empty())
        .unwrap()
}

fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_with_cookie(uri: &str, body: Value, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Pull "session_token=..." out of a Set-Cookie response header.
fn session_cookie(response: &axum::response::Response) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("expected a Set-Cookie header")
        .to_str()
        .unwrap();
    raw.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn health_check_answers_ok() {
    let (app, _) = test_app().await;
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "OK");
}

#[tokio::test]
async fn collect_stores_a_normalized_page_view() {
    let (app, storage) = test_app().await;

    let response = app
        .clone()
        .oneshot(get(
            "/collect?project_id=proj1&path=https%3A%2F%2Fblog.test%2Fdocs&title=Docs",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let top_pages = TopPagesPaginator::new(storage.clone() as Arc<dyn Storage>);
    let rows = top_pages
        .top_pages("proj1", DateRangeSelector::Last24Hours, 10, 0)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].path, "/docs");
    assert_eq!(rows[0].title, "Docs");
}

#[tokio::test]
async fn collect_rejects_invalid_percent_encoding() {
    let (app, storage) = test_app().await;

    // path decodes to "/bad%zz"
    let response = app
        .oneshot(get("/collect?project_id=proj1&path=%2Fbad%25zz"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let top_pages = TopPagesPaginator::new(storage.clone() as Arc<dyn Storage>);
    let rows = top_pages
        .top_pages("proj1", DateRangeSelector::Last24Hours, 10, 0)
        .await
        .unwrap();
    assert!(rows.is_empty(), "a rejected beacon must not write a row");
}

#[tokio::test]
async fn private_routes_open_during_onboarding_then_gated() {
    let (app, _) = test_app().await;

    // No users yet: the private API is reachable so onboarding can happen
    let response = app.clone().oneshot(get("/api/projects")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // First user becomes admin and is logged in right away
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users",
            json!({ "email": "owner@example.com", "password": "hunter2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = session_cookie(&response);
    let body = body_json(response).await;
    assert_eq!(body["is_admin"], true);
    assert!(body.get("password_hash").is_none());

    // Gate is closed now
    let response = app.clone().oneshot(get("/api/projects")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // ...but the session cookie opens it
    let response = app
        .clone()
        .oneshot(get_with_cookie("/api/projects", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_rejects_bad_credentials_and_issues_sessions() {
    let (app, _) = test_app().await;

    app.clone()
        .oneshot(post_json(
            "/api/users",
            json!({ "email": "owner@example.com", "password": "hunter2" }),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/login",
            json!({ "email": "nobody@example.com", "password": "hunter2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["email_error"],
        "Email address does not exist"
    );

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/login",
            json!({ "email": "owner@example.com", "password": "wrong" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["password_error"],
        "Password is incorrect"
    );

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/login",
            json!({ "email": "owner@example.com", "password": "hunter2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);

    let response = app
        .oneshot(get_with_cookie("/api/projects", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn dashboard_endpoints_serve_series_and_paginated_pages() {
    let (app, _) = test_app().await;

    // Onboarding is open: create the project straight away
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/projects",
            json!({ "name": "Blog", "base_url": "https://blog.test" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let project_id = body_json(response).await["project_id"]
        .as_str()
        .unwrap()
        .to_string();

    for i in 0..12 {
        let uri = format!(
            "/collect?project_id={}&path=%2Fpost%2F{:02}",
            project_id, i % 12
        );
        let response = app.clone().oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    // Unknown selector falls back to 24h; garbage offset falls back to 0
    let uri = format!(
        "/api/projects/{}/views/pages?daterange=bogus&offset=junk&limit=10",
        project_id
    );
    let response = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["daterange"], "24h");
    assert_eq!(body["rows"].as_array().unwrap().len(), 10);
    assert_eq!(body["pagination"]["total_rows"], 12);
    assert_eq!(body["pagination"]["show_controls"], true);
    assert_eq!(body["pagination"]["next_offset"], 10);
    assert!(body["pagination"]["prev_offset"].is_null());

    let uri = format!("/api/projects/{}/views/series?daterange=24h", project_id);
    let response = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total_views"], 12);
    let points = body["points"].as_array().unwrap();
    assert!(!points.is_empty());
    assert_eq!(
        body["chart"]["bars"].as_array().unwrap().len(),
        points.len()
    );
}

#[tokio::test]
async fn change_password_checks_the_old_one_and_rotates() {
    let (app, _) = test_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/users",
            json!({ "email": "owner@example.com", "password": "hunter2" }),
        ))
        .await
        .unwrap();
    let cookie = session_cookie(&response);

    let response = app
        .clone()
        .oneshot(post_json_with_cookie(
            "/api/users/me/password",
            json!({ "old_password": "wrong", "new_password": "hunter3" }),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["old_password_error"],
        "Old password is incorrect"
    );

    let response = app
        .clone()
        .oneshot(post_json_with_cookie(
            "/api/users/me/password",
            json!({ "old_password": "hunter2", "new_password": "hunter2" }),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json_with_cookie(
            "/api/users/me/password",
            json!({ "old_password": "hunter2", "new_password": "hunter3" }),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Only the new password logs in now
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/login",
            json!({ "email": "owner@example.com", "password": "hunter2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(post_json(
            "/api/login",
            json!({ "email": "owner@example.com", "password": "hunter3" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_sweep_removes_only_expired_sessions() {
    let (_, storage) = test_app().await;
    let sessions = SessionService::new(storage.clone() as Arc<dyn Storage>);

    let live = sessions.create("user1").await.unwrap();

    let now = chrono::Utc::now().timestamp();
    storage
        .create_session("expired-session", "user1", now - 60)
        .await
        .unwrap();

    let removed = sessions.sweep_expired().await.unwrap();
    assert_eq!(removed, 1);

    assert!(sessions.is_valid(&live.session_id).await);
    assert!(!sessions.is_valid("expired-session").await);
}
