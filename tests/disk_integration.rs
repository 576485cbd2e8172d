//! End-to-end flow over the SQLite + disk backend.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{SECRET, assert_cors, body_bytes, body_json, get};
use file_api::{
    AppState, db,
    services::{
        credential_service::{SqliteCredentials, hash_secret},
        storage_service::StorageService,
        token_service::TokenService,
    },
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

async fn disk_app() -> (axum::Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = db::connect(&format!("sqlite://{}", dir.path().join("meta/file_api.db").display()))
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    let pool = Arc::new(pool);

    let credentials = SqliteCredentials::new(pool.clone());
    credentials
        .upsert("alice", &hash_secret("wonderland").unwrap())
        .await
        .unwrap();
    credentials.upsert("bob", "plain-builder").await.unwrap();

    let state = AppState::new(
        Arc::new(StorageService::new(pool, dir.path().join("objects"))),
        Arc::new(credentials),
        TokenService::new(SECRET),
    );
    (file_api::routes(state), dir)
}

async fn login(app: &axum::Router, username: &str, password: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "username": username, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

#[tokio::test]
async fn test_login_against_stored_credentials() {
    let (app, _dir) = disk_app().await;

    let (status, body) = login(&app, "alice", "wonderland").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let (status, _) = login(&app, "bob", "plain-builder").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = login(&app, "alice", "nope").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid credentials" }));
}

#[tokio::test]
async fn test_file_lifecycle_on_disk() {
    let (app, dir) = disk_app().await;
    let (_, body) = login(&app, "alice", "wonderland").await;
    let bearer = format!("Bearer {}", body["token"].as_str().unwrap());

    let send = |request: Request<Body>| app.clone().oneshot(request);

    // upload
    let response = send(
        Request::builder()
            .method("POST")
            .uri("/api/files/reports/2025/q1+summary.txt")
            .header(header::AUTHORIZATION, &bearer)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Body::from("quarterly numbers"))
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // list
    let body = body_json(send(get("/api/files?path=reports/")).await.unwrap()).await;
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["name"], "reports/2025/q1+summary.txt");
    assert_eq!(files[0]["size"], 17);

    // download with an encoded filename
    let response = send(get("/api/download/reports/2025/q1+summary.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_cors(&response);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"q1%2Bsummary.txt\""
    );
    assert_eq!(body_bytes(response).await, b"quarterly numbers");

    // move
    let response = send(
        Request::builder()
            .method("POST")
            .uri("/api/move/reports/2025/q1+summary.txt")
            .header(header::AUTHORIZATION, &bearer)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"destination":"archive/q1.txt"}"#))
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(send(get("/api/files")).await.unwrap()).await;
    assert_eq!(body["files"][0]["name"], "archive/q1.txt");
    assert_eq!(body["files"].as_array().unwrap().len(), 1);

    // delete
    let response = send(
        Request::builder()
            .method("DELETE")
            .uri("/api/files/archive/q1.txt")
            .header(header::AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(send(get("/api/files")).await.unwrap()).await;
    assert_eq!(body, json!({ "files": [] }));

    // no payload files left behind
    let leftovers = std::fs::read_dir(dir.path().join("objects"))
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}
