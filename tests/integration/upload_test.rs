//! Guest uploads: policy checks, conflict strategies and path safety.

use axum::http::StatusCode;
use serde_json::json;

use crate::helpers::{TestApp, exists};

async fn upload_token(app: &TestApp, admin: &str, strategy: &str) -> String {
    let token = app
        .create_token(
            admin,
            json!({
                "allow_upload": true,
                "upload_path": "inbox",
                "filename_conflict_strategy": strategy,
                "max_usage_count": 0,
            }),
        )
        .await;
    app.guest_session(&token).await
}

#[tokio::test]
async fn test_upload_stores_file_and_counts_use() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app
        .create_token(
            &admin,
            json!({ "allow_upload": true, "upload_path": "inbox/2024", "max_usage_count": 2 }),
        )
        .await;
    let session = app.guest_session(&token).await;

    let response = app.upload(&session, "report.pdf", b"%PDF-1.7").await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(response.body["filename"], "report.pdf");
    assert_eq!(response.body["size_bytes"], 8);
    assert_eq!(response.body["renamed"], false);
    assert_eq!(app.read_file("inbox/2024/report.pdf"), b"%PDF-1.7");

    let stored = app.get_token(&admin, token["id"].as_i64().unwrap()).await;
    assert_eq!(stored.body["usage_count"], 1);
    assert_eq!(stored.body["uploaded_bytes"], 8);
}

#[tokio::test]
async fn test_upload_policy_violations_leave_nothing_behind() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app
        .create_token(
            &admin,
            json!({
                "allow_upload": true,
                "upload_path": "inbox",
                "allowed_file_types": ["pdf", "TXT"],
                "max_file_size_mb": 1,
            }),
        )
        .await;
    let session = app.guest_session(&token).await;

    let response = app.upload(&session, "virus.exe", b"MZ").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("POLICY_VIOLATION"));

    let big = vec![b'x'; 1024 * 1024 + 1];
    let response = app.upload(&session, "big.txt", &big).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    assert!(!exists(&app.storage_root().join("inbox/virus.exe")));
    assert!(!exists(&app.storage_root().join("inbox/big.txt")));

    let response = app.upload(&session, "NOTES.TXT", b"fine").await;
    assert_eq!(response.status, StatusCode::CREATED);

    let stored = app.get_token(&admin, token["id"].as_i64().unwrap()).await;
    assert_eq!(stored.body["usage_count"], 1);
    assert_eq!(stored.body["status"], "exhausted");
}

#[tokio::test]
async fn test_upload_requires_permission() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app.create_token(&admin, json!({ "allow_download": true })).await;
    let session = app.guest_session(&token).await;

    let response = app.upload(&session, "a.txt", b"a").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("POLICY_VIOLATION"));
}

#[tokio::test]
async fn test_upload_traversal_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let session = upload_token(&app, &admin, "overwrite").await;

    for name in ["../escape.txt", "..", "nested/evil.txt"] {
        let response = app.upload(&session, name, b"pwned").await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{name}");
        assert_eq!(response.error_code(), Some("PATH_VIOLATION"), "{name}");
    }
    assert!(!exists(&app.storage_root().join("escape.txt")));
    assert!(!exists(&app.storage_root().join("inbox/nested")));
}

#[tokio::test]
async fn test_reject_strategy_keeps_original() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("inbox/data.csv", b"original");
    let session = upload_token(&app, &admin, "reject").await;

    let response = app.upload(&session, "data.csv", b"replacement").await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(app.read_file("inbox/data.csv"), b"original");
    let leftovers: Vec<_> = std::fs::read_dir(app.storage_root().join("inbox"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);
}

#[tokio::test]
async fn test_rename_strategy_creates_second_file() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("inbox/data.csv", b"original");
    let session = upload_token(&app, &admin, "rename").await;

    let first = app.upload(&session, "data.csv", b"second").await;
    let second = app.upload(&session, "data.csv", b"third").await;

    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["filename"], "data_1.csv");
    assert_eq!(first.body["renamed"], true);
    assert_eq!(second.body["filename"], "data_2.csv");
    assert_eq!(app.read_file("inbox/data.csv"), b"original");
    assert_eq!(app.read_file("inbox/data_1.csv"), b"second");
    assert_eq!(app.read_file("inbox/data_2.csv"), b"third");
}

#[tokio::test]
async fn test_overwrite_strategy_replaces_bytes() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("inbox/data.csv", b"a much longer original body");
    let session = upload_token(&app, &admin, "overwrite").await;

    let response = app.upload(&session, "data.csv", b"short").await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["renamed"], false);
    assert_eq!(app.read_file("inbox/data.csv"), b"short");
}

#[cfg(unix)]
#[tokio::test]
async fn test_upload_through_symlinked_dir_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let outside = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(app.storage_root()).unwrap();
    std::os::unix::fs::symlink(outside.path(), app.storage_root().join("inbox")).unwrap();
    let session = upload_token(&app, &admin, "overwrite").await;

    let response = app.upload(&session, "leak.txt", b"secret").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), Some("PATH_VIOLATION"));
    assert!(!exists(&outside.path().join("leak.txt")));
}
