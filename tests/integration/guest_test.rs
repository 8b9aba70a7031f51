//! Guest session lifecycle over HTTP.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_guest_login_returns_policy_without_consuming() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app
        .create_token(
            &admin,
            json!({
                "allow_upload": true,
                "upload_path": "inbox",
                "page_title": "Quarterly drop",
                "allowed_file_types": ["pdf"],
            }),
        )
        .await;

    for _ in 0..3 {
        let response = app
            .guest_login(token["token_string"].as_str().unwrap())
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        assert!(response.body["session_token"].is_string());
        assert_eq!(response.body["policy"]["page_title"], "Quarterly drop");
        assert_eq!(response.body["policy"]["upload_path"], "inbox");
        assert_eq!(response.body["policy"]["allowed_file_types"], json!(["pdf"]));
    }

    let stored = app.get_token(&admin, token["id"].as_i64().unwrap()).await;
    assert_eq!(stored.body["usage_count"], 0);
    assert_eq!(stored.body["status"], "active");
}

#[tokio::test]
async fn test_guest_login_unknown_token() {
    let app = TestApp::new().await;
    let response = app.guest_login("0123456789ABCDEF0123456789ABCDEF").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error_code(), Some("INVALID_TOKEN"));
}

#[tokio::test]
async fn test_guest_login_expired_token() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app
        .create_token(
            &admin,
            json!({ "expires_at": Utc::now() - Duration::minutes(5), "allow_download": true }),
        )
        .await;
    assert_eq!(token["status"], "expired");

    let response = app
        .guest_login(token["token_string"].as_str().unwrap())
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("TOKEN_UNAVAILABLE"));
    assert_eq!(response.body["details"]["reason"], "expired");
}

#[tokio::test]
async fn test_revocation_reaches_live_sessions() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app
        .create_token(&admin, json!({ "allow_download": true, "max_usage_count": 0 }))
        .await;
    let session = app.guest_session(&token).await;

    let before = app.request("GET", "/api/guest/files", None, Some(&session)).await;
    assert_eq!(before.status, StatusCode::OK);

    app.request(
        "POST",
        &format!("/api/admin/tokens/{}/revoke", token["id"]),
        None,
        Some(&admin),
    )
    .await;

    let after = app.request("GET", "/api/guest/files", None, Some(&session)).await;
    assert_eq!(after.status, StatusCode::FORBIDDEN);
    assert_eq!(after.body["details"]["reason"], "revoked");
}

#[tokio::test]
async fn test_guest_routes_reject_admin_bearer() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let response = app.request("GET", "/api/guest/files", None, Some(&admin)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.request("GET", "/api/guest/files", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_keeps_policy_snapshot() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app
        .create_token(
            &admin,
            json!({ "allow_upload": true, "allowed_file_types": ["txt"], "max_usage_count": 0 }),
        )
        .await;
    let old_session = app.guest_session(&token).await;

    let response = app
        .request(
            "PUT",
            &format!("/api/admin/tokens/{}", token["id"]),
            Some(json!({ "allowed_file_types": ["pdf"] })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let old = app.upload(&old_session, "notes.txt", b"frozen").await;
    assert_eq!(old.status, StatusCode::CREATED, "{:?}", old.body);

    let new_session = app.guest_session(&token).await;
    let new = app.upload(&new_session, "notes2.txt", b"edited").await;
    assert_eq!(new.status, StatusCode::FORBIDDEN);
    assert_eq!(new.error_code(), Some("POLICY_VIOLATION"));
}

#[tokio::test]
async fn test_list_files_skips_directories_and_temp_files() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("shared/b.txt", b"bb");
    app.write_file("shared/a.txt", b"a");
    app.write_file("shared/.a.txt.123.part", b"partial");
    app.write_file("shared/nested/c.txt", b"c");
    let token = app
        .create_token(
            &admin,
            json!({ "allow_download": true, "downloadable_path": "shared" }),
        )
        .await;
    let session = app.guest_session(&token).await;

    let response = app.request("GET", "/api/guest/files", None, Some(&session)).await;

    assert_eq!(response.status, StatusCode::OK);
    let files = response.body["files"].as_array().unwrap();
    let names: Vec<&str> = files.iter().map(|f| f["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["a.txt", "b.txt"]);
    assert_eq!(files[1]["size_bytes"], 2);

    let stored = app.get_token(&admin, token["id"].as_i64().unwrap()).await;
    assert_eq!(stored.body["usage_count"], 0);
}

#[tokio::test]
async fn test_listing_requires_download_permission() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app.create_token(&admin, json!({ "allow_upload": true })).await;
    let session = app.guest_session(&token).await;

    let response = app.request("GET", "/api/guest/files", None, Some(&session)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("POLICY_VIOLATION"));
}
