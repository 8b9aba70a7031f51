//! Admin login and token management over HTTP.

use axum::http::StatusCode;
use serde_json::json;

use crate::helpers::{ADMIN_PASSWORD, ADMIN_USERNAME, TestApp};

#[tokio::test]
async fn test_admin_login_success() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    assert!(!token.is_empty());

    let response = app.admin_login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["token_type"], "bearer");
    assert!(response.body["expires_at"].is_string());
}

#[tokio::test]
async fn test_admin_login_failures_look_alike() {
    let app = TestApp::new().await;
    app.admin_token().await;

    let wrong_password = app.admin_login(ADMIN_USERNAME, "not-the-password").await;
    let unknown_user = app.admin_login("nobody", ADMIN_PASSWORD).await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
    assert_eq!(wrong_password.error_code(), Some("UNAUTHORIZED"));
}

#[tokio::test]
async fn test_admin_routes_require_admin_bearer() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let anonymous = app.request("GET", "/api/admin/tokens", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let garbage = app
        .request("GET", "/api/admin/tokens", None, Some("not-a-jwt"))
        .await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let token = app
        .create_token(&admin, json!({ "allow_download": true }))
        .await;
    let session = app.guest_session(&token).await;
    let guest = app
        .request("GET", "/api/admin/tokens", None, Some(&session))
        .await;
    assert_eq!(guest.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_token_applies_defaults() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let token = app.create_token(&admin, json!({})).await;

    assert_eq!(token["status"], "active");
    assert_eq!(token["max_usage_count"], 1);
    assert_eq!(token["usage_count"], 0);
    assert_eq!(token["remaining_uses"], 1);
    assert_eq!(token["allow_upload"], false);
    assert_eq!(token["allow_download"], false);
    assert_eq!(token["allow_resumable_download"], true);
    assert_eq!(token["filename_conflict_strategy"], "rename");
    assert_eq!(token["allowed_file_types"], json!([]));
    assert_eq!(token["token_string"].as_str().map(str::len), Some(32));
}

#[tokio::test]
async fn test_create_token_rejects_bad_input() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    for body in [
        json!({ "upload_path": "../outside" }),
        json!({ "downloadable_path": "/etc" }),
        json!({ "max_usage_count": -2 }),
        json!({ "max_file_size_mb": 0 }),
        json!({ "max_file_size_mb": 1i64 << 45 }),
        json!({ "download_bandwidth_limit_kbps": i64::MAX }),
    ] {
        let response = app
            .request("POST", "/api/admin/tokens", Some(body.clone()), Some(&admin))
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response.error_code(), Some("VALIDATION_ERROR"), "{body}");
    }

    let token = app.create_token(&admin, json!({ "allow_upload": true })).await;
    let response = app
        .request(
            "PUT",
            &format!("/api/admin/tokens/{}", token["id"]),
            Some(json!({ "max_total_upload_mb": 1i64 << 45 })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), Some("VALIDATION_ERROR"));
}

#[tokio::test]
async fn test_list_tokens_is_paginated() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    for i in 0..3 {
        app.create_token(&admin, json!({ "description": format!("token {i}") }))
            .await;
    }

    let response = app
        .request("GET", "/api/admin/tokens?page=1&limit=2", None, Some(&admin))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 3);
    assert_eq!(response.body["page"], 1);
    assert_eq!(response.body["limit"], 2);
    let items = response.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["description"], "token 2");
}

#[tokio::test]
async fn test_update_token() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app
        .create_token(&admin, json!({ "description": "initial", "max_usage_count": 5 }))
        .await;
    let id = token["id"].as_i64().unwrap();
    let path = format!("/api/admin/tokens/{id}");

    let response = app
        .request(
            "PUT",
            &path,
            Some(json!({ "description": null, "allow_upload": true, "allowed_file_types": [".PDF"] })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["description"], json!(null));
    assert_eq!(response.body["allow_upload"], true);
    assert_eq!(response.body["allowed_file_types"], json!(["pdf"]));
    assert_eq!(response.body["max_usage_count"], 5);
    assert_eq!(response.body["token_string"], token["token_string"]);

    let response = app
        .request("PUT", &path, Some(json!({ "token_string": "ABC" })), Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), Some("VALIDATION_ERROR"));
}

#[tokio::test]
async fn test_update_cannot_exhaust_delete_on_exhaust_token() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("out/a.txt", b"a");
    let token = app
        .create_token(
            &admin,
            json!({
                "allow_download": true,
                "downloadable_path": "out",
                "max_usage_count": 3,
                "delete_on_exhaust": true,
            }),
        )
        .await;
    let session = app.guest_session(&token).await;
    let response = app.download("GET", &session, "a.txt", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let path = format!("/api/admin/tokens/{}", token["id"]);
    let response = app
        .request("PUT", &path, Some(json!({ "max_usage_count": 1 })), Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), Some("VALIDATION_ERROR"));

    let response = app
        .request("PUT", &path, Some(json!({ "max_usage_count": 2 })), Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "active");
    assert_eq!(response.body["remaining_uses"], 1);
}

#[tokio::test]
async fn test_update_requires_active_token() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app.create_token(&admin, json!({})).await;
    let id = token["id"].as_i64().unwrap();

    let revoked = app
        .request("POST", &format!("/api/admin/tokens/{id}/revoke"), None, Some(&admin))
        .await;
    assert_eq!(revoked.status, StatusCode::OK);
    assert_eq!(revoked.body["status"], "revoked");

    let response = app
        .request(
            "PUT",
            &format!("/api/admin/tokens/{id}"),
            Some(json!({ "description": "too late" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_revoke_is_idempotent() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app.create_token(&admin, json!({})).await;
    let path = format!("/api/admin/tokens/{}/revoke", token["id"]);

    for _ in 0..2 {
        let response = app.request("POST", &path, None, Some(&admin)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["status"], "revoked");
    }

    let missing = app
        .request("POST", "/api/admin/tokens/9999/revoke", None, Some(&admin))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_token() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app.create_token(&admin, json!({})).await;
    let id = token["id"].as_i64().unwrap();
    let path = format!("/api/admin/tokens/{id}");

    let response = app.request("DELETE", &path, None, Some(&admin)).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    assert_eq!(app.get_token(&admin, id).await.status, StatusCode::NOT_FOUND);
    let again = app.request("DELETE", &path, None, Some(&admin)).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    let login = app
        .guest_login(token["token_string"].as_str().unwrap())
        .await;
    assert_eq!(login.status, StatusCode::NOT_FOUND);
    assert_eq!(login.error_code(), Some("INVALID_TOKEN"));
}

#[tokio::test]
async fn test_downloadable_dirs_lists_root_subdirectories() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("reports/q1.pdf", b"q1");
    app.write_file("inbox/readme.txt", b"hi");
    app.write_file("loose.txt", b"not a dir");

    let response = app
        .request("GET", "/api/admin/tokens/downloadable-dirs", None, Some(&admin))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["directories"], json!(["inbox", "reports"]));
}

#[tokio::test]
async fn test_token_logs_record_activity() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("shared/a.txt", b"abc");
    let token = app
        .create_token(
            &admin,
            json!({ "allow_download": true, "downloadable_path": "shared", "max_usage_count": 5 }),
        )
        .await;
    let session = app.guest_session(&token).await;
    let response = app.download("GET", &session, "a.txt", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let logs = app
        .request(
            "GET",
            &format!("/api/admin/tokens/{}/logs", token["id"]),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(logs.status, StatusCode::OK);
    let actions: Vec<&str> = logs.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, ["download", "guest_login", "token_created"]);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["database"], "connected");
}
