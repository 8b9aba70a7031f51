//! Guest downloads: full and ranged GET, HEAD, and path safety.

use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::helpers::TestApp;

const CONTENTS: &[u8] = b"0123456789abcdefghij";

async fn download_token(app: &TestApp, admin: &str, extra: Value) -> (Value, String) {
    let mut body = json!({ "allow_download": true, "downloadable_path": "outbox", "max_usage_count": 0 });
    if let (Some(base), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    let token = app.create_token(admin, body).await;
    let session = app.guest_session(&token).await;
    (token, session)
}

async fn usage(app: &TestApp, admin: &str, token: &Value) -> i64 {
    let stored = app.get_token(admin, token["id"].as_i64().unwrap()).await;
    stored.body["usage_count"].as_i64().unwrap()
}

#[tokio::test]
async fn test_full_download() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("outbox/letters.txt", CONTENTS);
    let (token, session) = download_token(&app, &admin, json!({})).await;

    let response = app.download("GET", &session, "letters.txt", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.bytes, CONTENTS);
    assert_eq!(response.header("accept-ranges"), Some("bytes"));
    assert_eq!(response.header("content-length"), Some("20"));
    assert_eq!(response.header("content-type"), Some("text/plain"));
    assert!(
        response
            .header("content-disposition")
            .unwrap()
            .starts_with("attachment; filename=\"letters.txt\"")
    );
    assert_eq!(usage(&app, &admin, &token).await, 1);
}

#[tokio::test]
async fn test_ranged_download() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("outbox/letters.txt", CONTENTS);
    let (token, session) = download_token(&app, &admin, json!({})).await;

    let response = app
        .download("GET", &session, "letters.txt", Some("bytes=2-5"))
        .await;
    assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.bytes, b"2345");
    assert_eq!(response.header("content-range"), Some("bytes 2-5/20"));
    assert_eq!(response.header("content-length"), Some("4"));

    let tail = app
        .download("GET", &session, "letters.txt", Some("bytes=-3"))
        .await;
    assert_eq!(tail.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(tail.bytes, b"hij");

    let open_ended = app
        .download("GET", &session, "letters.txt", Some("bytes=18-"))
        .await;
    assert_eq!(open_ended.bytes, b"ij");
    assert_eq!(open_ended.header("content-range"), Some("bytes 18-19/20"));

    assert_eq!(usage(&app, &admin, &token).await, 3);
}

#[tokio::test]
async fn test_unsatisfiable_range_is_not_charged() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("outbox/letters.txt", CONTENTS);
    let (token, session) = download_token(&app, &admin, json!({})).await;

    let response = app
        .download("GET", &session, "letters.txt", Some("bytes=50-60"))
        .await;

    assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.header("content-range"), Some("bytes */20"));
    assert_eq!(usage(&app, &admin, &token).await, 0);
}

#[tokio::test]
async fn test_malformed_range_serves_full_file() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("outbox/letters.txt", CONTENTS);
    let (_, session) = download_token(&app, &admin, json!({})).await;

    for range in ["bytes=0-1,4-5", "items=0-3", "bytes=5-2"] {
        let response = app
            .download("GET", &session, "letters.txt", Some(range))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{range}");
        assert_eq!(response.bytes, CONTENTS, "{range}");
    }
}

#[tokio::test]
async fn test_head_reports_size_without_charging() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("outbox/letters.txt", CONTENTS);
    let (token, session) = download_token(&app, &admin, json!({ "max_usage_count": 1 })).await;

    for _ in 0..3 {
        let response = app.download("HEAD", &session, "letters.txt", None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header("content-length"), Some("20"));
        assert!(response.bytes.is_empty());
    }
    assert_eq!(usage(&app, &admin, &token).await, 0);

    let response = app.download("GET", &session, "letters.txt", None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_range_ignored_when_not_resumable() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("outbox/letters.txt", CONTENTS);
    let (_, session) =
        download_token(&app, &admin, json!({ "allow_resumable_download": false })).await;

    let response = app
        .download("GET", &session, "letters.txt", Some("bytes=2-5"))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.bytes, CONTENTS);
    assert_eq!(response.header("accept-ranges"), Some("none"));
    assert!(response.header("content-range").is_none());
}

#[tokio::test]
async fn test_empty_file_is_not_charged() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("outbox/empty.bin", b"");
    let (token, session) = download_token(&app, &admin, json!({ "max_usage_count": 1 })).await;

    let response = app.download("GET", &session, "empty.bin", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.bytes.is_empty());
    assert_eq!(usage(&app, &admin, &token).await, 0);
}

#[tokio::test]
async fn test_download_traversal_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("secret.txt", b"top secret");
    app.write_file("outbox/letters.txt", CONTENTS);
    let (token, session) = download_token(&app, &admin, json!({})).await;

    for name in ["..%2Fsecret.txt", "%2E%2E", "..%5Csecret.txt"] {
        let response = app.download("GET", &session, name, None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{name}");
        assert_eq!(response.error_code(), Some("PATH_VIOLATION"), "{name}");
    }
    assert_eq!(usage(&app, &admin, &token).await, 0);

    let logs = app
        .request(
            "GET",
            &format!("/api/admin/tokens/{}/logs", token["id"]),
            None,
            Some(&admin),
        )
        .await;
    let actions: Vec<&str> = logs.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions.iter().filter(|a| **a == "path_violation").count(),
        3
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_out_of_root_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("passwd"), b"root:x:0:0").unwrap();
    app.write_file("outbox/letters.txt", CONTENTS);
    std::os::unix::fs::symlink(
        outside.path().join("passwd"),
        app.storage_root().join("outbox/passwd"),
    )
    .unwrap();
    let (_, session) = download_token(&app, &admin, json!({})).await;

    let response = app.download("GET", &session, "passwd", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), Some("PATH_VIOLATION"));

    let listing = app.request("GET", "/api/guest/files", None, Some(&session)).await;
    assert_eq!(listing.body["files"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_file() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (token, session) = download_token(&app, &admin, json!({})).await;

    let response = app.download("GET", &session, "nope.txt", None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error_code(), Some("NOT_FOUND"));
    assert_eq!(usage(&app, &admin, &token).await, 0);
}

#[tokio::test]
async fn test_exhausted_after_last_use() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("outbox/letters.txt", CONTENTS);
    let (token, session) = download_token(&app, &admin, json!({ "max_usage_count": 1 })).await;

    let first = app.download("GET", &session, "letters.txt", None).await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app.download("GET", &session, "letters.txt", None).await;
    assert_eq!(second.status, StatusCode::FORBIDDEN);
    assert_eq!(second.error_code(), Some("TOKEN_UNAVAILABLE"));
    assert_eq!(second.body["details"]["reason"], "exhausted");

    let stored = app.get_token(&admin, token["id"].as_i64().unwrap()).await;
    assert_eq!(stored.body["status"], "exhausted");
    assert_eq!(stored.body["remaining_uses"], 0);
}

#[tokio::test]
async fn test_delete_on_exhaust_removes_token() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("outbox/letters.txt", CONTENTS);
    let (token, session) = download_token(
        &app,
        &admin,
        json!({ "max_usage_count": 1, "delete_on_exhaust": true }),
    )
    .await;

    let first = app.download("GET", &session, "letters.txt", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.bytes, CONTENTS);

    let stored = app.get_token(&admin, token["id"].as_i64().unwrap()).await;
    assert_eq!(stored.status, StatusCode::NOT_FOUND);

    let second = app.download("GET", &session, "letters.txt", None).await;
    assert_eq!(second.status, StatusCode::NOT_FOUND);
    assert_eq!(second.error_code(), Some("INVALID_TOKEN"));
}
