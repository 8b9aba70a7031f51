//! Concurrent use of a single token.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::helpers::TestApp;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_downloads_never_exceed_max_usage() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    app.write_file("outbox/report.bin", &[7u8; 4096]);
    let token = app
        .create_token(
            &admin,
            json!({ "allow_download": true, "downloadable_path": "outbox", "max_usage_count": 3 }),
        )
        .await;
    let session = app.guest_session(&token).await;

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let router = app.router.clone();
            let session = session.clone();
            tokio::spawn(async move {
                let req = Request::builder()
                    .method("GET")
                    .uri("/api/guest/download/report.bin")
                    .header("Authorization", format!("Bearer {session}"))
                    .body(Body::empty())
                    .unwrap();
                router.oneshot(req).await.unwrap().status()
            })
        })
        .collect();

    let statuses = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect::<Vec<_>>();

    let ok = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let refused = statuses
        .iter()
        .filter(|s| **s == StatusCode::FORBIDDEN)
        .count();
    assert_eq!(ok, 3, "{statuses:?}");
    assert_eq!(refused, 7, "{statuses:?}");

    let stored = app.get_token(&admin, token["id"].as_i64().unwrap()).await;
    assert_eq!(stored.body["usage_count"], 3);
    assert_eq!(stored.body["status"], "exhausted");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rename_uploads_keep_every_file() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let token = app
        .create_token(
            &admin,
            json!({
                "allow_upload": true,
                "upload_path": "inbox",
                "filename_conflict_strategy": "rename",
                "max_usage_count": 0,
            }),
        )
        .await;
    let session = app.guest_session(&token).await;

    let uploads = (0..6u8).map(|i| {
        let session = session.clone();
        let app = &app;
        async move { app.upload(&session, "same.txt", &[b'a' + i]).await }
    });
    let responses = futures::future::join_all(uploads).await;

    let mut names: Vec<String> = responses
        .iter()
        .map(|r| {
            assert_eq!(r.status, StatusCode::CREATED, "{:?}", r.body);
            r.body["filename"].as_str().unwrap().to_string()
        })
        .collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 6);

    let stored = app.get_token(&admin, token["id"].as_i64().unwrap()).await;
    assert_eq!(stored.body["usage_count"], 6);
    assert_eq!(stored.body["uploaded_bytes"], 6);
}
