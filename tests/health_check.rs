//! Integration tests for the yapper server

mod common;

use common::spawn_app;

#[tokio::test]
async fn health_check_works() {
    let app = spawn_app();

    let response = app
        .client
        .get(app.url("/api/healthz"))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.content_length(), Some(0));
}

#[tokio::test]
async fn health_check_echoes_request_id() {
    let app = spawn_app();

    let response = app
        .client
        .get(app.url("/api/healthz"))
        .header("x-request-id", "req-abc-123")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(
        response.headers().get("x-request-id").unwrap().to_str().unwrap(),
        "req-abc-123"
    );
}

#[tokio::test]
async fn static_index_is_served() {
    let app = spawn_app();

    let response = app
        .client
        .get(app.url("/app/"))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert!(response.text().await.unwrap().contains("Yapper"));
}
