mod common;

use common::spawn_app;
use serde_json::{json, Value};

// --- Account Tests ---

#[tokio::test]
async fn create_user_returns_201_without_password_hash() {
    let app = spawn_app();

    let response = app.create_user("a@x.com", "secret1").await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["is_premium"], false);
    assert!(body.get("id").is_some());
    assert!(body.get("hashed_password").is_none());
}

#[tokio::test]
async fn create_user_with_taken_email_returns_409() {
    let app = spawn_app();
    app.create_user("a@x.com", "secret1").await;

    let response = app.create_user("a@x.com", "secret2").await;

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn create_user_rejects_invalid_input() {
    let app = spawn_app();
    let test_cases = vec![
        (json!({ "email": "not-an-email", "password": "secret1" }), "invalid email"),
        (json!({ "email": "a@x.com", "password": "" }), "empty password"),
        (json!({ "email": "a@x.com", "password": "x".repeat(73) }), "password over 72 bytes"),
        (json!({ "email": "a@x.com" }), "missing password"),
    ];

    for (body, description) in test_cases {
        let response = app
            .client
            .post(app.url("/api/users"))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 when the payload had {}.",
            description
        );
    }
}

#[tokio::test]
async fn malformed_json_returns_400() {
    let app = spawn_app();

    let response = app
        .client
        .post(app.url("/api/login"))
        .header("Content-Type", "application/json")
        .body("{\"email\": ")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_tokens_and_user() {
    let app = spawn_app();
    app.create_user("a@x.com", "secret1").await;

    let response = app.login("a@x.com", "secret1").await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["refresh_token"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app();
    app.create_user("a@x.com", "secret1").await;

    let wrong_password = app.login("a@x.com", "wrong").await;
    let unknown_email = app.login("nouser@x.com", "anything").await;

    assert_eq!(wrong_password.status(), unknown_email.status());
    assert_eq!(400, wrong_password.status().as_u16());

    let wrong_password: Value = wrong_password.json().await.unwrap();
    let unknown_email: Value = unknown_email.json().await.unwrap();
    assert_eq!(wrong_password["code"], unknown_email["code"]);
    assert_eq!(wrong_password["message"], unknown_email["message"]);
}

// --- Refresh / Revoke Tests ---

#[tokio::test]
async fn refresh_twice_with_same_token_succeeds() {
    let app = spawn_app();
    let user = app.logged_in_user("a@x.com", "secret1").await;
    let bearer = format!("Bearer {}", user.refresh_token);

    for _ in 0..2 {
        let response = app.post_with_auth("/api/refresh", &bearer).await;
        assert_eq!(200, response.status().as_u16());

        let body: Value = response.json().await.unwrap();
        assert!(!body["token"].as_str().unwrap().is_empty());
        assert!(body.get("refresh_token").is_none());
    }
}

#[tokio::test]
async fn refreshed_token_authenticates() {
    let app = spawn_app();
    let user = app.logged_in_user("a@x.com", "secret1").await;

    let body: Value = app
        .post_with_auth("/api/refresh", &format!("Bearer {}", user.refresh_token))
        .await
        .json()
        .await
        .unwrap();

    let response = app
        .client
        .get(app.url("/api/me"))
        .bearer_auth(body["token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn revoked_token_cannot_refresh() {
    let app = spawn_app();
    let user = app.logged_in_user("a@x.com", "secret1").await;
    let bearer = format!("Bearer {}", user.refresh_token);

    let response = app.post_with_auth("/api/revoke", &bearer).await;
    assert_eq!(204, response.status().as_u16());

    let response = app.post_with_auth("/api/refresh", &bearer).await;
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "TOKEN_REVOKED");

    // revoking again is a no-op
    let response = app.post_with_auth("/api/revoke", &bearer).await;
    assert_eq!(204, response.status().as_u16());
}

#[tokio::test]
async fn unknown_refresh_token_returns_404() {
    let app = spawn_app();

    let response = app.post_with_auth("/api/refresh", "Bearer no-such-token").await;
    assert_eq!(404, response.status().as_u16());

    let response = app.post_with_auth("/api/revoke", "Bearer no-such-token").await;
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn refresh_with_bad_authorization_header_returns_400() {
    let app = spawn_app();

    for header in ["Bearer ", "Basic abc", "Bearer a b"] {
        let response = app.post_with_auth("/api/refresh", header).await;
        assert_eq!(400, response.status().as_u16(), "header {:?}", header);
    }

    let response = app.client.post(app.url("/api/refresh")).send().await.unwrap();
    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "MISSING_CREDENTIAL");
}

// --- Protected Route Tests ---

#[tokio::test]
async fn me_requires_valid_access_token() {
    let app = spawn_app();
    let user = app.logged_in_user("a@x.com", "secret1").await;

    let response = app.client.get(app.url("/api/me")).bearer_auth(&user.token).send().await.unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], user.id.as_str());

    let response = app.client.get(app.url("/api/me")).send().await.unwrap();
    assert_eq!(400, response.status().as_u16());

    let tampered = format!("{}x", user.token);
    let response = app.client.get(app.url("/api/me")).bearer_auth(tampered).send().await.unwrap();
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() {
    let app = spawn_app();
    let user = app.logged_in_user("a@x.com", "secret1").await;

    let response = app
        .client
        .get(app.url("/api/me"))
        .bearer_auth(&user.refresh_token)
        .send()
        .await
        .unwrap();

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn revoke_all_sessions_ends_every_refresh_token() {
    let app = spawn_app();
    let first = app.logged_in_user("a@x.com", "secret1").await;
    let second: Value = app.login("a@x.com", "secret1").await.json().await.unwrap();

    let response = app
        .client
        .delete(app.url("/api/me/sessions"))
        .bearer_auth(&first.token)
        .send()
        .await
        .unwrap();
    assert_eq!(204, response.status().as_u16());

    for refresh_token in [first.refresh_token.as_str(), second["refresh_token"].as_str().unwrap()] {
        let response = app
            .post_with_auth("/api/refresh", &format!("Bearer {}", refresh_token))
            .await;
        assert_eq!(401, response.status().as_u16());
    }
}

#[tokio::test]
async fn update_user_changes_credentials() {
    let app = spawn_app();
    let user = app.logged_in_user("a@x.com", "secret1").await;

    let response = app
        .client
        .put(app.url("/api/users"))
        .bearer_auth(&user.token)
        .json(&json!({ "email": "b@x.com", "password": "secret2" }))
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], "b@x.com");

    assert_eq!(200, app.login("b@x.com", "secret2").await.status().as_u16());
    assert_eq!(400, app.login("a@x.com", "secret1").await.status().as_u16());

    // existing sessions survive a credential change
    let response = app
        .post_with_auth("/api/refresh", &format!("Bearer {}", user.refresh_token))
        .await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn update_user_to_email_of_another_user_returns_409() {
    let app = spawn_app();
    app.create_user("taken@x.com", "secret1").await;
    let user = app.logged_in_user("a@x.com", "secret1").await;

    let response = app
        .client
        .put(app.url("/api/users"))
        .bearer_auth(&user.token)
        .json(&json!({ "email": "taken@x.com", "password": "secret2" }))
        .send()
        .await
        .unwrap();

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn update_user_requires_access_token() {
    let app = spawn_app();

    let response = app
        .client
        .put(app.url("/api/users"))
        .json(&json!({ "email": "b@x.com", "password": "secret2" }))
        .send()
        .await
        .unwrap();

    assert_eq!(400, response.status().as_u16());
}

// --- Webhook Tests ---

async fn send_webhook(app: &common::TestApp, api_key: &str, body: Value) -> reqwest::Response {
    app.client
        .post(app.url("/api/polka/webhooks"))
        .header("Authorization", format!("ApiKey {}", api_key))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.")
}

#[tokio::test]
async fn upgrade_webhook_marks_user_premium() {
    let app = spawn_app();
    let user = app.logged_in_user("a@x.com", "secret1").await;

    let response = send_webhook(
        &app,
        common::API_KEY,
        json!({ "event": "user.upgraded", "data": { "user_id": user.id } }),
    )
    .await;
    assert_eq!(204, response.status().as_u16());

    let body: Value = app
        .client
        .get(app.url("/api/me"))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["is_premium"], true);
}

#[tokio::test]
async fn webhook_rejects_wrong_api_key() {
    let app = spawn_app();
    let user = app.logged_in_user("a@x.com", "secret1").await;

    let response = send_webhook(
        &app,
        "not-the-key",
        json!({ "event": "user.upgraded", "data": { "user_id": user.id } }),
    )
    .await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn webhook_for_unknown_user_returns_404_and_ignores_other_events() {
    let app = spawn_app();

    let response = send_webhook(
        &app,
        common::API_KEY,
        json!({ "event": "user.upgraded", "data": { "user_id": uuid::Uuid::new_v4() } }),
    )
    .await;
    assert_eq!(404, response.status().as_u16());

    let response = send_webhook(&app, common::API_KEY, json!({ "event": "user.payment_failed" })).await;
    assert_eq!(204, response.status().as_u16());
}
