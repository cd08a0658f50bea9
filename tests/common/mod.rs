#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use serde_json::{json, Value};
use yapper::auth::SessionManager;
use yapper::configuration::AuthSettings;
use yapper::startup::run;
use yapper::store::{InMemoryRefreshTokenStore, InMemoryUserStore};

pub const JWT_SECRET: &str = "integration-secret-key-at-least-32-characters";
pub const API_KEY: &str = "polka-integration-key";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

pub struct LoggedInUser {
    pub id: String,
    pub token: String,
    pub refresh_token: String,
}

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        jwt_secret: JWT_SECRET.to_string(),
        issuer: "yapper".to_string(),
        access_token_ttl_seconds: 3600,
        refresh_token_ttl_seconds: 60 * 24 * 3600,
        leeway_seconds: 0,
        bcrypt_cost: 4,
        store_timeout_ms: 1000,
        api_key: API_KEY.to_string(),
    }
}

pub fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let session = SessionManager::new(
        &auth_settings(),
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryRefreshTokenStore::new()),
    )
    .expect("Failed to build session manager");

    let server = run(listener, session, API_KEY.to_string()).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn create_user(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/users"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_with_auth(&self, path: &str, authorization: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("Authorization", authorization)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Register and log in, returning the issued tokens.
    pub async fn logged_in_user(&self, email: &str, password: &str) -> LoggedInUser {
        assert_eq!(self.create_user(email, password).await.status().as_u16(), 201);

        let response = self.login(email, password).await;
        assert_eq!(response.status().as_u16(), 200);
        let body: Value = response.json().await.expect("Failed to parse response");

        LoggedInUser {
            id: body["id"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
            refresh_token: body["refresh_token"].as_str().unwrap().to_string(),
        }
    }
}
