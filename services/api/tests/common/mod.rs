// tests/common/mod.rs
//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use api_lib::{
    adapters::Argon2Hasher,
    config::Config,
    web::{app_router, state::AppState},
};
use axum::{
    body::Body,
    http::{self, Method, Request, StatusCode},
    Router,
};
use chirp_core::MemoryStore;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "secret123";

/// The full router over a fresh in-memory store.
pub fn create_test_app() -> Router {
    let config = Config::from_lookup(|key| match key {
        "STORAGE_BACKEND" => Some("memory".to_string()),
        "JWT_SECRET" => Some("integration-test-secret".to_string()),
        _ => None,
    })
    .unwrap();
    let state = AppState::new(
        Arc::new(config),
        Arc::new(MemoryStore::new()),
        Arc::new(Argon2Hasher::new()),
    );
    app_router(Arc::new(state)).unwrap()
}

/// Sends one request and returns the status and the decoded JSON body
/// (`Value::Null` for an empty body).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    send(app, Method::POST, uri, token, Some(body)).await
}

/// A registered account and its bearer token.
pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub token: String,
}

impl TestUser {
    pub fn token(&self) -> Option<&str> {
        Some(&self.token)
    }
}

pub async fn register(app: &Router, username: &str) -> TestUser {
    let (status, body) = post(
        app,
        "/auth/register",
        None,
        json!({
            "email": format!("{username}@example.com"),
            "username": username,
            "displayName": username.to_uppercase(),
            "password": PASSWORD,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register {username}: {body}");
    TestUser {
        id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
        username: username.to_string(),
        token: body["access_token"].as_str().unwrap().to_string(),
    }
}

/// Posts a plain tweet and returns its id.
pub async fn tweet(app: &Router, author: &TestUser, content: &str) -> Uuid {
    let (status, body) = post(app, "/tweets", author.token(), json!({ "content": content })).await;
    assert_eq!(status, StatusCode::CREATED, "tweet: {body}");
    body["id"].as_str().unwrap().parse().unwrap()
}
