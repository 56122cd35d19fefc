// tests/auth_api.rs

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{create_test_app, get, post, register, send, PASSWORD};

#[tokio::test]
async fn register_returns_the_user_and_a_token_without_the_password() {
    let app = create_test_app();

    let (status, body) = post(
        &app,
        "/auth/register",
        None,
        json!({
            "email": "ada@example.com",
            "username": "ada",
            "password": PASSWORD,
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["username"], "ada");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["isVerified"], false);
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["user"].get("password").is_none());
    assert!(!body.to_string().contains(PASSWORD));
}

#[tokio::test]
async fn profile_requires_a_valid_bearer_token() {
    let app = create_test_app();
    let ada = register(&app, "ada").await;

    let (status, body) = get(&app, "/auth/profile", ada.token()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], ada.id.to_string());
    assert!(!body.to_string().contains(PASSWORD));

    let (status, body) = get(&app, "/auth/profile", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = get(&app, "/auth/profile", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_checks_the_password() {
    let app = create_test_app();
    register(&app, "ada").await;

    let (status, body) = post(
        &app,
        "/auth/login",
        None,
        json!({ "email": "ada@example.com", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap().to_string();
    let (status, _) = get(&app, "/auth/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &app,
        "/auth/login",
        None,
        json!({ "email": "ada@example.com", "password": "wrong-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, _) = post(
        &app,
        "/auth/login",
        None,
        json!({ "email": "nobody@example.com", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_accounts_conflict() {
    let app = create_test_app();
    register(&app, "ada").await;

    let (status, body) = post(
        &app,
        "/auth/register",
        None,
        json!({ "email": "ada@example.com", "username": "other", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["statusCode"], 409);

    let (status, _) = post(
        &app,
        "/auth/register",
        None,
        json!({ "email": "other@example.com", "username": "ada", "password": PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_registrations_are_bad_requests() {
    let app = create_test_app();
    for payload in [
        json!({ "email": "not-an-email", "username": "ada", "password": PASSWORD }),
        json!({ "email": "ada@example.com", "username": "ada lovelace", "password": PASSWORD }),
        json!({ "email": "ada@example.com", "username": "ada", "password": "123" }),
    ] {
        let (status, body) = post(&app, "/auth/register", None, payload.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
        assert_eq!(body["error"], "Bad Request");
    }
}

#[tokio::test]
async fn undecodable_bodies_use_the_error_envelope() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(body["statusCode"], status.as_u16());
    assert!(body["message"].as_str().is_some());
}
