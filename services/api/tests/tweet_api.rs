// tests/tweet_api.rs

mod common;

use std::fmt;
use std::sync::{Arc, Mutex};

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use common::{create_test_app, get, post, register, send, tweet};

fn respond_uri(option_id: &str) -> String {
    format!("/tweets/poll/option/{option_id}/respond")
}

#[tokio::test]
async fn like_notifies_the_author_once_and_unlike_is_silent() {
    let app = create_test_app();
    let ada = register(&app, "ada").await;
    let bob = register(&app, "bob").await;
    let tweet_id = tweet(&app, &ada, "Hi #test").await;

    let (status, body) = post(
        &app,
        &format!("/tweets/{tweet_id}/like"),
        bob.token(),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["userId"], bob.id.to_string());

    let (_, body) = get(&app, &format!("/tweets/{tweet_id}"), None).await;
    assert_eq!(body["_count"]["likes"], 1);
    assert_eq!(body["likes"][0]["userId"], bob.id.to_string());

    let (_, notifications) = get(&app, "/notifications", ada.token()).await;
    let notifications = notifications.as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "LIKE");
    assert_eq!(notifications[0]["targetId"], bob.id.to_string());
    assert_eq!(notifications[0]["tweetId"], tweet_id.to_string());

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/tweets/{tweet_id}/like"),
        bob.token(),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, notifications) = get(&app, "/notifications", ada.token()).await;
    assert_eq!(notifications.as_array().unwrap().len(), 1);
    let (_, unread) = get(&app, "/notifications/unread", ada.token()).await;
    assert_eq!(unread["count"], 1);
}

#[tokio::test]
async fn liking_twice_and_unliking_unliked_are_bad_requests() {
    let app = create_test_app();
    let ada = register(&app, "ada").await;
    let tweet_id = tweet(&app, &ada, "hello").await;
    let uri = format!("/tweets/{tweet_id}/like");

    let (status, _) = post(&app, &uri, ada.token(), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = post(&app, &uri, ada.token(), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Tweet already liked");

    let (status, _) = send(&app, Method::DELETE, &uri, ada.token(), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::DELETE, &uri, ada.token(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn guarded_routes_reject_anonymous_callers() {
    let app = create_test_app();
    let (status, body) = post(&app, "/tweets", None, json!({ "content": "hello" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);

    let (status, _) = get(&app, "/tweets/feed/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = get(&app, "/messages/conversations", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_pages_carry_their_meta() {
    let app = create_test_app();
    let ada = register(&app, "ada").await;
    for i in 0..7 {
        tweet(&app, &ada, &format!("tweet number {i}")).await;
    }

    let (status, body) = get(&app, "/tweets?page=3&limit=3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["meta"], json!({ "total": 7, "page": 3, "limit": 3, "pages": 3 }));
    assert_eq!(body["data"][0]["content"], "tweet number 0");

    let (_, body) = get(&app, "/tweets", None).await;
    assert_eq!(body["meta"]["limit"], 10);
    assert_eq!(body["data"][0]["content"], "tweet number 6");

    let (status, _) = get(&app, "/tweets?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = get(&app, "/tweets?limit=lots", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn only_the_author_may_edit_or_delete() {
    let app = create_test_app();
    let ada = register(&app, "ada").await;
    let bob = register(&app, "bob").await;
    let tweet_id = tweet(&app, &ada, "first draft").await;
    let uri = format!("/tweets/{tweet_id}");

    let (status, _) = send(
        &app,
        Method::PATCH,
        &uri,
        bob.token(),
        Some(json!({ "content": "mine now" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &uri, bob.token(), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        ada.token(),
        Some(json!({ "content": "final" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "final");

    let (status, _) = send(&app, Method::DELETE, &uri, ada.token(), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = get(&app, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let app = create_test_app();
    let (status, body) = get(&app, "/tweets/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn hashtags_and_search_find_tweets() {
    let app = create_test_app();
    let ada = register(&app, "ada").await;
    tweet(&app, &ada, "Learning #Rust today").await;
    tweet(&app, &ada, "nothing to see").await;

    let (_, body) = get(&app, "/tweets/hashtag/rust", None).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["content"], "Learning #Rust today");

    let (_, body) = get(&app, "/tweets/search/LEARNING", None).await;
    assert_eq!(body["meta"]["total"], 1);

    let (_, body) = get(&app, "/tweets/search/see", None).await;
    assert_eq!(body["data"][0]["content"], "nothing to see");
}

#[tokio::test]
async fn mentions_notify_the_mentioned_user() {
    let app = create_test_app();
    let ada = register(&app, "ada").await;
    let bob = register(&app, "bob").await;
    tweet(&app, &ada, "hey @bob and @bob and @nobody").await;

    let (_, notifications) = get(&app, "/notifications", bob.token()).await;
    let notifications = notifications.as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["type"], "MENTION");
    assert_eq!(notifications[0]["target"]["username"], "ada");
}

#[tokio::test]
async fn replies_embed_the_original_and_count_on_it() {
    let app = create_test_app();
    let ada = register(&app, "ada").await;
    let bob = register(&app, "bob").await;
    let original = tweet(&app, &ada, "original").await;

    let (status, reply) = post(
        &app,
        "/tweets",
        bob.token(),
        json!({ "content": "a reply", "replyToId": original }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["replyToId"], original.to_string());
    assert_eq!(reply["replyTo"]["content"], "original");
    assert_eq!(reply["replyTo"]["user"]["username"], "ada");

    let (_, replies) = get(&app, &format!("/tweets/{original}/replies"), None).await;
    assert_eq!(replies["meta"]["total"], 1);
    let (_, body) = get(&app, &format!("/tweets/{original}"), None).await;
    assert_eq!(body["_count"]["comments"], 1);

    let (status, _) = post(
        &app,
        "/tweets",
        bob.token(),
        json!({ "content": "into the void", "replyToId": uuid::Uuid::new_v4() }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn poll_votes_toggle_and_move() {
    let app = create_test_app();
    let ada = register(&app, "ada").await;
    let bob = register(&app, "bob").await;

    let (status, body) = post(
        &app,
        "/tweets",
        ada.token(),
        json!({
            "content": "Tabs or spaces?",
            "poll": {
                "question": "Pick one",
                "options": ["tabs", "spaces"],
                "expiresAt": (Utc::now() + Duration::days(1)).to_rfc3339(),
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let tweet_id = body["id"].as_str().unwrap().to_string();
    let poll_id = body["poll"]["id"].as_str().unwrap().to_string();
    let tabs = body["poll"]["options"][0]["id"].as_str().unwrap().to_string();
    let spaces = body["poll"]["options"][1]["id"].as_str().unwrap().to_string();
    assert_eq!(body["poll"]["_count"], json!({ "options": 2, "responses": 0 }));

    let (status, body) = post(&app, &respond_uri(&tabs), bob.token(), json!({})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "voted");

    let (_, body) = post(&app, &respond_uri(&spaces), bob.token(), json!({})).await;
    assert_eq!(body["status"], "changed");
    assert_eq!(body["response"]["pollOptionId"], spaces);

    let (_, body) = get(&app, &format!("/tweets/{tweet_id}"), None).await;
    assert_eq!(body["poll"]["_count"]["responses"], 1);
    assert_eq!(body["poll"]["options"][1]["_count"]["responses"], 1);
    assert_eq!(body["poll"]["options"][1]["responses"][0]["userId"], bob.id.to_string());

    let (_, body) = post(&app, &respond_uri(&spaces), bob.token(), json!({})).await;
    assert_eq!(body["status"], "removed");

    let retract = format!("/tweets/poll/{poll_id}/response");
    let (status, _) = send(&app, Method::DELETE, &retract, bob.token(), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    post(&app, &respond_uri(&tabs), bob.token(), json!({})).await;
    let (status, _) = send(&app, Method::DELETE, &retract, bob.token(), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn expired_polls_reject_votes() {
    let app = create_test_app();
    let ada = register(&app, "ada").await;

    let (_, body) = post(
        &app,
        "/tweets",
        ada.token(),
        json!({
            "content": "Too late",
            "poll": {
                "question": "Closed?",
                "options": ["yes", "no"],
                "expiresAt": (Utc::now() - Duration::hours(1)).to_rfc3339(),
            }
        }),
    )
    .await;
    let option = body["poll"]["options"][0]["id"].as_str().unwrap();

    let (status, _) = post(&app, &respond_uri(option), ada.token(), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/// Collects the message of every event emitted while installed.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<String>>>);

impl CapturedLogs {
    fn count(&self, message: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|m| *m == message).count()
    }
}

struct MessageField(String);

impl Visit for MessageField {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = MessageField(String::new());
        event.record(&mut message);
        self.0.lock().unwrap().push(message.0);
    }
}

#[tokio::test]
async fn each_mutation_is_logged_once() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(logs.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let app = create_test_app();
    let ada = register(&app, "ada").await;
    let tweet_id = tweet(&app, &ada, "short lived").await;
    let tweet_uri = format!("/tweets/{tweet_id}");
    let (status, _) = send(&app, Method::DELETE, &tweet_uri, ada.token(), None).await;
    assert_eq!(status, StatusCode::OK);
    let user_uri = format!("/users/{}", ada.id);
    let (status, _) = send(&app, Method::DELETE, &user_uri, ada.token(), None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(logs.count("Tweet created"), 1);
    assert_eq!(logs.count("Tweet deleted"), 1);
    assert_eq!(logs.count("User deleted"), 1);
}
