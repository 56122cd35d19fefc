//! Shared fixtures for the service-level tests.

#![allow(dead_code)]

use std::sync::Arc;

use chirp_core::services::{
    MessageService, NotificationService, Registration, TweetService, UserService,
};
use chirp_core::{CredentialHasher, MemoryStore, PortResult, TweetDetails, TweetInput, User};
use uuid::Uuid;

/// Reversible stand-in for argon2 so tests stay fast.
pub struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash(&self, password: &str) -> PortResult<String> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hashed: &str) -> PortResult<bool> {
        Ok(hashed == format!("plain${password}"))
    }
}

pub struct World {
    pub users: UserService,
    pub tweets: TweetService,
    pub messages: MessageService,
    pub notifications: NotificationService,
}

impl World {
    pub fn new() -> Self {
        let db = Arc::new(MemoryStore::new());
        Self {
            users: UserService::new(db.clone(), Arc::new(PlainHasher)),
            tweets: TweetService::new(db.clone()),
            messages: MessageService::new(db.clone()),
            notifications: NotificationService::new(db),
        }
    }

    pub async fn user(&self, username: &str) -> User {
        self.users
            .register(Registration {
                email: format!("{username}@example.com"),
                username: username.to_string(),
                display_name: None,
                password: "secret123".to_string(),
            })
            .await
            .expect("registration succeeds")
    }

    pub async fn tweet(&self, author: Uuid, content: &str) -> TweetDetails {
        self.tweets
            .create(
                author,
                TweetInput {
                    content: content.to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect("tweet is created")
    }
}
