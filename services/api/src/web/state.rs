//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::auth::TokenService;
use chirp_core::ports::{CredentialHasher, DatabaseService};
use chirp_core::services::{MessageService, NotificationService, TweetService, UserService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: TokenService,
    pub users: UserService,
    pub tweets: TweetService,
    pub messages: MessageService,
    pub notifications: NotificationService,
}

impl AppState {
    /// Wires every service onto the same storage handle.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            tokens: TokenService::new(&config.jwt_secret, config.jwt_ttl_seconds),
            users: UserService::new(db.clone(), hasher),
            tweets: TweetService::new(db.clone()),
            messages: MessageService::new(db.clone()),
            notifications: NotificationService::new(db),
            config,
        }
    }
}
