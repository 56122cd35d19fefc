//! crates/chirp_core/src/services/mod.rs
//!
//! Business rules layered over the storage port. Each service is cheap to clone
//! and shares the same `DatabaseService` handle.

pub mod messages;
pub mod notifications;
pub mod tweets;
pub mod users;

pub use messages::MessageService;
pub use notifications::NotificationService;
pub use tweets::{TweetService, VoteOutcome};
pub use users::{ProfileEdit, Registration, UserService};
