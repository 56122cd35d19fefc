//! crates/chirp_core/src/ports.rs
//!
//! Defines the storage contract for the application's core logic.
//! The trait forms the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete database.
//!
//! Every method that writes more than one row is atomic: an implementation must
//! either persist all of it or none of it, and must report a violated uniqueness
//! rule as `PortError::Conflict` instead of silently accepting a duplicate.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    ConversationDetails, ConversationOverview, Follow, Like, LikeDetails, MessageDetails,
    NewNotification, NewUser, Notification, NotificationDetails, Poll, PollOption, PollResponse,
    Tweet, TweetChanges, TweetDetails, TweetFilter, User, UserChanges, UserCredentials,
    UserSummary,
};
use crate::fanout::TweetWrite;
use crate::pagination::PageRequest;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Uniqueness violated: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Port
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users ---
    /// Conflict when the email or username is taken.
    async fn create_user(&self, new_user: NewUser) -> PortResult<User>;

    async fn get_user(&self, user_id: Uuid) -> PortResult<User>;

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<User>>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn list_users(&self) -> PortResult<Vec<User>>;

    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> PortResult<User>;

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()>;

    // --- Follow Graph ---
    /// Writes the edge and its FOLLOW notification together.
    async fn insert_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        notification: NewNotification,
    ) -> PortResult<Follow>;

    /// Returns `false` when there was no such edge.
    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> PortResult<bool>;

    async fn list_followers(&self, user_id: Uuid) -> PortResult<Vec<UserSummary>>;

    async fn list_following(&self, user_id: Uuid) -> PortResult<Vec<UserSummary>>;

    // --- Tweets ---
    /// Writes the tweet, its poll, its hashtag links and its notifications together.
    async fn insert_tweet(&self, write: TweetWrite) -> PortResult<TweetDetails>;

    async fn get_tweet(&self, tweet_id: Uuid) -> PortResult<Tweet>;

    /// Like `list_tweets` for one id, plus the embedded retweet / reply-to previews.
    async fn get_tweet_details(&self, tweet_id: Uuid) -> PortResult<TweetDetails>;

    /// One page of matches, newest first, and the total number of matches.
    async fn list_tweets(
        &self,
        filter: &TweetFilter,
        page: PageRequest,
    ) -> PortResult<(Vec<TweetDetails>, u64)>;

    async fn update_tweet(&self, tweet_id: Uuid, changes: TweetChanges)
        -> PortResult<TweetDetails>;

    async fn delete_tweet(&self, tweet_id: Uuid) -> PortResult<()>;

    // --- Likes ---
    /// Conflict when the user already likes the tweet.
    async fn insert_like(
        &self,
        user_id: Uuid,
        tweet_id: Uuid,
        notification: Option<NewNotification>,
    ) -> PortResult<Like>;

    /// Returns `false` when there was no such like.
    async fn delete_like(&self, user_id: Uuid, tweet_id: Uuid) -> PortResult<bool>;

    async fn list_likes(&self, tweet_id: Uuid) -> PortResult<Vec<LikeDetails>>;

    // --- Polls ---
    async fn get_poll(&self, poll_id: Uuid) -> PortResult<Poll>;

    /// The option together with the poll that owns it.
    async fn get_poll_option(&self, option_id: Uuid) -> PortResult<(PollOption, Poll)>;

    async fn find_poll_response(&self, user_id: Uuid, poll_id: Uuid)
        -> PortResult<Option<PollResponse>>;

    /// Conflict when the user already has a response on the option's poll.
    async fn insert_poll_response(
        &self,
        user_id: Uuid,
        option: &PollOption,
    ) -> PortResult<PollResponse>;

    /// Re-points an existing response at another option of the same poll.
    async fn move_poll_response(
        &self,
        response_id: Uuid,
        option_id: Uuid,
    ) -> PortResult<PollResponse>;

    async fn delete_poll_response(&self, response_id: Uuid) -> PortResult<()>;

    // --- Notifications ---
    async fn list_notifications(&self, user_id: Uuid) -> PortResult<Vec<NotificationDetails>>;

    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<u64>;

    /// NotFound unless the notification belongs to `user_id`.
    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> PortResult<Notification>;

    /// Returns how many rows flipped from unread to read.
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64>;

    // --- Messaging ---
    async fn create_conversation(&self, participant_ids: &[Uuid])
        -> PortResult<ConversationDetails>;

    /// Conversations the user takes part in, most recently active first.
    async fn list_conversations(&self, user_id: Uuid) -> PortResult<Vec<ConversationOverview>>;

    /// `None` when the conversation is unknown or `member_id` is not a participant.
    async fn find_conversation(
        &self,
        conversation_id: Uuid,
        member_id: Uuid,
    ) -> PortResult<Option<ConversationDetails>>;

    /// All messages oldest first; messages sent by others are marked read in the same unit.
    async fn list_messages_marking_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> PortResult<Vec<MessageDetails>>;

    /// Appends the message and bumps the conversation's `updated_at` together.
    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> PortResult<MessageDetails>;

    async fn count_unread_messages(&self, user_id: Uuid) -> PortResult<u64>;
}

/// One-way password hashing. Implementations must salt every hash.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> PortResult<String>;

    /// `Ok(false)` for a wrong password; `Err` only when the stored hash is unusable.
    fn verify(&self, password: &str, hashed: &str) -> PortResult<bool>;
}
