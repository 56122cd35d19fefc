//! crates/chirp_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Users and the Follow Graph
//=========================================================================================

/// A user profile as it is shown to clients. Never carries the password hash.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub banner_image_url: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            profile_image_url: self.profile_image_url.clone(),
            is_verified: self.is_verified,
        }
    }
}

/// The author card embedded in tweets, likes, notifications and messages.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub is_verified: bool,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

/// Fields for a brand new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub hashed_password: String,
}

/// A partial profile update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub hashed_password: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub banner_image_url: Option<String>,
}

/// A directed follow edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Follow {
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Tweets
//=========================================================================================

/// Which tweet, if any, this tweet points back at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TweetOrigin {
    #[default]
    None,
    Retweet(Uuid),
    Reply(Uuid),
}

impl TweetOrigin {
    pub fn retweet_id(&self) -> Option<Uuid> {
        match self {
            TweetOrigin::Retweet(id) => Some(*id),
            _ => None,
        }
    }

    pub fn reply_to_id(&self) -> Option<Uuid> {
        match self {
            TweetOrigin::Reply(id) => Some(*id),
            _ => None,
        }
    }

    /// Rebuilds the origin from the two nullable storage columns.
    pub fn from_columns(retweet_id: Option<Uuid>, reply_to_id: Option<Uuid>) -> Self {
        match (retweet_id, reply_to_id) {
            (Some(id), _) => TweetOrigin::Retweet(id),
            (None, Some(id)) => TweetOrigin::Reply(id),
            (None, None) => TweetOrigin::None,
        }
    }
}

/// Media attached to a tweet. A poll is stored separately and excludes media.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TweetMedia {
    #[default]
    None,
    Images(Vec<String>),
    Video(String),
}

impl TweetMedia {
    pub fn images(&self) -> &[String] {
        match self {
            TweetMedia::Images(urls) => urls,
            _ => &[],
        }
    }

    pub fn video_url(&self) -> Option<&str> {
        match self {
            TweetMedia::Video(url) => Some(url),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, TweetMedia::None)
    }

    pub fn from_columns(images: Vec<String>, video_url: Option<String>) -> Self {
        match (images.is_empty(), video_url) {
            (_, Some(url)) => TweetMedia::Video(url),
            (false, None) => TweetMedia::Images(images),
            (true, None) => TweetMedia::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tweet {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub media: TweetMedia,
    pub origin: TweetOrigin,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TweetCounts {
    pub replies: u64,
    pub likes: u64,
    pub retweets: u64,
}

/// A tweet with its author, used for the embedded retweet / reply-to card.
#[derive(Debug, Clone, PartialEq)]
pub struct TweetPreview {
    pub tweet: Tweet,
    pub author: UserSummary,
}

/// The fully assembled read model returned by every tweet query.
#[derive(Debug, Clone, PartialEq)]
pub struct TweetDetails {
    pub tweet: Tweet,
    pub author: UserSummary,
    pub liked_by: Vec<Uuid>,
    pub counts: TweetCounts,
    pub poll: Option<PollDetails>,
    pub retweet: Option<TweetPreview>,
    pub reply_to: Option<TweetPreview>,
}

/// Editable tweet fields. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct TweetChanges {
    pub content: Option<String>,
    pub media: Option<TweetMedia>,
}

/// The selection a paginated tweet listing runs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TweetFilter {
    All,
    ByAuthor(Uuid),
    /// Tweets by the user or by anyone the user follows.
    Feed(Uuid),
    /// Case-insensitive substring match on content or on a linked hashtag name.
    Search(String),
    /// Exact match on a (lower-cased) hashtag name.
    Hashtag(String),
    RepliesTo(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hashtag {
    pub id: Uuid,
    pub name: String,
}

//=========================================================================================
// Likes
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Like {
    pub user_id: Uuid,
    pub tweet_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LikeDetails {
    pub like: Like,
    pub user: UserSummary,
}

//=========================================================================================
// Polls
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Poll {
    pub id: Uuid,
    pub tweet_id: Uuid,
    pub question: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Poll {
    /// A poll accepts vote changes only while `now < expires_at`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOption {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
}

/// One option together with the users who picked it.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOptionTally {
    pub option: PollOption,
    pub voter_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollDetails {
    pub poll: Poll,
    pub options: Vec<PollOptionTally>,
}

impl PollDetails {
    pub fn total_responses(&self) -> usize {
        self.options.iter().map(|o| o.voter_ids.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub poll_id: Uuid,
    pub poll_option_id: Uuid,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Notifications
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Retweet,
    Mention,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "LIKE",
            NotificationKind::Comment => "COMMENT",
            NotificationKind::Follow => "FOLLOW",
            NotificationKind::Retweet => "RETWEET",
            NotificationKind::Mention => "MENTION",
            NotificationKind::System => "SYSTEM",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "LIKE" => Some(NotificationKind::Like),
            "COMMENT" => Some(NotificationKind::Comment),
            "FOLLOW" => Some(NotificationKind::Follow),
            "RETWEET" => Some(NotificationKind::Retweet),
            "MENTION" => Some(NotificationKind::Mention),
            "SYSTEM" => Some(NotificationKind::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub content: String,
    /// The recipient.
    pub user_id: Uuid,
    /// The actor who triggered it.
    pub target_id: Option<Uuid>,
    pub tweet_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDetails {
    pub notification: Notification,
    pub target: Option<UserSummary>,
}

/// A notification that has not been written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub content: String,
    pub user_id: Uuid,
    pub target_id: Option<Uuid>,
    pub tweet_id: Option<Uuid>,
}

//=========================================================================================
// Messaging
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationDetails {
    pub conversation: Conversation,
    pub participants: Vec<UserSummary>,
}

/// A row of the conversation list: participants plus the newest message.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationOverview {
    pub conversation: Conversation,
    pub participants: Vec<UserSummary>,
    pub last_message: Option<Message>,
    pub message_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDetails {
    pub message: Message,
    pub sender: UserSummary,
}
