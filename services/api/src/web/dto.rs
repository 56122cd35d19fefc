//! services/api/src/web/dto.rs
//!
//! Request payloads and response bodies of the REST API. Field names are
//! camelCase on the wire; embedded counters are serialized under `_count`.

use chirp_core::domain::{
    ConversationDetails, ConversationOverview, Follow, Like, LikeDetails, Message, MessageDetails,
    NotificationDetails, PollDetails, PollOptionTally, PollResponse, TweetDetails, TweetPreview,
    User, UserSummary,
};
use chirp_core::fanout::{PollInput, TweetEdit, TweetInput};
use chirp_core::pagination::{PageMeta, PageRequest, Paginated};
use chirp_core::ServiceResult;
use chirp_core::services::{ProfileEdit, Registration, VoteOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Request Payloads
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub password: String,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration {
            email: req.email,
            username: req.username,
            display_name: req.display_name,
            password: req.password,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
    pub banner_image_url: Option<String>,
}

impl From<UpdateUserRequest> for ProfileEdit {
    fn from(req: UpdateUserRequest) -> Self {
        ProfileEdit {
            email: req.email,
            username: req.username,
            display_name: req.display_name,
            password: req.password,
            bio: req.bio,
            profile_image_url: req.profile_image_url,
            banner_image_url: req.banner_image_url,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTweetRequest {
    pub content: String,
    pub images: Option<Vec<String>>,
    pub video_url: Option<String>,
    pub poll: Option<CreatePollRequest>,
    pub retweet_id: Option<Uuid>,
    pub reply_to_id: Option<Uuid>,
}

impl From<CreateTweetRequest> for TweetInput {
    fn from(req: CreateTweetRequest) -> Self {
        TweetInput {
            content: req.content,
            images: req.images,
            video_url: req.video_url,
            poll: req.poll.map(|p| PollInput {
                question: p.question,
                options: p.options,
                expires_at: p.expires_at,
            }),
            retweet_id: req.retweet_id,
            reply_to_id: req.reply_to_id,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTweetRequest {
    pub content: Option<String>,
    pub images: Option<Vec<String>>,
    pub video_url: Option<String>,
}

impl From<UpdateTweetRequest> for TweetEdit {
    fn from(req: UpdateTweetRequest) -> Self {
        TweetEdit {
            content: req.content,
            images: req.images,
            video_url: req.video_url,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub participant_ids: Vec<Uuid>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub content: String,
    pub conversation_id: Uuid,
}

/// `?page=&limit=` on every tweet listing.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number, defaults to 1.
    pub page: Option<u32>,
    /// Page size, defaults to 10 and is capped at 100.
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn request(&self) -> ServiceResult<PageRequest> {
        PageRequest::new(self.page, self.limit)
    }
}

//=========================================================================================
// Users
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
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

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            display_name: u.display_name,
            bio: u.bio,
            profile_image_url: u.profile_image_url,
            banner_image_url: u.banner_image_url,
            is_verified: u.is_verified,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummaryResponse {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub profile_image_url: Option<String>,
    pub is_verified: bool,
}

impl From<UserSummary> for UserSummaryResponse {
    fn from(u: UserSummary) -> Self {
        Self {
            id: u.id,
            username: u.username,
            display_name: u.display_name,
            profile_image_url: u.profile_image_url,
            is_verified: u.is_verified,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowResponse {
    pub follower_id: Uuid,
    pub following_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Follow> for FollowResponse {
    fn from(f: Follow) -> Self {
        Self {
            follower_id: f.follower_id,
            following_id: f.following_id,
            created_at: f.created_at,
        }
    }
}

//=========================================================================================
// Tweets
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: Uuid,
}

#[derive(Serialize, ToSchema)]
pub struct TweetCountResponse {
    pub comments: u64,
    pub likes: u64,
    pub retweets: u64,
}

#[derive(Serialize, ToSchema)]
pub struct OptionCountResponse {
    pub responses: u64,
}

#[derive(Serialize, ToSchema)]
pub struct PollCountResponse {
    pub options: u64,
    pub responses: u64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionResponse {
    pub id: Uuid,
    pub text: String,
    pub responses: Vec<UserRef>,
    #[serde(rename = "_count")]
    pub count: OptionCountResponse,
}

impl From<PollOptionTally> for PollOptionResponse {
    fn from(t: PollOptionTally) -> Self {
        Self {
            id: t.option.id,
            text: t.option.text,
            count: OptionCountResponse {
                responses: t.voter_ids.len() as u64,
            },
            responses: t
                .voter_ids
                .into_iter()
                .map(|user_id| UserRef { user_id })
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TweetPollResponse {
    pub id: Uuid,
    pub question: String,
    pub expires_at: DateTime<Utc>,
    pub tweet_id: Uuid,
    pub options: Vec<PollOptionResponse>,
    #[serde(rename = "_count")]
    pub count: PollCountResponse,
}

impl From<PollDetails> for TweetPollResponse {
    fn from(p: PollDetails) -> Self {
        let count = PollCountResponse {
            options: p.options.len() as u64,
            responses: p.total_responses() as u64,
        };
        Self {
            id: p.poll.id,
            question: p.poll.question,
            expires_at: p.poll.expires_at,
            tweet_id: p.poll.tweet_id,
            options: p.options.into_iter().map(Into::into).collect(),
            count,
        }
    }
}

/// The embedded card for a retweeted or replied-to tweet.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TweetPreviewResponse {
    pub id: Uuid,
    pub content: String,
    pub images: Vec<String>,
    pub video_url: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user: UserSummaryResponse,
}

impl From<TweetPreview> for TweetPreviewResponse {
    fn from(p: TweetPreview) -> Self {
        Self {
            id: p.tweet.id,
            images: p.tweet.media.images().to_vec(),
            video_url: p.tweet.media.video_url().map(str::to_string),
            content: p.tweet.content,
            user_id: p.tweet.author_id,
            created_at: p.tweet.created_at,
            user: p.author.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TweetResponse {
    pub id: Uuid,
    pub content: String,
    pub images: Vec<String>,
    pub video_url: Option<String>,
    pub user_id: Uuid,
    pub retweet_id: Option<Uuid>,
    pub reply_to_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserSummaryResponse,
    pub likes: Vec<UserRef>,
    #[serde(rename = "_count")]
    pub count: TweetCountResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<TweetPollResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retweet: Option<TweetPreviewResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<TweetPreviewResponse>,
}

impl From<TweetDetails> for TweetResponse {
    fn from(d: TweetDetails) -> Self {
        let tweet = d.tweet;
        Self {
            id: tweet.id,
            images: tweet.media.images().to_vec(),
            video_url: tweet.media.video_url().map(str::to_string),
            content: tweet.content,
            user_id: tweet.author_id,
            retweet_id: tweet.origin.retweet_id(),
            reply_to_id: tweet.origin.reply_to_id(),
            created_at: tweet.created_at,
            updated_at: tweet.updated_at,
            user: d.author.into(),
            likes: d
                .liked_by
                .into_iter()
                .map(|user_id| UserRef { user_id })
                .collect(),
            count: TweetCountResponse {
                comments: d.counts.replies,
                likes: d.counts.likes,
                retweets: d.counts.retweets,
            },
            poll: d.poll.map(Into::into),
            retweet: d.retweet.map(Into::into),
            reply_to: d.reply_to.map(Into::into),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PageMetaResponse {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub pages: u64,
}

impl From<PageMeta> for PageMetaResponse {
    fn from(m: PageMeta) -> Self {
        Self {
            total: m.total,
            page: m.page,
            limit: m.limit,
            pages: m.pages,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TweetPageResponse {
    pub data: Vec<TweetResponse>,
    pub meta: PageMetaResponse,
}

impl From<Paginated<TweetDetails>> for TweetPageResponse {
    fn from(p: Paginated<TweetDetails>) -> Self {
        Self {
            data: p.data.into_iter().map(Into::into).collect(),
            meta: p.meta.into(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub user_id: Uuid,
    pub tweet_id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummaryResponse>,
}

impl From<Like> for LikeResponse {
    fn from(l: Like) -> Self {
        Self {
            user_id: l.user_id,
            tweet_id: l.tweet_id,
            created_at: l.created_at,
            user: None,
        }
    }
}

impl From<LikeDetails> for LikeResponse {
    fn from(l: LikeDetails) -> Self {
        Self {
            user: Some(l.user.into()),
            ..LikeResponse::from(l.like)
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollVoteResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub poll_id: Uuid,
    pub poll_option_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<PollResponse> for PollVoteResponse {
    fn from(r: PollResponse) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            poll_id: r.poll_id,
            poll_option_id: r.poll_option_id,
            created_at: r.created_at,
        }
    }
}

/// What a click on a poll option did: `voted`, `changed` or `removed`.
#[derive(Serialize, ToSchema)]
pub struct PollVoteOutcomeResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<PollVoteResponse>,
}

impl From<VoteOutcome> for PollVoteOutcomeResponse {
    fn from(outcome: VoteOutcome) -> Self {
        let (status, response) = match outcome {
            VoteOutcome::Voted(r) => ("voted", Some(r.into())),
            VoteOutcome::Changed(r) => ("changed", Some(r.into())),
            VoteOutcome::Removed => ("removed", None),
        };
        Self {
            status: status.to_string(),
            response,
        }
    }
}

//=========================================================================================
// Notifications and Messaging
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub user_id: Uuid,
    pub target_id: Option<Uuid>,
    pub tweet_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<UserSummaryResponse>,
}

impl From<chirp_core::domain::Notification> for NotificationResponse {
    fn from(n: chirp_core::domain::Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind.as_str().to_string(),
            content: n.content,
            user_id: n.user_id,
            target_id: n.target_id,
            tweet_id: n.tweet_id,
            is_read: n.is_read,
            created_at: n.created_at,
            target: None,
        }
    }
}

impl From<NotificationDetails> for NotificationResponse {
    fn from(n: NotificationDetails) -> Self {
        Self {
            target: n.target.map(Into::into),
            ..NotificationResponse::from(n.notification)
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub content: String,
    pub user_id: Uuid,
    pub conversation_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummaryResponse>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            id: m.id,
            content: m.content,
            user_id: m.sender_id,
            conversation_id: m.conversation_id,
            is_read: m.is_read,
            created_at: m.created_at,
            user: None,
        }
    }
}

impl From<MessageDetails> for MessageResponse {
    fn from(m: MessageDetails) -> Self {
        Self {
            user: Some(m.sender.into()),
            ..MessageResponse::from(m.message)
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MessageCountResponse {
    pub messages: u64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub participants: Vec<UserSummaryResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageResponse>,
    #[serde(rename = "_count", skip_serializing_if = "Option::is_none")]
    pub count: Option<MessageCountResponse>,
}

impl From<ConversationDetails> for ConversationResponse {
    fn from(c: ConversationDetails) -> Self {
        Self {
            id: c.conversation.id,
            created_at: c.conversation.created_at,
            updated_at: c.conversation.updated_at,
            participants: c.participants.into_iter().map(Into::into).collect(),
            last_message: None,
            count: None,
        }
    }
}

impl From<ConversationOverview> for ConversationResponse {
    fn from(c: ConversationOverview) -> Self {
        Self {
            id: c.conversation.id,
            created_at: c.conversation.created_at,
            updated_at: c.conversation.updated_at,
            participants: c.participants.into_iter().map(Into::into).collect(),
            last_message: c.last_message.map(Into::into),
            count: Some(MessageCountResponse {
                messages: c.message_count,
            }),
        }
    }
}

//=========================================================================================
// Small Bodies
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub message: String,
}

impl StatusResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
