//! crates/chirp_core/src/memory.rs
//!
//! A process-local implementation of the `DatabaseService` port.
//!
//! All tables live behind one mutex, so every port call is trivially atomic. The
//! uniqueness rules mirror the Postgres schema and surface as `PortError::Conflict`.
//! Rows carry an insertion sequence number which stands in for `created_at` when
//! ordering, keeping "newest first" stable even when two rows share a timestamp.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{
    Conversation, ConversationDetails, ConversationOverview, Follow, Hashtag, Like, LikeDetails,
    Message, MessageDetails, NewNotification, NewUser, Notification, NotificationDetails, Poll,
    PollDetails, PollOption, PollOptionTally, PollResponse, Tweet, TweetChanges, TweetCounts,
    TweetDetails, TweetFilter, TweetPreview, User, UserChanges, UserCredentials, UserSummary,
};
use crate::fanout::TweetWrite;
use crate::pagination::PageRequest;
use crate::ports::{DatabaseService, PortError, PortResult};

//=========================================================================================
// Tables
//=========================================================================================

struct UserRow {
    user: User,
    hashed_password: String,
}

struct Seq<T> {
    seq: u64,
    row: T,
}

#[derive(Default)]
struct Tables {
    next_seq: u64,
    users: Vec<UserRow>,
    follows: Vec<Follow>,
    tweets: Vec<Seq<Tweet>>,
    polls: Vec<Poll>,
    poll_options: Vec<PollOption>,
    poll_responses: Vec<PollResponse>,
    likes: Vec<Like>,
    hashtags: Vec<Hashtag>,
    /// (tweet_id, hashtag_id)
    tweet_hashtags: Vec<(Uuid, Uuid)>,
    notifications: Vec<Seq<Notification>>,
    /// The sequence number is bumped whenever a message is appended.
    conversations: Vec<Seq<Conversation>>,
    /// (conversation_id, user_id)
    participants: Vec<(Uuid, Uuid)>,
    messages: Vec<Seq<Message>>,
}

fn user_not_found(id: Uuid) -> PortError {
    PortError::NotFound(format!("User with ID {id} not found"))
}

fn tweet_not_found(id: Uuid) -> PortError {
    PortError::NotFound(format!("Tweet with ID {id} not found"))
}

impl Tables {
    fn bump(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn user(&self, id: Uuid) -> PortResult<&UserRow> {
        self.users
            .iter()
            .find(|u| u.user.id == id)
            .ok_or_else(|| user_not_found(id))
    }

    fn summary(&self, id: Uuid) -> PortResult<UserSummary> {
        Ok(self.user(id)?.user.summary())
    }

    fn tweet(&self, id: Uuid) -> PortResult<&Tweet> {
        self.tweets
            .iter()
            .map(|t| &t.row)
            .find(|t| t.id == id)
            .ok_or_else(|| tweet_not_found(id))
    }

    fn email_or_username_taken(&self, email: &str, username: &str, except: Option<Uuid>) -> bool {
        self.users.iter().any(|u| {
            Some(u.user.id) != except && (u.user.email == email || u.user.username == username)
        })
    }

    fn push_notification(&mut self, new: &NewNotification) {
        let seq = self.bump();
        self.notifications.push(Seq {
            seq,
            row: Notification {
                id: Uuid::new_v4(),
                kind: new.kind,
                content: new.content.clone(),
                user_id: new.user_id,
                target_id: new.target_id,
                tweet_id: new.tweet_id,
                is_read: false,
                created_at: Utc::now(),
            },
        });
    }

    fn hashtag_names(&self, tweet_id: Uuid) -> impl Iterator<Item = &str> {
        self.tweet_hashtags
            .iter()
            .filter(move |(t, _)| *t == tweet_id)
            .filter_map(move |(_, h)| self.hashtags.iter().find(|tag| tag.id == *h))
            .map(|tag| tag.name.as_str())
    }

    fn matches(&self, filter: &TweetFilter, tweet: &Tweet) -> bool {
        match filter {
            TweetFilter::All => true,
            TweetFilter::ByAuthor(author) => tweet.author_id == *author,
            TweetFilter::Feed(user) => {
                tweet.author_id == *user
                    || self
                        .follows
                        .iter()
                        .any(|f| f.follower_id == *user && f.following_id == tweet.author_id)
            }
            TweetFilter::Search(query) => {
                let query = query.to_lowercase();
                tweet.content.to_lowercase().contains(&query)
                    || self
                        .hashtag_names(tweet.id)
                        .any(|name| name.to_lowercase().contains(&query))
            }
            TweetFilter::Hashtag(tag) => self.hashtag_names(tweet.id).any(|name| name == tag),
            TweetFilter::RepliesTo(parent) => tweet.origin.reply_to_id() == Some(*parent),
        }
    }

    fn poll_details(&self, tweet_id: Uuid) -> Option<PollDetails> {
        let poll = self.polls.iter().find(|p| p.tweet_id == tweet_id)?;
        let options = self
            .poll_options
            .iter()
            .filter(|o| o.poll_id == poll.id)
            .map(|o| PollOptionTally {
                option: o.clone(),
                voter_ids: self
                    .poll_responses
                    .iter()
                    .filter(|r| r.poll_option_id == o.id)
                    .map(|r| r.user_id)
                    .collect(),
            })
            .collect();
        Some(PollDetails {
            poll: poll.clone(),
            options,
        })
    }

    fn preview(&self, id: Option<Uuid>) -> PortResult<Option<TweetPreview>> {
        let Some(id) = id else { return Ok(None) };
        let Ok(tweet) = self.tweet(id) else { return Ok(None) };
        Ok(Some(TweetPreview {
            tweet: tweet.clone(),
            author: self.summary(tweet.author_id)?,
        }))
    }

    fn details(&self, tweet: &Tweet) -> PortResult<TweetDetails> {
        let others = self.tweets.iter().map(|t| &t.row);
        let counts = TweetCounts {
            replies: others
                .clone()
                .filter(|t| t.origin.reply_to_id() == Some(tweet.id))
                .count() as u64,
            likes: self.likes.iter().filter(|l| l.tweet_id == tweet.id).count() as u64,
            retweets: others
                .filter(|t| t.origin.retweet_id() == Some(tweet.id))
                .count() as u64,
        };
        Ok(TweetDetails {
            tweet: tweet.clone(),
            author: self.summary(tweet.author_id)?,
            liked_by: self
                .likes
                .iter()
                .filter(|l| l.tweet_id == tweet.id)
                .map(|l| l.user_id)
                .collect(),
            counts,
            poll: self.poll_details(tweet.id),
            retweet: self.preview(tweet.origin.retweet_id())?,
            reply_to: self.preview(tweet.origin.reply_to_id())?,
        })
    }

    fn remove_tweet(&mut self, tweet_id: Uuid) {
        self.tweets.retain(|t| t.row.id != tweet_id);
        let poll_ids: Vec<Uuid> = self
            .polls
            .iter()
            .filter(|p| p.tweet_id == tweet_id)
            .map(|p| p.id)
            .collect();
        self.polls.retain(|p| p.tweet_id != tweet_id);
        self.poll_options.retain(|o| !poll_ids.contains(&o.poll_id));
        self.poll_responses.retain(|r| !poll_ids.contains(&r.poll_id));
        self.likes.retain(|l| l.tweet_id != tweet_id);
        self.tweet_hashtags.retain(|(t, _)| *t != tweet_id);
        self.notifications.retain(|n| n.row.tweet_id != Some(tweet_id));
        for other in self.tweets.iter_mut() {
            if other.row.origin.retweet_id() == Some(tweet_id)
                || other.row.origin.reply_to_id() == Some(tweet_id)
            {
                other.row.origin = Default::default();
            }
        }
    }

    fn conversation_details(&self, conversation: &Conversation) -> PortResult<ConversationDetails> {
        let participants = self
            .participants
            .iter()
            .filter(|(c, _)| *c == conversation.id)
            .map(|(_, u)| self.summary(*u))
            .collect::<PortResult<Vec<_>>>()?;
        Ok(ConversationDetails {
            conversation: conversation.clone(),
            participants,
        })
    }

    fn is_participant(&self, conversation_id: Uuid, user_id: Uuid) -> bool {
        self.participants
            .iter()
            .any(|(c, u)| *c == conversation_id && *u == user_id)
    }

    fn message_details(&self, message: &Message) -> PortResult<MessageDetails> {
        Ok(MessageDetails {
            message: message.clone(),
            sender: self.summary(message.sender_id)?,
        })
    }
}

//=========================================================================================
// The Store
//=========================================================================================

/// An in-memory `DatabaseService`, used by tests and the `memory` storage backend.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| PortError::Unexpected("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DatabaseService for MemoryStore {
    // --- Users ---
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let mut tables = self.lock()?;
        if tables.email_or_username_taken(&new_user.email, &new_user.username, None) {
            return Err(PortError::Conflict("users_email_or_username".to_string()));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            username: new_user.username,
            display_name: new_user.display_name,
            bio: None,
            profile_image_url: None,
            banner_image_url: None,
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(UserRow {
            user: user.clone(),
            hashed_password: new_user.hashed_password,
        });
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        Ok(self.lock()?.user(user_id)?.user.clone())
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|u| u.user.email == email)
            .map(|u| u.user.clone()))
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        let tables = self.lock()?;
        Ok(tables
            .users
            .iter()
            .find(|u| u.user.username == username)
            .map(|u| u.user.clone()))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let tables = self.lock()?;
        tables
            .users
            .iter()
            .find(|u| u.user.email == email)
            .map(|u| UserCredentials {
                user: u.user.clone(),
                hashed_password: u.hashed_password.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User with email {email} not found")))
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        Ok(self.lock()?.users.iter().map(|u| u.user.clone()).collect())
    }

    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> PortResult<User> {
        let mut tables = self.lock()?;
        let current = tables.user(user_id)?.user.clone();
        let email = changes.email.clone().unwrap_or(current.email);
        let username = changes.username.clone().unwrap_or(current.username);
        if tables.email_or_username_taken(&email, &username, Some(user_id)) {
            return Err(PortError::Conflict("users_email_or_username".to_string()));
        }
        let row = tables
            .users
            .iter_mut()
            .find(|u| u.user.id == user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        row.user.email = email;
        row.user.username = username;
        if let Some(v) = changes.display_name {
            row.user.display_name = Some(v);
        }
        if let Some(v) = changes.bio {
            row.user.bio = Some(v);
        }
        if let Some(v) = changes.profile_image_url {
            row.user.profile_image_url = Some(v);
        }
        if let Some(v) = changes.banner_image_url {
            row.user.banner_image_url = Some(v);
        }
        if let Some(v) = changes.hashed_password {
            row.hashed_password = v;
        }
        row.user.updated_at = Utc::now();
        Ok(row.user.clone())
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let mut tables = self.lock()?;
        tables.user(user_id)?;
        let owned: Vec<Uuid> = tables
            .tweets
            .iter()
            .filter(|t| t.row.author_id == user_id)
            .map(|t| t.row.id)
            .collect();
        for tweet_id in owned {
            tables.remove_tweet(tweet_id);
        }
        tables.users.retain(|u| u.user.id != user_id);
        tables
            .follows
            .retain(|f| f.follower_id != user_id && f.following_id != user_id);
        tables.likes.retain(|l| l.user_id != user_id);
        tables.poll_responses.retain(|r| r.user_id != user_id);
        tables.notifications.retain(|n| n.row.user_id != user_id);
        for n in tables.notifications.iter_mut() {
            if n.row.target_id == Some(user_id) {
                n.row.target_id = None;
            }
        }
        tables.participants.retain(|(_, u)| *u != user_id);
        tables.messages.retain(|m| m.row.sender_id != user_id);
        Ok(())
    }

    // --- Follow Graph ---
    async fn insert_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        notification: NewNotification,
    ) -> PortResult<Follow> {
        let mut tables = self.lock()?;
        tables.user(follower_id)?;
        tables.user(following_id)?;
        if tables
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id)
        {
            return Err(PortError::Conflict("follows_pkey".to_string()));
        }
        let follow = Follow {
            follower_id,
            following_id,
            created_at: Utc::now(),
        };
        tables.follows.push(follow.clone());
        tables.push_notification(&notification);
        Ok(follow)
    }

    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> PortResult<bool> {
        let mut tables = self.lock()?;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(tables.follows.len() != before)
    }

    async fn list_followers(&self, user_id: Uuid) -> PortResult<Vec<UserSummary>> {
        let tables = self.lock()?;
        tables
            .follows
            .iter()
            .filter(|f| f.following_id == user_id)
            .map(|f| tables.summary(f.follower_id))
            .collect()
    }

    async fn list_following(&self, user_id: Uuid) -> PortResult<Vec<UserSummary>> {
        let tables = self.lock()?;
        tables
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .map(|f| tables.summary(f.following_id))
            .collect()
    }

    // --- Tweets ---
    async fn insert_tweet(&self, write: TweetWrite) -> PortResult<TweetDetails> {
        let mut tables = self.lock()?;
        let draft = write.draft;
        tables.user(draft.author_id)?;
        if let Some(origin) = draft.origin.retweet_id().or(draft.origin.reply_to_id()) {
            tables.tweet(origin)?;
        }

        let now = Utc::now();
        let tweet = Tweet {
            id: draft.id,
            author_id: draft.author_id,
            content: draft.content,
            media: draft.media,
            origin: draft.origin,
            created_at: now,
            updated_at: now,
        };
        let seq = tables.bump();
        tables.tweets.push(Seq {
            seq,
            row: tweet.clone(),
        });

        if let Some(new_poll) = draft.poll {
            let poll_id = Uuid::new_v4();
            tables.polls.push(Poll {
                id: poll_id,
                tweet_id: tweet.id,
                question: new_poll.question,
                expires_at: new_poll.expires_at,
                created_at: now,
            });
            for text in new_poll.options {
                tables.poll_options.push(PollOption {
                    id: Uuid::new_v4(),
                    poll_id,
                    text,
                });
            }
        }

        for name in write.hashtags {
            let existing = tables.hashtags.iter().find(|h| h.name == name).map(|h| h.id);
            let hashtag_id = match existing {
                Some(id) => id,
                None => {
                    let id = Uuid::new_v4();
                    tables.hashtags.push(Hashtag { id, name });
                    id
                }
            };
            if !tables.tweet_hashtags.contains(&(tweet.id, hashtag_id)) {
                tables.tweet_hashtags.push((tweet.id, hashtag_id));
            }
        }

        for notification in &write.notifications {
            tables.push_notification(notification);
        }

        tables.details(&tweet)
    }

    async fn get_tweet(&self, tweet_id: Uuid) -> PortResult<Tweet> {
        Ok(self.lock()?.tweet(tweet_id)?.clone())
    }

    async fn get_tweet_details(&self, tweet_id: Uuid) -> PortResult<TweetDetails> {
        let tables = self.lock()?;
        let tweet = tables.tweet(tweet_id)?;
        tables.details(tweet)
    }

    async fn list_tweets(
        &self,
        filter: &TweetFilter,
        page: PageRequest,
    ) -> PortResult<(Vec<TweetDetails>, u64)> {
        let tables = self.lock()?;
        let mut matching: Vec<&Seq<Tweet>> = tables
            .tweets
            .iter()
            .filter(|t| tables.matches(filter, &t.row))
            .collect();
        matching.sort_by(|a, b| b.seq.cmp(&a.seq));
        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .map(|t| tables.details(&t.row))
            .collect::<PortResult<Vec<_>>>()?;
        Ok((data, total))
    }

    async fn update_tweet(
        &self,
        tweet_id: Uuid,
        changes: TweetChanges,
    ) -> PortResult<TweetDetails> {
        let mut tables = self.lock()?;
        let row = tables
            .tweets
            .iter_mut()
            .find(|t| t.row.id == tweet_id)
            .ok_or_else(|| tweet_not_found(tweet_id))?;
        if let Some(content) = changes.content {
            row.row.content = content;
        }
        if let Some(media) = changes.media {
            row.row.media = media;
        }
        row.row.updated_at = Utc::now();
        let tweet = row.row.clone();
        tables.details(&tweet)
    }

    async fn delete_tweet(&self, tweet_id: Uuid) -> PortResult<()> {
        let mut tables = self.lock()?;
        tables.tweet(tweet_id)?;
        tables.remove_tweet(tweet_id);
        Ok(())
    }

    // --- Likes ---
    async fn insert_like(
        &self,
        user_id: Uuid,
        tweet_id: Uuid,
        notification: Option<NewNotification>,
    ) -> PortResult<Like> {
        let mut tables = self.lock()?;
        tables.user(user_id)?;
        tables.tweet(tweet_id)?;
        if tables
            .likes
            .iter()
            .any(|l| l.user_id == user_id && l.tweet_id == tweet_id)
        {
            return Err(PortError::Conflict("likes_pkey".to_string()));
        }
        let like = Like {
            user_id,
            tweet_id,
            created_at: Utc::now(),
        };
        tables.likes.push(like.clone());
        if let Some(notification) = notification {
            tables.push_notification(&notification);
        }
        Ok(like)
    }

    async fn delete_like(&self, user_id: Uuid, tweet_id: Uuid) -> PortResult<bool> {
        let mut tables = self.lock()?;
        let before = tables.likes.len();
        tables
            .likes
            .retain(|l| !(l.user_id == user_id && l.tweet_id == tweet_id));
        Ok(tables.likes.len() != before)
    }

    async fn list_likes(&self, tweet_id: Uuid) -> PortResult<Vec<LikeDetails>> {
        let tables = self.lock()?;
        tables
            .likes
            .iter()
            .filter(|l| l.tweet_id == tweet_id)
            .map(|l| {
                Ok(LikeDetails {
                    like: l.clone(),
                    user: tables.summary(l.user_id)?,
                })
            })
            .collect()
    }

    // --- Polls ---
    async fn get_poll(&self, poll_id: Uuid) -> PortResult<Poll> {
        let tables = self.lock()?;
        tables
            .polls
            .iter()
            .find(|p| p.id == poll_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Poll with ID {poll_id} not found")))
    }

    async fn get_poll_option(&self, option_id: Uuid) -> PortResult<(PollOption, Poll)> {
        let tables = self.lock()?;
        let option = tables
            .poll_options
            .iter()
            .find(|o| o.id == option_id)
            .ok_or_else(|| {
                PortError::NotFound(format!("Poll option with ID {option_id} not found"))
            })?;
        let poll = tables
            .polls
            .iter()
            .find(|p| p.id == option.poll_id)
            .ok_or_else(|| {
                PortError::NotFound(format!("Poll with ID {} not found", option.poll_id))
            })?;
        Ok((option.clone(), poll.clone()))
    }

    async fn find_poll_response(
        &self,
        user_id: Uuid,
        poll_id: Uuid,
    ) -> PortResult<Option<PollResponse>> {
        let tables = self.lock()?;
        Ok(tables
            .poll_responses
            .iter()
            .find(|r| r.user_id == user_id && r.poll_id == poll_id)
            .cloned())
    }

    async fn insert_poll_response(
        &self,
        user_id: Uuid,
        option: &PollOption,
    ) -> PortResult<PollResponse> {
        let mut tables = self.lock()?;
        tables.user(user_id)?;
        if tables
            .poll_responses
            .iter()
            .any(|r| r.user_id == user_id && r.poll_id == option.poll_id)
        {
            return Err(PortError::Conflict("poll_responses_user_poll".to_string()));
        }
        let response = PollResponse {
            id: Uuid::new_v4(),
            user_id,
            poll_id: option.poll_id,
            poll_option_id: option.id,
            created_at: Utc::now(),
        };
        tables.poll_responses.push(response.clone());
        Ok(response)
    }

    async fn move_poll_response(
        &self,
        response_id: Uuid,
        option_id: Uuid,
    ) -> PortResult<PollResponse> {
        let mut tables = self.lock()?;
        let response = tables
            .poll_responses
            .iter_mut()
            .find(|r| r.id == response_id)
            .ok_or_else(|| {
                PortError::NotFound(format!("Poll response with ID {response_id} not found"))
            })?;
        response.poll_option_id = option_id;
        Ok(response.clone())
    }

    async fn delete_poll_response(&self, response_id: Uuid) -> PortResult<()> {
        let mut tables = self.lock()?;
        let before = tables.poll_responses.len();
        tables.poll_responses.retain(|r| r.id != response_id);
        if tables.poll_responses.len() == before {
            return Err(PortError::NotFound(format!(
                "Poll response with ID {response_id} not found"
            )));
        }
        Ok(())
    }

    // --- Notifications ---
    async fn list_notifications(&self, user_id: Uuid) -> PortResult<Vec<NotificationDetails>> {
        let tables = self.lock()?;
        let mut rows: Vec<&Seq<Notification>> = tables
            .notifications
            .iter()
            .filter(|n| n.row.user_id == user_id)
            .collect();
        rows.sort_by(|a, b| b.seq.cmp(&a.seq));
        rows.into_iter()
            .map(|n| {
                let target = match n.row.target_id {
                    Some(id) => tables.summary(id).ok(),
                    None => None,
                };
                Ok(NotificationDetails {
                    notification: n.row.clone(),
                    target,
                })
            })
            .collect()
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        let tables = self.lock()?;
        Ok(tables
            .notifications
            .iter()
            .filter(|n| n.row.user_id == user_id && !n.row.is_read)
            .count() as u64)
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> PortResult<Notification> {
        let mut tables = self.lock()?;
        let row = tables
            .notifications
            .iter_mut()
            .find(|n| n.row.id == notification_id && n.row.user_id == user_id)
            .ok_or_else(|| {
                PortError::NotFound(format!("Notification with ID {notification_id} not found"))
            })?;
        row.row.is_read = true;
        Ok(row.row.clone())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64> {
        let mut tables = self.lock()?;
        let mut flipped = 0;
        for n in tables
            .notifications
            .iter_mut()
            .filter(|n| n.row.user_id == user_id && !n.row.is_read)
        {
            n.row.is_read = true;
            flipped += 1;
        }
        Ok(flipped)
    }

    // --- Messaging ---
    async fn create_conversation(
        &self,
        participant_ids: &[Uuid],
    ) -> PortResult<ConversationDetails> {
        let mut tables = self.lock()?;
        for id in participant_ids {
            tables.user(*id)?;
        }
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let seq = tables.bump();
        tables.conversations.push(Seq {
            seq,
            row: conversation.clone(),
        });
        for id in participant_ids {
            if !tables.is_participant(conversation.id, *id) {
                tables.participants.push((conversation.id, *id));
            }
        }
        tables.conversation_details(&conversation)
    }

    async fn list_conversations(&self, user_id: Uuid) -> PortResult<Vec<ConversationOverview>> {
        let tables = self.lock()?;
        let mut rows: Vec<&Seq<Conversation>> = tables
            .conversations
            .iter()
            .filter(|c| tables.is_participant(c.row.id, user_id))
            .collect();
        rows.sort_by(|a, b| b.seq.cmp(&a.seq));
        rows.into_iter()
            .map(|c| {
                let details = tables.conversation_details(&c.row)?;
                let thread: Vec<&Seq<Message>> = tables
                    .messages
                    .iter()
                    .filter(|m| m.row.conversation_id == c.row.id)
                    .collect();
                let last_message = thread.iter().max_by_key(|m| m.seq).map(|m| m.row.clone());
                Ok(ConversationOverview {
                    conversation: details.conversation,
                    participants: details.participants,
                    last_message,
                    message_count: thread.len() as u64,
                })
            })
            .collect()
    }

    async fn find_conversation(
        &self,
        conversation_id: Uuid,
        member_id: Uuid,
    ) -> PortResult<Option<ConversationDetails>> {
        let tables = self.lock()?;
        if !tables.is_participant(conversation_id, member_id) {
            return Ok(None);
        }
        match tables
            .conversations
            .iter()
            .find(|c| c.row.id == conversation_id)
        {
            Some(c) => Ok(Some(tables.conversation_details(&c.row)?)),
            None => Ok(None),
        }
    }

    async fn list_messages_marking_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> PortResult<Vec<MessageDetails>> {
        let mut tables = self.lock()?;
        for m in tables.messages.iter_mut().filter(|m| {
            m.row.conversation_id == conversation_id && m.row.sender_id != reader_id
        }) {
            m.row.is_read = true;
        }
        let mut thread: Vec<&Seq<Message>> = tables
            .messages
            .iter()
            .filter(|m| m.row.conversation_id == conversation_id)
            .collect();
        thread.sort_by_key(|m| m.seq);
        thread
            .into_iter()
            .map(|m| tables.message_details(&m.row))
            .collect()
    }

    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> PortResult<MessageDetails> {
        let mut tables = self.lock()?;
        let now = Utc::now();
        let seq = tables.bump();
        let conversation = tables
            .conversations
            .iter_mut()
            .find(|c| c.row.id == conversation_id)
            .ok_or_else(|| PortError::NotFound("Conversation not found".to_string()))?;
        conversation.seq = seq;
        conversation.row.updated_at = now;

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            is_read: false,
            created_at: now,
        };
        let seq = tables.bump();
        tables.messages.push(Seq {
            seq,
            row: message.clone(),
        });
        tables.message_details(&message)
    }

    async fn count_unread_messages(&self, user_id: Uuid) -> PortResult<u64> {
        let tables = self.lock()?;
        Ok(tables
            .messages
            .iter()
            .filter(|m| {
                m.row.sender_id != user_id
                    && !m.row.is_read
                    && tables.is_participant(m.row.conversation_id, user_id)
            })
            .count() as u64)
    }
}
