//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Every port method that writes more than one row opens a transaction, and the
//! "at most one" rules are enforced by unique constraints rather than by reads
//! before writes. A violated constraint is reported as `PortError::Conflict`.

use async_trait::async_trait;
use chirp_core::domain::{
    Conversation, ConversationDetails, ConversationOverview, Follow, Like, LikeDetails, Message,
    MessageDetails, NewNotification, NewUser, Notification, NotificationDetails,
    NotificationKind, Poll, PollDetails, PollOption, PollOptionTally, PollResponse, Tweet,
    TweetChanges, TweetCounts, TweetDetails, TweetFilter, TweetMedia, TweetOrigin, TweetPreview,
    User, UserChanges, UserCredentials, UserSummary,
};
use chirp_core::fanout::TweetWrite;
use chirp_core::pagination::PageRequest;
use chirp_core::ports::{DatabaseService, PortError, PortResult};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::{debug, error};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, username, display_name, bio, profile_image_url, \
                            banner_image_url, is_verified, created_at, updated_at";
const SUMMARY_COLUMNS: &str =
    "u.id, u.username, u.display_name, u.profile_image_url, u.is_verified";
const TWEET_COLUMNS: &str = "t.id, t.user_id, t.content, t.images, t.video_url, t.retweet_id, \
                             t.reply_to_id, t.created_at, t.updated_at";
const NOTIFICATION_COLUMNS: &str =
    "id, type, content, user_id, target_id, tweet_id, is_read, created_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, user_id, content, is_read, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Translates a driver error into the port's vocabulary.
fn db_error(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(db) = &e {
        let constraint = db.constraint().unwrap_or("unnamed").to_string();
        if db.is_unique_violation() {
            return PortError::Conflict(constraint);
        }
        if db.is_foreign_key_violation() {
            return PortError::NotFound(format!("Referenced row missing ({constraint})"));
        }
    }
    error!(error = %e, "Database query failed");
    PortError::Unexpected(e.to_string())
}

fn user_not_found(id: Uuid) -> PortError {
    PortError::NotFound(format!("User with ID {id} not found"))
}

fn tweet_not_found(id: Uuid) -> PortError {
    PortError::NotFound(format!("Tweet with ID {id} not found"))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    username: String,
    display_name: Option<String>,
    bio: Option<String>,
    profile_image_url: Option<String>,
    banner_image_url: Option<String>,
    is_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            username: self.username,
            display_name: self.display_name,
            bio: self.bio,
            profile_image_url: self.profile_image_url,
            banner_image_url: self.banner_image_url,
            is_verified: self.is_verified,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    #[sqlx(flatten)]
    user: UserRecord,
    password: String,
}

#[derive(FromRow)]
struct SummaryRecord {
    id: Uuid,
    username: String,
    display_name: Option<String>,
    profile_image_url: Option<String>,
    is_verified: bool,
}
impl SummaryRecord {
    fn to_domain(self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username,
            display_name: self.display_name,
            profile_image_url: self.profile_image_url,
            is_verified: self.is_verified,
        }
    }
}

#[derive(FromRow)]
struct FollowRecord {
    follower_id: Uuid,
    following_id: Uuid,
    created_at: DateTime<Utc>,
}
impl FollowRecord {
    fn to_domain(self) -> Follow {
        Follow {
            follower_id: self.follower_id,
            following_id: self.following_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct TweetRecord {
    id: Uuid,
    user_id: Uuid,
    content: String,
    images: Vec<String>,
    video_url: Option<String>,
    retweet_id: Option<Uuid>,
    reply_to_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl TweetRecord {
    fn to_domain(self) -> Tweet {
        Tweet {
            id: self.id,
            author_id: self.user_id,
            content: self.content,
            media: TweetMedia::from_columns(self.images, self.video_url),
            origin: TweetOrigin::from_columns(self.retweet_id, self.reply_to_id),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct LikeRecord {
    user_id: Uuid,
    tweet_id: Uuid,
    created_at: DateTime<Utc>,
}
impl LikeRecord {
    fn to_domain(self) -> Like {
        Like {
            user_id: self.user_id,
            tweet_id: self.tweet_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct LikeWithUserRecord {
    #[sqlx(flatten)]
    like: LikeRecord,
    #[sqlx(flatten)]
    user: SummaryRecord,
}

#[derive(FromRow)]
struct PollRecord {
    id: Uuid,
    tweet_id: Uuid,
    question: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}
impl PollRecord {
    fn to_domain(self) -> Poll {
        Poll {
            id: self.id,
            tweet_id: self.tweet_id,
            question: self.question,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct PollOptionRecord {
    id: Uuid,
    poll_id: Uuid,
    text: String,
}
impl PollOptionRecord {
    fn to_domain(self) -> PollOption {
        PollOption {
            id: self.id,
            poll_id: self.poll_id,
            text: self.text,
        }
    }
}

#[derive(FromRow)]
struct PollResponseRecord {
    id: Uuid,
    user_id: Uuid,
    poll_id: Uuid,
    poll_option_id: Uuid,
    created_at: DateTime<Utc>,
}
impl PollResponseRecord {
    fn to_domain(self) -> PollResponse {
        PollResponse {
            id: self.id,
            user_id: self.user_id,
            poll_id: self.poll_id,
            poll_option_id: self.poll_option_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct NotificationRecord {
    id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    content: String,
    user_id: Uuid,
    target_id: Option<Uuid>,
    tweet_id: Option<Uuid>,
    is_read: bool,
    created_at: DateTime<Utc>,
}
impl NotificationRecord {
    fn to_domain(self) -> PortResult<Notification> {
        let kind = NotificationKind::parse(&self.kind).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown notification type '{}'", self.kind))
        })?;
        Ok(Notification {
            id: self.id,
            kind,
            content: self.content,
            user_id: self.user_id,
            target_id: self.target_id,
            tweet_id: self.tweet_id,
            is_read: self.is_read,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct ConversationRecord {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ConversationRecord {
    fn to_domain(self) -> Conversation {
        Conversation {
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ParticipantRecord {
    conversation_id: Uuid,
    #[sqlx(flatten)]
    user: SummaryRecord,
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    conversation_id: Uuid,
    user_id: Uuid,
    content: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}
impl MessageRecord {
    fn to_domain(self) -> Message {
        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_id: self.user_id,
            content: self.content,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// Query Helpers
//=========================================================================================

/// Escapes the `LIKE` metacharacters so user input matches literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TweetFilter) {
    match filter {
        TweetFilter::All => {}
        TweetFilter::ByAuthor(user_id) => {
            qb.push(" WHERE t.user_id = ").push_bind(*user_id);
        }
        TweetFilter::Feed(user_id) => {
            qb.push(" WHERE (t.user_id = ")
                .push_bind(*user_id)
                .push(" OR t.user_id IN (SELECT following_id FROM follows WHERE follower_id = ")
                .push_bind(*user_id)
                .push("))");
        }
        TweetFilter::Search(query) => {
            let pattern = like_pattern(query);
            qb.push(" WHERE (t.content ILIKE ")
                .push_bind(pattern.clone())
                .push(
                    " OR EXISTS (SELECT 1 FROM hashtags_on_tweets ht \
                     JOIN hashtags h ON h.id = ht.hashtag_id \
                     WHERE ht.tweet_id = t.id AND h.name ILIKE ",
                )
                .push_bind(pattern)
                .push("))");
        }
        TweetFilter::Hashtag(tag) => {
            qb.push(
                " WHERE EXISTS (SELECT 1 FROM hashtags_on_tweets ht \
                 JOIN hashtags h ON h.id = ht.hashtag_id \
                 WHERE ht.tweet_id = t.id AND h.name = ",
            )
            .push_bind(tag.clone())
            .push(")");
        }
        TweetFilter::RepliesTo(parent_id) => {
            qb.push(" WHERE t.reply_to_id = ").push_bind(*parent_id);
        }
    }
}

async fn insert_notification(conn: &mut PgConnection, n: &NewNotification) -> PortResult<()> {
    sqlx::query(
        "INSERT INTO notifications (id, type, content, user_id, target_id, tweet_id) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(n.kind.as_str())
    .bind(&n.content)
    .bind(n.user_id)
    .bind(n.target_id)
    .bind(n.tweet_id)
    .execute(conn)
    .await
    .map_err(db_error)?;
    Ok(())
}

impl DbAdapter {
    async fn summaries(&self, ids: &[Uuid]) -> PortResult<HashMap<Uuid, UserSummary>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!("SELECT {SUMMARY_COLUMNS} FROM users u WHERE u.id = ANY($1)");
        let records = sqlx::query_as::<_, SummaryRecord>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(records
            .into_iter()
            .map(|r| (r.id, r.to_domain()))
            .collect())
    }

    async fn counts_by(&self, sql: &str, ids: &[Uuid]) -> PortResult<HashMap<Uuid, u64>> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(|(id, n)| (id, n as u64)).collect())
    }

    async fn poll_details(&self, tweet_ids: &[Uuid]) -> PortResult<HashMap<Uuid, PollDetails>> {
        let polls = sqlx::query_as::<_, PollRecord>(
            "SELECT id, tweet_id, question, expires_at, created_at FROM polls \
             WHERE tweet_id = ANY($1)",
        )
        .bind(tweet_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        if polls.is_empty() {
            return Ok(HashMap::new());
        }

        let poll_ids: Vec<Uuid> = polls.iter().map(|p| p.id).collect();
        let options = sqlx::query_as::<_, PollOptionRecord>(
            "SELECT id, poll_id, text FROM poll_options WHERE poll_id = ANY($1) ORDER BY position",
        )
        .bind(&poll_ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        let votes = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT poll_option_id, user_id FROM poll_responses WHERE poll_id = ANY($1) \
             ORDER BY created_at",
        )
        .bind(&poll_ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut tallies: HashMap<Uuid, Vec<PollOptionTally>> = HashMap::new();
        for option in options {
            let option = option.to_domain();
            let voter_ids = votes
                .iter()
                .filter(|(option_id, _)| *option_id == option.id)
                .map(|(_, user_id)| *user_id)
                .collect();
            tallies
                .entry(option.poll_id)
                .or_default()
                .push(PollOptionTally { option, voter_ids });
        }

        Ok(polls
            .into_iter()
            .map(|p| {
                let options = tallies.remove(&p.id).unwrap_or_default();
                (
                    p.tweet_id,
                    PollDetails {
                        poll: p.to_domain(),
                        options,
                    },
                )
            })
            .collect())
    }

    /// Batch-loads everything a page of tweets embeds.
    async fn assemble(&self, records: Vec<TweetRecord>) -> PortResult<Vec<TweetDetails>> {
        let tweets: Vec<Tweet> = records.into_iter().map(TweetRecord::to_domain).collect();
        if tweets.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = tweets.iter().map(|t| t.id).collect();

        let origin_ids: Vec<Uuid> = tweets
            .iter()
            .filter_map(|t| t.origin.retweet_id().or(t.origin.reply_to_id()))
            .collect();
        let origins: Vec<Tweet> = if origin_ids.is_empty() {
            Vec::new()
        } else {
            let sql = format!("SELECT {TWEET_COLUMNS} FROM tweets t WHERE t.id = ANY($1)");
            sqlx::query_as::<_, TweetRecord>(&sql)
                .bind(&origin_ids[..])
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?
                .into_iter()
                .map(TweetRecord::to_domain)
                .collect()
        };

        let mut author_ids: Vec<Uuid> = tweets
            .iter()
            .chain(origins.iter())
            .map(|t| t.author_id)
            .collect();
        author_ids.sort();
        author_ids.dedup();
        let authors = self.summaries(&author_ids).await?;

        let likes = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT tweet_id, user_id FROM likes WHERE tweet_id = ANY($1) ORDER BY created_at",
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        let replies = self
            .counts_by(
                "SELECT reply_to_id, COUNT(*) FROM tweets WHERE reply_to_id = ANY($1) \
                 GROUP BY reply_to_id",
                &ids,
            )
            .await?;
        let retweets = self
            .counts_by(
                "SELECT retweet_id, COUNT(*) FROM tweets WHERE retweet_id = ANY($1) \
                 GROUP BY retweet_id",
                &ids,
            )
            .await?;
        let mut polls = self.poll_details(&ids).await?;

        let preview = |origin_id: Option<Uuid>| -> Option<TweetPreview> {
            let origin = origins.iter().find(|o| Some(o.id) == origin_id)?;
            Some(TweetPreview {
                tweet: origin.clone(),
                author: authors.get(&origin.author_id)?.clone(),
            })
        };

        tweets
            .into_iter()
            .map(|tweet| {
                let author = authors.get(&tweet.author_id).cloned().ok_or_else(|| {
                    PortError::Unexpected(format!("Author of tweet {} is missing", tweet.id))
                })?;
                let liked_by: Vec<Uuid> = likes
                    .iter()
                    .filter(|(tweet_id, _)| *tweet_id == tweet.id)
                    .map(|(_, user_id)| *user_id)
                    .collect();
                let counts = TweetCounts {
                    replies: replies.get(&tweet.id).copied().unwrap_or(0),
                    likes: liked_by.len() as u64,
                    retweets: retweets.get(&tweet.id).copied().unwrap_or(0),
                };
                Ok(TweetDetails {
                    retweet: preview(tweet.origin.retweet_id()),
                    reply_to: preview(tweet.origin.reply_to_id()),
                    poll: polls.remove(&tweet.id),
                    author,
                    liked_by,
                    counts,
                    tweet,
                })
            })
            .collect()
    }

    async fn participants(&self, conversation_ids: &[Uuid]) -> PortResult<Vec<ParticipantRecord>> {
        let sql = format!(
            "SELECT p.conversation_id, {SUMMARY_COLUMNS} FROM conversation_participants p \
             JOIN users u ON u.id = p.user_id WHERE p.conversation_id = ANY($1) ORDER BY u.username"
        );
        sqlx::query_as::<_, ParticipantRecord>(&sql)
            .bind(conversation_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn conversation_details(
        &self,
        record: ConversationRecord,
    ) -> PortResult<ConversationDetails> {
        let participants = self
            .participants(&[record.id])
            .await?
            .into_iter()
            .map(|p| p.user.to_domain())
            .collect();
        Ok(ConversationDetails {
            conversation: record.to_domain(),
            participants,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Users ---
    async fn create_user(&self, new_user: NewUser) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, email, username, display_name, password) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.email)
            .bind(&new_user.username)
            .bind(&new_user.display_name)
            .bind(&new_user.hashed_password)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(record.to_domain())
    }

    async fn get_user(&self, user_id: Uuid) -> PortResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(UserRecord::to_domain)
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn find_user_by_email(&self, email: &str) -> PortResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(UserRecord::to_domain))
    }

    async fn find_user_by_username(&self, username: &str) -> PortResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, UserRecord>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(UserRecord::to_domain))
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let sql = format!("SELECT {USER_COLUMNS}, password FROM users WHERE email = $1");
        let record = sqlx::query_as::<_, CredentialsRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or_else(|| PortError::NotFound(format!("User with email {email} not found")))?;
        Ok(UserCredentials {
            user: record.user.to_domain(),
            hashed_password: record.password,
        })
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id");
        Ok(sqlx::query_as::<_, UserRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(UserRecord::to_domain)
            .collect())
    }

    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> PortResult<User> {
        let sql = format!(
            "UPDATE users SET \
               email = COALESCE($2, email), \
               username = COALESCE($3, username), \
               display_name = COALESCE($4, display_name), \
               password = COALESCE($5, password), \
               bio = COALESCE($6, bio), \
               profile_image_url = COALESCE($7, profile_image_url), \
               banner_image_url = COALESCE($8, banner_image_url), \
               updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .bind(changes.email)
            .bind(changes.username)
            .bind(changes.display_name)
            .bind(changes.hashed_password)
            .bind(changes.bio)
            .bind(changes.profile_image_url)
            .bind(changes.banner_image_url)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(UserRecord::to_domain)
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(user_not_found(user_id));
        }
        Ok(())
    }

    // --- Follow Graph ---
    async fn insert_follow(
        &self,
        follower_id: Uuid,
        following_id: Uuid,
        notification: NewNotification,
    ) -> PortResult<Follow> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let record = sqlx::query_as::<_, FollowRecord>(
            "INSERT INTO follows (follower_id, following_id) VALUES ($1, $2) \
             RETURNING follower_id, following_id, created_at",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        insert_notification(&mut *tx, &notification).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(record.to_domain())
    }

    async fn delete_follow(&self, follower_id: Uuid, following_id: Uuid) -> PortResult<bool> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(follower_id)
                .bind(following_id)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_followers(&self, user_id: Uuid) -> PortResult<Vec<UserSummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM follows f JOIN users u ON u.id = f.follower_id \
             WHERE f.following_id = $1 ORDER BY f.created_at"
        );
        Ok(sqlx::query_as::<_, SummaryRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(SummaryRecord::to_domain)
            .collect())
    }

    async fn list_following(&self, user_id: Uuid) -> PortResult<Vec<UserSummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM follows f JOIN users u ON u.id = f.following_id \
             WHERE f.follower_id = $1 ORDER BY f.created_at"
        );
        Ok(sqlx::query_as::<_, SummaryRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(SummaryRecord::to_domain)
            .collect())
    }

    // --- Tweets ---
    async fn insert_tweet(&self, write: TweetWrite) -> PortResult<TweetDetails> {
        let draft = write.draft;
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            "INSERT INTO tweets (id, user_id, content, images, video_url, retweet_id, reply_to_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(draft.id)
        .bind(draft.author_id)
        .bind(&draft.content)
        .bind(draft.media.images().to_vec())
        .bind(draft.media.video_url())
        .bind(draft.origin.retweet_id())
        .bind(draft.origin.reply_to_id())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if let Some(poll) = &draft.poll {
            let poll_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO polls (id, tweet_id, question, expires_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(poll_id)
            .bind(draft.id)
            .bind(&poll.question)
            .bind(poll.expires_at)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

            for (position, text) in poll.options.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO poll_options (id, poll_id, text, position) \
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(Uuid::new_v4())
                .bind(poll_id)
                .bind(text)
                .bind(position as i32)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
            }
        }

        for name in &write.hashtags {
            let hashtag_id: Uuid = sqlx::query_scalar(
                "INSERT INTO hashtags (id, name) VALUES ($1, $2) \
                 ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name RETURNING id",
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

            sqlx::query(
                "INSERT INTO hashtags_on_tweets (tweet_id, hashtag_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(draft.id)
            .bind(hashtag_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        for notification in &write.notifications {
            insert_notification(&mut *tx, notification).await?;
        }

        tx.commit().await.map_err(db_error)?;
        debug!(tweet_id = %draft.id, "Tweet transaction committed");
        self.get_tweet_details(draft.id).await
    }

    async fn get_tweet(&self, tweet_id: Uuid) -> PortResult<Tweet> {
        let sql = format!("SELECT {TWEET_COLUMNS} FROM tweets t WHERE t.id = $1");
        sqlx::query_as::<_, TweetRecord>(&sql)
            .bind(tweet_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(TweetRecord::to_domain)
            .ok_or_else(|| tweet_not_found(tweet_id))
    }

    async fn get_tweet_details(&self, tweet_id: Uuid) -> PortResult<TweetDetails> {
        let sql = format!("SELECT {TWEET_COLUMNS} FROM tweets t WHERE t.id = $1");
        let record = sqlx::query_as::<_, TweetRecord>(&sql)
            .bind(tweet_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or_else(|| tweet_not_found(tweet_id))?;
        self.assemble(vec![record])
            .await?
            .pop()
            .ok_or_else(|| tweet_not_found(tweet_id))
    }

    async fn list_tweets(
        &self,
        filter: &TweetFilter,
        page: PageRequest,
    ) -> PortResult<(Vec<TweetDetails>, u64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tweets t");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {TWEET_COLUMNS} FROM tweets t"));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY t.created_at DESC, t.id DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let records = select
            .build_query_as::<TweetRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok((self.assemble(records).await?, total as u64))
    }

    async fn update_tweet(
        &self,
        tweet_id: Uuid,
        changes: TweetChanges,
    ) -> PortResult<TweetDetails> {
        let media_changed = changes.media.is_some();
        let media = changes.media.unwrap_or_default();
        let result = sqlx::query(
            "UPDATE tweets SET \
               content = COALESCE($2, content), \
               images = CASE WHEN $3 THEN $4 ELSE images END, \
               video_url = CASE WHEN $3 THEN $5 ELSE video_url END, \
               updated_at = now() \
             WHERE id = $1",
        )
        .bind(tweet_id)
        .bind(changes.content)
        .bind(media_changed)
        .bind(media.images().to_vec())
        .bind(media.video_url())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(tweet_not_found(tweet_id));
        }
        self.get_tweet_details(tweet_id).await
    }

    async fn delete_tweet(&self, tweet_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM tweets WHERE id = $1")
            .bind(tweet_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(tweet_not_found(tweet_id));
        }
        Ok(())
    }

    // --- Likes ---
    async fn insert_like(
        &self,
        user_id: Uuid,
        tweet_id: Uuid,
        notification: Option<NewNotification>,
    ) -> PortResult<Like> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let record = sqlx::query_as::<_, LikeRecord>(
            "INSERT INTO likes (user_id, tweet_id) VALUES ($1, $2) \
             RETURNING user_id, tweet_id, created_at",
        )
        .bind(user_id)
        .bind(tweet_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        if let Some(notification) = &notification {
            insert_notification(&mut *tx, notification).await?;
        }
        tx.commit().await.map_err(db_error)?;
        Ok(record.to_domain())
    }

    async fn delete_like(&self, user_id: Uuid, tweet_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND tweet_id = $2")
            .bind(user_id)
            .bind(tweet_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_likes(&self, tweet_id: Uuid) -> PortResult<Vec<LikeDetails>> {
        let sql = format!(
            "SELECT l.user_id, l.tweet_id, l.created_at, {SUMMARY_COLUMNS} \
             FROM likes l JOIN users u ON u.id = l.user_id \
             WHERE l.tweet_id = $1 ORDER BY l.created_at"
        );
        Ok(sqlx::query_as::<_, LikeWithUserRecord>(&sql)
            .bind(tweet_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|r| LikeDetails {
                like: r.like.to_domain(),
                user: r.user.to_domain(),
            })
            .collect())
    }

    // --- Polls ---
    async fn get_poll(&self, poll_id: Uuid) -> PortResult<Poll> {
        sqlx::query_as::<_, PollRecord>(
            "SELECT id, tweet_id, question, expires_at, created_at FROM polls WHERE id = $1",
        )
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(PollRecord::to_domain)
        .ok_or_else(|| PortError::NotFound(format!("Poll with ID {poll_id} not found")))
    }

    async fn get_poll_option(&self, option_id: Uuid) -> PortResult<(PollOption, Poll)> {
        let option = sqlx::query_as::<_, PollOptionRecord>(
            "SELECT id, poll_id, text FROM poll_options WHERE id = $1",
        )
        .bind(option_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| PortError::NotFound(format!("Poll option with ID {option_id} not found")))?
        .to_domain();
        let poll = self.get_poll(option.poll_id).await?;
        Ok((option, poll))
    }

    async fn find_poll_response(
        &self,
        user_id: Uuid,
        poll_id: Uuid,
    ) -> PortResult<Option<PollResponse>> {
        Ok(sqlx::query_as::<_, PollResponseRecord>(
            "SELECT id, user_id, poll_id, poll_option_id, created_at FROM poll_responses \
             WHERE user_id = $1 AND poll_id = $2",
        )
        .bind(user_id)
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(PollResponseRecord::to_domain))
    }

    async fn insert_poll_response(
        &self,
        user_id: Uuid,
        option: &PollOption,
    ) -> PortResult<PollResponse> {
        let record = sqlx::query_as::<_, PollResponseRecord>(
            "INSERT INTO poll_responses (id, user_id, poll_id, poll_option_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, poll_id, poll_option_id, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(option.poll_id)
        .bind(option.id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(record.to_domain())
    }

    async fn move_poll_response(
        &self,
        response_id: Uuid,
        option_id: Uuid,
    ) -> PortResult<PollResponse> {
        sqlx::query_as::<_, PollResponseRecord>(
            "UPDATE poll_responses SET poll_option_id = $2 WHERE id = $1 \
             RETURNING id, user_id, poll_id, poll_option_id, created_at",
        )
        .bind(response_id)
        .bind(option_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .map(PollResponseRecord::to_domain)
        .ok_or_else(|| {
            PortError::NotFound(format!("Poll response with ID {response_id} not found"))
        })
    }

    async fn delete_poll_response(&self, response_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM poll_responses WHERE id = $1")
            .bind(response_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Poll response with ID {response_id} not found"
            )));
        }
        Ok(())
    }

    // --- Notifications ---
    async fn list_notifications(&self, user_id: Uuid) -> PortResult<Vec<NotificationDetails>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let records = sqlx::query_as::<_, NotificationRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let mut target_ids: Vec<Uuid> = records.iter().filter_map(|r| r.target_id).collect();
        target_ids.sort();
        target_ids.dedup();
        let targets = self.summaries(&target_ids).await?;

        records
            .into_iter()
            .map(|r| {
                let target = r.target_id.and_then(|id| targets.get(&id).cloned());
                Ok(NotificationDetails {
                    notification: r.to_domain()?,
                    target,
                })
            })
            .collect()
    }

    async fn count_unread_notifications(&self, user_id: Uuid) -> PortResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(count as u64)
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> PortResult<Notification> {
        let sql = format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 \
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        sqlx::query_as::<_, NotificationRecord>(&sql)
            .bind(notification_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or_else(|| {
                PortError::NotFound(format!("Notification with ID {notification_id} not found"))
            })?
            .to_domain()
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(result.rows_affected())
    }

    // --- Messaging ---
    async fn create_conversation(
        &self,
        participant_ids: &[Uuid],
    ) -> PortResult<ConversationDetails> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let record = sqlx::query_as::<_, ConversationRecord>(
            "INSERT INTO conversations (id) VALUES ($1) RETURNING id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        for user_id in participant_ids {
            sqlx::query(
                "INSERT INTO conversation_participants (conversation_id, user_id) \
                 VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(record.id)
            .bind(*user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;
        self.conversation_details(record).await
    }

    async fn list_conversations(&self, user_id: Uuid) -> PortResult<Vec<ConversationOverview>> {
        let records = sqlx::query_as::<_, ConversationRecord>(
            "SELECT c.id, c.created_at, c.updated_at FROM conversations c \
             JOIN conversation_participants p ON p.conversation_id = c.id \
             WHERE p.user_id = $1 ORDER BY c.updated_at DESC, c.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = records.iter().map(|r| r.id).collect();

        let mut participants: HashMap<Uuid, Vec<UserSummary>> = HashMap::new();
        for p in self.participants(&ids).await? {
            participants
                .entry(p.conversation_id)
                .or_default()
                .push(p.user.to_domain());
        }

        let sql = format!(
            "SELECT DISTINCT ON (conversation_id) {MESSAGE_COLUMNS} FROM messages \
             WHERE conversation_id = ANY($1) ORDER BY conversation_id, created_at DESC, id DESC"
        );
        let mut last_messages: HashMap<Uuid, Message> = sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(&ids[..])
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|m| (m.conversation_id, m.to_domain()))
            .collect();
        let counts = self
            .counts_by(
                "SELECT conversation_id, COUNT(*) FROM messages WHERE conversation_id = ANY($1) \
                 GROUP BY conversation_id",
                &ids,
            )
            .await?;

        Ok(records
            .into_iter()
            .map(|r| ConversationOverview {
                participants: participants.remove(&r.id).unwrap_or_default(),
                last_message: last_messages.remove(&r.id),
                message_count: counts.get(&r.id).copied().unwrap_or(0),
                conversation: r.to_domain(),
            })
            .collect())
    }

    async fn find_conversation(
        &self,
        conversation_id: Uuid,
        member_id: Uuid,
    ) -> PortResult<Option<ConversationDetails>> {
        let record = sqlx::query_as::<_, ConversationRecord>(
            "SELECT c.id, c.created_at, c.updated_at FROM conversations c \
             JOIN conversation_participants p ON p.conversation_id = c.id \
             WHERE c.id = $1 AND p.user_id = $2",
        )
        .bind(conversation_id)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        match record {
            Some(record) => Ok(Some(self.conversation_details(record).await?)),
            None => Ok(None),
        }
    }

    async fn list_messages_marking_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> PortResult<Vec<MessageDetails>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx::query(
            "UPDATE messages SET is_read = TRUE \
             WHERE conversation_id = $1 AND user_id <> $2 AND is_read = FALSE",
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 \
             ORDER BY created_at, id"
        );
        let records = sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(conversation_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;

        let mut sender_ids: Vec<Uuid> = records.iter().map(|m| m.user_id).collect();
        sender_ids.sort();
        sender_ids.dedup();
        let senders = self.summaries(&sender_ids).await?;

        records
            .into_iter()
            .map(|m| {
                let sender = senders
                    .get(&m.user_id)
                    .cloned()
                    .ok_or_else(|| user_not_found(m.user_id))?;
                Ok(MessageDetails {
                    message: m.to_domain(),
                    sender,
                })
            })
            .collect()
    }

    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> PortResult<MessageDetails> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let sql = format!(
            "INSERT INTO messages (id, conversation_id, user_id, content) \
             VALUES ($1, $2, $3, $4) RETURNING {MESSAGE_COLUMNS}"
        );
        let record = sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(conversation_id)
            .bind(sender_id)
            .bind(content)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
        sqlx::query("UPDATE conversations SET updated_at = now() WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;

        let sender = self
            .summaries(&[sender_id])
            .await?
            .remove(&sender_id)
            .ok_or_else(|| user_not_found(sender_id))?;
        Ok(MessageDetails {
            message: record.to_domain(),
            sender,
        })
    }

    async fn count_unread_messages(&self, user_id: Uuid) -> PortResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages m \
             JOIN conversation_participants p \
               ON p.conversation_id = m.conversation_id AND p.user_id = $1 \
             WHERE m.user_id <> $1 AND m.is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn feed_filter_includes_followees() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tweets t");
        push_filter(&mut qb, &TweetFilter::Feed(Uuid::nil()));
        let sql = qb.sql();
        assert!(sql.contains("t.user_id = $1"));
        assert!(sql.contains("follower_id = $2"));
    }
}
