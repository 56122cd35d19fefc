//! crates/chirp_core/src/services/tweets.rs
//!
//! Tweet lifecycle, listings, likes and poll voting.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Like, LikeDetails, NewNotification, PollResponse, TweetDetails, TweetFilter};
use crate::error::{ServiceError, ServiceResult};
use crate::fanout::{self, TweetDraft, TweetEdit, TweetInput};
use crate::pagination::{PageRequest, Paginated};
use crate::poll::{self, VoteState, VoteTransition};
use crate::ports::{DatabaseService, PortError};

/// What a poll click ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum VoteOutcome {
    Voted(PollResponse),
    Changed(PollResponse),
    Removed,
}

#[derive(Clone)]
pub struct TweetService {
    db: Arc<dyn DatabaseService>,
}

fn tweet_not_found(id: Uuid) -> ServiceError {
    ServiceError::not_found(format!("Tweet with ID {id} not found"))
}

impl TweetService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    //=====================================================================================
    // Lifecycle
    //=====================================================================================

    /// Creates the tweet with its poll, hashtag links and notifications in one unit.
    pub async fn create(&self, author_id: Uuid, input: TweetInput) -> ServiceResult<TweetDetails> {
        let draft = TweetDraft::new(author_id, input)?;

        let origin_author = match draft.origin.retweet_id().or(draft.origin.reply_to_id()) {
            Some(origin_id) => {
                let origin = self.db.get_tweet(origin_id).await.map_err(|e| match e {
                    PortError::NotFound(_) => tweet_not_found(origin_id),
                    other => other.into(),
                })?;
                Some(origin.author_id)
            }
            None => None,
        };

        let mut mentioned = Vec::new();
        for username in fanout::distinct_mentions(&draft.content) {
            if let Some(user) = self.db.find_user_by_username(&username).await? {
                mentioned.push(user.id);
            }
        }

        let write = fanout::plan_tweet(draft, origin_author, &mentioned);
        debug!(
            tweet_id = %write.draft.id,
            hashtags = write.hashtags.len(),
            notifications = write.notifications.len(),
            "Planned tweet fan-out"
        );
        let created = self.db.insert_tweet(write).await?;
        info!(tweet_id = %created.tweet.id, author_id = %author_id, "Tweet created");
        Ok(created)
    }

    pub async fn find_one(&self, tweet_id: Uuid) -> ServiceResult<TweetDetails> {
        self.db
            .get_tweet_details(tweet_id)
            .await
            .map_err(|e| not_found_as_tweet(e, tweet_id))
    }

    /// Only the author may edit; the origin and poll are fixed at creation.
    pub async fn update(
        &self,
        tweet_id: Uuid,
        actor_id: Uuid,
        edit: TweetEdit,
    ) -> ServiceResult<TweetDetails> {
        let current = self.find_one(tweet_id).await?;
        if current.tweet.author_id != actor_id {
            return Err(ServiceError::Forbidden(
                "You can only update your own tweets".to_string(),
            ));
        }
        let changes = fanout::tweet_changes(edit, &current.tweet.media, current.poll.is_some())?;
        let updated = self.db.update_tweet(tweet_id, changes).await?;
        info!(tweet_id = %tweet_id, "Tweet updated");
        Ok(updated)
    }

    pub async fn remove(&self, tweet_id: Uuid, actor_id: Uuid) -> ServiceResult<()> {
        let tweet = self
            .db
            .get_tweet(tweet_id)
            .await
            .map_err(|e| not_found_as_tweet(e, tweet_id))?;
        if tweet.author_id != actor_id {
            return Err(ServiceError::Forbidden(
                "You can only delete your own tweets".to_string(),
            ));
        }
        self.db.delete_tweet(tweet_id).await?;
        info!(tweet_id = %tweet_id, "Tweet deleted");
        Ok(())
    }

    //=====================================================================================
    // Listings
    //=====================================================================================

    async fn list(
        &self,
        filter: TweetFilter,
        page: PageRequest,
    ) -> ServiceResult<Paginated<TweetDetails>> {
        let (data, total) = self.db.list_tweets(&filter, page).await?;
        Ok(Paginated::new(data, total, page))
    }

    pub async fn find_all(&self, page: PageRequest) -> ServiceResult<Paginated<TweetDetails>> {
        self.list(TweetFilter::All, page).await
    }

    pub async fn user_tweets(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> ServiceResult<Paginated<TweetDetails>> {
        self.db.get_user(user_id).await?;
        self.list(TweetFilter::ByAuthor(user_id), page).await
    }

    /// The user's own tweets plus those of everyone they follow.
    pub async fn feed(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> ServiceResult<Paginated<TweetDetails>> {
        self.list(TweetFilter::Feed(user_id), page).await
    }

    pub async fn search(
        &self,
        query: &str,
        page: PageRequest,
    ) -> ServiceResult<Paginated<TweetDetails>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::bad_request("search query should not be empty"));
        }
        self.list(TweetFilter::Search(query.to_string()), page).await
    }

    pub async fn by_hashtag(
        &self,
        tag: &str,
        page: PageRequest,
    ) -> ServiceResult<Paginated<TweetDetails>> {
        let tag = tag.trim().trim_start_matches('#').to_lowercase();
        self.list(TweetFilter::Hashtag(tag), page).await
    }

    pub async fn replies(
        &self,
        tweet_id: Uuid,
        page: PageRequest,
    ) -> ServiceResult<Paginated<TweetDetails>> {
        self.db
            .get_tweet(tweet_id)
            .await
            .map_err(|e| not_found_as_tweet(e, tweet_id))?;
        self.list(TweetFilter::RepliesTo(tweet_id), page).await
    }

    //=====================================================================================
    // Likes
    //=====================================================================================

    /// Liking twice is an error, not a no-op.
    pub async fn like(&self, tweet_id: Uuid, user_id: Uuid) -> ServiceResult<Like> {
        let tweet = self
            .db
            .get_tweet(tweet_id)
            .await
            .map_err(|e| not_found_as_tweet(e, tweet_id))?;

        let notification = (tweet.author_id != user_id)
            .then(|| NewNotification::like(tweet.author_id, user_id, tweet_id));

        let like = self
            .db
            .insert_like(user_id, tweet_id, notification)
            .await
            .map_err(|e| match e {
                PortError::Conflict(_) => ServiceError::bad_request("Tweet already liked"),
                other => other.into(),
            })?;
        info!(tweet_id = %tweet_id, user_id = %user_id, "Tweet liked");
        Ok(like)
    }

    /// Unliking leaves notifications alone.
    pub async fn unlike(&self, tweet_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        self.db
            .get_tweet(tweet_id)
            .await
            .map_err(|e| not_found_as_tweet(e, tweet_id))?;
        if !self.db.delete_like(user_id, tweet_id).await? {
            return Err(ServiceError::bad_request("Tweet not liked"));
        }
        info!(tweet_id = %tweet_id, user_id = %user_id, "Tweet unliked");
        Ok(())
    }

    pub async fn likes(&self, tweet_id: Uuid) -> ServiceResult<Vec<LikeDetails>> {
        self.db
            .get_tweet(tweet_id)
            .await
            .map_err(|e| not_found_as_tweet(e, tweet_id))?;
        Ok(self.db.list_likes(tweet_id).await?)
    }

    //=====================================================================================
    // Polls
    //=====================================================================================

    pub async fn respond_to_poll(
        &self,
        option_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<VoteOutcome> {
        let (option, poll) = self.db.get_poll_option(option_id).await.map_err(|e| match e {
            PortError::NotFound(_) => {
                ServiceError::not_found(format!("Poll option with ID {option_id} not found"))
            }
            other => other.into(),
        })?;

        let existing = self.db.find_poll_response(user_id, poll.id).await?;
        let state = VoteState::from(existing.as_ref());
        let transition = poll::respond(&poll, state, option_id, Utc::now())?;

        let outcome = match transition {
            VoteTransition::Insert { .. } => {
                let response = self
                    .db
                    .insert_poll_response(user_id, &option)
                    .await
                    .map_err(|e| match e {
                        PortError::Conflict(_) => {
                            ServiceError::bad_request("You have already responded to this poll")
                        }
                        other => other.into(),
                    })?;
                VoteOutcome::Voted(response)
            }
            VoteTransition::Move {
                response_id,
                option_id,
            } => VoteOutcome::Changed(self.db.move_poll_response(response_id, option_id).await?),
            VoteTransition::Delete { response_id } => {
                self.db.delete_poll_response(response_id).await?;
                VoteOutcome::Removed
            }
        };
        info!(
            poll_id = %poll.id,
            user_id = %user_id,
            outcome = outcome_label(&outcome),
            "Poll vote applied"
        );
        Ok(outcome)
    }

    pub async fn remove_poll_response(&self, poll_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        let poll = self.db.get_poll(poll_id).await.map_err(|e| match e {
            PortError::NotFound(_) => {
                ServiceError::not_found(format!("No poll response found for poll ID {poll_id}"))
            }
            other => other.into(),
        })?;
        let existing = self.db.find_poll_response(user_id, poll_id).await?;
        if let VoteTransition::Delete { response_id } =
            poll::retract(&poll, VoteState::from(existing.as_ref()), Utc::now())?
        {
            self.db.delete_poll_response(response_id).await?;
        }
        info!(poll_id = %poll_id, user_id = %user_id, "Poll response removed");
        Ok(())
    }
}

fn not_found_as_tweet(err: PortError, tweet_id: Uuid) -> ServiceError {
    match err {
        PortError::NotFound(_) => tweet_not_found(tweet_id),
        other => other.into(),
    }
}

fn outcome_label(outcome: &VoteOutcome) -> &'static str {
    match outcome {
        VoteOutcome::Voted(_) => "voted",
        VoteOutcome::Changed(_) => "changed",
        VoteOutcome::Removed => "removed",
    }
}
