//! crates/chirp_core/src/fanout.rs
//!
//! Turns a raw tweet payload into a validated draft, then plans every row the
//! tweet creation writes: the tweet, its poll, its hashtag links, and the
//! notifications derived from it.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{NewNotification, NotificationKind, TweetChanges, TweetMedia, TweetOrigin};
use crate::error::{ServiceError, ServiceResult};
use crate::extract;

pub const MAX_CONTENT_CHARS: usize = 280;
pub const MAX_IMAGES: usize = 4;
pub const MIN_POLL_OPTIONS: usize = 2;
pub const MAX_POLL_OPTIONS: usize = 4;
pub const MIN_POLL_OPTION_CHARS: usize = 2;

//=========================================================================================
// Raw Input
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PollInput {
    pub question: String,
    pub options: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// The tweet payload as the client sent it, every attachment independently optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TweetInput {
    pub content: String,
    pub images: Option<Vec<String>>,
    pub video_url: Option<String>,
    pub poll: Option<PollInput>,
    pub retweet_id: Option<Uuid>,
    pub reply_to_id: Option<Uuid>,
}

/// The editable subset of a tweet payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TweetEdit {
    pub content: Option<String>,
    pub images: Option<Vec<String>>,
    pub video_url: Option<String>,
}

//=========================================================================================
// Validated Draft
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct NewPoll {
    pub question: String,
    pub options: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TweetDraft {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub media: TweetMedia,
    pub origin: TweetOrigin,
    pub poll: Option<NewPoll>,
}

impl TweetDraft {
    /// Validates the payload once; the result can no longer carry two origins or
    /// two kinds of attachment.
    pub fn new(author_id: Uuid, input: TweetInput) -> ServiceResult<Self> {
        let content = validate_content(input.content)?;

        let origin = match (input.retweet_id, input.reply_to_id) {
            (Some(_), Some(_)) => {
                return Err(ServiceError::bad_request(
                    "A tweet cannot be both a retweet and a reply",
                ))
            }
            (Some(id), None) => TweetOrigin::Retweet(id),
            (None, Some(id)) => TweetOrigin::Reply(id),
            (None, None) => TweetOrigin::None,
        };

        let media = build_media(input.images, input.video_url)?;
        let poll = input.poll.map(validate_poll).transpose()?;
        if poll.is_some() && !media.is_none() {
            return Err(ServiceError::bad_request(
                "A tweet can carry images, a video or a poll, but only one of them",
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            author_id,
            content,
            media,
            origin,
            poll,
        })
    }
}

/// Validates an edit against the tweet's current media and whether it owns a poll.
pub fn tweet_changes(
    edit: TweetEdit,
    current_media: &TweetMedia,
    has_poll: bool,
) -> ServiceResult<TweetChanges> {
    let content = edit.content.map(validate_content).transpose()?;

    let media = if edit.images.is_some() || edit.video_url.is_some() {
        let images = edit
            .images
            .or_else(|| Some(current_media.images().to_vec()));
        let video_url = edit
            .video_url
            .or_else(|| current_media.video_url().map(str::to_string));
        let media = build_media(images, video_url)?;
        if has_poll && !media.is_none() {
            return Err(ServiceError::bad_request(
                "A tweet with a poll cannot also carry images or a video",
            ));
        }
        Some(media)
    } else {
        None
    };

    Ok(TweetChanges { content, media })
}

fn validate_content(content: String) -> ServiceResult<String> {
    if content.trim().is_empty() {
        return Err(ServiceError::bad_request("content should not be empty"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ServiceError::bad_request(format!(
            "content must be at most {MAX_CONTENT_CHARS} characters"
        )));
    }
    Ok(content)
}

fn build_media(
    images: Option<Vec<String>>,
    video_url: Option<String>,
) -> ServiceResult<TweetMedia> {
    let images = images.unwrap_or_default();
    if images.len() > MAX_IMAGES {
        return Err(ServiceError::bad_request(format!(
            "a tweet can carry at most {MAX_IMAGES} images"
        )));
    }
    if images.iter().any(|url| url.trim().is_empty()) {
        return Err(ServiceError::bad_request("image URLs should not be empty"));
    }
    let video_url = video_url.filter(|url| !url.trim().is_empty());

    match (images.is_empty(), video_url) {
        (false, Some(_)) => Err(ServiceError::bad_request(
            "A tweet can carry images or a video, not both",
        )),
        (true, Some(url)) => Ok(TweetMedia::Video(url)),
        (false, None) => Ok(TweetMedia::Images(images)),
        (true, None) => Ok(TweetMedia::None),
    }
}

fn validate_poll(input: PollInput) -> ServiceResult<NewPoll> {
    if input.question.trim().is_empty() {
        return Err(ServiceError::bad_request("poll question should not be empty"));
    }
    if !(MIN_POLL_OPTIONS..=MAX_POLL_OPTIONS).contains(&input.options.len()) {
        return Err(ServiceError::bad_request(format!(
            "a poll needs between {MIN_POLL_OPTIONS} and {MAX_POLL_OPTIONS} options"
        )));
    }
    if input
        .options
        .iter()
        .any(|o| o.trim().chars().count() < MIN_POLL_OPTION_CHARS)
    {
        return Err(ServiceError::bad_request(format!(
            "Each poll option must have at least {MIN_POLL_OPTION_CHARS} characters"
        )));
    }
    Ok(NewPoll {
        question: input.question,
        options: input.options,
        expires_at: input.expires_at,
    })
}

//=========================================================================================
// Fan-out Plan
//=========================================================================================

/// Everything one tweet creation writes, handed to storage as a single unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TweetWrite {
    pub draft: TweetDraft,
    /// One entry per occurrence in the text; storage upserts each by name.
    pub hashtags: Vec<String>,
    pub notifications: Vec<NewNotification>,
}

/// Builds the write set for `draft`.
///
/// `origin_author_id` is the author of the retweeted / replied-to tweet and
/// `mentioned_user_ids` the accounts the mentions resolved to.
pub fn plan_tweet(
    draft: TweetDraft,
    origin_author_id: Option<Uuid>,
    mentioned_user_ids: &[Uuid],
) -> TweetWrite {
    let hashtags = extract::hashtags(&draft.content);
    let author = draft.author_id;
    let mut notifications = Vec::new();

    if let Some(origin_author) = origin_author_id.filter(|id| *id != author) {
        match draft.origin {
            TweetOrigin::Retweet(origin_id) => {
                notifications.push(NewNotification::retweet(origin_author, author, origin_id))
            }
            TweetOrigin::Reply(origin_id) => {
                notifications.push(NewNotification::reply(origin_author, author, origin_id))
            }
            TweetOrigin::None => {}
        }
    }

    for mentioned in mentioned_user_ids.iter().filter(|id| **id != author) {
        notifications.push(NewNotification::mention(*mentioned, author, draft.id));
    }

    TweetWrite {
        draft,
        hashtags,
        notifications,
    }
}

/// Mentions in first-seen order with repeats dropped.
pub fn distinct_mentions(content: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for name in extract::mentions(content) {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

impl NewNotification {
    fn about(
        kind: NotificationKind,
        content: &str,
        recipient: Uuid,
        actor: Uuid,
        tweet_id: Option<Uuid>,
    ) -> Self {
        Self {
            kind,
            content: content.to_string(),
            user_id: recipient,
            target_id: Some(actor),
            tweet_id,
        }
    }

    pub fn like(recipient: Uuid, actor: Uuid, tweet_id: Uuid) -> Self {
        Self::about(
            NotificationKind::Like,
            "liked your tweet",
            recipient,
            actor,
            Some(tweet_id),
        )
    }

    pub fn reply(recipient: Uuid, actor: Uuid, tweet_id: Uuid) -> Self {
        Self::about(
            NotificationKind::Comment,
            "replied to your tweet",
            recipient,
            actor,
            Some(tweet_id),
        )
    }

    pub fn retweet(recipient: Uuid, actor: Uuid, tweet_id: Uuid) -> Self {
        Self::about(
            NotificationKind::Retweet,
            "retweeted your tweet",
            recipient,
            actor,
            Some(tweet_id),
        )
    }

    pub fn mention(recipient: Uuid, actor: Uuid, tweet_id: Uuid) -> Self {
        Self::about(
            NotificationKind::Mention,
            "mentioned you in a tweet",
            recipient,
            actor,
            Some(tweet_id),
        )
    }

    pub fn follow(recipient: Uuid, actor: Uuid) -> Self {
        Self::about(
            NotificationKind::Follow,
            "started following you",
            recipient,
            actor,
            None,
        )
    }
}
