mod common;

use std::collections::HashSet;

use chirp_core::{
    NotificationKind, PageRequest, PollInput, ServiceError, TweetEdit, TweetInput, TweetMedia,
};
use chrono::{Duration, Utc};
use common::World;
use uuid::Uuid;

fn page(page: u32, limit: u32) -> PageRequest {
    PageRequest::new(Some(page), Some(limit)).unwrap()
}

#[tokio::test]
async fn hashtags_are_linked_once_and_mentions_notify() {
    let world = World::new();
    let author = world.user("alice").await;
    let bar = world.user("bar").await;

    let created = world.tweet(author.id, "hello #Foo #foo @Bar").await;

    let tagged = world.tweets.by_hashtag("#FOO", PageRequest::default()).await.unwrap();
    assert_eq!(tagged.meta.total, 1);
    assert_eq!(tagged.data[0].tweet.id, created.tweet.id);

    let inbox = world.notifications.list(bar.id).await.unwrap();
    assert_eq!(inbox.len(), 1);
    let mention = &inbox[0].notification;
    assert_eq!(mention.kind, NotificationKind::Mention);
    assert_eq!(mention.tweet_id, Some(created.tweet.id));
    assert_eq!(mention.target_id, Some(author.id));
    assert!(world.notifications.list(author.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn mentioning_yourself_or_a_stranger_is_silent() {
    let world = World::new();
    let author = world.user("alice").await;

    world.tweet(author.id, "note to @alice and @nobody").await;

    assert!(world.notifications.list(author.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn liking_twice_is_rejected_and_unlike_needs_a_like() {
    let world = World::new();
    let author = world.user("alice").await;
    let fan = world.user("bob").await;
    let tweet = world.tweet(author.id, "likeable").await;

    world.tweets.like(tweet.tweet.id, fan.id).await.unwrap();
    let again = world.tweets.like(tweet.tweet.id, fan.id).await;
    assert!(matches!(again, Err(ServiceError::BadRequest(_))));

    let details = world.tweets.find_one(tweet.tweet.id).await.unwrap();
    assert_eq!(details.counts.likes, 1);
    assert_eq!(details.liked_by, vec![fan.id]);

    let stranger = world.user("carol").await;
    let unlike = world.tweets.unlike(tweet.tweet.id, stranger.id).await;
    assert!(matches!(unlike, Err(ServiceError::BadRequest(_))));
}

#[tokio::test]
async fn like_notifies_author_and_unlike_is_silent() {
    let world = World::new();
    let a = world.user("alice").await;
    let b = world.user("bob").await;
    let tweet = world.tweet(a.id, "hello").await;

    world.tweets.like(tweet.tweet.id, b.id).await.unwrap();
    let inbox = world.notifications.list(a.id).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].notification.kind, NotificationKind::Like);
    assert_eq!(inbox[0].notification.target_id, Some(b.id));
    assert_eq!(inbox[0].notification.content, "liked your tweet");
    assert_eq!(inbox[0].target.as_ref().map(|t| t.id), Some(b.id));

    world.tweets.unlike(tweet.tweet.id, b.id).await.unwrap();
    assert_eq!(world.notifications.list(a.id).await.unwrap().len(), 1);
    assert_eq!(world.tweets.find_one(tweet.tweet.id).await.unwrap().counts.likes, 0);
}

#[tokio::test]
async fn liking_your_own_tweet_does_not_notify() {
    let world = World::new();
    let a = world.user("alice").await;
    let tweet = world.tweet(a.id, "me me me").await;

    world.tweets.like(tweet.tweet.id, a.id).await.unwrap();

    assert_eq!(world.notifications.unread_count(a.id).await.unwrap(), 0);
}

#[tokio::test]
async fn feed_contains_only_self_and_followees() {
    let world = World::new();
    let a = world.user("alice").await;
    let b = world.user("bob").await;
    let c = world.user("carol").await;
    world.users.follow(a.id, b.id).await.unwrap();

    let own = world.tweet(a.id, "mine").await;
    let followed = world.tweet(b.id, "followed").await;
    world.tweet(c.id, "stranger").await;

    let feed = world.tweets.feed(a.id, PageRequest::default()).await.unwrap();
    let ids: Vec<Uuid> = feed.data.iter().map(|t| t.tweet.id).collect();
    assert_eq!(ids, vec![followed.tweet.id, own.tweet.id]);
    assert_eq!(feed.meta.total, 2);
}

#[tokio::test]
async fn pages_partition_the_listing() {
    let world = World::new();
    let a = world.user("alice").await;
    for i in 0..7 {
        world.tweet(a.id, &format!("tweet {i}")).await;
    }

    let mut seen = HashSet::new();
    for p in 1..=3 {
        let listing = world.tweets.find_all(page(p, 3)).await.unwrap();
        assert_eq!(listing.meta.total, 7);
        assert_eq!(listing.meta.pages, 3);
        for t in listing.data {
            assert!(seen.insert(t.tweet.id), "a tweet appeared on two pages");
        }
    }
    assert_eq!(seen.len(), 7);

    let beyond = world.tweets.find_all(page(4, 3)).await.unwrap();
    assert!(beyond.data.is_empty());
}

#[tokio::test]
async fn newest_tweet_comes_first() {
    let world = World::new();
    let a = world.user("alice").await;
    world.tweet(a.id, "first").await;
    let second = world.tweet(a.id, "second").await;

    let listing = world.tweets.user_tweets(a.id, PageRequest::default()).await.unwrap();
    assert_eq!(listing.data[0].tweet.id, second.tweet.id);
}

#[tokio::test]
async fn search_matches_content_and_hashtags() {
    let world = World::new();
    let a = world.user("alice").await;
    world.tweet(a.id, "Rustaceans unite").await;
    world.tweet(a.id, "weekend plans #rustconf").await;
    world.tweet(a.id, "nothing to see").await;

    let found = world.tweets.search("RUST", PageRequest::default()).await.unwrap();
    assert_eq!(found.meta.total, 2);

    let blank = world.tweets.search("  ", PageRequest::default()).await;
    assert!(matches!(blank, Err(ServiceError::BadRequest(_))));
}

#[tokio::test]
async fn replies_and_retweets_notify_the_origin_author() {
    let world = World::new();
    let a = world.user("alice").await;
    let b = world.user("bob").await;
    let original = world.tweet(a.id, "original").await;

    let reply = world
        .tweets
        .create(
            b.id,
            TweetInput {
                content: "a reply".to_string(),
                reply_to_id: Some(original.tweet.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    world
        .tweets
        .create(
            b.id,
            TweetInput {
                content: "a retweet".to_string(),
                retweet_id: Some(original.tweet.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(reply.reply_to.as_ref().map(|p| p.tweet.id), Some(original.tweet.id));

    let details = world.tweets.find_one(original.tweet.id).await.unwrap();
    assert_eq!(details.counts.replies, 1);
    assert_eq!(details.counts.retweets, 1);

    let replies = world
        .tweets
        .replies(original.tweet.id, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(replies.data.len(), 1);

    let kinds: Vec<NotificationKind> = world
        .notifications
        .list(a.id)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.notification.kind)
        .collect();
    assert_eq!(kinds, vec![NotificationKind::Retweet, NotificationKind::Comment]);
}

#[tokio::test]
async fn replying_to_a_missing_tweet_is_not_found() {
    let world = World::new();
    let a = world.user("alice").await;

    let result = world
        .tweets
        .create(
            a.id,
            TweetInput {
                content: "into the void".to_string(),
                reply_to_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn only_the_author_may_edit_or_delete() {
    let world = World::new();
    let a = world.user("alice").await;
    let b = world.user("bob").await;
    let tweet = world.tweet(a.id, "draft").await;

    let edit = TweetEdit {
        content: Some("hijacked".to_string()),
        ..Default::default()
    };
    let denied = world.tweets.update(tweet.tweet.id, b.id, edit.clone()).await;
    assert!(matches!(denied, Err(ServiceError::Forbidden(_))));
    let denied = world.tweets.remove(tweet.tweet.id, b.id).await;
    assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

    let edit = TweetEdit {
        content: Some("final".to_string()),
        images: Some(vec!["https://img/1.png".to_string()]),
        ..Default::default()
    };
    let updated = world.tweets.update(tweet.tweet.id, a.id, edit).await.unwrap();
    assert_eq!(updated.tweet.content, "final");
    assert_eq!(
        updated.tweet.media,
        TweetMedia::Images(vec!["https://img/1.png".to_string()])
    );

    world.tweets.remove(tweet.tweet.id, a.id).await.unwrap();
    let gone = world.tweets.find_one(tweet.tweet.id).await;
    assert!(matches!(gone, Err(ServiceError::NotFound(_))));
}

async fn poll_tweet(world: &World, author: Uuid, expires_in: Duration) -> chirp_core::PollDetails {
    world
        .tweets
        .create(
            author,
            TweetInput {
                content: "vote!".to_string(),
                poll: Some(PollInput {
                    question: "Best editor?".to_string(),
                    options: vec!["vim".to_string(), "emacs".to_string()],
                    expires_at: Utc::now() + expires_in,
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .poll
        .expect("tweet carries a poll")
}

#[tokio::test]
async fn voting_the_same_option_twice_toggles_it_off() {
    let world = World::new();
    let a = world.user("alice").await;
    let poll = poll_tweet(&world, a.id, Duration::hours(1)).await;
    let vim = poll.options[0].option.id;

    let first = world.tweets.respond_to_poll(vim, a.id).await.unwrap();
    assert!(matches!(first, chirp_core::services::VoteOutcome::Voted(_)));
    let second = world.tweets.respond_to_poll(vim, a.id).await.unwrap();
    assert_eq!(second, chirp_core::services::VoteOutcome::Removed);

    let details = world.tweets.find_one(poll.poll.tweet_id).await.unwrap();
    assert_eq!(details.poll.unwrap().total_responses(), 0);
}

#[tokio::test]
async fn voting_another_option_moves_the_vote() {
    let world = World::new();
    let a = world.user("alice").await;
    let poll = poll_tweet(&world, a.id, Duration::hours(1)).await;
    let (vim, emacs) = (poll.options[0].option.id, poll.options[1].option.id);

    world.tweets.respond_to_poll(vim, a.id).await.unwrap();
    world.tweets.respond_to_poll(emacs, a.id).await.unwrap();

    let details = world.tweets.find_one(poll.poll.tweet_id).await.unwrap().poll.unwrap();
    assert_eq!(details.total_responses(), 1);
    assert!(details.options[0].voter_ids.is_empty());
    assert_eq!(details.options[1].voter_ids, vec![a.id]);
}

#[tokio::test]
async fn expired_polls_reject_votes() {
    let world = World::new();
    let a = world.user("alice").await;
    let poll = poll_tweet(&world, a.id, -Duration::minutes(5)).await;

    let result = world.tweets.respond_to_poll(poll.options[0].option.id, a.id).await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));
}

#[tokio::test]
async fn retracting_without_a_vote_is_not_found() {
    let world = World::new();
    let a = world.user("alice").await;
    let poll = poll_tweet(&world, a.id, Duration::hours(1)).await;

    let result = world.tweets.remove_poll_response(poll.poll.id, a.id).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));

    world.tweets.respond_to_poll(poll.options[0].option.id, a.id).await.unwrap();
    world.tweets.remove_poll_response(poll.poll.id, a.id).await.unwrap();
}
