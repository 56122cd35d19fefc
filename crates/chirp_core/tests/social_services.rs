mod common;

use chirp_core::services::{ProfileEdit, Registration};
use chirp_core::{NotificationKind, ServiceError};
use common::World;
use uuid::Uuid;

#[tokio::test]
async fn duplicate_email_or_username_conflicts() {
    let world = World::new();
    world.user("alice").await;

    let same_email = world
        .users
        .register(Registration {
            email: "alice@example.com".to_string(),
            username: "other".to_string(),
            display_name: None,
            password: "secret123".to_string(),
        })
        .await;
    assert!(matches!(same_email, Err(ServiceError::Conflict(_))));

    let same_username = world
        .users
        .register(Registration {
            email: "new@example.com".to_string(),
            username: "alice".to_string(),
            display_name: None,
            password: "secret123".to_string(),
        })
        .await;
    assert!(matches!(same_username, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn login_requires_the_right_password() {
    let world = World::new();
    let alice = world.user("alice").await;

    let ok = world
        .users
        .authenticate("alice@example.com", "secret123")
        .await
        .unwrap();
    assert_eq!(ok.id, alice.id);

    for (email, password) in [("alice@example.com", "wrong"), ("ghost@example.com", "secret123")] {
        let denied = world.users.authenticate(email, password).await;
        assert!(matches!(denied, Err(ServiceError::Unauthorized(_))));
    }
}

#[tokio::test]
async fn password_change_takes_effect() {
    let world = World::new();
    let alice = world.user("alice").await;

    world
        .users
        .update(
            alice.id,
            alice.id,
            ProfileEdit {
                password: Some("brandnew".to_string()),
                bio: Some("hi".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(world.users.authenticate("alice@example.com", "secret123").await.is_err());
    assert!(world.users.authenticate("alice@example.com", "brandnew").await.is_ok());
}

#[tokio::test]
async fn profiles_are_self_service_only() {
    let world = World::new();
    let alice = world.user("alice").await;
    let bob = world.user("bob").await;

    let edit = world.users.update(bob.id, alice.id, ProfileEdit::default()).await;
    assert!(matches!(edit, Err(ServiceError::Forbidden(_))));
    let delete = world.users.remove(bob.id, alice.id).await;
    assert!(matches!(delete, Err(ServiceError::Forbidden(_))));
}

#[tokio::test]
async fn follow_then_unfollow_restores_the_graph() {
    let world = World::new();
    let a = world.user("alice").await;
    let b = world.user("bob").await;

    world.users.follow(a.id, b.id).await.unwrap();
    assert_eq!(world.users.followers(b.id).await.unwrap()[0].id, a.id);
    assert_eq!(world.users.following(a.id).await.unwrap()[0].id, b.id);

    let again = world.users.follow(a.id, b.id).await;
    assert!(matches!(again, Err(ServiceError::Conflict(_))));

    world.users.unfollow(a.id, b.id).await.unwrap();
    assert!(world.users.followers(b.id).await.unwrap().is_empty());
    assert!(world.users.following(a.id).await.unwrap().is_empty());

    let missing = world.users.unfollow(a.id, b.id).await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));

    let inbox = world.notifications.list(b.id).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].notification.kind, NotificationKind::Follow);
}

#[tokio::test]
async fn following_yourself_is_rejected() {
    let world = World::new();
    let a = world.user("alice").await;

    let result = world.users.follow(a.id, a.id).await;
    assert!(matches!(result, Err(ServiceError::BadRequest(_))));
}

#[tokio::test]
async fn deleting_a_user_removes_their_tweets() {
    let world = World::new();
    let a = world.user("alice").await;
    let tweet = world.tweet(a.id, "soon gone").await;

    world.users.remove(a.id, a.id).await.unwrap();

    assert!(matches!(
        world.tweets.find_one(tweet.tweet.id).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        world.users.find_by_id(a.id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn notifications_are_marked_read_only_by_their_owner() {
    let world = World::new();
    let a = world.user("alice").await;
    let b = world.user("bob").await;
    let c = world.user("carol").await;
    world.users.follow(b.id, a.id).await.unwrap();
    world.users.follow(c.id, a.id).await.unwrap();

    let inbox = world.notifications.list(a.id).await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].notification.target_id, Some(c.id));
    let first = inbox[0].notification.id;

    let foreign = world.notifications.mark_read(b.id, first).await;
    assert!(matches!(foreign, Err(ServiceError::NotFound(_))));

    let read = world.notifications.mark_read(a.id, first).await.unwrap();
    assert!(read.is_read);
    assert_eq!(world.notifications.unread_count(a.id).await.unwrap(), 1);

    assert_eq!(world.notifications.mark_all_read(a.id).await.unwrap(), 1);
    assert_eq!(world.notifications.unread_count(a.id).await.unwrap(), 0);
}

#[tokio::test]
async fn conversations_exclude_yourself_and_strangers() {
    let world = World::new();
    let a = world.user("alice").await;
    let b = world.user("bob").await;
    let c = world.user("carol").await;

    let with_self = world.messages.create_conversation(a.id, vec![a.id, b.id]).await;
    assert!(matches!(with_self, Err(ServiceError::Forbidden(_))));
    let empty = world.messages.create_conversation(a.id, vec![]).await;
    assert!(matches!(empty, Err(ServiceError::BadRequest(_))));
    let ghost = world.messages.create_conversation(a.id, vec![Uuid::new_v4()]).await;
    assert!(matches!(ghost, Err(ServiceError::NotFound(_))));

    let conversation = world
        .messages
        .create_conversation(a.id, vec![b.id, b.id])
        .await
        .unwrap();
    assert_eq!(conversation.participants.len(), 2);

    let id = conversation.conversation.id;
    let outsider = world.messages.messages(id, c.id).await;
    assert!(matches!(outsider, Err(ServiceError::NotFound(_))));
    let intrusion = world.messages.send(c.id, id, "hi").await;
    assert!(matches!(intrusion, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn reading_a_thread_marks_incoming_messages_read() {
    let world = World::new();
    let a = world.user("alice").await;
    let b = world.user("bob").await;
    let id = world
        .messages
        .create_conversation(a.id, vec![b.id])
        .await
        .unwrap()
        .conversation
        .id;

    world.messages.send(a.id, id, "hey bob").await.unwrap();
    world.messages.send(a.id, id, "you there?").await.unwrap();
    world.messages.send(b.id, id, "yes").await.unwrap();

    assert_eq!(world.messages.unread_count(b.id).await.unwrap(), 2);
    assert_eq!(world.messages.unread_count(a.id).await.unwrap(), 1);

    let thread = world.messages.messages(id, b.id).await.unwrap();
    let contents: Vec<&str> = thread.iter().map(|m| m.message.content.as_str()).collect();
    assert_eq!(contents, vec!["hey bob", "you there?", "yes"]);
    assert_eq!(world.messages.unread_count(b.id).await.unwrap(), 0);
    assert_eq!(world.messages.unread_count(a.id).await.unwrap(), 1);

    let overview = world.messages.conversations(a.id).await.unwrap();
    assert_eq!(overview[0].message_count, 3);
    assert_eq!(
        overview[0].last_message.as_ref().map(|m| m.content.as_str()),
        Some("yes")
    );
}

#[tokio::test]
async fn most_recently_active_conversation_is_listed_first() {
    let world = World::new();
    let a = world.user("alice").await;
    let b = world.user("bob").await;
    let c = world.user("carol").await;
    let with_b = world.messages.create_conversation(a.id, vec![b.id]).await.unwrap();
    let with_c = world.messages.create_conversation(a.id, vec![c.id]).await.unwrap();

    world
        .messages
        .send(b.id, with_b.conversation.id, "bump")
        .await
        .unwrap();

    let listed = world.messages.conversations(a.id).await.unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|c| c.conversation.id).collect();
    assert_eq!(ids, vec![with_b.conversation.id, with_c.conversation.id]);
}
