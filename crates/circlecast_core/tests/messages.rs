mod common;

use circlecast_core::repo::message_repo::MessageRepository;
use circlecast_core::{
    open_db_in_memory, CircleService, ErrorKind, MessageService, ServiceError, ServicePolicy,
    SqliteGraphRepository, BROADCAST_CIRCLE, GOLD_CIRCLE,
};
use common::register;

#[test]
fn broadcast_message_is_visible_only_to_followers() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let bob = register(store, "bob");
    let carol = register(store, "carol");
    let circles = CircleService::new(store, ServicePolicy::default());
    let messages = MessageService::new(store);

    let broadcast = circles
        .circle_id_by_name(&alice, BROADCAST_CIRCLE)
        .unwrap()
        .unwrap();
    let hello = messages.create_message(&alice, "hello").unwrap();
    messages.publish(&alice, hello, broadcast).unwrap();

    let err = messages.get_message(&bob, hello).unwrap_err();
    assert!(matches!(err, ServiceError::MessageNotFound(_)));

    circles.join_broadcast(&carol, "alice").unwrap();
    let seen = messages.get_message(&carol, hello).unwrap();
    assert_eq!(seen.content, "hello");
    assert_eq!(seen.author, "alice");

    // The chief reaches her own publication too.
    messages.get_message(&alice, hello).unwrap();
}

#[test]
fn unpublish_removes_visibility_gained_through_that_circle() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let bob = register(store, "bob");
    let circles = CircleService::new(store, ServicePolicy::default());
    let messages = MessageService::new(store);

    let gold = circles.circle_id_by_name(&alice, GOLD_CIRCLE).unwrap().unwrap();
    circles.add_member(&alice, gold, "bob").unwrap();

    let secret = messages.create_message(&alice, "for gold only").unwrap();
    messages.publish(&alice, secret, gold).unwrap();
    messages.publish(&alice, secret, gold).unwrap();
    messages.get_message(&bob, secret).unwrap();

    messages.unpublish(&alice, secret, gold).unwrap();
    assert!(matches!(
        messages.get_message(&bob, secret).unwrap_err(),
        ServiceError::MessageNotFound(_)
    ));

    let err = messages.unpublish(&alice, secret, gold).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[test]
fn publish_requires_authorship_and_membership() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let bob = register(store, "bob");
    let circles = CircleService::new(store, ServicePolicy::default());
    let messages = MessageService::new(store);

    let alice_gold = circles.circle_id_by_name(&alice, GOLD_CIRCLE).unwrap().unwrap();
    let bob_broadcast = circles
        .circle_id_by_name(&bob, BROADCAST_CIRCLE)
        .unwrap()
        .unwrap();
    let note = messages.create_message(&alice, "note").unwrap();

    // Not a member of bob's Broadcast yet.
    let err = messages.publish(&alice, note, bob_broadcast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    // Someone else's message.
    let err = messages.publish(&bob, note, bob_broadcast).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let err = messages
        .publish(&alice, note, uuid::Uuid::new_v4())
        .unwrap_err();
    assert!(matches!(err, ServiceError::CircleNotFound(_)));

    circles.join_broadcast(&alice, "bob").unwrap();
    messages.publish(&alice, note, bob_broadcast).unwrap();
    messages.publish(&alice, note, alice_gold).unwrap();
    assert!(store
        .message_is_published_to("alice", note, bob_broadcast)
        .unwrap());
    messages.get_message(&bob, note).unwrap();
}

#[test]
fn empty_content_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let messages = MessageService::new(store);

    let err = messages.create_message(&alice, "  \n ").unwrap_err();
    assert!(matches!(err, ServiceError::EmptyContent));
    assert!(messages.list_authored_messages(&alice).unwrap().is_empty());
}

#[test]
fn only_author_edits_and_deletes() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let bob = register(store, "bob");
    let messages = MessageService::new(store);

    let draft = messages.create_message(&alice, "first draft").unwrap();
    let before = messages.list_authored_messages(&alice).unwrap()[0].clone();

    let err = messages.edit_message(&bob, draft, "defaced").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    let err = messages.delete_message(&bob, draft).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    messages.edit_message(&alice, draft, "second draft").unwrap();
    let after = messages.list_authored_messages(&alice).unwrap()[0].clone();
    assert_eq!(after.content, "second draft");
    assert_eq!(after.created_at, before.created_at);
    assert!(after.last_saved_at >= before.last_saved_at);

    messages.delete_message(&alice, draft).unwrap();
    assert!(!store.message_exists(draft).unwrap());
    assert!(matches!(
        messages.delete_message(&alice, draft).unwrap_err(),
        ServiceError::MessageNotFound(_)
    ));
}

#[test]
fn author_listing_is_ordered_and_includes_unpublished() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let messages = MessageService::new(store);

    let first = messages.create_message(&alice, "one").unwrap();
    let second = messages.create_message(&alice, "two").unwrap();
    let third = messages.create_message(&alice, "three").unwrap();

    let ids: Vec<_> = messages
        .list_authored_messages(&alice)
        .unwrap()
        .into_iter()
        .map(|message| message.id)
        .collect();
    assert_eq!(ids, vec![first, second, third]);
    assert_eq!(
        messages.list_messages_by_author(&alice, "alice").unwrap().len(),
        3
    );
}

#[test]
fn listing_another_author_applies_visibility() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let bob = register(store, "bob");
    let circles = CircleService::new(store, ServicePolicy::default());
    let messages = MessageService::new(store);

    let broadcast = circles
        .circle_id_by_name(&alice, BROADCAST_CIRCLE)
        .unwrap()
        .unwrap();
    let gold = circles.circle_id_by_name(&alice, GOLD_CIRCLE).unwrap().unwrap();

    let public_note = messages.create_message(&alice, "public").unwrap();
    let private_note = messages.create_message(&alice, "private").unwrap();
    messages.create_message(&alice, "draft").unwrap();
    messages.publish(&alice, public_note, broadcast).unwrap();
    messages.publish(&alice, private_note, gold).unwrap();

    assert!(messages
        .list_messages_by_author(&bob, "alice")
        .unwrap()
        .is_empty());

    circles.join_broadcast(&bob, "alice").unwrap();
    let visible = messages.list_messages_by_author(&bob, "alice").unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, public_note);

    // Published to two circles bob belongs to, still listed once.
    circles.add_member(&alice, gold, "bob").unwrap();
    messages.publish(&alice, public_note, gold).unwrap();
    let visible = messages.list_messages_by_author(&bob, "alice").unwrap();
    let ids: Vec<_> = visible.iter().map(|message| message.id).collect();
    assert_eq!(ids, vec![public_note, private_note]);

    let err = messages.list_messages_by_author(&bob, "nobody").unwrap_err();
    assert!(matches!(err, ServiceError::UserNotFound(_)));
}

#[test]
fn message_serializes_with_author_and_timestamps() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let messages = MessageService::new(store);
    messages.create_message(&alice, "hello").unwrap();

    let message = &messages.list_authored_messages(&alice).unwrap()[0];
    let json = serde_json::to_value(message).unwrap();
    assert_eq!(json["author"], "alice");
    assert_eq!(json["content"], "hello");
    assert!(json["created_at"].is_i64());
}
