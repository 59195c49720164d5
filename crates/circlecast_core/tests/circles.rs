mod common;

use circlecast_core::repo::circle_repo::CircleRepository;
use circlecast_core::repo::user_repo::UserRepository;
use circlecast_core::{
    open_db_in_memory, AdminService, CircleRole, CircleSearchRequest, CircleService, ErrorKind,
    ServiceError, ServicePolicy, SqliteGraphRepository, BROADCAST_CIRCLE, GOLD_CIRCLE,
};
use common::register;

fn circles(store: SqliteGraphRepository<'_>) -> CircleService<SqliteGraphRepository<'_>> {
    CircleService::new(store, ServicePolicy::default())
}

fn member_of_count(conn: &rusqlite::Connection, handle: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM member_of WHERE user_handle = ?1;",
        [handle],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn public_domain_initialization_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let admin = AdminService::new(store);

    let first = admin.initialize_graph().unwrap();
    let second = admin.initialize_graph().unwrap();
    assert_eq!(first, second);

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM public_domain;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn reset_wipes_graph_and_restores_public_domain() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    register(store, "alice");

    AdminService::new(store).reset_graph().unwrap();

    assert!(!store.handle_exists("alice").unwrap());
    let circle_rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM circles;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(circle_rows, 0);
    // Signup works again right after a reset.
    register(store, "alice");
}

#[test]
fn default_circles_are_created_once() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    register(store, "alice");

    assert!(store.create_default_circles("alice").unwrap());
    let chiefed: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM chief_of WHERE user_handle = 'alice';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(chiefed, 2);
    assert!(!store.create_default_circles("nobody").unwrap());
}

#[test]
fn create_circle_rejects_empty_and_reserved_names() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let service = circles(store);

    for name in ["", "   ", GOLD_CIRCLE, "broadcast"] {
        let err = service.create_circle(&alice, name, false).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCircleName(_)), "{name}");
    }

    let book_club = service.create_circle(&alice, " Book club ", false).unwrap();
    assert_eq!(
        service.circle_id_by_name(&alice, "Book club").unwrap(),
        Some(book_club)
    );
    assert!(store.user_is_chief_of("alice", book_club).unwrap());
}

#[test]
fn joining_a_public_circle_twice_creates_one_membership() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let bob = register(store, "bob");
    let service = circles(store);

    let open_circle = service.create_circle(&alice, "Open", true).unwrap();
    service.join_circle(&bob, open_circle).unwrap();
    service.join_circle(&bob, open_circle).unwrap();

    assert!(store.user_is_member_or_chief_of("bob", open_circle).unwrap());
    assert_eq!(member_of_count(&conn, "bob"), 1);
}

#[test]
fn private_circle_cannot_be_joined_by_outsiders() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let bob = register(store, "bob");
    let service = circles(store);

    let gold = service.circle_id_by_name(&alice, GOLD_CIRCLE).unwrap().unwrap();
    assert!(!service.can_see(&bob, gold).unwrap());
    assert!(service.can_see(&alice, gold).unwrap());

    let err = service.join_circle(&bob, gold).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(member_of_count(&conn, "bob"), 0);
}

#[test]
fn join_unknown_circle_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let bob = register(store, "bob");

    let err = circles(store)
        .join_circle(&bob, uuid::Uuid::new_v4())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn join_broadcast_is_idempotent_and_checks_target() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    register(store, "alice");
    let bob = register(store, "bob");
    let service = circles(store);

    service.join_broadcast(&bob, "alice").unwrap();
    service.join_broadcast(&bob, "alice").unwrap();
    assert_eq!(member_of_count(&conn, "bob"), 1);

    let err = service.join_broadcast(&bob, "nobody").unwrap_err();
    assert!(matches!(err, ServiceError::UserNotFound(_)));
}

#[test]
fn blocking_revokes_memberships_and_prevents_rejoining() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let bob = register(store, "bob");
    let service = circles(store);

    let broadcast = service
        .circle_id_by_name(&alice, BROADCAST_CIRCLE)
        .unwrap()
        .unwrap();
    service.join_broadcast(&bob, "alice").unwrap();
    assert!(store.user_is_member_or_chief_of("bob", broadcast).unwrap());

    service.block_user(&alice, "bob").unwrap();
    service.block_user(&alice, "bob").unwrap();
    assert!(store.block_exists("alice", "bob").unwrap());
    assert!(!store.user_is_member_or_chief_of("bob", broadcast).unwrap());

    assert!(matches!(
        service.join_broadcast(&bob, "alice").unwrap_err(),
        ServiceError::Blocked
    ));
    assert!(matches!(
        service.join_circle(&bob, broadcast).unwrap_err(),
        ServiceError::Blocked
    ));

    // Blocking is directed: alice can still follow bob.
    service.join_broadcast(&alice, "bob").unwrap();
}

#[test]
fn block_rejects_self_and_unknown_targets() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let service = circles(store);

    assert!(matches!(
        service.block_user(&alice, "alice").unwrap_err(),
        ServiceError::CannotBlockSelf
    ));
    assert!(matches!(
        service.block_user(&alice, "ghost").unwrap_err(),
        ServiceError::UserNotFound(_)
    ));
}

#[test]
fn chief_adds_members_to_private_circle() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let bob = register(store, "bob");
    register(store, "carol");
    let service = circles(store);

    let gold = service.circle_id_by_name(&alice, GOLD_CIRCLE).unwrap().unwrap();
    let err = service.add_member(&bob, gold, "carol").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    service.add_member(&alice, gold, "bob").unwrap();
    assert!(service.can_see(&bob, gold).unwrap());
    assert!(service.can_publish(&bob, gold).unwrap());

    service.block_user(&alice, "carol").unwrap();
    let err = service.add_member(&alice, gold, "carol").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[test]
fn revoke_membership_removes_target_from_all_chiefed_circles() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let bob = register(store, "bob");
    let service = circles(store);

    let gold = service.circle_id_by_name(&alice, GOLD_CIRCLE).unwrap().unwrap();
    service.add_member(&alice, gold, "bob").unwrap();
    service.join_broadcast(&bob, "alice").unwrap();

    assert_eq!(service.revoke_membership(&alice, "bob").unwrap(), 2);
    assert_eq!(service.revoke_membership(&alice, "bob").unwrap(), 0);
    assert_eq!(member_of_count(&conn, "bob"), 0);
}

#[test]
fn search_circles_hides_private_circles_from_others() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteGraphRepository::try_new(&conn).unwrap();
    let alice = register(store, "alice");
    let bob = register(store, "bob");
    let service = circles(store);
    service.join_broadcast(&alice, "bob").unwrap();

    let own = service
        .search_circles(
            &alice,
            &CircleSearchRequest {
                owner: "alice".to_string(),
                ..CircleSearchRequest::default()
            },
        )
        .unwrap();
    let names: Vec<_> = own.iter().map(|circle| circle.name.as_str()).collect();
    assert_eq!(own.len(), 3);
    assert!(names.contains(&GOLD_CIRCLE));
    let bobs = own
        .iter()
        .find(|circle| circle.chief == "bob")
        .expect("bob's broadcast is listed");
    assert_eq!(bobs.role, CircleRole::Member);
    assert!(bobs.is_public);

    let seen_by_bob = service
        .search_circles(
            &bob,
            &CircleSearchRequest {
                owner: "alice".to_string(),
                ..CircleSearchRequest::default()
            },
        )
        .unwrap();
    assert!(seen_by_bob.iter().all(|circle| circle.is_public));
    assert!(seen_by_bob.iter().all(|circle| circle.name != GOLD_CIRCLE));

    let paged = service
        .search_circles(
            &alice,
            &CircleSearchRequest {
                owner: "alice".to_string(),
                skip: 1,
                limit: Some(1),
                ..CircleSearchRequest::default()
            },
        )
        .unwrap();
    assert_eq!(paged.len(), 1);

    let json = serde_json::to_value(&own[0]).unwrap();
    assert!(json["role"] == "chief" || json["role"] == "member");
}
