//! Store-level tests against an in-memory database.

use chrono::{Duration, Utc};

use crate::{migrations, Database};

fn db() -> Database {
    Database::open_in_memory().expect("in-memory db")
}

fn seed_identity(db: &Database, id: &str, name: &str) {
    db.upsert_identity(id, name, Some(&format!("https://avatars.example/{id}.png")))
        .unwrap();
}

/// Rows from before sign-in was required have no owner; the schema keeps
/// accepting them so old databases stay loadable.
fn insert_anonymous(db: &Database, text: &str) -> i64 {
    db.with_conn(|conn| {
        conn.execute("INSERT INTO messages (text) VALUES (?1)", [text])?;
        Ok(conn.last_insert_rowid())
    })
    .unwrap()
}

fn expiry_in(hours: i64) -> String {
    (Utc::now() + Duration::hours(hours))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

// -- Migrations --

#[test]
fn migrations_are_idempotent() {
    let db = db();
    // Second run must be a no-op, not a failure.
    db.with_conn(|conn| migrations::run(conn)).unwrap();

    seed_identity(&db, "a", "Alice");
    db.insert_message("still works", "a").unwrap();
    assert_eq!(db.count_messages().unwrap(), 1);
}

// -- Messages --

#[test]
fn insert_returns_stored_row() {
    let db = db();
    seed_identity(&db, "a", "Alice");

    let row = db.insert_message("  hello  ", "a").unwrap();
    assert_eq!(row.id, 1);
    // Text is stored verbatim, whitespace and all.
    assert_eq!(row.text, "  hello  ");
    assert_eq!(row.owner_id.as_deref(), Some("a"));
    assert!(!row.created_at.is_empty());
}

#[test]
fn ids_are_monotonic_and_never_reused() {
    let db = db();
    seed_identity(&db, "a", "Alice");

    let first = db.insert_message("one", "a").unwrap();
    let second = db.insert_message("two", "a").unwrap();
    let third = db.insert_message("three", "a").unwrap();
    assert_eq!((first.id, second.id, third.id), (1, 2, 3));

    assert_eq!(db.delete_message_owned(third.id, "a").unwrap(), 1);

    // The freed id must not come back.
    let fourth = db.insert_message("four", "a").unwrap();
    assert_eq!(fourth.id, 4);
}

#[test]
fn feed_lists_newest_first() {
    let db = db();
    seed_identity(&db, "a", "Alice");

    db.insert_message("first", "a").unwrap();
    db.insert_message("second", "a").unwrap();
    db.insert_message("third", "a").unwrap();

    let feed = db.list_messages().unwrap();
    let texts: Vec<&str> = feed.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["third", "second", "first"]);
}

#[test]
fn feed_joins_owner_display_fields() {
    let db = db();
    seed_identity(&db, "a", "Alice");
    seed_identity(&db, "b", "Bob");

    db.insert_message("from alice", "a").unwrap();
    db.insert_message("from bob", "b").unwrap();

    let feed = db.list_messages().unwrap();
    assert_eq!(feed.len(), 2);

    let bob = &feed[0];
    assert_eq!(bob.owner_id.as_deref(), Some("b"));
    assert_eq!(bob.owner_name.as_deref(), Some("Bob"));
    assert_eq!(
        bob.owner_image.as_deref(),
        Some("https://avatars.example/b.png")
    );

    let alice = &feed[1];
    assert_eq!(alice.owner_name.as_deref(), Some("Alice"));
}

#[test]
fn feed_keeps_ownerless_rows_with_null_owner() {
    let db = db();
    seed_identity(&db, "a", "Alice");

    insert_anonymous(&db, "old guest entry");
    db.insert_message("signed entry", "a").unwrap();

    let feed = db.list_messages().unwrap();
    assert_eq!(feed.len(), 2);

    let anon = feed.iter().find(|m| m.text == "old guest entry").unwrap();
    assert!(anon.owner_id.is_none());
    assert!(anon.owner_name.is_none());
    assert!(anon.owner_image.is_none());
}

#[test]
fn conditional_delete_requires_matching_owner() {
    let db = db();
    seed_identity(&db, "a", "Alice");
    seed_identity(&db, "b", "Bob");

    let row = db.insert_message("mine", "a").unwrap();

    assert_eq!(db.delete_message_owned(row.id, "b").unwrap(), 0);
    assert_eq!(db.count_messages().unwrap(), 1);

    assert_eq!(db.delete_message_owned(row.id, "a").unwrap(), 1);
    assert_eq!(db.count_messages().unwrap(), 0);

    // Already gone: the same statement now misses.
    assert_eq!(db.delete_message_owned(row.id, "a").unwrap(), 0);
}

#[test]
fn conditional_delete_skips_ownerless_rows() {
    let db = db();
    seed_identity(&db, "a", "Alice");

    let id = insert_anonymous(&db, "nobody owns this");
    // NULL owner_id compares equal to no identity.
    assert_eq!(db.delete_message_owned(id, "a").unwrap(), 0);
    assert_eq!(db.count_messages().unwrap(), 1);
}

#[test]
fn message_owner_distinguishes_missing_from_ownerless() {
    let db = db();
    seed_identity(&db, "a", "Alice");

    let owned = db.insert_message("owned", "a").unwrap();
    let anon = insert_anonymous(&db, "anonymous");

    assert_eq!(
        db.get_message_owner(owned.id).unwrap(),
        Some(Some("a".to_string()))
    );
    assert_eq!(db.get_message_owner(anon).unwrap(), Some(None));
    assert_eq!(db.get_message_owner(9999).unwrap(), None);
}

// -- Sessions --

#[test]
fn resolve_session_roundtrip() {
    let db = db();
    seed_identity(&db, "a", "Alice");
    db.create_session("tok-a", "a", &expiry_in(24)).unwrap();

    let identity = db.resolve_session("tok-a").unwrap().unwrap();
    assert_eq!(identity.id, "a");
    assert_eq!(identity.name, "Alice");
    assert_eq!(
        identity.image.as_deref(),
        Some("https://avatars.example/a.png")
    );

    assert!(db.resolve_session("unknown-token").unwrap().is_none());
}

#[test]
fn expired_sessions_do_not_resolve() {
    let db = db();
    seed_identity(&db, "a", "Alice");
    db.create_session("stale", "a", &expiry_in(-1)).unwrap();

    assert!(db.resolve_session("stale").unwrap().is_none());
}

#[test]
fn delete_session_revokes_immediately() {
    let db = db();
    seed_identity(&db, "a", "Alice");
    db.create_session("tok-a", "a", &expiry_in(24)).unwrap();

    assert_eq!(db.delete_session("tok-a").unwrap(), 1);
    assert!(db.resolve_session("tok-a").unwrap().is_none());

    // Second delete is a miss, not an error.
    assert_eq!(db.delete_session("tok-a").unwrap(), 0);
}

#[test]
fn purge_removes_only_expired_sessions() {
    let db = db();
    seed_identity(&db, "a", "Alice");
    db.create_session("live", "a", &expiry_in(24)).unwrap();
    db.create_session("dead", "a", &expiry_in(-24)).unwrap();

    assert_eq!(db.purge_expired_sessions().unwrap(), 1);
    assert!(db.resolve_session("live").unwrap().is_some());
    assert!(db.resolve_session("dead").unwrap().is_none());
}

// -- Identities --

#[test]
fn upsert_identity_refreshes_profile() {
    let db = db();
    db.upsert_identity("a", "Alice", None).unwrap();
    db.upsert_identity("a", "Alice Liddell", Some("https://avatars.example/a2.png"))
        .unwrap();

    let row = db.get_identity("a").unwrap().unwrap();
    assert_eq!(row.name, "Alice Liddell");
    assert_eq!(row.image.as_deref(), Some("https://avatars.example/a2.png"));
}
