#![allow(clippy::unwrap_used, clippy::expect_used)]

use parley_core::{ParleyError, Role};
use parley_session::{InMemorySessionStore, SessionStore};
use std::sync::Arc;

#[tokio::test]
async fn test_get_or_create_returns_same_instance() {
    let store = InMemorySessionStore::new();
    let first = store.get_or_create("s1").await.unwrap();
    let second = store.get_or_create("s1").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.id(), "s1");
    assert_eq!(store.session_count().await, 1);
}

#[tokio::test]
async fn test_empty_session_id_is_rejected() {
    let store = InMemorySessionStore::new();

    let err = store.get_or_create("").await.unwrap_err();
    assert!(matches!(err, ParleyError::InvalidArgument(_)));

    let err = store.append_turn("  ", Role::User, "hi").await.unwrap_err();
    assert!(matches!(err, ParleyError::InvalidArgument(_)));
    assert_eq!(store.session_count().await, 0);
}

#[tokio::test]
async fn test_append_preserves_order() {
    let store = InMemorySessionStore::new();
    store.append_turn("s1", Role::User, "first").await.unwrap();
    store.append_turn("s1", Role::Assistant, "second").await.unwrap();
    store.append_turn("s1", Role::User, "third").await.unwrap();

    let history = store.history("s1").await;
    let contents: Vec<_> = history.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, ["first", "second", "third"]);
    assert_eq!(history[1].role, Role::Assistant);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let store = InMemorySessionStore::new();
    store.append_turn("alice", Role::User, "alice says hi").await.unwrap();
    store.append_turn("bob", Role::User, "bob says hi").await.unwrap();

    let alice = store.history("alice").await;
    let bob = store.history("bob").await;
    assert_eq!(alice.len(), 1);
    assert_eq!(bob.len(), 1);
    assert_eq!(alice[0].content, "alice says hi");
    assert_eq!(bob[0].content, "bob says hi");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_yields_single_session() {
    let store = Arc::new(InMemorySessionStore::new());

    let mut handles = Vec::new();
    for _ in 0..32 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.get_or_create("shared").await.unwrap()
        }));
    }

    let mut sessions = Vec::new();
    for h in handles {
        sessions.push(h.await.unwrap());
    }

    assert_eq!(store.session_count().await, 1);
    for s in &sessions[1..] {
        assert!(Arc::ptr_eq(&sessions[0], s));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_are_not_lost() {
    let store = Arc::new(InMemorySessionStore::with_shards(4));

    let mut handles = Vec::new();
    for i in 0..100 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let sid = format!("session-{}", i % 5);
            store
                .append_turn(&sid, Role::User, &format!("msg-{i}"))
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(store.session_count().await, 5);
    for n in 0..5 {
        let history = store.history(&format!("session-{n}")).await;
        assert_eq!(history.len(), 20);
    }
}
