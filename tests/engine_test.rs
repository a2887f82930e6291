//! Multi-tenant engine integration tests over the in-memory store.

mod common;

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use trellis::{BotEngine, BotUser, EngineError, MemoryStore, StoreBag, UserKey};

async fn engine_with(store: &Arc<MemoryStore>) -> BotEngine {
    store.put_template(common::template());
    store.add_instance(common::instance(1, "111:token-a"));
    BotEngine::new(store.clone(), store.clone(), store.clone())
        .await
        .expect("engine construction")
}

fn key(chat_id: i64, user_id: u64) -> UserKey {
    UserKey { instance_id: Some(1), chat_id, user_id }
}

#[tokio::test]
async fn test_template_absent_fails_fast() {
    let store = Arc::new(MemoryStore::new());
    let result = BotEngine::new(store.clone(), store.clone(), store.clone()).await;
    assert!(matches!(result, Err(EngineError::TemplateNotFound)));
}

#[tokio::test]
async fn test_unknown_instance_fails_the_request() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(&store).await;

    let result = engine
        .process_update(99, common::message_update(1, 111, 222, "A", "hi"))
        .await;
    assert!(matches!(result, Err(EngineError::InstanceNotFound(99))));
}

#[tokio::test]
async fn test_first_event_creates_user_and_runs_start() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(&store).await;
    engine.tree().register_node("start", common::visit_start);
    engine.tree().register_node("await_name", common::visit_await_name);

    engine
        .process_update(1, common::message_update(1, 111, 222, "A", "hi"))
        .await
        .unwrap();

    let user = store
        .find_by_key_sync(&key(111, 222))
        .expect("exactly one user created");
    assert_eq!(user.chat_id, 111);
    assert_eq!(user.user_id, 222);
    assert_eq!(user.first_name, "A");
    assert!(!user.blocked);
    // The start node ran and moved the conversation on
    assert_eq!(user.store.get("visited"), Some(&json!("start")));
    assert_eq!(user.state, "await_name");
    assert!(user.update_dt >= user.create_dt);
}

#[tokio::test]
async fn test_persisted_state_seeds_the_next_dispatch() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(&store).await;
    engine.tree().register_node("start", common::visit_start);
    engine.tree().register_node("await_name", common::visit_await_name);

    engine
        .process_update(1, common::message_update(1, 111, 222, "A", "hi"))
        .await
        .unwrap();
    engine
        .process_update(1, common::message_update(2, 111, 222, "A", "Bob"))
        .await
        .unwrap();

    let user = store.find_by_key_sync(&key(111, 222)).unwrap();
    assert_eq!(user.store.get("visited"), Some(&json!("await_name")));
    assert_eq!(user.state, "await_name");
}

#[tokio::test]
async fn test_blocked_user_update_is_dropped_silently() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(&store).await;
    engine.tree().register_node("start", common::visit_start);

    let frozen = Utc::now() - chrono::Duration::hours(1);
    store.put_user(BotUser {
        id: 1,
        instance_id: Some(1),
        chat_id: 111,
        user_id: 222,
        first_name: "A".to_string(),
        last_name: None,
        username: None,
        state: String::new(),
        store: StoreBag::new(),
        blocked: true,
        update_dt: frozen,
        create_dt: frozen,
    });

    engine
        .process_update(1, common::message_update(1, 111, 222, "A", "hi"))
        .await
        .unwrap();

    let user = store.get_user(1).unwrap();
    // No dispatch, no persistence: the record is untouched
    assert_eq!(user.state, "");
    assert!(user.store.is_empty());
    assert_eq!(user.update_dt, frozen);
}

#[tokio::test]
async fn test_handler_error_aborts_before_persistence() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(&store).await;
    engine.tree().register_node("start", common::exploding_node);

    let result = engine
        .process_update(1, common::message_update(1, 111, 222, "A", "hi"))
        .await;
    assert!(matches!(result, Err(EngineError::Handler(_))));

    // The user was created on the way in, but the write-back never happened
    let user = store.find_by_key_sync(&key(111, 222)).unwrap();
    assert_eq!(user.state, "");
    assert!(user.store.is_empty());
}

#[tokio::test]
async fn test_instance_credentials_are_reread_every_event() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(&store).await;
    engine.tree().register_node("start", common::record_token);

    engine
        .process_update(1, common::message_update(1, 111, 222, "A", "hi"))
        .await
        .unwrap();
    let user = store.find_by_key_sync(&key(111, 222)).unwrap();
    assert_eq!(user.store.get("token"), Some(&json!("111:token-a")));

    // Rotate the credential between events
    store.add_instance(common::instance(1, "111:token-b"));
    engine
        .process_update(1, common::message_update(2, 111, 222, "A", "hi"))
        .await
        .unwrap();
    let user = store.find_by_key_sync(&key(111, 222)).unwrap();
    assert_eq!(user.store.get("token"), Some(&json!("111:token-b")));
}

#[tokio::test]
async fn test_router_redirect_applies_before_node_dispatch() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(&store).await;
    engine.tree().register_router(common::reset_router);
    engine.tree().register_node("start", common::visit_start);
    engine.tree().register_node("await_name", common::visit_await_name);

    // Walk to await_name, then /reset jumps back through the router
    engine
        .process_update(1, common::message_update(1, 111, 222, "A", "hi"))
        .await
        .unwrap();
    engine
        .process_update(1, common::message_update(2, 111, 222, "A", "/reset"))
        .await
        .unwrap();

    let user = store.find_by_key_sync(&key(111, 222)).unwrap();
    assert_eq!(user.store.get("visited"), Some(&json!("start")));
    assert_eq!(user.state, "await_name");
}

#[tokio::test]
async fn test_identityless_update_is_ignored() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(&store).await;
    engine.tree().register_node("start", common::visit_start);

    engine.process_update(1, common::anonymous_update(1)).await.unwrap();

    assert!(store.find_by_key_sync(&key(111, 222)).is_none());
}

#[tokio::test]
async fn test_user_locks_serialize_concurrent_updates() {
    let store = Arc::new(MemoryStore::new());
    store.put_template(common::template());
    store.add_instance(common::instance(1, "111:token-a"));
    let engine = BotEngine::new(store.clone(), store.clone(), store.clone())
        .await
        .unwrap()
        .with_user_locks();
    engine.tree().register_node("start", common::append_trail);

    let engine = Arc::new(engine);
    let (a, b) = tokio::join!(
        engine.process_update(1, common::message_update(1, 111, 222, "A", "one")),
        engine.process_update(1, common::message_update(2, 111, 222, "A", "two")),
    );
    a.unwrap();
    b.unwrap();

    // Both read-modify-write cycles survived: no lost update
    let user = store.find_by_key_sync(&key(111, 222)).unwrap();
    assert_eq!(user.store.get("trail"), Some(&json!([0, 1])));
}
