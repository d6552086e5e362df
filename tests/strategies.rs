//! Integration tests for session sharing under each key strategy.

mod common;

use chatfsm::{ContextExt, Manager, MemoryStorage, State, Storage, StorageKey, Strategy};
use common::{Collect, Message, manager};
use std::sync::Arc;

async fn collected(manager: &Manager<Message>, event: &Message) -> Vec<String> {
    manager
        .new_context(event)
        .data_opt("items")
        .await
        .expect("data_opt")
        .unwrap_or_default()
}

async fn send_all(manager: &Manager<Message>, events: &[Message]) {
    for event in events {
        manager.dispatch("text", event).await.expect("dispatch");
    }
}

fn collecting(strategy: Strategy) -> Manager<Message> {
    let (manager, _) = manager(strategy);
    manager.register("text", [State::ANY], Collect { field: "items" });
    manager
}

#[tokio::test]
async fn chat_strategy_shares_one_session_per_chat() {
    let manager = collecting(Strategy::Chat);
    send_all(
        &manager,
        &[
            Message::in_chat(5, 1, "a"),
            Message::in_chat(5, 2, "b"),
            Message::in_chat(6, 1, "c"),
        ],
    )
    .await;

    assert_eq!(collected(&manager, &Message::in_chat(5, 99, "")).await, vec!["a", "b"]);
    assert_eq!(collected(&manager, &Message::in_chat(6, 99, "")).await, vec!["c"]);
}

#[tokio::test]
async fn global_user_follows_the_user_across_chats() {
    let manager = collecting(Strategy::GlobalUser);
    send_all(
        &manager,
        &[
            Message::in_chat(5, 9, "a"),
            Message::in_chat(7, 9, "b"),
            Message::chatless(9, "c"),
        ],
    )
    .await;

    assert_eq!(collected(&manager, &Message::in_chat(1, 9, "")).await, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn topic_strategies_split_forum_threads() {
    let per_user = collecting(Strategy::UserInTopic);
    let per_topic = collecting(Strategy::ChatTopic);
    let events = [
        Message::in_topic(5, 100, 1, "a"),
        Message::in_topic(5, 100, 2, "b"),
        Message::in_topic(5, 200, 1, "c"),
    ];
    send_all(&per_user, &events).await;
    send_all(&per_topic, &events).await;

    assert_eq!(collected(&per_user, &Message::in_topic(5, 100, 1, "")).await, vec!["a"]);
    assert_eq!(collected(&per_user, &Message::in_topic(5, 200, 1, "")).await, vec!["c"]);
    assert_eq!(collected(&per_topic, &Message::in_topic(5, 100, 3, "")).await, vec!["a", "b"]);
    assert_eq!(collected(&per_topic, &Message::in_topic(5, 200, 3, "")).await, vec!["c"]);
}

#[tokio::test]
async fn chatless_events_use_chat_zero() {
    let manager = collecting(Strategy::UserInChat);
    send_all(&manager, &[Message::chatless(9, "inline")]).await;

    assert_eq!(
        manager.key_for(&Message::chatless(9, "")),
        StorageKey::new(42, 0, 9, 0)
    );
    assert_eq!(collected(&manager, &Message::in_chat(0, 9, "")).await, vec!["inline"]);
}

#[tokio::test]
async fn managers_with_different_strategies_share_storage() {
    let storage = Arc::new(MemoryStorage::new());
    let chat_level = Manager::<Message>::with_config(
        storage.clone(),
        chatfsm::ManagerConfig::default().with_strategy(Strategy::Chat),
    );
    let user_level: Manager<Message> = Manager::new(storage.clone());
    chat_level.register("text", [State::ANY], Collect { field: "chat_log" });
    user_level.register("text", [State::ANY], Collect { field: "user_log" });

    for user in [1, 2] {
        let event = Message::in_chat(5, user, "hi");
        chat_level.dispatch("text", &event).await.expect("dispatch");
        user_level.dispatch("text", &event).await.expect("dispatch");
    }

    // Chat-level key (42, 5, 5, 0) plus two user-level keys.
    assert_eq!(storage.len(), 3);
    let log: Vec<String> = chat_level
        .new_context(&Message::in_chat(5, 1, ""))
        .data("chat_log")
        .await
        .expect("chat log");
    assert_eq!(log, vec!["hi", "hi"]);

    storage.close().await.expect("close");
    let err = user_level
        .dispatch("text", &Message::in_chat(5, 1, "late"))
        .await
        .expect_err("closed");
    assert_eq!(err.error_code(), "handler_state");
}
