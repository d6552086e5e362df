//! Integration test common infrastructure.
//!
//! Provides a chat update type, a few reusable handlers, and a helper to
//! build a manager over a fresh in-memory storage.

#![allow(dead_code)]

use async_trait::async_trait;
use chatfsm::{
    Context, ContextExt, Event, Handler, HandlerResult, Manager, ManagerConfig, MemoryStorage,
    State, Strategy,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// A message arriving from a chat transport.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub bot: i64,
    pub chat: Option<i64>,
    pub user: i64,
    pub thread: i64,
    pub text: String,
}

impl Message {
    /// Message in a group or private chat, outside any topic.
    pub fn in_chat(chat: i64, user: i64, text: &str) -> Self {
        Self {
            bot: 42,
            chat: Some(chat),
            user,
            thread: 0,
            text: text.to_string(),
        }
    }

    /// Message inside a forum topic.
    pub fn in_topic(chat: i64, thread: i64, user: i64, text: &str) -> Self {
        Self {
            thread,
            ..Self::in_chat(chat, user, text)
        }
    }

    /// Event without a chat, such as an inline query.
    pub fn chatless(user: i64, text: &str) -> Self {
        Self {
            chat: None,
            ..Self::in_chat(0, user, text)
        }
    }
}

impl Event for Message {
    fn bot_id(&self) -> i64 {
        self.bot
    }
    fn chat_id(&self) -> Option<i64> {
        self.chat
    }
    fn user_id(&self) -> i64 {
        self.user
    }
    fn thread_id(&self) -> i64 {
        self.thread
    }
}

/// Replies captured by handlers, in order.
pub type Outbox = Arc<Mutex<Vec<String>>>;

pub fn outbox() -> Outbox {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn manager(strategy: Strategy) -> (Manager<Message>, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let config = ManagerConfig::default().with_strategy(strategy);
    (Manager::with_config(storage.clone(), config), storage)
}

/// Sends a fixed reply and moves to `next`.
pub struct Transition {
    pub reply: &'static str,
    pub next: State,
    pub outbox: Outbox,
}

#[async_trait]
impl Handler<Message> for Transition {
    async fn handle(&self, _event: &Message, ctx: &dyn Context) -> HandlerResult {
        self.outbox.lock().push(self.reply.to_string());
        ctx.set_state(self.next.clone()).await?;
        Ok(())
    }
}

/// Appends the message text to a list stored under `field`.
pub struct Collect {
    pub field: &'static str,
}

#[async_trait]
impl Handler<Message> for Collect {
    async fn handle(&self, event: &Message, ctx: &dyn Context) -> HandlerResult {
        let mut items: Vec<String> = ctx.data_opt(self.field).await?.unwrap_or_default();
        items.push(event.text.clone());
        ctx.set_data(self.field, &items).await?;
        Ok(())
    }
}
