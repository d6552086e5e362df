//! Storage key derivation.
//!
//! A [`Strategy`] decides which identity fields of an event collapse into the
//! [`StorageKey`] that names a session. Derivation is pure: the same strategy
//! and inputs always produce the same key.

use crate::handlers::Event;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one session in storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey {
    /// Bot the session belongs to.
    pub bot_id: i64,
    /// Chat id, or the user id under [`Strategy::GlobalUser`].
    pub chat_id: i64,
    /// User id, or the chat id under chat-wide strategies.
    pub user_id: i64,
    /// Topic/thread id; 0 when the strategy ignores threads.
    pub thread_id: i64,
}

impl StorageKey {
    /// Create a key from raw fields.
    pub const fn new(bot_id: i64, chat_id: i64, user_id: i64, thread_id: i64) -> Self {
        Self {
            bot_id,
            chat_id,
            user_id,
            thread_id,
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.bot_id, self.chat_id, self.user_id, self.thread_id
        )
    }
}

/// Policy mapping raw identity fields to a [`StorageKey`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One session per user in each chat.
    #[default]
    UserInChat,
    /// One session per chat, shared by every member.
    Chat,
    /// One session per user, shared across all chats.
    GlobalUser,
    /// One session per user in each topic of a chat.
    UserInTopic,
    /// One session per topic, shared by every member.
    ChatTopic,
}

impl Strategy {
    /// All strategies in index order.
    pub const ALL: [Strategy; 5] = [
        Strategy::UserInChat,
        Strategy::Chat,
        Strategy::GlobalUser,
        Strategy::UserInTopic,
        Strategy::ChatTopic,
    ];

    /// Look up a strategy by numeric index; unknown indices fall back to
    /// [`Strategy::UserInChat`].
    pub fn from_index(index: i64) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    /// Stable configuration name of the strategy.
    pub fn name(self) -> &'static str {
        match self {
            Self::UserInChat => "user_in_chat",
            Self::Chat => "chat",
            Self::GlobalUser => "global_user",
            Self::UserInTopic => "user_in_topic",
            Self::ChatTopic => "chat_topic",
        }
    }

    /// Derive the storage key for an identity tuple.
    pub fn apply(self, bot_id: i64, chat_id: i64, user_id: i64, thread_id: i64) -> StorageKey {
        match self {
            Self::UserInChat => StorageKey::new(bot_id, chat_id, user_id, 0),
            Self::Chat => StorageKey::new(bot_id, chat_id, chat_id, 0),
            Self::GlobalUser => StorageKey::new(bot_id, user_id, user_id, 0),
            Self::UserInTopic => StorageKey::new(bot_id, chat_id, user_id, thread_id),
            Self::ChatTopic => StorageKey::new(bot_id, chat_id, chat_id, thread_id),
        }
    }

    /// Derive the storage key for an event.
    ///
    /// Events without a chat (payment pre-checkout queries, for instance)
    /// use chat id 0.
    pub fn key_for<E: Event + ?Sized>(self, event: &E) -> StorageKey {
        self.apply(
            event.bot_id(),
            event.chat_id().unwrap_or(0),
            event.user_id(),
            event.thread_id(),
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
