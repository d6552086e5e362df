//! # chatfsm
//!
//! Per-conversation finite-state tracking for message-driven applications.
//!
//! Every inbound event carries an identity tuple (bot, chat, user, thread).
//! A [`Strategy`] collapses that tuple into a [`StorageKey`], a [`Storage`]
//! keeps one `(state, data)` record per key, and the [`Manager`] routes each
//! event to the first handler registered for its endpoint whose state
//! matcher accepts the session's current [`State`].
//!
//! ## Features
//!
//! - Five key aggregation policies (per user in chat, per chat, per user
//!   across chats, per user in topic, per topic)
//! - Concurrency-safe in-memory storage with typed data access
//! - Ordered, first-match-wins dispatch with a wildcard state
//! - Standalone state filters for handlers wired outside the registry
//! - TOML configuration and `tracing` integration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chatfsm::{Manager, MemoryStorage, State};
//! use std::sync::Arc;
//!
//! let manager: Manager<MyEvent> = Manager::new(Arc::new(MemoryStorage::new()));
//! manager.register("/start", [State::DEFAULT], StartHandler);
//! manager.register("text", [State::new("ask_name")], NameHandler);
//!
//! // inside the transport's update loop
//! manager.dispatch("text", &event).await?;
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod manager;
pub mod state;
pub mod storage;
pub mod strategy;
pub mod telemetry;

pub use self::config::{Config, FsmSettings, LoggingConfig};
pub use self::context::{Context, ContextExt, ContextFactory, StorageContext};
pub use self::error::{ConfigError, HandlerError, HandlerResult, StorageError};
pub use self::handlers::{
    DefaultFilterProcessor, Endpoint, Event, EventFilter, Handler, HandlerConfig, HandlerEntry,
    Registry, StateFilter, StateFilterProcessor,
};
pub use self::manager::{Manager, ManagerConfig};
pub use self::state::{State, StateFn, StateMatcher, StateSet};
pub use self::storage::{MemoryStorage, Storage, StorageExt};
pub use self::strategy::{StorageKey, Strategy};
