//! State-aware handlers.
//!
//! This module contains the handler trait, the endpoint registry that picks
//! one handler per event, and the standalone state filter.
//!
//! ## Dispatch
//!
//! Several handlers may share one [`Endpoint`]. Each is guarded by a
//! [`StateMatcher`](crate::StateMatcher) and optional [`EventFilter`]s.
//! [`Registry::dispatch`] reads the session state once and runs the first
//! entry, in registration order, that accepts it. No match is not an error.

pub mod filter;
pub mod options;
pub mod registry;

pub use filter::{DefaultFilterProcessor, StateFilter, StateFilterProcessor};
pub use options::HandlerConfig;
pub use registry::{HandlerEntry, Registry};

use crate::context::Context;
use crate::error::HandlerResult;
use async_trait::async_trait;
use std::borrow::{Borrow, Cow};
use std::fmt;
use std::sync::Arc;

/// Identity fields of an inbound event, as exposed by the transport.
pub trait Event: Send + Sync {
    /// Id of the bot that received the event.
    fn bot_id(&self) -> i64;

    /// Chat the event belongs to, if any.
    fn chat_id(&self) -> Option<i64>;

    /// Sender of the event.
    fn user_id(&self) -> i64;

    /// Topic/thread inside the chat; 0 when the platform has none.
    fn thread_id(&self) -> i64 {
        0
    }
}

/// Routing identifier grouping handlers (a command, an event kind, a
/// callback's unique id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint(Cow<'static, str>);

impl Endpoint {
    /// Create an endpoint from a static or owned name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The raw endpoint name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Transport-internal endpoints start with a control character.
        match self.0.strip_prefix(['\u{7}', '\u{c}']) {
            Some(rest) => write!(f, "{:?}", rest),
            None => f.write_str(&self.0),
        }
    }
}

impl From<&'static str> for Endpoint {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for Endpoint {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl Borrow<str> for Endpoint {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Handles one event with access to its session.
///
/// # Example
///
/// ```ignore
/// pub struct AskAgeHandler;
///
/// #[async_trait]
/// impl Handler<Update> for AskAgeHandler {
///     async fn handle(&self, update: &Update, ctx: &dyn Context) -> HandlerResult {
///         ctx.set_data("name", update.text()).await?;
///         ctx.set_state(State::from("ask_age")).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<E: Event>: Send + Sync {
    /// Handle an incoming event.
    async fn handle(&self, event: &E, ctx: &dyn Context) -> HandlerResult;
}

#[async_trait]
impl<E: Event, H: Handler<E> + ?Sized> Handler<E> for Arc<H> {
    async fn handle(&self, event: &E, ctx: &dyn Context) -> HandlerResult {
        (**self).handle(event, ctx).await
    }
}

/// Extra predicate over the event itself, checked after the state matcher.
pub type EventFilter<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
