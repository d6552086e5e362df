//! Standalone state filter.
//!
//! [`StateFilter`] guards one handler with a state matcher outside of any
//! registry, for transports that bind one callback per endpoint themselves.
//! How the state is read and matched is delegated to a
//! [`StateFilterProcessor`], which the manager lets callers replace.

use super::{Event, Handler};
use crate::context::Context;
use crate::error::{HandlerResult, StorageError};
use crate::state::StateMatcher;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

/// Decides whether a filtered handler runs for the current session.
#[async_trait]
pub trait StateFilterProcessor: Send + Sync {
    /// Read state through `ctx` and check it against `matcher`.
    ///
    /// Returning an error aborts the event; returning `Ok(false)` drops it.
    async fn process(
        &self,
        ctx: &dyn Context,
        matcher: &dyn StateMatcher,
    ) -> Result<bool, StorageError>;
}

/// Reads state once and applies the matcher. Read failures are propagated.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFilterProcessor;

#[async_trait]
impl StateFilterProcessor for DefaultFilterProcessor {
    async fn process(
        &self,
        ctx: &dyn Context,
        matcher: &dyn StateMatcher,
    ) -> Result<bool, StorageError> {
        let state = ctx.state().await?;
        Ok(matcher.matches(&state))
    }
}

/// Handler wrapper that only forwards events whose session state matches.
pub struct StateFilter<E: Event> {
    matcher: Arc<dyn StateMatcher>,
    processor: Arc<dyn StateFilterProcessor>,
    inner: Arc<dyn Handler<E>>,
}

impl<E: Event> StateFilter<E> {
    /// Wrap `inner` so it only runs when `matcher` accepts the state.
    pub fn new(
        matcher: Arc<dyn StateMatcher>,
        processor: Arc<dyn StateFilterProcessor>,
        inner: Arc<dyn Handler<E>>,
    ) -> Self {
        Self {
            matcher,
            processor,
            inner,
        }
    }
}

#[async_trait]
impl<E: Event> Handler<E> for StateFilter<E> {
    async fn handle(&self, event: &E, ctx: &dyn Context) -> HandlerResult {
        if self.processor.process(ctx, self.matcher.as_ref()).await? {
            self.inner.handle(event, ctx).await
        } else {
            trace!(key = %ctx.key(), "State filter dropped event");
            Ok(())
        }
    }
}
