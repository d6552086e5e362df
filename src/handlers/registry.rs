//! Endpoint registry and dispatch.
//!
//! The `Registry` keeps an ordered list of state-guarded entries per
//! endpoint and counts dispatches per endpoint.

use super::{Endpoint, Event, EventFilter, Handler};
use crate::context::Context;
use crate::error::{HandlerError, HandlerResult};
use crate::state::{State, StateMatcher, StateSet};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Instrument, debug, field, warn};

/// One state-guarded handler under an endpoint.
pub struct HandlerEntry<E: Event> {
    matcher: Arc<dyn StateMatcher>,
    filters: Vec<EventFilter<E>>,
    handler: Arc<dyn Handler<E>>,
}

impl<E: Event> HandlerEntry<E> {
    /// Entry firing in any of `states`; an empty list means the default state.
    pub fn new(
        states: impl IntoIterator<Item = State>,
        handler: impl Handler<E> + 'static,
    ) -> Self {
        Self::with_matcher(Arc::new(StateSet::for_handler(states)), Arc::new(handler))
    }

    /// Entry guarded by an arbitrary matcher.
    pub fn with_matcher(matcher: Arc<dyn StateMatcher>, handler: Arc<dyn Handler<E>>) -> Self {
        Self {
            matcher,
            filters: Vec::new(),
            handler,
        }
    }

    /// Add an event filter. All filters must pass for the entry to match.
    pub fn with_filter(mut self, filter: EventFilter<E>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add several event filters.
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = EventFilter<E>>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Whether this entry should handle `event` while the session is in `state`.
    pub fn accepts(&self, state: &State, event: &E) -> bool {
        self.matcher.matches(state) && self.filters.iter().all(|f| f(event))
    }

    /// The guarded handler.
    pub fn handler(&self) -> &Arc<dyn Handler<E>> {
        &self.handler
    }
}

impl<E: Event> fmt::Debug for HandlerEntry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("filters", &self.filters.len())
            .finish_non_exhaustive()
    }
}

struct EndpointSlot<E: Event> {
    entries: Vec<HandlerEntry<E>>,
    /// Dispatches that reached this endpoint, matched or not.
    dispatched: AtomicU64,
}

/// Registry of state-guarded handlers, grouped by endpoint.
///
/// Written mostly during setup and read during dispatch; late registration
/// is allowed.
pub struct Registry<E: Event> {
    endpoints: RwLock<HashMap<Endpoint, EndpointSlot<E>>>,
}

impl<E: Event> Registry<E> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Append a handler for `endpoint` that fires in any of `states`.
    ///
    /// An empty `states` list means the handler only fires when no state is
    /// set. Passing [`State::ANY`] registers a catch-all.
    pub fn register(
        &self,
        endpoint: impl Into<Endpoint>,
        states: impl IntoIterator<Item = State>,
        handler: impl Handler<E> + 'static,
    ) {
        self.insert(endpoint, HandlerEntry::new(states, handler));
    }

    /// Append a prepared entry for `endpoint`.
    pub fn insert(&self, endpoint: impl Into<Endpoint>, entry: HandlerEntry<E>) {
        let endpoint = endpoint.into();
        debug!(%endpoint, "Registering handler");
        self.endpoints
            .write()
            .entry(endpoint)
            .or_insert_with(|| EndpointSlot {
                entries: Vec::new(),
                dispatched: AtomicU64::new(0),
            })
            .entries
            .push(entry);
    }

    /// Number of entries registered under `endpoint`.
    pub fn handler_count(&self, endpoint: &str) -> usize {
        self.endpoints
            .read()
            .get(endpoint)
            .map_or(0, |slot| slot.entries.len())
    }

    /// Registered endpoints, sorted.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let mut endpoints: Vec<_> = self.endpoints.read().keys().cloned().collect();
        endpoints.sort();
        endpoints
    }

    /// Dispatch counts per endpoint, most used first. Unused endpoints are omitted.
    pub fn endpoint_stats(&self) -> Vec<(Endpoint, u64)> {
        let mut stats: Vec<_> = self
            .endpoints
            .read()
            .iter()
            .map(|(endpoint, slot)| (endpoint.clone(), slot.dispatched.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();

        stats.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        stats
    }

    /// Dispatch `event` to the first entry under `endpoint` accepting the
    /// session's current state.
    ///
    /// A failed state read is returned as [`HandlerError::State`]. The
    /// selected handler's result is returned unchanged. When the endpoint is
    /// unknown or no entry matches, nothing runs and `Ok(())` is returned.
    pub async fn dispatch(&self, endpoint: &str, event: &E, ctx: &dyn Context) -> HandlerResult {
        {
            let endpoints = self.endpoints.read();
            let Some(slot) = endpoints.get(endpoint) else {
                debug!(endpoint, "No handlers registered for endpoint");
                return Ok(());
            };
            slot.dispatched.fetch_add(1, Ordering::Relaxed);
        }

        let dispatch_span = crate::telemetry::spans::dispatch(endpoint, &ctx.key());

        async {
            let state = match ctx.state().await {
                Ok(state) => state,
                Err(source) => {
                    warn!(error = %source, "Failed to read state before dispatch");
                    return Err(HandlerError::State {
                        endpoint: Endpoint::from(endpoint.to_string()),
                        source,
                    });
                }
            };
            tracing::Span::current().record("state", field::display(&state));

            // Clone the handler out so no lock is held while it runs.
            let handler = self.endpoints.read().get(endpoint).and_then(|slot| {
                slot.entries
                    .iter()
                    .find(|entry| entry.accepts(&state, event))
                    .map(|entry| Arc::clone(&entry.handler))
            });

            let Some(handler) = handler else {
                debug!("No handler accepts current state");
                return Ok(());
            };

            let result = handler.handle(event, ctx).await;
            if let Err(ref e) = result {
                debug!(error = %e, code = e.error_code(), "Handler error");
            }
            result
        }
        .instrument(dispatch_span)
        .await
    }
}

impl<E: Event> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for Registry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("endpoints", &self.endpoints())
            .finish()
    }
}
