//! Builder-style handler registration.
//!
//! ```ignore
//! manager.bind(
//!     HandlerConfig::new()
//!         .on("text")
//!         .on_states([State::from("ask_age")])
//!         .filter(|u: &Update| u.text.parse::<u8>().is_ok())
//!         .handle(AgeHandler),
//! )?;
//! ```

use super::{Endpoint, Event, EventFilter, Handler, HandlerEntry};
use crate::error::HandlerError;
use crate::state::{State, StateMatcher, StateSet};
use std::sync::Arc;

/// Description of one state-guarded handler.
pub struct HandlerConfig<E: Event> {
    endpoint: Option<Endpoint>,
    matcher: Option<Arc<dyn StateMatcher>>,
    filters: Vec<EventFilter<E>>,
    handler: Option<Arc<dyn Handler<E>>>,
}

impl<E: Event> HandlerConfig<E> {
    /// Empty configuration.
    pub fn new() -> Self {
        Self {
            endpoint: None,
            matcher: None,
            filters: Vec::new(),
            handler: None,
        }
    }

    /// Endpoint to register under.
    pub fn on(mut self, endpoint: impl Into<Endpoint>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Fire in any of `states`. An empty list means the default state, which
    /// is also what an unset matcher means.
    pub fn on_states(mut self, states: impl IntoIterator<Item = State>) -> Self {
        self.matcher = Some(Arc::new(StateSet::for_handler(states)));
        self
    }

    /// Guard with an arbitrary matcher.
    pub fn match_state(mut self, matcher: impl StateMatcher + 'static) -> Self {
        self.matcher = Some(Arc::new(matcher));
        self
    }

    /// Add an event predicate; every predicate must pass.
    pub fn filter(mut self, filter: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Handler to run.
    pub fn handle(mut self, handler: impl Handler<E> + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Validate and split into the endpoint and its registry entry.
    pub fn build(self) -> Result<(Endpoint, HandlerEntry<E>), HandlerError> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| HandlerError::Config("handler config has no endpoint".to_string()))?;
        let handler = self.handler.ok_or_else(|| {
            HandlerError::Config(format!("handler config for {endpoint} has no handler"))
        })?;
        let matcher = self
            .matcher
            .unwrap_or_else(|| Arc::new(StateSet::for_handler([State::DEFAULT])));

        Ok((
            endpoint,
            HandlerEntry::with_matcher(matcher, handler).with_filters(self.filters),
        ))
    }
}

impl<E: Event> Default for HandlerConfig<E> {
    fn default() -> Self {
        Self::new()
    }
}
