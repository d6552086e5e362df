//! Session state labels and the matchers that guard handlers.
//!
//! A [`State`] is an opaque label. Two values are reserved:
//!
//! - [`State::DEFAULT`]: the empty label, meaning "no state set" or "freshly reset"
//! - [`State::ANY`]: the wildcard, accepted by every matcher during dispatch
//!
//! Matchers decide whether a handler is interested in the current state.
//! Registration with a list of states builds a [`StateSet`]; arbitrary
//! predicates go through [`StateFn`].

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

/// An opaque state label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(Cow<'static, str>);

impl State {
    /// No state set. Every unseen or reset session is in this state.
    pub const DEFAULT: State = State(Cow::Borrowed(""));

    /// Wildcard. Matches any current state, including [`State::DEFAULT`].
    pub const ANY: State = State(Cow::Borrowed("*"));

    /// Create a state from a static or owned label.
    pub fn new(label: impl Into<Cow<'static, str>>) -> Self {
        Self(label.into())
    }

    /// Create a state from a static label in const context.
    pub const fn from_static(label: &'static str) -> Self {
        Self(Cow::Borrowed(label))
    }

    /// The raw label.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the default (unset) state.
    #[inline]
    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether this is the wildcard.
    #[inline]
    pub fn is_any(&self) -> bool {
        *self == Self::ANY
    }
}

impl Default for State {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            f.write_str("<default>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&'static str> for State {
    fn from(label: &'static str) -> Self {
        Self(Cow::Borrowed(label))
    }
}

impl From<String> for State {
    fn from(label: String) -> Self {
        Self(Cow::Owned(label))
    }
}

impl AsRef<str> for State {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Returns true if `state` is one of `states`, or `states` holds the wildcard.
pub fn contains_state(state: &State, states: &[State]) -> bool {
    states.iter().any(|s| s == state || s.is_any())
}

/// Decides whether a handler accepts the session's current state.
pub trait StateMatcher: Send + Sync {
    /// Returns true if a handler guarded by this matcher should run.
    fn matches(&self, state: &State) -> bool;
}

impl StateMatcher for State {
    fn matches(&self, state: &State) -> bool {
        self.is_any() || self == state
    }
}

/// An unordered set of states a handler is interested in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSet {
    states: HashSet<State>,
}

impl StateSet {
    /// Create a set from the given states.
    pub fn new(states: impl IntoIterator<Item = State>) -> Self {
        Self {
            states: states.into_iter().collect(),
        }
    }

    /// Build the set used for handler registration.
    ///
    /// An empty list means the handler only fires when no state is set.
    pub fn for_handler(states: impl IntoIterator<Item = State>) -> Self {
        let mut set = Self::new(states);
        if set.states.is_empty() {
            set.states.insert(State::DEFAULT);
        }
        set
    }

    /// Membership test without wildcard expansion.
    #[inline]
    pub fn contains(&self, state: &State) -> bool {
        self.states.contains(state)
    }

    /// Number of distinct states in the set.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Iterate the states in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }
}

impl StateMatcher for StateSet {
    fn matches(&self, state: &State) -> bool {
        self.states.contains(state) || self.states.contains(&State::ANY)
    }
}

impl FromIterator<State> for StateSet {
    fn from_iter<I: IntoIterator<Item = State>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Matcher backed by an arbitrary predicate.
pub struct StateFn<F>(pub F);

impl<F> StateMatcher for StateFn<F>
where
    F: Fn(&State) -> bool + Send + Sync,
{
    fn matches(&self, state: &State) -> bool {
        (self.0)(state)
    }
}

impl<F> fmt::Debug for StateFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateFn").finish_non_exhaustive()
    }
}
