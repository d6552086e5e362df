//! Composition root.
//!
//! A [`Manager`] owns the storage, the key strategy, the context factory,
//! the filter processor, and the endpoint registry. It holds no session
//! state of its own, so several managers may share one storage.

use crate::config::FsmSettings;
use crate::context::{Context, ContextFactory, default_context_factory};
use crate::error::HandlerResult;
use crate::handlers::{
    DefaultFilterProcessor, Event, Handler, HandlerConfig, Registry, StateFilter,
    StateFilterProcessor,
};
use crate::state::{State, StateSet};
use crate::storage::Storage;
use crate::strategy::{StorageKey, Strategy};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Overridable parts of a [`Manager`]. `Default` fills every field.
#[derive(Clone)]
pub struct ManagerConfig {
    /// Key derivation policy.
    pub strategy: Strategy,
    /// Builds the per-event context.
    pub context_factory: ContextFactory,
    /// Decides state filter outcomes for [`Manager::for_states`].
    pub filter_processor: Arc<dyn StateFilterProcessor>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            context_factory: default_context_factory(),
            filter_processor: Arc::new(DefaultFilterProcessor),
        }
    }
}

impl ManagerConfig {
    /// Override the strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Override the context factory.
    pub fn with_context_factory(mut self, factory: ContextFactory) -> Self {
        self.context_factory = factory;
        self
    }

    /// Override the filter processor.
    pub fn with_filter_processor(mut self, processor: Arc<dyn StateFilterProcessor>) -> Self {
        self.filter_processor = processor;
        self
    }
}

impl From<&FsmSettings> for ManagerConfig {
    fn from(settings: &FsmSettings) -> Self {
        Self::default().with_strategy(settings.strategy)
    }
}

impl fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// Binds state-aware handlers to endpoints and dispatches events to them.
pub struct Manager<E: Event> {
    storage: Arc<dyn Storage>,
    strategy: Strategy,
    context_factory: ContextFactory,
    filter_processor: Arc<dyn StateFilterProcessor>,
    registry: Registry<E>,
}

impl<E: Event> Manager<E> {
    /// Create a manager with the default configuration.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_config(storage, ManagerConfig::default())
    }

    /// Create a manager with an explicit configuration.
    pub fn with_config(storage: Arc<dyn Storage>, config: ManagerConfig) -> Self {
        info!(strategy = %config.strategy, "Creating FSM manager");
        Self {
            storage,
            strategy: config.strategy,
            context_factory: config.context_factory,
            filter_processor: config.filter_processor,
            registry: Registry::new(),
        }
    }

    /// The shared storage.
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// The key strategy in use.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// The endpoint registry.
    pub fn registry(&self) -> &Registry<E> {
        &self.registry
    }

    /// Storage key of the session `event` belongs to.
    pub fn key_for(&self, event: &E) -> StorageKey {
        self.strategy.key_for(event)
    }

    /// Build the context for `event` through the configured factory.
    pub fn new_context(&self, event: &E) -> Box<dyn Context> {
        (self.context_factory)(Arc::clone(&self.storage), self.key_for(event))
    }

    /// Append a handler for `endpoint` firing in any of `states`; an empty
    /// list means the default state.
    pub fn register(
        &self,
        endpoint: impl Into<crate::Endpoint>,
        states: impl IntoIterator<Item = State>,
        handler: impl Handler<E> + 'static,
    ) {
        self.registry.register(endpoint, states, handler);
    }

    /// Register a handler described by a [`HandlerConfig`].
    pub fn bind(&self, config: HandlerConfig<E>) -> HandlerResult {
        let (endpoint, entry) = config.build()?;
        self.registry.insert(endpoint, entry);
        Ok(())
    }

    /// Wrap `handler` so it only runs in one of `states`, independent of
    /// the registry. An empty list means the default state.
    pub fn for_states(
        &self,
        states: impl IntoIterator<Item = State>,
        handler: impl Handler<E> + 'static,
    ) -> StateFilter<E> {
        StateFilter::new(
            Arc::new(StateSet::for_handler(states)),
            Arc::clone(&self.filter_processor),
            Arc::new(handler),
        )
    }

    /// Run `handler` for `event` with a fresh context, bypassing the registry.
    pub async fn run(&self, event: &E, handler: &dyn Handler<E>) -> HandlerResult {
        let ctx = self.new_context(event);
        handler.handle(event, ctx.as_ref()).await
    }

    /// Dispatch `event` to the first handler under `endpoint` accepting the
    /// session's current state. See [`Registry::dispatch`].
    pub async fn dispatch(&self, endpoint: &str, event: &E) -> HandlerResult {
        let ctx = self.new_context(event);
        self.registry.dispatch(endpoint, event, ctx.as_ref()).await
    }

    /// Dispatch counts per endpoint, most used first.
    pub fn endpoint_stats(&self) -> Vec<(crate::Endpoint, u64)> {
        self.registry.endpoint_stats()
    }
}

impl<E: Event> fmt::Debug for Manager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("strategy", &self.strategy)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextExt, StorageContext};
    use crate::error::{HandlerError, StorageError};
    use crate::handlers::testing::{Recorder, Update};
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MENU: State = State::from_static("menu");

    fn manager(strategy: Strategy) -> (Manager<Update>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let config = ManagerConfig::default().with_strategy(strategy);
        (Manager::with_config(storage.clone(), config), storage)
    }

    /// Moves the session to `menu`.
    struct OpenMenu;

    #[async_trait]
    impl Handler<Update> for OpenMenu {
        async fn handle(&self, _event: &Update, ctx: &dyn Context) -> HandlerResult {
            ctx.set_state(MENU).await?;
            Ok(())
        }
    }

    #[test]
    fn default_config_uses_user_in_chat() {
        let config = ManagerConfig::default();
        assert_eq!(config.strategy, Strategy::UserInChat);
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let manager: Manager<Update> = Manager::new(storage);
        assert_eq!(manager.strategy(), Strategy::UserInChat);
    }

    #[test]
    fn key_follows_strategy() {
        let (manager, _) = manager(Strategy::Chat);
        assert_eq!(
            manager.key_for(&Update::new(5, 1, "")),
            manager.key_for(&Update::new(5, 2, ""))
        );
        assert_eq!(manager.key_for(&Update::new(5, 1, "")), StorageKey::new(1, 5, 5, 0));
        assert_eq!(manager.new_context(&Update::new(5, 1, "")).key(), StorageKey::new(1, 5, 5, 0));
    }

    #[tokio::test]
    async fn dispatch_resolves_state_per_session() {
        let (manager, _) = manager(Strategy::UserInChat);
        let log = Arc::new(Mutex::new(Vec::new()));
        manager.register("/start", Vec::<State>::new(), OpenMenu);
        manager.register("/start", [MENU], Recorder::new("already in menu", &log));

        let alice = Update::new(5, 1, "/start");
        let bob = Update::new(5, 2, "/start");

        manager.dispatch("/start", &alice).await.expect("dispatch");
        assert_eq!(manager.new_context(&alice).state().await.expect("state"), MENU);
        assert_eq!(
            manager.new_context(&bob).state().await.expect("state"),
            State::DEFAULT
        );

        manager.dispatch("/start", &alice).await.expect("dispatch");
        assert_eq!(*log.lock(), vec!["already in menu"]);
    }

    #[tokio::test]
    async fn bind_registers_built_entries() {
        let (manager, _) = manager(Strategy::UserInChat);
        let log = Arc::new(Mutex::new(Vec::new()));
        manager
            .bind(
                HandlerConfig::new()
                    .on("text")
                    .on_states([State::ANY])
                    .filter(|u: &Update| u.text == "ping")
                    .handle(Recorder::new("pong", &log)),
            )
            .expect("bind");

        manager.dispatch("text", &Update::new(5, 1, "hello")).await.expect("dispatch");
        manager.dispatch("text", &Update::new(5, 1, "ping")).await.expect("dispatch");
        assert_eq!(*log.lock(), vec!["pong"]);

        let err = manager.bind(HandlerConfig::new().on("broken")).expect_err("no handler");
        assert!(matches!(err, HandlerError::Config(_)));
        assert_eq!(manager.registry().handler_count("broken"), 0);
    }

    #[tokio::test]
    async fn for_states_runs_outside_registry() {
        let (manager, _) = manager(Strategy::UserInChat);
        let log = Arc::new(Mutex::new(Vec::new()));
        let guarded = manager.for_states([MENU], Recorder::new("menu only", &log));
        let update = Update::new(5, 1, "hi");

        manager.run(&update, &guarded).await.expect("dropped");
        assert!(log.lock().is_empty());

        manager.run(&update, &OpenMenu).await.expect("open menu");
        manager.run(&update, &guarded).await.expect("forwarded");
        assert_eq!(*log.lock(), vec!["menu only"]);
    }

    #[tokio::test]
    async fn managers_share_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let first: Manager<Update> = Manager::new(storage.clone());
        let second: Manager<Update> = Manager::new(storage.clone());
        let log = Arc::new(Mutex::new(Vec::new()));
        first.register("/start", Vec::<State>::new(), OpenMenu);
        second.register("text", [MENU], Recorder::new("second", &log));

        let update = Update::new(5, 1, "hi");
        second.dispatch("text", &update).await.expect("dispatch");
        assert!(log.lock().is_empty());

        first.dispatch("/start", &update).await.expect("dispatch");
        second.dispatch("text", &update).await.expect("dispatch");
        assert_eq!(*log.lock(), vec!["second"]);
    }

    /// Context that counts state reads before delegating.
    struct CountingContext {
        inner: StorageContext,
        reads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Context for CountingContext {
        fn key(&self) -> StorageKey {
            self.inner.key()
        }
        async fn state(&self) -> Result<State, StorageError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.state().await
        }
        async fn set_state(&self, state: State) -> Result<(), StorageError> {
            self.inner.set_state(state).await
        }
        async fn reset_state(&self, with_data: bool) -> Result<(), StorageError> {
            self.inner.reset_state(with_data).await
        }
        async fn update_data(&self, field: &str, value: Option<Value>) -> Result<(), StorageError> {
            self.inner.update_data(field, value).await
        }
        async fn data_value(&self, field: &str) -> Result<Value, StorageError> {
            self.inner.data_value(field).await
        }
    }

    #[tokio::test]
    async fn custom_context_factory_is_used_for_dispatch() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let factory: ContextFactory = Arc::new(move |storage: Arc<dyn Storage>, key: StorageKey| -> Box<dyn Context> {
            Box::new(CountingContext {
                inner: StorageContext::new(storage, key),
                reads: Arc::clone(&counter),
            })
        });
        let manager: Manager<Update> = Manager::with_config(
            Arc::new(MemoryStorage::new()),
            ManagerConfig::default().with_context_factory(factory),
        );
        let log = Arc::new(Mutex::new(Vec::new()));
        manager.register("text", [State::ANY], Recorder::new("any", &log));

        manager.dispatch("text", &Update::new(5, 1, "hi")).await.expect("dispatch");
        manager.dispatch("text", &Update::new(5, 1, "hi")).await.expect("dispatch");
        assert_eq!(reads.load(Ordering::SeqCst), 2, "one state read per dispatch");
        assert_eq!(manager.endpoint_stats(), vec![(crate::Endpoint::from("text"), 2)]);
    }

    #[tokio::test]
    async fn handlers_read_and_write_data_through_context() {
        let (manager, storage) = manager(Strategy::GlobalUser);

        struct Remember;

        #[async_trait]
        impl Handler<Update> for Remember {
            async fn handle(&self, event: &Update, ctx: &dyn Context) -> HandlerResult {
                let mut seen: Vec<String> = ctx.data_opt("seen").await?.unwrap_or_default();
                seen.push(event.text.clone());
                ctx.set_data("seen", &seen).await?;
                Ok(())
            }
        }

        manager.register("text", [State::ANY], Remember);
        manager.dispatch("text", &Update::new(5, 9, "in chat 5")).await.expect("dispatch");
        manager.dispatch("text", &Update::new(7, 9, "in chat 7")).await.expect("dispatch");

        let key = manager.key_for(&Update::new(0, 9, ""));
        let seen: Vec<String> = crate::storage::StorageExt::data(storage.as_ref(), &key, "seen")
            .await
            .expect("data");
        assert_eq!(seen, vec!["in chat 5", "in chat 7"]);
    }
}
