//! Subscriber installation and span constructors.
//!
//! The library itself only emits events; host applications that have no
//! subscriber of their own can call [`init_tracing`] once at startup.

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber configured by `config`.
///
/// `RUST_LOG` overrides `config.filter` when set. Returns an error if the
/// chosen filter does not parse or a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(from_env.as_deref(), config)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install subscriber: {e}"))
    }
}

/// Pick the env directive when present and non-blank, else the configured one.
/// A malformed env directive is an error, not a fallback.
fn build_filter(from_env: Option<&str>, config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    match from_env.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| anyhow::anyhow!("invalid {} {directives:?}: {e}", EnvFilter::DEFAULT_ENV)),
        None => Ok(EnvFilter::try_new(&config.filter)?),
    }
}

/// Standardized span constructors.
pub mod spans {
    use crate::strategy::StorageKey;
    use tracing::{Level, Span, field, span};

    /// Span covering one dispatch. `state` is recorded once it has been read.
    pub fn dispatch(endpoint: &str, key: &StorageKey) -> Span {
        span!(
            Level::DEBUG,
            "fsm.dispatch",
            endpoint,
            bot = key.bot_id,
            chat = key.chat_id,
            user = key.user_id,
            thread = key.thread_id,
            state = field::Empty,
        )
    }
}
