//! Shared tracing/logging initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.filter` when set. With `config.json` the
/// subscriber emits structured JSON lines for log aggregation.
pub fn init_tracing(config: &LogConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.filter));
    let registry = tracing_subscriber::registry().with(env_filter);
    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}
