//! Tracing subscriber setup

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Failure to install the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TracingInitError {
    #[error("Invalid log filter '{level}': {source}")]
    Filter {
        level: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Global subscriber already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the filter: a valid `RUST_LOG` wins, otherwise the configured level.
fn build_filter(env_directives: Option<&str>, level: &str) -> Result<EnvFilter, TracingInitError> {
    if let Some(filter) = env_directives.and_then(|d| EnvFilter::try_new(d).ok()) {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|source| TracingInitError::Filter {
        level: level.to_string(),
        source,
    })
}

/// Install the global tracing subscriber according to `config.format`.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TracingInitError> {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(env_directives.as_deref(), &config.level)?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format.as_str() {
        "pretty" => registry.with(fmt::layer().pretty()).try_init()?,
        "compact" => registry
            .with(fmt::layer().compact().with_target(true))
            .try_init()?,
        _ => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()?,
    }

    Ok(())
}
