use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

/// Output format of the log stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn for_config(config: &AppConfig) -> Self {
        if config.is_production() {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Build the filter: `RUST_LOG` wins, otherwise the configured level for this
/// crate with HTTP and SQL noise capped.
pub fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},physique_coach={level},tower_http=info,sqlx=warn"
        ))
    })
}

/// Install the global subscriber. Call once from `main`.
pub fn init_tracing(config: &AppConfig) {
    let registry = tracing_subscriber::registry().with(build_env_filter(&config.log_level));

    match LogFormat::for_config(config) {
        LogFormat::Json => registry
            .with(fmt::layer().with_target(true).json())
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).init(),
    }
}
