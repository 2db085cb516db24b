//! Tracing initialization

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

/// Transport internals are noisy at info; held to warn unless RUST_LOG
/// overrides the whole filter.
const QUIET_TARGETS: &[&str] = &["hyper", "reqwest", "tower_http"];

pub fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.level));

    let format_layer = match config.format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(format_layer)
        .init();

    tracing::info!(level = %config.level, format = ?config.format, "Logging initialized");
}

fn default_filter(level: &str) -> EnvFilter {
    let directives = QUIET_TARGETS
        .iter()
        .fold(level.to_string(), |directives, target| {
            format!("{},{}=warn", directives, target)
        });

    EnvFilter::new(directives)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_quiets_transport_targets() {
        let filter = default_filter("debug").to_string();

        assert!(filter.starts_with("debug"));
        for target in QUIET_TARGETS {
            assert!(filter.contains(&format!("{}=warn", target)));
        }
    }
}
