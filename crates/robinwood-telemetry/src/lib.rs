//! Tracing subscriber setup for robinwood binaries and tests.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "robinwood_engine" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Directive string handed to `EnvFilter` when RUST_LOG is unset.
    pub fn filter_directives(&self) -> String {
        let mut filter_str = self.log_level.to_string().to_lowercase();
        for (module, level) in &self.module_levels {
            filter_str.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
        }
        filter_str
    }
}

/// Parse a level name ("warn", "DEBUG", ...). Unknown names yield `None`.
pub fn parse_level(s: &str) -> Option<Level> {
    s.trim().parse().ok()
}

/// Stderr subscriber for startup work that runs before settings pick the real one.
///
/// Only warnings and errors pass, so problems found while loading settings are not lost.
pub fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish()
}

/// Initialize the global subscriber. Call once at startup; later calls are no-ops.
pub fn init_telemetry(config: &TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    if tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
        .is_err()
    {
        tracing::debug!("telemetry already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_passes_warnings_only() {
        tracing::subscriber::with_default(bootstrap_subscriber(), || {
            assert!(tracing::enabled!(Level::WARN));
            assert!(tracing::enabled!(Level::ERROR));
            assert!(!tracing::enabled!(Level::INFO));
        });
    }

    #[test]
    fn default_directives() {
        assert_eq!(TelemetryConfig::default().filter_directives(), "info");
    }

    #[test]
    fn module_overrides_appended() {
        let config = TelemetryConfig {
            log_level: Level::WARN,
            module_levels: vec![
                ("robinwood_engine".into(), Level::DEBUG),
                ("robinwood_store".into(), Level::TRACE),
            ],
            json: true,
        };
        assert_eq!(
            config.filter_directives(),
            "warn,robinwood_engine=debug,robinwood_store=trace"
        );
    }

    #[test]
    fn parse_level_names() {
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level(" WARN "), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_telemetry(&TelemetryConfig::default());
        init_telemetry(&TelemetryConfig::default());
    }
}
