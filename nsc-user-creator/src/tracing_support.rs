//! Tracing and logging support.
//!
//! Diagnostics go to stderr so the tool stays silent on stdout. The default
//! filter is `warn`, which keeps a successful run quiet; `RUST_LOG` overrides
//! it (`RUST_LOG=nsc_user_creator=debug` shows the derived subject counts).

use std::str::FromStr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither a level nor `RUST_LOG` is given
pub const DEFAULT_FILTER: &str = "warn";

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Multi-line human-readable output.
    Pretty,

    /// Single-line output.
    #[default]
    Compact,

    /// JSON lines, for log collectors.
    Json,
}

impl FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown log format '{}' (expected 'pretty', 'compact' or 'json')",
                other
            )),
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter.
    ///
    /// If None, uses RUST_LOG environment variable or defaults to [`DEFAULT_FILTER`].
    pub level: Option<tracing::Level>,

    /// Output format.
    pub format: TracingFormat,

    /// Include timestamps in output.
    pub timestamps: bool,

    /// Include target module names in output.
    pub target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: TracingFormat::default(),
            timestamps: true,
            target: false,
        }
    }
}

impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        match self.level {
            Some(level) => EnvFilter::new(level.to_string()),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        }
    }
}

/// Initialize tracing subscriber with custom configuration.
///
/// # Example
///
/// ```ignore
/// use nsc_user_creator::tracing_support::{init_subscriber_with_config, TracingConfig, TracingFormat};
///
/// init_subscriber_with_config(TracingConfig {
///     format: TracingFormat::Json,
///     ..Default::default()
/// });
/// ```
pub fn init_subscriber_with_config(config: TracingConfig) {
    let filter = config.filter();
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.target);

    match (config.format, config.timestamps) {
        (TracingFormat::Pretty, true) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.pretty())
                .init();
        }
        (TracingFormat::Pretty, false) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.pretty().without_time())
                .init();
        }
        (TracingFormat::Compact, true) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.compact())
                .init();
        }
        (TracingFormat::Compact, false) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.compact().without_time())
                .init();
        }
        (TracingFormat::Json, true) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json())
                .init();
        }
        (TracingFormat::Json, false) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.json().without_time())
                .init();
        }
    }
}
