//! Tracing subscriber setup for the `chatlink` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the host. Logs go to stderr so they never interleave with streamed
//! replies on stdout.
//!
//! ## Environment Variables
//!
//! - `CHATLINK_LOG` or `RUST_LOG`: filter directive (e.g. `chatlink=debug,warn`)
//! - `CHATLINK_LOG_FORMAT`: `pretty`, `compact` or `json`
//!
//! ```bash
//! CHATLINK_LOG=chatlink=trace CHATLINK_LOG_FORMAT=json chatlink -c demo
//! ```

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

pub const DEFAULT_FILTER: &str = "chatlink=info,warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, colored
    Pretty,
    /// One line per event
    #[default]
    Compact,
    /// JSON objects for log aggregation
    Json,
}

impl LogFormat {
    /// Case-insensitive parse. `None` for anything unrecognised.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
    /// Emit span open/close events
    pub with_spans: bool,
    /// Include file and line
    pub with_file: bool,
    pub with_thread_ids: bool,
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
            with_spans: false,
            with_file: false,
            with_thread_ids: false,
            with_target: true,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let filter = lookup("CHATLINK_LOG")
            .or_else(|| lookup("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let format = lookup("CHATLINK_LOG_FORMAT")
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or_default();
        Self {
            filter,
            format,
            ..Default::default()
        }
    }

    pub fn debug() -> Self {
        Self {
            filter: "chatlink=debug,info".to_string(),
            with_file: true,
            ..Default::default()
        }
    }

    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            with_spans: true,
            ..Default::default()
        }
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: LogConfig) {
    let env_filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let span_events = if config.with_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_file(config.with_file)
        .with_line_number(config.with_file)
        .with_thread_ids(config.with_thread_ids)
        .with_target(config.with_target);

    let registry = tracing_subscriber::registry().with(env_filter);
    let _ = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(registry.with(layer.json())),
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(registry.with(layer.compact()))
        }
        LogFormat::Pretty => tracing::subscriber::set_global_default(registry.with(layer.pretty())),
    };
}
