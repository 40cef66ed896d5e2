//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with a fmt layer that records file,
//! line, level and span-close events, filtered at the configured level.

use std::str::FromStr;

use tracing_subscriber::{
    Layer, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

pub use tracing::level_filters::LevelFilter;

/// Parses a level name (`trace` … `error`, `off`), falling back to `INFO`.
pub fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level.trim()).unwrap_or(LevelFilter::INFO)
}

/// Initializes the global tracing subscriber. Calling it twice is a no-op.
pub fn init_tracing(level: LevelFilter) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_file(true)
                .with_line_number(true)
                .with_level(true)
                .with_filter(level),
        )
        .try_init();
}
