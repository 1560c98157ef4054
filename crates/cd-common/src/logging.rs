//! Structured Logging
//!
//! `LOG_FORMAT=json` selects one JSON object per line for log shipping;
//! anything else gives compact coloured text. `RUST_LOG` filters as usual
//! and defaults to `info`, e.g. `RUST_LOG=cd_notify=debug,tower_http=info`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("LOG_FORMAT").unwrap_or_default())
    }

    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(service_name: &str) {
    init_with_format(service_name, LogFormat::from_env());
}

pub fn init_with_format(service_name: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!(service = service_name, ?format, "Logging initialized");
    }
}
