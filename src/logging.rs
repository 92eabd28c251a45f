//! Logging
//!
//! Installs a `tracing-subscriber` formatter writing to stderr. The filter
//! comes from `FATSTD_LOG`, then `[logging] level` in fatstd.toml, then
//! `warn`. Safe to call repeatedly and from a host that already installed
//! its own global subscriber.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "FATSTD_LOG";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize logging once per process.
pub fn init() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let directive = filter_directive();
        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_filter(filter),
        );

        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already installed, keeping it");
        }

        tracing::debug!(filter = %directive, version = crate::VERSION, "fatstd logging initialized");
    });
}

fn filter_directive() -> String {
    match std::env::var(LOG_ENV) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => config::global().logging.level.clone(),
    }
}
