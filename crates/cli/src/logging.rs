use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_ENV: &str = "STAMPNAME_LOG";

/// Diagnostics go to stderr so stdout carries only audit lines.
pub fn init_logger() {
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| "warn".to_string());

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(EnvFilter::new(filter))
        .init();
}
