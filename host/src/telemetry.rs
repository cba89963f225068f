// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "cartlink_host=debug,cartlink=debug";

/// Initialize logging. Honors `RUST_LOG`; a second call only logs a warning.
pub fn init_telemetry() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.into()),
    );

    if tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_err()
    {
        tracing::warn!("Tracing subscriber already set. Telemetry re-initialized?");
    }
}
