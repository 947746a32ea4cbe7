//! Structured logging.
//!
//! # Design Decisions
//! - `RUST_LOG` wins when set; the config level is the fallback
//! - Request IDs flow through spans added by the HTTP trace layer

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the tracing subscriber. Call once at startup.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("fleet_gateway={log_level},tower_http=warn"))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
