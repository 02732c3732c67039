//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Keep gateway and tower-http events visible by default
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log filter configurable via RUST_LOG
//! - Request IDs travel as event fields, correlating the inbound request
//!   with its upstream leg

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber. Call once, before any traffic.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sakthi_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
