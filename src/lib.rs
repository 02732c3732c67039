//! Sakthi Gateway Library
//!
//! Reverse proxy fronting the Sakthi ideas API and the admin UI: one inbound
//! port, prefix-routed forwarding with path rewrites, CORS enforcement, and
//! WebSocket passthrough.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
