//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → middleware/cors.rs (origin check, preflight, header stamping)
//!     → [routing layer decides upstream]
//!     → server.rs::forward (HTTP) or websocket.rs (upgrade relay)
//!     → response.rs (stream upstream body, error JSON on failure)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::HttpServer;
