//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! startup
//!     → listener.rs (bind 0.0.0.0:port, classify failures)
//!     → Hand the TcpListener to the HTTP layer
//! ```

pub mod listener;

pub use listener::{bind_listener, ListenerError};
