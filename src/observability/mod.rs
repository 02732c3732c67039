//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events with request IDs)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//! ```
//!
//! # Design Decisions
//! - Structured events over free-form lines, for machine parsing
//! - Request ID flows through all subsystems

pub mod logging;

pub use logging::init_logging;
