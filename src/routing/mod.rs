//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query)
//!     → router.rs (ordered prefix scan, first match wins)
//!     → rule.rs (compose upstream target URL)
//!     → RouteDecision { rule, upstream, target, websocket }
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → resolve upstream bases, parse pinned targets
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same path always yields the same decision
//! - Total: no NoMatch case, stray paths belong to the admin upstream

pub mod router;
pub mod rule;

pub use router::{RouteDecision, Router};
pub use rule::{ForwardAction, UpstreamName};
