//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the matching route for a request path
//! - Compose the upstream target URL, query string included
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan, first match wins (acceptable for a fixed table)
//! - Total: unmatched paths fall through to the admin upstream instead of
//!   producing a routing error, so the admin UI serves every stray path

use crate::config::schema::GatewayConfig;
use crate::config::validation::ValidationError;
use crate::routing::rule::{CompiledRule, UpstreamName};

/// Outcome of routing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    /// Name of the rule that matched ("default" for the admin fallback).
    pub rule: String,
    /// Which upstream the request goes to.
    pub upstream: UpstreamName,
    /// Full target URL: scheme, authority, rewritten path, original query.
    pub target: String,
    /// Whether WebSocket upgrades may be relayed to this upstream.
    pub websocket: bool,
}

/// Immutable routing table, shared via `Arc` across connections.
#[derive(Debug, Clone)]
pub struct Router {
    rules: Vec<CompiledRule>,
    admin_base: String,
    api_websocket: bool,
    admin_websocket: bool,
}

impl Router {
    /// Compile the config's route table. Base URLs are parsed here so
    /// `decide` never fails at request time.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, Vec<ValidationError>> {
        let mut rules = Vec::with_capacity(config.routes.len());
        let mut errors = Vec::new();

        for route in &config.routes {
            match CompiledRule::compile(route, &config.upstreams) {
                Ok(rule) => rules.push(rule),
                Err(e) => errors.push(e),
            }
        }

        let admin_base = config
            .upstreams
            .admin
            .base_url
            .trim_end_matches('/')
            .to_string();
        if url::Url::parse(&admin_base).is_err() {
            errors.push(ValidationError::Upstream {
                name: "admin".to_string(),
                reason: format!("invalid URL '{}'", admin_base),
            });
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            rules,
            admin_base,
            api_websocket: config.upstreams.api.supports_websocket,
            admin_websocket: config.upstreams.admin.supports_websocket,
        })
    }

    /// Route a request path. First matching rule wins; everything else goes
    /// to the admin upstream under the "default" rule.
    pub fn decide(&self, path: &str, query: Option<&str>) -> RouteDecision {
        for rule in &self.rules {
            if rule.matches(path) {
                return RouteDecision {
                    rule: rule.name().to_string(),
                    upstream: rule.upstream(),
                    target: with_query(rule.target(path), query),
                    websocket: self.websocket_for(rule.upstream()),
                };
            }
        }

        RouteDecision {
            rule: "default".to_string(),
            upstream: UpstreamName::Admin,
            target: with_query(format!("{}{}", self.admin_base, path), query),
            websocket: self.admin_websocket,
        }
    }

    fn websocket_for(&self, upstream: UpstreamName) -> bool {
        match upstream {
            UpstreamName::Api => self.api_websocket,
            UpstreamName::Admin => self.admin_websocket,
        }
    }
}

fn with_query(mut target: String, query: Option<&str>) -> String {
    if let Some(q) = query {
        target.push('?');
        target.push_str(q);
    }
    target
}
