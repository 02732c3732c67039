//! Compiled route rules.
//!
//! # Responsibilities
//! - Match request paths against a rule's prefix (case-sensitive)
//! - Compose the upstream target URL for a matched path
//! - Compile raw `RouteConfig` entries into ready-to-run rules
//!
//! # Design Decisions
//! - Plain `starts_with` prefix matching, no regex, O(n) in path length
//! - Target URLs are composed by string concatenation; bases are checked as
//!   URLs once at compile time so request-time composition cannot fail
//! - A rule forwards one of three ways: path untouched, leading prefix
//!   rewritten, or everything after the prefix appended to a pinned base

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::schema::{RouteConfig, UpstreamsConfig};
use crate::config::validation::ValidationError;

/// Which of the two upstreams a rule forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamName {
    Api,
    Admin,
}

impl std::fmt::Display for UpstreamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamName::Api => write!(f, "api"),
            UpstreamName::Admin => write!(f, "admin"),
        }
    }
}

/// How a matched rule maps the request path onto the upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardAction {
    /// Forward the path untouched.
    Passthrough,
    /// Replace the leading `from` prefix with `to`.
    RewritePrefix { from: String, to: String },
    /// Ignore the upstream base; append the remainder after the matched
    /// prefix to this pinned base URL verbatim.
    PinBase(String),
}

/// A route rule compiled against the upstream table.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    name: String,
    prefix: String,
    upstream: UpstreamName,
    action: ForwardAction,
    /// Upstream base, scheme and authority, no trailing slash.
    base: String,
}

impl CompiledRule {
    /// Compile a raw route entry. The base URLs involved are parsed here so
    /// request-time composition is infallible.
    pub fn compile(
        route: &RouteConfig,
        upstreams: &UpstreamsConfig,
    ) -> Result<Self, ValidationError> {
        let upstream_config = match route.upstream {
            UpstreamName::Api => &upstreams.api,
            UpstreamName::Admin => &upstreams.admin,
        };

        let base = checked_base(&upstream_config.base_url).map_err(|reason| {
            ValidationError::Upstream {
                name: route.upstream.to_string(),
                reason,
            }
        })?;

        let action = match (&route.target_url, &route.rewrite_from, &route.rewrite_to) {
            (Some(target), _, _) => {
                let pin = checked_base(target).map_err(|reason| ValidationError::Route {
                    name: route.name.clone(),
                    reason,
                })?;
                ForwardAction::PinBase(pin)
            }
            (None, Some(from), Some(to)) => ForwardAction::RewritePrefix {
                from: from.clone(),
                to: to.clone(),
            },
            (None, None, None) => ForwardAction::Passthrough,
            _ => {
                return Err(ValidationError::Route {
                    name: route.name.clone(),
                    reason: "rewrite_from and rewrite_to must be set together".to_string(),
                })
            }
        };

        Ok(Self {
            name: route.name.clone(),
            prefix: route.path_prefix.clone(),
            upstream: route.upstream,
            action,
            base,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn upstream(&self) -> UpstreamName {
        self.upstream
    }

    /// Whether this rule claims the path.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// Compose the full target URL (scheme, authority, path) for a path this
    /// rule matched. The query string is appended by the caller.
    pub fn target(&self, path: &str) -> String {
        match &self.action {
            ForwardAction::Passthrough => format!("{}{}", self.base, path),
            ForwardAction::RewritePrefix { from, to } => match path.strip_prefix(from.as_str()) {
                Some(rest) => format!("{}{}{}", self.base, to, rest),
                None => format!("{}{}", self.base, path),
            },
            ForwardAction::PinBase(pin) => match path.strip_prefix(self.prefix.as_str()) {
                Some(rest) => format!("{}{}", pin, rest),
                None => format!("{}{}", pin, path),
            },
        }
    }
}

/// Parse a base URL and normalize away any trailing slash so composed
/// targets never contain `//`.
fn checked_base(raw: &str) -> Result<String, String> {
    let url = Url::parse(raw).map_err(|e| format!("invalid URL '{}': {}", raw, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::default_routes;

    fn upstreams() -> UpstreamsConfig {
        UpstreamsConfig::default()
    }

    fn compile(route: &RouteConfig) -> CompiledRule {
        CompiledRule::compile(route, &upstreams()).unwrap()
    }

    #[test]
    fn passthrough_keeps_path_untouched() {
        let rule = compile(&default_routes()[0]);
        assert!(rule.matches("/api/admin/settings"));
        assert_eq!(
            rule.target("/api/admin/settings"),
            "http://localhost:5001/api/admin/settings"
        );
    }

    #[test]
    fn rewrite_replaces_leading_prefix_only() {
        let rule = compile(&default_routes()[2]);
        assert_eq!(rule.target("/api/users"), "http://localhost:3000/app/api/users");
        assert_eq!(rule.target("/api"), "http://localhost:3000/app/api");
    }

    #[test]
    fn pinned_base_appends_remainder_verbatim() {
        let rule = compile(&default_routes()[1]);
        assert_eq!(
            rule.target("/api/ideas"),
            "http://localhost:3000/app/api/ideas"
        );
        assert_eq!(
            rule.target("/api/ideas/123"),
            "http://localhost:3000/app/api/ideas/123"
        );
    }

    #[test]
    fn pinned_target_tolerates_paths_outside_its_prefix() {
        // `target` stays total even for a path `matches` never approved.
        let rule = compile(&default_routes()[1]);
        assert_eq!(rule.target("/x"), "http://localhost:3000/app/api/ideas/x");
    }

    #[test]
    fn prefix_match_is_case_sensitive_starts_with() {
        let rule = compile(&default_routes()[2]);
        assert!(rule.matches("/api"));
        assert!(rule.matches("/apix"));
        assert!(!rule.matches("/API"));
        assert!(!rule.matches("/v2/api"));
    }

    #[test]
    fn trailing_slash_on_base_is_normalized() {
        let mut ups = upstreams();
        ups.admin.base_url = "http://localhost:5001/".to_string();
        let rule = CompiledRule::compile(&default_routes()[0], &ups).unwrap();
        assert_eq!(rule.target("/x"), "http://localhost:5001/x");
    }

    #[test]
    fn compile_rejects_unparsable_pinned_target() {
        let mut route = default_routes()[1].clone();
        route.target_url = Some("not a url".to_string());
        let err = CompiledRule::compile(&route, &upstreams()).unwrap_err();
        assert!(matches!(err, ValidationError::Route { .. }));
    }
}
