//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal (or absent) config file is valid.
//! The defaults reproduce the deployment contract: port 5000, the ideas API
//! on `http://localhost:3000`, the admin UI on `http://localhost:5001`.

use serde::{Deserialize, Serialize};

use crate::routing::rule::UpstreamName;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (inbound port).
    pub listener: ListenerConfig,

    /// The two fixed upstream targets.
    pub upstreams: UpstreamsConfig,

    /// Ordered route rules, evaluated first-match-wins. Paths that match no
    /// rule fall through to the admin upstream.
    pub routes: Vec<RouteConfig>,

    /// CORS policy applied to every response.
    pub cors: CorsConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Inbound port; the gateway binds all interfaces (`0.0.0.0`).
    /// Overridable with the `PORT` environment variable or `--port`.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self { port: 5000 }
    }
}

/// The two upstream targets the gateway forwards to.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamsConfig {
    /// Backend ideas API.
    pub api: UpstreamConfig,

    /// Admin UI server, also the catch-all default route.
    pub admin: UpstreamConfig,
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            api: UpstreamConfig {
                base_url: "http://localhost:3000".to_string(),
                supports_websocket: true,
            },
            admin: UpstreamConfig {
                base_url: "http://localhost:5001".to_string(),
                supports_websocket: true,
            },
        }
    }
}

/// A single upstream target.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL, scheme and authority only (e.g. "http://localhost:3000").
    pub base_url: String,

    /// Whether WebSocket upgrade requests are relayed to this target.
    #[serde(default = "default_supports_websocket")]
    pub supports_websocket: bool,
}

fn default_supports_websocket() -> bool {
    true
}

/// Route rule configuration.
///
/// `rewrite_from`/`rewrite_to` replace the leading path prefix before
/// forwarding; `target_url` instead pins the rule to an explicit base URL and
/// appends the path remainder after `path_prefix` verbatim. A rule uses at
/// most one of the two forms; with neither, the path is forwarded untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Rule identifier for logging.
    pub name: String,

    /// Path prefix to match (plain `starts_with`, checked in order).
    pub path_prefix: String,

    /// Upstream the rule forwards to.
    pub upstream: UpstreamName,

    /// Prefix to strip from the request path.
    #[serde(default)]
    pub rewrite_from: Option<String>,

    /// Replacement for the stripped prefix.
    #[serde(default)]
    pub rewrite_to: Option<String>,

    /// Explicit base URL overriding the upstream's own, path included.
    #[serde(default)]
    pub target_url: Option<String>,
}

/// The default routing table.
///
/// Specific rules come first so their decisions win over the generic `/api`
/// rewrite: `/api/admin` belongs to the admin server, `/api/ideas` is pinned
/// to its fully prefixed backend URL, and every other `/api` path has `/api`
/// rewritten to `/app/api`.
pub fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig {
            name: "admin-api".to_string(),
            path_prefix: "/api/admin".to_string(),
            upstream: UpstreamName::Admin,
            rewrite_from: None,
            rewrite_to: None,
            target_url: None,
        },
        RouteConfig {
            name: "ideas".to_string(),
            path_prefix: "/api/ideas".to_string(),
            upstream: UpstreamName::Api,
            rewrite_from: None,
            rewrite_to: None,
            target_url: Some("http://localhost:3000/app/api/ideas".to_string()),
        },
        RouteConfig {
            name: "api".to_string(),
            path_prefix: "/api".to_string(),
            upstream: UpstreamName::Api,
            rewrite_from: Some("/api".to_string()),
            rewrite_to: Some("/app/api".to_string()),
            target_url: None,
        },
    ]
}

/// CORS policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Literal origins allowed to make credentialed requests.
    pub allowed_origins: Vec<String>,

    /// Production domains allowed together with all their subdomains
    /// (host suffix match, no scheme).
    pub allowed_origin_suffixes: Vec<String>,

    /// Methods advertised in `Access-Control-Allow-Methods`.
    pub allowed_methods: Vec<String>,

    /// Headers advertised in `Access-Control-Allow-Headers`.
    pub allowed_headers: Vec<String>,

    /// Headers advertised in `Access-Control-Expose-Headers`.
    pub exposed_headers: Vec<String>,

    /// Whether `Access-Control-Allow-Credentials: true` is sent. Credentialed
    /// mode is why the allowed origin is echoed literally, never `*`.
    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds (`Access-Control-Max-Age`).
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                // Expo web dev server ports, the Android emulator's host
                // alias, and the workstation LAN address.
                "http://localhost:19006".to_string(),
                "http://localhost:19000".to_string(),
                "http://10.0.2.2:19006".to_string(),
                "http://10.0.2.2:19000".to_string(),
                "http://10.35.187.142:19006".to_string(),
            ],
            allowed_origin_suffixes: vec!["sakthi.app".to_string()],
            allowed_methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "PUT".to_string(),
                "DELETE".to_string(),
                "PATCH".to_string(),
                "OPTIONS".to_string(),
            ],
            allowed_headers: vec![
                "Content-Type".to_string(),
                "Authorization".to_string(),
                "X-Requested-With".to_string(),
                "Accept".to_string(),
            ],
            exposed_headers: vec![
                "Content-Length".to_string(),
                "X-Foo".to_string(),
                "X-Bar".to_string(),
            ],
            allow_credentials: true,
            max_age_seconds: 86_400,
        }
    }
}

impl GatewayConfig {
    /// Default config with the default route table filled in.
    ///
    /// `Default::default` leaves `routes` empty (serde's vector default);
    /// this is the constructor the binary and tests start from.
    pub fn standard() -> Self {
        Self {
            routes: default_routes(),
            ..Self::default()
        }
    }
}
