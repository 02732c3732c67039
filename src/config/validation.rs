//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check upstream base URLs are plain scheme+authority endpoints
//! - Check route rules are internally consistent
//! - Check CORS allow-list entries are usable for literal matching
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use url::Url;

use crate::config::schema::{CorsConfig, GatewayConfig, RouteConfig, UpstreamConfig};

/// A single semantic problem found in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Upstream { name: String, reason: String },
    Route { name: String, reason: String },
    Cors { reason: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Upstream { name, reason } => {
                write!(f, "upstream '{}': {}", name, reason)
            }
            ValidationError::Route { name, reason } => {
                write!(f, "route '{}': {}", name, reason)
            }
            ValidationError::Cors { reason } => write!(f, "cors: {}", reason),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed config, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_upstream("api", &config.upstreams.api, &mut errors);
    check_upstream("admin", &config.upstreams.admin, &mut errors);

    for route in &config.routes {
        check_route(route, &mut errors);
    }

    check_cors(&config.cors, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_upstream(name: &str, upstream: &UpstreamConfig, errors: &mut Vec<ValidationError>) {
    let push = |errors: &mut Vec<ValidationError>, reason: String| {
        errors.push(ValidationError::Upstream {
            name: name.to_string(),
            reason,
        });
    };

    match Url::parse(&upstream.base_url) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                push(errors, format!("unsupported scheme '{}'", url.scheme()));
            }
            if url.host_str().is_none() {
                push(errors, "missing host".to_string());
            }
            // The route layer appends request paths to the base URL, so a
            // base carrying its own path would splice into targets twice.
            if !url.path().is_empty() && url.path() != "/" {
                push(
                    errors,
                    format!("base URL must not carry a path, got '{}'", url.path()),
                );
            }
        }
        Err(e) => push(errors, format!("invalid URL '{}': {}", upstream.base_url, e)),
    }
}

fn check_route(route: &RouteConfig, errors: &mut Vec<ValidationError>) {
    let push = |errors: &mut Vec<ValidationError>, reason: String| {
        errors.push(ValidationError::Route {
            name: route.name.clone(),
            reason,
        });
    };

    if route.name.is_empty() {
        errors.push(ValidationError::Route {
            name: "<unnamed>".to_string(),
            reason: "route name must not be empty".to_string(),
        });
    }

    if !route.path_prefix.starts_with('/') {
        push(
            errors,
            format!("path_prefix must start with '/', got '{}'", route.path_prefix),
        );
    }

    match (&route.rewrite_from, &route.rewrite_to) {
        (Some(from), Some(to)) => {
            if !from.starts_with('/') || !to.starts_with('/') {
                push(errors, "rewrite_from and rewrite_to must start with '/'".to_string());
            }
            if route.target_url.is_some() {
                push(
                    errors,
                    "a rule uses either a prefix rewrite or a pinned target_url, not both"
                        .to_string(),
                );
            }
        }
        (None, None) => {}
        _ => push(
            errors,
            "rewrite_from and rewrite_to must be set together".to_string(),
        ),
    }

    if let Some(target) = &route.target_url {
        match Url::parse(target) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    push(
                        errors,
                        format!("target_url has unsupported scheme '{}'", url.scheme()),
                    );
                }
                if url.host_str().is_none() {
                    push(errors, "target_url is missing a host".to_string());
                }
            }
            Err(e) => push(errors, format!("invalid target_url '{}': {}", target, e)),
        }
    }
}

fn check_cors(cors: &CorsConfig, errors: &mut Vec<ValidationError>) {
    for origin in &cors.allowed_origins {
        // Origins are matched byte for byte against the Origin header, so a
        // trailing slash or a path would never match a real browser value.
        if origin.ends_with('/') {
            errors.push(ValidationError::Cors {
                reason: format!("allowed origin '{}' must not end with '/'", origin),
            });
            continue;
        }
        match Url::parse(origin) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    errors.push(ValidationError::Cors {
                        reason: format!(
                            "allowed origin '{}' has unsupported scheme '{}'",
                            origin,
                            url.scheme()
                        ),
                    });
                }
            }
            Err(e) => errors.push(ValidationError::Cors {
                reason: format!("invalid allowed origin '{}': {}", origin, e),
            }),
        }
    }

    for suffix in &cors.allowed_origin_suffixes {
        if suffix.is_empty() || suffix.contains('/') || suffix.contains(':') {
            errors.push(ValidationError::Cors {
                reason: format!(
                    "origin suffix '{}' must be a bare domain (no scheme, port, or path)",
                    suffix
                ),
            });
        }
    }
}
