//! CORS policy middleware.
//!
//! # Responsibilities
//! - Decide whether a browser origin may use the gateway
//! - Answer preflight OPTIONS requests at the gateway, never upstream
//! - Stamp policy headers on every response that had an Origin
//!
//! # Design Decisions
//! - Requests without an Origin header (curl, native apps, server-to-server)
//!   bypass the policy entirely and get no CORS headers
//! - Disallowed origins are rejected with 403 before any forwarding happens
//! - The allowed origin is echoed literally, never `*`, because responses
//!   carry Access-Control-Allow-Credentials
//! - Production domains match by host suffix on segment boundaries, so
//!   `app.sakthi.app` is in and `evilsakthi.app` stays out

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::config::validation::ValidationError;
use crate::config::CorsConfig;
use crate::http::request::RequestIdExt;
use crate::http::server::AppState;

/// Compiled CORS policy, immutable and shared across connections.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    allowed_suffixes: Vec<String>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    expose_headers: Option<HeaderValue>,
    allow_credentials: bool,
    max_age: HeaderValue,
}

impl CorsPolicy {
    /// Precompute the header values once; the lists never change at runtime.
    pub fn from_config(config: &CorsConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            allowed_origins: config.allowed_origins.clone(),
            allowed_suffixes: config.allowed_origin_suffixes.clone(),
            allow_methods: joined_value(&config.allowed_methods, "allowed_methods")?,
            allow_headers: joined_value(&config.allowed_headers, "allowed_headers")?,
            expose_headers: if config.exposed_headers.is_empty() {
                None
            } else {
                Some(joined_value(&config.exposed_headers, "exposed_headers")?)
            },
            allow_credentials: config.allow_credentials,
            max_age: HeaderValue::from_str(&config.max_age_seconds.to_string()).map_err(|e| {
                ValidationError::Cors {
                    reason: format!("max_age_seconds: {}", e),
                }
            })?,
        })
    }

    /// Whether the given Origin header value may use the gateway.
    pub fn origin_allowed(&self, origin: &str) -> bool {
        if self.allowed_origins.iter().any(|o| o == origin) {
            return true;
        }

        let host = match Url::parse(origin).ok().and_then(|u| u.host_str().map(str::to_string)) {
            Some(host) => host,
            None => return false,
        };

        self.allowed_suffixes
            .iter()
            .any(|suffix| host == *suffix || host.ends_with(&format!(".{}", suffix)))
    }

    /// Add the policy headers to a response that will reach a browser.
    /// Every allowed response carries the method and header lists, not only
    /// preflight answers.
    pub fn stamp(&self, headers: &mut HeaderMap, origin: &HeaderValue) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        if self.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        if let Some(expose) = &self.expose_headers {
            headers.insert(header::ACCESS_CONTROL_EXPOSE_HEADERS, expose.clone());
        }
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }

    /// Build the preflight answer. Preflights terminate here; upstreams
    /// never see an OPTIONS that a browser sent to probe the policy.
    pub fn preflight_response(&self, origin: Option<&HeaderValue>) -> Response {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());

        match origin {
            Some(origin) => self.stamp(headers, origin),
            None => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
                headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
                headers.append(header::VARY, HeaderValue::from_static("Origin"));
            }
        }

        response
    }
}

fn joined_value(list: &[String], field: &str) -> Result<HeaderValue, ValidationError> {
    HeaderValue::from_str(&list.join(", ")).map_err(|e| ValidationError::Cors {
        reason: format!("{}: {}", field, e),
    })
}

/// Gate every request on the CORS policy before routing happens.
pub async fn cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let policy = state.cors.clone();
    let is_preflight = req.method() == Method::OPTIONS;

    let origin = match req.headers().get(header::ORIGIN).cloned() {
        Some(origin) => origin,
        None => {
            if is_preflight {
                return policy.preflight_response(None);
            }
            return next.run(req).await;
        }
    };

    let allowed = origin
        .to_str()
        .map(|o| policy.origin_allowed(o))
        .unwrap_or(false);

    if !allowed {
        tracing::warn!(
            request_id = %req.request_id(),
            origin = ?origin,
            path = %req.uri().path(),
            "request rejected by CORS policy"
        );
        let mut response = (StatusCode::FORBIDDEN, "Not allowed by CORS").into_response();
        response
            .headers_mut()
            .append(header::VARY, HeaderValue::from_static("Origin"));
        return response;
    }

    if is_preflight {
        return policy.preflight_response(Some(&origin));
    }

    let mut response = next.run(req).await;
    policy.stamp(response.headers_mut(), &origin);
    response
}
