//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay upstream response bodies without buffering
//! - Report upstream failures as a structured JSON error
//! - Log mid-stream body failures that occur after headers are committed
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the entire body
//! - Every forwarding failure maps to one JSON shape and status 500, so
//!   clients distinguish gateway failures from upstream application errors
//! - A body error after the status line is sent can only be logged; the
//!   connection is aborted mid-stream

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use hyper::body::{Frame, Incoming, SizeHint};
use serde::Serialize;

/// JSON body returned when forwarding to an upstream fails.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyErrorBody {
    pub success: bool,
    pub message: String,
    pub details: String,
    pub original_url: String,
    pub path: String,
}

impl ProxyErrorBody {
    pub fn new(details: impl Into<String>, original_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            success: false,
            message: "Proxy error".to_string(),
            details: details.into(),
            original_url: original_url.into(),
            path: path.into(),
        }
    }
}

/// Build the 500 response for a failed forward.
pub fn proxy_error_response(body: &ProxyErrorBody) -> Response {
    let payload = serde_json::to_string(body).unwrap_or_else(|_| {
        // Serialization of a plain struct of strings cannot realistically
        // fail; keep the contract of always returning JSON anyway.
        "{\"success\":false,\"message\":\"Proxy error\"}".to_string()
    });

    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, payload).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Streams an upstream body through to the client, logging an error the
/// moment the upstream fails mid-transfer.
pub struct RelayBody {
    inner: Pin<Box<Incoming>>,
    request_id: String,
    failed: bool,
}

impl RelayBody {
    pub fn new(inner: Incoming, request_id: String) -> Self {
        Self {
            inner: Box::pin(inner),
            request_id,
            failed: false,
        }
    }
}

impl hyper::body::Body for RelayBody {
    type Data = Bytes;
    type Error = hyper::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match this.inner.as_mut().poll_frame(cx) {
            Poll::Ready(Some(Err(e))) => {
                if !this.failed {
                    this.failed = true;
                    tracing::error!(
                        request_id = %this.request_id,
                        error = %e,
                        "upstream body failed after headers were sent"
                    );
                }
                Poll::Ready(Some(Err(e)))
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Wrap an upstream response body for relaying.
pub fn relay_body(inner: Incoming, request_id: String) -> Body {
    Body::new(RelayBody::new(inner, request_id))
}
