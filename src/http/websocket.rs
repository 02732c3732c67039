//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Complete the upgrade handshake with the client
//! - Establish the WebSocket connection to the routed upstream
//! - Bidirectional frame forwarding
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Gateway ←──── WebSocket frames ────→ Upstream
//! ```
//!
//! # Design Decisions
//! - The upstream connection is dialed before the client upgrade completes,
//!   so a dead upstream still yields an ordinary HTTP 500 error response
//! - Frame-level forwarding (no message buffering)
//! - Close frames propagated in both directions
//! - Ping/pong forwarded transparently
//! - The upstream's negotiated subprotocol is echoed back to the client

use axum::body::Body;
use axum::extract::ws::{self, WebSocket, WebSocketUpgrade};
use axum::extract::FromRequestParts;
use axum::http::{header, HeaderMap, HeaderValue, Request};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::http::request::{append_forwarded_for, X_REQUEST_ID};
use crate::http::response::{proxy_error_response, ProxyErrorBody};
use crate::routing::RouteDecision;

/// End-to-end headers worth carrying into the upstream handshake. The
/// handshake mechanics (key, version, upgrade) are rebuilt by the client.
const CARRIED_HEADERS: [header::HeaderName; 3] = [
    header::AUTHORIZATION,
    header::COOKIE,
    header::SEC_WEBSOCKET_PROTOCOL,
];

/// Relay a WebSocket upgrade request to the upstream chosen by the router.
pub async fn proxy_upgrade(
    request: Request<Body>,
    decision: RouteDecision,
    request_id: String,
    peer: String,
) -> Response {
    let path = request.uri().path().to_string();
    let original_url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let (mut parts, _body) = request.into_parts();
    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let target = websocket_target(&decision.target);
    let mut upstream_request = match target.as_str().into_client_request() {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                target = %target,
                error = %e,
                "invalid WebSocket target"
            );
            return proxy_error_response(&ProxyErrorBody::new(
                e.to_string(),
                original_url,
                path,
            ));
        }
    };
    carry_headers(
        &parts.headers,
        upstream_request.headers_mut(),
        &request_id,
        &peer,
    );

    let (upstream, handshake_response) = match connect_async(upstream_request).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                target = %target,
                error = %e,
                "WebSocket upstream connect failed"
            );
            return proxy_error_response(&ProxyErrorBody::new(
                e.to_string(),
                original_url,
                path,
            ));
        }
    };

    let negotiated = handshake_response
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let upgrade = match negotiated {
        Some(protocol) => upgrade.protocols([protocol]),
        None => upgrade,
    };

    tracing::debug!(
        request_id = %request_id,
        rule = %decision.rule,
        target = %target,
        "WebSocket relay established"
    );

    upgrade.on_upgrade(move |client| relay(client, upstream, request_id))
}

/// Rewrite the routed HTTP target onto the WebSocket scheme.
fn websocket_target(target: &str) -> String {
    if let Some(rest) = target.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = target.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        target.to_string()
    }
}

fn carry_headers(inbound: &HeaderMap, outbound: &mut HeaderMap, request_id: &str, peer: &str) {
    for name in CARRIED_HEADERS {
        for value in inbound.get_all(&name) {
            outbound.append(name.clone(), value.clone());
        }
    }

    if let Some(chain) = inbound.get("x-forwarded-for") {
        outbound.insert("x-forwarded-for", chain.clone());
    }
    append_forwarded_for(outbound, peer);

    if let Ok(value) = HeaderValue::from_str(request_id) {
        outbound.insert(X_REQUEST_ID, value);
    }
}

/// Pump frames both ways until either side closes or fails.
async fn relay(
    client: WebSocket,
    upstream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    request_id: String,
) {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut upstream_tx, mut upstream_rx) = upstream.split();

    loop {
        tokio::select! {
            from_client = client_rx.next() => match from_client {
                Some(Ok(message)) => {
                    let closing = matches!(message, ws::Message::Close(_));
                    if upstream_tx.send(client_to_upstream(message)).await.is_err() {
                        break;
                    }
                    if closing {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::debug!(request_id = %request_id, error = %e, "client socket error");
                    break;
                }
                None => break,
            },
            from_upstream = upstream_rx.next() => match from_upstream {
                Some(Ok(message)) => {
                    let closing = matches!(message, protocol::Message::Close(_));
                    if let Some(forward) = upstream_to_client(message) {
                        if client_tx.send(forward).await.is_err() {
                            break;
                        }
                    }
                    if closing {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::debug!(request_id = %request_id, error = %e, "upstream socket error");
                    break;
                }
                None => break,
            },
        }
    }

    // Best effort: whichever side is still up gets a close frame.
    let _ = client_tx.close().await;
    let _ = upstream_tx.close().await;
    tracing::debug!(request_id = %request_id, "WebSocket relay closed");
}

fn client_to_upstream(message: ws::Message) -> protocol::Message {
    match message {
        ws::Message::Text(text) => protocol::Message::Text(text.as_str().into()),
        ws::Message::Binary(data) => protocol::Message::Binary(data),
        ws::Message::Ping(data) => protocol::Message::Ping(data),
        ws::Message::Pong(data) => protocol::Message::Pong(data),
        ws::Message::Close(frame) => {
            protocol::Message::Close(frame.map(|f| protocol::CloseFrame {
                code: f.code.into(),
                reason: f.reason.as_str().into(),
            }))
        }
    }
}

fn upstream_to_client(message: protocol::Message) -> Option<ws::Message> {
    match message {
        protocol::Message::Text(text) => Some(ws::Message::Text(text.as_str().into())),
        protocol::Message::Binary(data) => Some(ws::Message::Binary(data)),
        protocol::Message::Ping(data) => Some(ws::Message::Ping(data)),
        protocol::Message::Pong(data) => Some(ws::Message::Pong(data)),
        protocol::Message::Close(frame) => {
            Some(ws::Message::Close(frame.map(|f| ws::CloseFrame {
                code: f.code.into(),
                reason: f.reason.as_str().into(),
            })))
        }
        // Raw frames never surface from a message-level read.
        protocol::Message::Frame(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_scheme_is_rewritten_for_websockets() {
        assert_eq!(
            websocket_target("http://localhost:3000/app/api/live"),
            "ws://localhost:3000/app/api/live"
        );
        assert_eq!(
            websocket_target("https://backend.sakthi.app/feed"),
            "wss://backend.sakthi.app/feed"
        );
    }

    #[test]
    fn carried_headers_include_auth_and_correlation() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        inbound.insert(header::COOKIE, HeaderValue::from_static("session=abc"));
        inbound.insert(
            header::SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static("graphql-ws"),
        );
        inbound.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7"));

        let mut outbound = HeaderMap::new();
        carry_headers(&inbound, &mut outbound, "req-1", "10.0.0.9");

        assert_eq!(outbound.get(header::AUTHORIZATION).unwrap(), "Bearer t");
        assert_eq!(outbound.get(header::COOKIE).unwrap(), "session=abc");
        assert_eq!(
            outbound.get(header::SEC_WEBSOCKET_PROTOCOL).unwrap(),
            "graphql-ws"
        );
        assert_eq!(
            outbound.get("x-forwarded-for").unwrap(),
            "203.0.113.7, 10.0.0.9"
        );
        assert_eq!(outbound.get(X_REQUEST_ID).unwrap(), "req-1");
    }

    #[test]
    fn text_and_close_frames_translate_both_ways() {
        let text = client_to_upstream(ws::Message::Text("hello".into()));
        assert!(matches!(text, protocol::Message::Text(t) if t.as_str() == "hello"));

        let close = client_to_upstream(ws::Message::Close(Some(ws::CloseFrame {
            code: 1001,
            reason: "going away".into(),
        })));
        match close {
            protocol::Message::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), 1001);
                assert_eq!(frame.reason.as_str(), "going away");
            }
            other => panic!("expected close frame, got {:?}", other),
        }

        let back = upstream_to_client(protocol::Message::Close(Some(protocol::CloseFrame {
            code: 1000.into(),
            reason: "done".into(),
        })));
        match back {
            Some(ws::Message::Close(Some(frame))) => {
                assert_eq!(frame.code, 1000);
                assert_eq!(frame.reason.as_str(), "done");
            }
            other => panic!("expected close frame, got {:?}", other),
        }
    }

    #[test]
    fn raw_frames_are_not_forwarded() {
        let frame = protocol::Message::Frame(protocol::frame::Frame::pong(
            axum::body::Bytes::new(),
        ));
        assert!(upstream_to_client(frame).is_none());
    }
}
