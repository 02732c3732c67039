//! TCP listener setup.
//!
//! # Responsibilities
//! - Bind the inbound port on all interfaces
//! - Distinguish an occupied port from other bind failures, so startup can
//!   print an actionable message before exiting

use std::net::SocketAddr;

use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Another process already holds the port.
    AddrInUse { port: u16, source: std::io::Error },
    /// Any other bind failure (permissions, bad interface state).
    Bind { port: u16, source: std::io::Error },
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::AddrInUse { port, .. } => {
                write!(f, "Port {} is already in use", port)
            }
            ListenerError::Bind { port, source } => {
                write!(f, "Failed to bind port {}: {}", port, source)
            }
        }
    }
}

impl std::error::Error for ListenerError {}

/// Bind `0.0.0.0:port`. Port 0 asks the OS for a free port, which tests use.
pub async fn bind_listener(port: u16) -> Result<TcpListener, ListenerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            return Err(ListenerError::AddrInUse { port, source: e })
        }
        Err(e) => return Err(ListenerError::Bind { port, source: e }),
    };

    let local_addr = listener.local_addr().map_err(|e| ListenerError::Bind { port, source: e })?;
    tracing::info!(address = %local_addr, "Listener bound");

    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_an_ephemeral_port() {
        let listener = bind_listener(0).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn occupied_port_is_reported_distinctly() {
        let first = bind_listener(0).await.unwrap();
        let port = first.local_addr().unwrap().port();

        let err = bind_listener(port).await.unwrap_err();
        assert!(matches!(err, ListenerError::AddrInUse { .. }));
        assert_eq!(err.to_string(), format!("Port {} is already in use", port));
    }
}
