//! Sakthi Gateway
//!
//! Reverse proxy fronting the Sakthi ideas API and the admin UI, built with
//! Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────────┐
//!                      │                    GATEWAY                     │
//!                      │                                                │
//!     Client Request   │  ┌──────────┐   ┌──────────┐   ┌───────────┐   │
//!     ─────────────────┼─▶│   net    │──▶│   http   │──▶│  routing  │   │
//!                      │  │ listener │   │  server  │   │   table   │   │
//!                      │  └──────────┘   └────┬─────┘   └─────┬─────┘   │
//!                      │                      │               │         │
//!                      │              CORS middleware         ▼         │
//!                      │                      │        ┌───────────┐    │     API upstream
//!     Client Response  │  ┌──────────┐        └───────▶│  forward  │◀───┼───  localhost:3000
//!     ◀────────────────┼──│ response │◀────────────────│ /ws relay │    │     Admin upstream
//!                      │  │  stream  │                 └───────────┘    │     localhost:5001
//!                      │  └──────────┘                                  │
//!                      │                                                │
//!                      │  ┌──────────────────────────────────────────┐  │
//!                      │  │         Cross-Cutting Concerns           │  │
//!                      │  │   config    lifecycle    observability   │  │
//!                      │  └──────────────────────────────────────────┘  │
//!                      └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use sakthi_gateway::config::{effective_port, load_or_default};
use sakthi_gateway::http::HttpServer;
use sakthi_gateway::lifecycle::{report_listening, Shutdown};
use sakthi_gateway::net::bind_listener;
use sakthi_gateway::observability::init_logging;

#[derive(Parser)]
#[command(name = "sakthi-gateway")]
#[command(about = "Reverse proxy for the Sakthi ideas API and admin UI", long_about = None)]
struct Cli {
    /// TOML config file; built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Inbound port, overriding both PORT and the config file.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();

    tracing::info!("sakthi-gateway v0.1.0 starting");

    let mut config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration rejected");
            std::process::exit(1);
        }
    };
    let env_port = std::env::var("PORT").ok();
    config.listener.port = effective_port(cli.port, env_port.as_deref(), &config);

    tracing::info!(
        port = config.listener.port,
        api = %config.upstreams.api.base_url,
        admin = %config.upstreams.admin.base_url,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    let listener = match bind_listener(config.listener.port).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            std::process::exit(1);
        }
    };

    let server = match HttpServer::new(config.clone()) {
        Ok(server) => server,
        Err(errors) => {
            for error in &errors {
                tracing::error!(error = %error, "configuration rejected");
            }
            std::process::exit(1);
        }
    };

    report_listening(config.listener.port, &config);

    let shutdown = Shutdown::wired_to_signals();

    if let Err(e) = server.run(listener, shutdown.subscribe()).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
}
