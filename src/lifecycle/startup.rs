//! Startup reporting.
//!
//! # Responsibilities
//! - Print the reachable base URLs once the listener is bound, so operators
//!   can copy-paste them into a device on the same network
//! - Summarize the forwarding table
//!
//! # Design Decisions
//! - Report goes to stdout, not the log: it is operator output, and it must
//!   show up regardless of the configured log filter
//! - Interface enumeration failures degrade to the localhost line only

use std::net::IpAddr;

use local_ip_address::list_afinet_netifas;

use crate::config::schema::RouteConfig;
use crate::config::GatewayConfig;
use crate::routing::UpstreamName;

/// Print the startup report for a successfully bound listener.
pub fn report_listening(port: u16, config: &GatewayConfig) {
    let interfaces = match list_afinet_netifas() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            tracing::warn!(error = %e, "could not enumerate network interfaces");
            Vec::new()
        }
    };

    for line in report_lines(port, config, &interfaces) {
        println!("{}", line);
    }
}

/// Assemble the report as lines. Pure so tests can feed fake interfaces.
pub fn report_lines(
    port: u16,
    config: &GatewayConfig,
    interfaces: &[(String, IpAddr)],
) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push("Gateway listening on:".to_string());
    lines.push(format!("  Local:    http://localhost:{}", port));
    for (_, ip) in interfaces {
        if let IpAddr::V4(v4) = ip {
            if !v4.is_loopback() {
                lines.push(format!("  Network:  http://{}:{}", v4, port));
            }
        }
    }

    lines.push("Forwarding:".to_string());
    for route in &config.routes {
        lines.push(format!(
            "  {} -> {}",
            route.path_prefix,
            route_target(route, config)
        ));
    }
    lines.push(format!(
        "  /* -> {}",
        config.upstreams.admin.base_url.trim_end_matches('/')
    ));

    lines
}

fn route_target(route: &RouteConfig, config: &GatewayConfig) -> String {
    if let Some(target) = &route.target_url {
        return target.clone();
    }

    let base = match route.upstream {
        UpstreamName::Api => &config.upstreams.api.base_url,
        UpstreamName::Admin => &config.upstreams.admin.base_url,
    };
    let base = base.trim_end_matches('/');

    match &route.rewrite_to {
        Some(to) => format!("{}{}", base, to),
        None => format!("{}{}", base, route.path_prefix),
    }
}
