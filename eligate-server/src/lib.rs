// Copyright 2025 Eligate Contributors (https://github.com/eligate)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

pub mod api;
pub mod config;
pub mod mcp;
pub mod upstream;

use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::GatewayConfig;
use mcp::McpServer;
use upstream::UpstreamClient;

/// Runs the HTTP gateway: tool routes and the MCP endpoint on one listener.
pub async fn run_server(config: GatewayConfig) -> Result<()> {
    init_tracing(false);

    tracing::info!("Starting Eligate Gateway");
    config.validate()?;
    let addr = config.socket_addr()?;
    tracing::info!(
        listen_addr = %config.server.listen_addr,
        token_url = %config.upstream.token_url,
        mcid_url = %config.upstream.mcid_url,
        medical_url = %config.upstream.medical_url,
        "Configuration loaded"
    );

    let state = build_state(&config)?;
    spawn_connectivity_probe(&state);

    let mcp_server = McpServer::new(state.clone());
    let app = api::router(state)
        .merge(mcp_server.router())
        .layer(if config.server.enable_cors {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            CorsLayer::new()
        })
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Gateway listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Runs the MCP stdio transport only. All logging goes to stderr so stdout
/// stays clean for JSON-RPC.
pub async fn run_stdio(config: GatewayConfig) -> Result<()> {
    init_tracing(true);

    tracing::info!("Starting Eligate Gateway on stdio");
    config.validate()?;

    let state = build_state(&config)?;
    spawn_connectivity_probe(&state);

    let server = McpServer::new(state);
    mcp::stdio::serve(server.handler()).await
}

fn build_state(config: &GatewayConfig) -> Result<AppState> {
    let upstream = UpstreamClient::new(config.upstream.clone())?;
    Ok(AppState::new(Arc::new(upstream)))
}

/// Fires the startup reachability probe without blocking the transports.
fn spawn_connectivity_probe(state: &AppState) {
    let upstream = state.upstream.clone();
    let health = state.health.clone();
    tokio::spawn(async move {
        let probed = upstream.probe_connectivity().await;
        *health.write().await = probed;
    });
}

fn init_tracing(to_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "eligate_server=info,tower_http=info".into());
    if to_stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
