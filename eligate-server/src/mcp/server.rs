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

//! MCP over HTTP
//!
//! Serves the JSON-RPC surface at POST /mcp, mergeable into the main router.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::api::AppState;
use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};

/// MCP Server
pub struct McpServer {
    handler: Arc<McpHandler>,
}

impl McpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            handler: Arc::new(McpHandler::new(state)),
        }
    }

    /// The handler, for transports that bypass HTTP.
    pub fn handler(&self) -> Arc<McpHandler> {
        self.handler.clone()
    }

    /// Get the Axum router for the MCP server
    pub fn router(&self) -> Router {
        Router::new()
            .route("/mcp", post(handle_mcp_request))
            .route("/mcp/health", get(handle_mcp_health))
            .with_state(self.handler.clone())
    }
}

/// Handle MCP JSON-RPC request over HTTP POST
async fn handle_mcp_request(
    State(handler): State<Arc<McpHandler>>,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    Json(handler.handle_request(request).await)
}

/// Handle MCP health check (GET /mcp/health)
async fn handle_mcp_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "protocol_version": MCP_PROTOCOL_VERSION,
        "server_name": "eligate-gateway",
        "server_version": env!("CARGO_PKG_VERSION"),
        "capabilities": {
            "tools": true,
            "prompts": true
        }
    }))
}
