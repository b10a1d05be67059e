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

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::debug;

use crate::api::{AppState, ROUTES, TOOL_NAMES};
use crate::upstream::UpstreamHealth;

/// Service descriptor returned from the root route.
#[derive(Debug, Serialize)]
pub struct ServerStatus {
    pub service: String,
    pub version: String,
    pub tools: Vec<String>,
    pub routes: Vec<String>,
}

/// Health check response structure
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub upstream: UpstreamHealth,
}

/// GET / - Service descriptor with the available tools and routes
pub async fn index() -> Json<ServerStatus> {
    Json(ServerStatus {
        service: "eligate-gateway".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tools: TOOL_NAMES.iter().map(|name| name.to_string()).collect(),
        routes: ROUTES.iter().map(|route| route.to_string()).collect(),
    })
}

/// GET /health - Gateway liveness plus the upstream reachability flags
///
/// `status` is `ok` only when the startup probe reached all three partner
/// endpoints; the route itself always answers 200.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("health check requested");
    let upstream = *state.health.read().await;
    let status = if upstream.all_up() { "ok" } else { "degraded" };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        upstream,
    })
}
