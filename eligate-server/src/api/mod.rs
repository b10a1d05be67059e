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

//! HTTP surface of the gateway: the tool invocation route, the combined
//! runner and the status endpoints.

pub mod combined;
pub mod health;
pub mod invoke;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::upstream::{UpstreamClient, UpstreamHealth};

pub use invoke::{dispatch, TOOL_NAMES};

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::UnknownTool(name) => (
                StatusCode::NOT_FOUND,
                format!("Unknown tool: {name}. Available: {}", TOOL_NAMES.join(", ")),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    /// Written once by the startup connectivity probe, read by `/health`.
    pub health: Arc<RwLock<UpstreamHealth>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(upstream: Arc<UpstreamClient>) -> Self {
        AppState {
            upstream,
            health: Arc::new(RwLock::new(UpstreamHealth::default())),
            started_at: Instant::now(),
        }
    }
}

/// Route patterns advertised by the root descriptor.
pub const ROUTES: [&str; 13] = [
    "/",
    "/health",
    "/healthz",
    "/get_token",
    "/search_mcid",
    "/submit_medical",
    "/probe_medical_auth",
    "/debug_transforms",
    "/test_connection",
    "/tool/{tool_name}",
    "/all",
    "/mcp",
    "/mcp/health",
];

/// All gateway routes under one router. Every tool is reachable both under
/// its own path and through `/tool/{tool_name}`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health_check))
        .route("/healthz", get(health::health_check))
        .route("/get_token", get(invoke::get_token).post(invoke::get_token))
        .route("/search_mcid", post(invoke::search_mcid))
        .route("/submit_medical", post(invoke::submit_medical))
        .route("/probe_medical_auth", post(invoke::probe_medical_auth))
        .route("/debug_transforms", post(invoke::debug_transforms))
        .route("/test_connection", post(invoke::test_connection))
        .route("/tool/:tool_name", post(invoke::invoke_tool))
        .route(
            "/all",
            get(combined::run_combined).post(combined::run_combined),
        )
        .with_state(state)
}
