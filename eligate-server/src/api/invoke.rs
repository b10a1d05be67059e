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

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use eligate_core::{CallEnvelope, PersonRecord};

use crate::api::{ApiError, AppState};

/// Names accepted by `POST /tool/{tool_name}` and `tools/call`.
pub const TOOL_NAMES: [&str; 7] = [
    "get_token",
    "mcid_search",
    "submit_medical",
    "probe_medical_auth",
    "all",
    "debug_transforms",
    "test_connection",
];

/// POST /tool/{tool_name} - Invoke one gateway tool by name
///
/// An absent or non-JSON body runs the tool against the built-in sample
/// record; a JSON body that is not a valid person record is a 400.
pub async fn invoke_tool(
    State(state): State<AppState>,
    Path(tool_name): Path<String>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    info!(tool = %tool_name, "tool invocation");
    let result = dispatch(&state, &tool_name, body.map(|Json(value)| value)).await?;
    Ok(Json(result))
}

/// GET|POST /get_token - Fetch the OAuth2 token
pub async fn get_token(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(dispatch(&state, "get_token", None).await?))
}

/// POST /search_mcid - Run the member search
pub async fn search_mcid(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(dispatch(&state, "mcid_search", body.map(|Json(value)| value)).await?))
}

/// POST /submit_medical - Submit the eligibility request
pub async fn submit_medical(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        dispatch(&state, "submit_medical", body.map(|Json(value)| value)).await?,
    ))
}

/// POST /probe_medical_auth - Sweep the authorization schemes
pub async fn probe_medical_auth(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        dispatch(&state, "probe_medical_auth", body.map(|Json(value)| value)).await?,
    ))
}

/// POST /debug_transforms - Render both request transforms without calling out
pub async fn debug_transforms(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        dispatch(&state, "debug_transforms", body.map(|Json(value)| value)).await?,
    ))
}

/// POST /test_connection - Report upstream reachability
pub async fn test_connection(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(dispatch(&state, "test_connection", None).await?))
}

/// Routes a tool name to its upstream call. Shared between the HTTP
/// invocation route and the MCP `tools/call` handler.
pub async fn dispatch(
    state: &AppState,
    tool: &str,
    args: Option<Value>,
) -> Result<Value, ApiError> {
    match tool {
        "get_token" => to_json(&CallEnvelope::from_result(
            state.upstream.token_exchange().await,
        )),
        "mcid_search" => {
            let person = parse_person(args)?;
            to_json(&CallEnvelope::from_result(
                state.upstream.search_mcid(person).await,
            ))
        }
        "submit_medical" => {
            let person = parse_person(args)?;
            to_json(&CallEnvelope::from_result(
                state.upstream.submit_medical(person).await,
            ))
        }
        "probe_medical_auth" => {
            let person = parse_person(args)?;
            match state.upstream.probe_medical_auth(person).await {
                Ok(report) => to_json(&report),
                Err(error) => to_json(&CallEnvelope::from_error(error)),
            }
        }
        "all" => {
            let person = parse_person(args)?;
            to_json(&state.upstream.run_all(person).await)
        }
        "debug_transforms" => {
            let person = parse_person(args)?;
            to_json(&state.upstream.render_transforms(person))
        }
        "test_connection" => to_json(&state.upstream.test_connection().await),
        unknown => Err(ApiError::UnknownTool(unknown.to_string())),
    }
}

/// Absent, null or empty-object arguments select the sample record; anything
/// else must deserialize as a person record.
pub(crate) fn parse_person(args: Option<Value>) -> Result<PersonRecord, ApiError> {
    match args {
        None | Some(Value::Null) => Ok(PersonRecord::sample()),
        Some(Value::Object(map)) if map.is_empty() => Ok(PersonRecord::sample()),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| ApiError::BadRequest(format!("invalid person record: {e}"))),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}
