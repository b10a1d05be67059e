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
use serde_json::Value;
use tracing::info;

use eligate_core::CombinedReport;

use crate::api::invoke::parse_person;
use crate::api::{ApiError, AppState};

/// GET|POST /all - Token exchange, member search and eligibility submit in
/// one shot, reported side by side
pub async fn run_combined(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> Result<Json<CombinedReport>, ApiError> {
    let person = parse_person(body.map(|Json(value)| value))?;
    info!("combined run requested");
    Ok(Json(state.upstream.run_all(person).await))
}
