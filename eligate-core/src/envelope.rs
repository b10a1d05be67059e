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

//! Response envelopes and the outbound error taxonomy.
//!
//! The gateway itself always answers HTTP 200; the real upstream status rides
//! inside a [`CallEnvelope`]. Callers must check the explicit `success` flag —
//! a 403 from a partner endpoint is data here, not an error. Hard failures
//! (network, missing credential) are the only [`UpstreamError`] cases.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::auth::AuthScheme;
use crate::transform::MedicalEligibilityRequest;

/// Normalized upstream body: JSON when it parses, raw text when it does not,
/// and a sentinel for empty responses.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ResponseBody {
    /// Sentinel rendered for empty bodies.
    pub const NO_CONTENT: &'static str = "No content";

    pub fn from_bytes(bytes: &[u8]) -> ResponseBody {
        if bytes.is_empty() {
            return ResponseBody::Empty;
        }
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
            ResponseBody::Empty => Value::String(Self::NO_CONTENT.to_string()),
        }
    }

    /// Like [`ResponseBody::into_value`], but text bodies are cut to `limit`
    /// characters. JSON bodies are never truncated.
    pub fn into_truncated_value(self, limit: usize) -> Value {
        match self {
            ResponseBody::Text(text) if text.chars().count() > limit => {
                Value::String(text.chars().take(limit).collect())
            }
            other => other.into_value(),
        }
    }
}

/// One upstream exchange that produced an HTTP response — any status.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: ResponseBody,
    pub request_id: Option<String>,
    /// Scheme the winning (or final) eligibility attempt used.
    pub auth_scheme: Option<AuthScheme>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Hard failures from the outbound callers.
///
/// Upstream rejections (non-200 statuses) are not represented here — they
/// come back as [`UpstreamResponse`] data and the caller inspects the status.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    /// Network, TLS or timeout failure; carried as a synthetic 500.
    #[error("transport failure: {message}")]
    Transport {
        message: String,
        request_id: Option<String>,
    },
    /// The token endpoint answered with a non-200 status.
    #[error("token endpoint returned HTTP {status}")]
    TokenRejected { status: u16 },
    /// The token endpoint answered 200 but no usable token came back.
    #[error("Access token not found")]
    MissingToken,
}

impl UpstreamError {
    /// Status code the error envelope carries.
    pub fn status(&self) -> u16 {
        match self {
            UpstreamError::Transport { .. } => 500,
            UpstreamError::TokenRejected { status } => *status,
            UpstreamError::MissingToken => 500,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            UpstreamError::Transport { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

/// JSON envelope every tool invocation returns.
///
/// `success` is true only for an upstream HTTP 200. Absent fields are omitted
/// from the serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub success: bool,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_scheme: Option<AuthScheme>,
}

impl CallEnvelope {
    pub fn from_response(response: UpstreamResponse) -> CallEnvelope {
        CallEnvelope {
            success: response.is_success(),
            status_code: response.status,
            data: Some(response.body.into_value()),
            error: None,
            request_id: response.request_id,
            auth_scheme: response.auth_scheme,
        }
    }

    pub fn from_error(error: UpstreamError) -> CallEnvelope {
        CallEnvelope {
            success: false,
            status_code: error.status(),
            data: None,
            error: Some(error.to_string()),
            request_id: error.request_id().map(str::to_string),
            auth_scheme: None,
        }
    }

    pub fn from_result(result: Result<UpstreamResponse, UpstreamError>) -> CallEnvelope {
        match result {
            Ok(response) => CallEnvelope::from_response(response),
            Err(error) => CallEnvelope::from_error(error),
        }
    }
}

/// Combined output of the `all` tool: the three calls side by side.
/// Partial failure stays inside the per-call envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedReport {
    pub success: bool,
    pub get_token: CallEnvelope,
    pub mcid_search: CallEnvelope,
    pub submit_medical: CallEnvelope,
    pub timestamp: u64,
}

impl CombinedReport {
    /// `success` is true when any of the three calls succeeded.
    pub fn new(
        get_token: CallEnvelope,
        mcid_search: CallEnvelope,
        submit_medical: CallEnvelope,
    ) -> Self {
        let success = get_token.success || mcid_search.success || submit_medical.success;
        CombinedReport {
            success,
            get_token,
            mcid_search,
            submit_medical,
            timestamp: unix_timestamp(),
        }
    }
}

/// One attempt in the authorization probe sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeAttempt {
    pub auth_scheme: AuthScheme,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    pub success: bool,
}

/// Full report from the `probe_medical_auth` diagnostic tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub success: bool,
    pub attempts: Vec<ProbeAttempt>,
    pub payload_sent: MedicalEligibilityRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful_scheme: Option<AuthScheme>,
    pub request_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStatus {
    pub reachable: bool,
    pub status: u16,
}

/// Per-endpoint reachability report from the `test_connection` tool.
///
/// The token endpoint counts as reachable only when it granted a token; the
/// two data endpoints count as reachable whenever they produced any HTTP
/// response (any status except a synthetic transport 500).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub token_api: EndpointStatus,
    pub mcid_api: EndpointStatus,
    pub medical_api: EndpointStatus,
    pub timestamp: u64,
}

impl ConnectionReport {
    pub fn new(
        token: &Result<UpstreamResponse, UpstreamError>,
        mcid: &Result<UpstreamResponse, UpstreamError>,
        medical: &Result<UpstreamResponse, UpstreamError>,
    ) -> Self {
        ConnectionReport {
            success: true,
            token_api: EndpointStatus {
                reachable: matches!(token, Ok(response) if response.is_success()),
                status: status_of(token),
            },
            mcid_api: EndpointStatus {
                reachable: status_of(mcid) != 500,
                status: status_of(mcid),
            },
            medical_api: EndpointStatus {
                reachable: status_of(medical) != 500,
                status: status_of(medical),
            },
            timestamp: unix_timestamp(),
        }
    }
}

fn status_of(result: &Result<UpstreamResponse, UpstreamError>) -> u16 {
    match result {
        Ok(response) => response.status,
        Err(error) => error.status(),
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: ResponseBody) -> UpstreamResponse {
        UpstreamResponse {
            status,
            body,
            request_id: Some("123".to_string()),
            auth_scheme: None,
        }
    }

    #[test]
    fn empty_bodies_render_the_no_content_sentinel() {
        assert_eq!(ResponseBody::from_bytes(b""), ResponseBody::Empty);
        assert_eq!(
            ResponseBody::Empty.into_value(),
            Value::String("No content".to_string())
        );
    }

    #[test]
    fn json_bodies_parse_and_text_falls_through() {
        assert_eq!(
            ResponseBody::from_bytes(br#"{"ok":true}"#),
            ResponseBody::Json(json!({"ok": true}))
        );
        assert_eq!(
            ResponseBody::from_bytes(b"<html>nope</html>"),
            ResponseBody::Text("<html>nope</html>".to_string())
        );
    }

    #[test]
    fn truncation_only_applies_to_text() {
        let long = "x".repeat(600);
        let truncated = ResponseBody::Text(long).into_truncated_value(500);
        assert_eq!(truncated.as_str().map(str::len), Some(500));

        let body = ResponseBody::Json(json!({"big": "x".repeat(600)}));
        assert_eq!(body.clone().into_truncated_value(500), body.into_value());
    }

    #[test]
    fn envelope_success_tracks_status_200() {
        let ok = CallEnvelope::from_response(response(200, ResponseBody::Json(json!({"a": 1}))));
        assert!(ok.success);
        assert_eq!(ok.status_code, 200);
        assert_eq!(ok.data, Some(json!({"a": 1})));
        assert!(ok.error.is_none());

        let rejected = CallEnvelope::from_response(response(403, ResponseBody::Empty));
        assert!(!rejected.success);
        assert_eq!(rejected.status_code, 403);
        assert_eq!(rejected.data, Some(json!("No content")));
    }

    #[test]
    fn missing_token_error_maps_to_the_fixed_message() {
        let envelope = CallEnvelope::from_error(UpstreamError::MissingToken);
        assert!(!envelope.success);
        assert_eq!(envelope.status_code, 500);
        assert_eq!(envelope.error.as_deref(), Some("Access token not found"));
        assert!(envelope.data.is_none());
    }

    #[test]
    fn transport_errors_keep_their_request_id() {
        let envelope = CallEnvelope::from_error(UpstreamError::Transport {
            message: "connection refused".to_string(),
            request_id: Some("456".to_string()),
        });
        assert_eq!(envelope.status_code, 500);
        assert_eq!(envelope.request_id.as_deref(), Some("456"));
        assert!(envelope.error.as_deref().unwrap().contains("refused"));
    }

    #[test]
    fn serialized_envelopes_omit_absent_fields() {
        let value =
            serde_json::to_value(CallEnvelope::from_response(response(200, ResponseBody::Empty)))
                .unwrap();
        assert!(value.get("error").is_none());
        assert!(value.get("auth_scheme").is_none());
        assert_eq!(value["request_id"], "123");

        let value = serde_json::to_value(CallEnvelope::from_error(UpstreamError::MissingToken))
            .unwrap();
        assert!(value.get("data").is_none());
        assert!(value.get("request_id").is_none());
    }

    #[test]
    fn combined_report_succeeds_when_any_call_does() {
        let ok = CallEnvelope::from_response(response(200, ResponseBody::Empty));
        let bad = CallEnvelope::from_error(UpstreamError::MissingToken);

        assert!(CombinedReport::new(bad.clone(), ok.clone(), bad.clone()).success);
        assert!(!CombinedReport::new(bad.clone(), bad.clone(), bad).success);
    }

    #[test]
    fn connection_report_reachability_rules() {
        let token_ok: Result<UpstreamResponse, UpstreamError> =
            Ok(response(200, ResponseBody::Json(json!({"access_token": "t"}))));
        let mcid_rejected: Result<UpstreamResponse, UpstreamError> =
            Ok(response(400, ResponseBody::Empty));
        let medical_down: Result<UpstreamResponse, UpstreamError> =
            Err(UpstreamError::Transport {
                message: "timed out".to_string(),
                request_id: None,
            });

        let report = ConnectionReport::new(&token_ok, &mcid_rejected, &medical_down);
        assert!(report.success);
        assert!(report.token_api.reachable);
        assert!(report.mcid_api.reachable, "a 400 still proves reachability");
        assert_eq!(report.mcid_api.status, 400);
        assert!(!report.medical_api.reachable);
        assert_eq!(report.medical_api.status, 500);

        let token_rejected: Result<UpstreamResponse, UpstreamError> =
            Ok(response(401, ResponseBody::Empty));
        let report = ConnectionReport::new(&token_rejected, &mcid_rejected, &mcid_rejected);
        assert!(
            !report.token_api.reachable,
            "the token endpoint must actually grant a token"
        );
    }
}
