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

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use reqwest::header;
use serde::Serialize;
use tracing::{debug, info, warn};

use eligate_core::{
    generate_request_id, to_mcid_search_request, to_medical_eligibility_request, AccessToken,
    AuthScheme, CallEnvelope, CombinedReport, ConnectionReport, MedicalEligibilityRequest,
    PersonRecord, ProbeAttempt, ProbeReport, ResponseBody, TransformDebug, UpstreamError,
    UpstreamResponse,
};

use crate::config::UpstreamConfig;
use crate::upstream::token::TokenProvider;

/// Characters kept of a textual body in probe reports.
const PROBE_BODY_LIMIT: usize = 500;

/// Per-request timeout for the startup connectivity probe.
const STARTUP_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Header carrying the partner account for member index calls.
const APIUSER_HEADER: &str = "Apiuser";

/// Reachability flags maintained by the startup connectivity probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpstreamHealth {
    pub token_api: bool,
    pub mcid_api: bool,
    pub medical_api: bool,
}

impl UpstreamHealth {
    pub fn all_up(&self) -> bool {
        self.token_api && self.mcid_api && self.medical_api
    }
}

/// The partner-facing side of the gateway.
///
/// Every tool ultimately funnels into one of the methods here. Two HTTP
/// clients are kept: the member index sits behind a proxy with an
/// unverifiable certificate chain, so its client can be configured to skip
/// TLS verification; the token and eligibility endpoints always verify.
pub struct UpstreamClient {
    config: UpstreamConfig,
    http: reqwest::Client,
    insecure_http: reqwest::Client,
    tokens: TokenProvider,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        let insecure_http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(config.mcid_accept_invalid_certs)
            .build()
            .context("failed to build HTTP client for the member index")?;
        let tokens = TokenProvider::new(http.clone(), &config);
        Ok(UpstreamClient {
            config,
            http,
            insecure_http,
            tokens,
        })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Raw client-credentials exchange, surfaced by the `get_token` tool.
    pub async fn token_exchange(&self) -> Result<UpstreamResponse, UpstreamError> {
        self.tokens.exchange().await
    }

    /// Consumer search against the member index.
    pub async fn search_mcid(
        &self,
        person: PersonRecord,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let person = person.normalize();
        let request = to_mcid_search_request(&person, &generate_request_id());
        debug!(request_id = %request.request_id, "querying member index");
        self.execute(
            self.insecure_http
                .post(&self.config.mcid_url)
                .header(APIUSER_HEADER, &self.config.api_user)
                .json(&request),
            Some(&request.request_id),
        )
        .await
    }

    /// Eligibility submit. Fetches a token first; without one the call is
    /// not attempted. With `diagnostic_auth_fallback` enabled the configured
    /// scheme is replaced by the whole fallback order.
    pub async fn submit_medical(
        &self,
        person: PersonRecord,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let token = match self.tokens.access_token().await {
            Ok(token) => token,
            Err(error) => {
                warn!(%error, "eligibility submit aborted, no access token");
                return Err(UpstreamError::MissingToken);
            }
        };

        let person = person.normalize();
        let payload =
            to_medical_eligibility_request(&person, &generate_request_id(), &self.config.caller_id);
        let schemes: &[AuthScheme] = if self.config.diagnostic_auth_fallback {
            &AuthScheme::FALLBACK_ORDER
        } else {
            std::slice::from_ref(&self.config.auth_scheme)
        };
        self.submit_with_schemes(&payload, &token, schemes).await
    }

    /// One payload, one token, several authorization schemes. Returns on the
    /// first 200; otherwise the last attempt's outcome stands.
    async fn submit_with_schemes(
        &self,
        payload: &MedicalEligibilityRequest,
        token: &AccessToken,
        schemes: &[AuthScheme],
    ) -> Result<UpstreamResponse, UpstreamError> {
        for (index, scheme) in schemes.iter().enumerate() {
            let is_last = index + 1 == schemes.len();
            let attempt = self
                .execute(
                    self.http
                        .post(&self.config.medical_url)
                        .header(header::AUTHORIZATION, scheme.header_value(token.as_str()))
                        .json(payload),
                    Some(&payload.request_id),
                )
                .await;
            match attempt {
                Ok(mut response) if response.is_success() => {
                    response.auth_scheme = Some(*scheme);
                    return Ok(response);
                }
                result if is_last => {
                    return result.map(|mut response| {
                        response.auth_scheme = Some(*scheme);
                        response
                    });
                }
                Ok(response) => {
                    debug!(
                        scheme = %scheme,
                        status = response.status,
                        "authorization scheme rejected, trying next"
                    );
                }
                Err(error) => {
                    debug!(scheme = %scheme, %error, "eligibility attempt failed, trying next");
                }
            }
        }
        Err(UpstreamError::Transport {
            message: "no authorization scheme configured".to_string(),
            request_id: Some(payload.request_id.clone()),
        })
    }

    /// Diagnostic sweep over every known authorization scheme against the
    /// eligibility endpoint, recording status, headers and a truncated body
    /// per attempt. Stops at the first 200.
    pub async fn probe_medical_auth(
        &self,
        person: PersonRecord,
    ) -> Result<ProbeReport, UpstreamError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|_| UpstreamError::MissingToken)?;

        let person = person.normalize();
        let request_id = generate_request_id();
        let payload = to_medical_eligibility_request(&person, &request_id, &self.config.caller_id);

        let mut attempts = Vec::with_capacity(AuthScheme::PROBE_ORDER.len());
        let mut successful_scheme = None;
        for scheme in AuthScheme::PROBE_ORDER {
            let attempt = self.probe_attempt(&payload, scheme, &token).await;
            let accepted = attempt.success;
            debug!(
                request_id = %request_id,
                scheme = %scheme,
                status = attempt.status_code,
                "probed authorization scheme"
            );
            attempts.push(attempt);
            if accepted {
                successful_scheme = Some(scheme);
                break;
            }
        }

        Ok(ProbeReport {
            success: successful_scheme.is_some(),
            attempts,
            payload_sent: payload,
            successful_scheme,
            request_id,
        })
    }

    async fn probe_attempt(
        &self,
        payload: &MedicalEligibilityRequest,
        scheme: AuthScheme,
        token: &AccessToken,
    ) -> ProbeAttempt {
        let sent = self
            .http
            .post(&self.config.medical_url)
            .header(header::AUTHORIZATION, scheme.header_value(token.as_str()))
            .json(payload)
            .send()
            .await;
        match sent {
            Ok(response) => {
                let status = response.status().as_u16();
                let headers: BTreeMap<String, String> = response
                    .headers()
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.as_str().to_string(),
                            String::from_utf8_lossy(value.as_bytes()).into_owned(),
                        )
                    })
                    .collect();
                let body = match response.bytes().await {
                    Ok(bytes) => ResponseBody::from_bytes(&bytes),
                    Err(_) => ResponseBody::Empty,
                };
                ProbeAttempt {
                    auth_scheme: scheme,
                    status_code: status,
                    body: Some(body.into_truncated_value(PROBE_BODY_LIMIT)),
                    error: None,
                    headers: Some(headers),
                    success: status == 200,
                }
            }
            Err(error) => ProbeAttempt {
                auth_scheme: scheme,
                status_code: 500,
                body: None,
                error: Some(error.to_string()),
                headers: None,
                success: false,
            },
        }
    }

    /// The three calls side by side, for the `all` tool.
    pub async fn run_all(&self, person: PersonRecord) -> CombinedReport {
        let (token, mcid, medical) = tokio::join!(
            self.token_exchange(),
            self.search_mcid(person.clone()),
            self.submit_medical(person),
        );
        CombinedReport::new(
            CallEnvelope::from_result(token),
            CallEnvelope::from_result(mcid),
            CallEnvelope::from_result(medical),
        )
    }

    /// Fires the sample record at all three endpoints and reports
    /// per-endpoint reachability.
    pub async fn test_connection(&self) -> ConnectionReport {
        let person = PersonRecord::sample();
        let (token, mcid, medical) = tokio::join!(
            self.token_exchange(),
            self.search_mcid(person.clone()),
            self.submit_medical(person),
        );
        ConnectionReport::new(&token, &mcid, &medical)
    }

    /// Shows what the two outbound transforms make of a record, without
    /// calling anything.
    pub fn render_transforms(&self, person: PersonRecord) -> TransformDebug {
        let normalized = person.clone().normalize();
        let request_id = generate_request_id();
        TransformDebug::new(
            person,
            to_mcid_search_request(&normalized, &request_id),
            to_medical_eligibility_request(&normalized, &request_id, &self.config.caller_id),
        )
    }

    /// Startup reachability check with a short per-request timeout. The token
    /// endpoint must grant a token; the data endpoints only have to answer
    /// with something other than a server error.
    pub async fn probe_connectivity(&self) -> UpstreamHealth {
        let person = PersonRecord::sample().normalize();
        let request_id = generate_request_id();

        let token_api = self
            .http
            .post(&self.config.token_url)
            .timeout(STARTUP_PROBE_TIMEOUT)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map(|response| response.status().as_u16() == 200)
            .unwrap_or(false);

        let mcid_api = self
            .insecure_http
            .post(&self.config.mcid_url)
            .timeout(STARTUP_PROBE_TIMEOUT)
            .header(APIUSER_HEADER, &self.config.api_user)
            .json(&to_mcid_search_request(&person, &request_id))
            .send()
            .await
            .map(|response| (200..=400).contains(&response.status().as_u16()))
            .unwrap_or(false);

        let medical_api = self
            .http
            .post(&self.config.medical_url)
            .timeout(STARTUP_PROBE_TIMEOUT)
            .header(header::AUTHORIZATION, "dummy")
            .json(&to_medical_eligibility_request(
                &person,
                &request_id,
                &self.config.caller_id,
            ))
            .send()
            .await
            .map(|response| (200..=400).contains(&response.status().as_u16()))
            .unwrap_or(false);

        let health = UpstreamHealth {
            token_api,
            mcid_api,
            medical_api,
        };
        info!(
            token_api = health.token_api,
            mcid_api = health.mcid_api,
            medical_api = health.medical_api,
            "upstream connectivity probe complete"
        );
        health
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        request_id: Option<&str>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let response = request.send().await.map_err(|e| UpstreamError::Transport {
            message: e.to_string(),
            request_id: request_id.map(str::to_string),
        })?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transport {
                message: e.to_string(),
                request_id: request_id.map(str::to_string),
            })?;
        Ok(UpstreamResponse {
            status,
            body: ResponseBody::from_bytes(&bytes),
            request_id: request_id.map(str::to_string),
            auth_scheme: None,
        })
    }
}
