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

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use moka::Expiry;
use serde_json::Value;
use tracing::debug;

use eligate_core::{AccessToken, ResponseBody, UpstreamError, UpstreamResponse};

use crate::config::UpstreamConfig;

/// Safety margin shaved off the advertised token lifetime.
const TOKEN_TTL_MARGIN_SECS: u64 = 30;

#[derive(Clone)]
struct CachedToken {
    token: AccessToken,
    ttl: Duration,
}

struct TokenExpiry;

impl Expiry<String, CachedToken> for TokenExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedToken,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Client-credentials token source.
///
/// With the cache disabled (the default) every call performs a fresh
/// exchange. With it enabled, tokens are cached per client id and concurrent
/// callers share one in-flight fetch.
pub struct TokenProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cache: Option<Cache<String, CachedToken>>,
    fallback_ttl: Duration,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, config: &UpstreamConfig) -> Self {
        let cache = config.token_cache.enabled.then(|| {
            Cache::builder()
                .max_capacity(8)
                .expire_after(TokenExpiry)
                .build()
        });
        TokenProvider {
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            cache,
            fallback_ttl: Duration::from_secs(config.token_cache.ttl_secs),
        }
    }

    /// One raw exchange against the token endpoint. Non-200 statuses come
    /// back as data; only transport failures are errors.
    pub async fn exchange(&self) -> Result<UpstreamResponse, UpstreamError> {
        debug!("requesting client-credentials token");
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::Transport {
                message: e.to_string(),
                request_id: None,
            })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| UpstreamError::Transport {
            message: e.to_string(),
            request_id: None,
        })?;
        // The token endpoint reports an empty body as an empty object.
        let body = match ResponseBody::from_bytes(&bytes) {
            ResponseBody::Empty => ResponseBody::Json(Value::Object(serde_json::Map::new())),
            other => other,
        };

        Ok(UpstreamResponse {
            status,
            body,
            request_id: None,
            auth_scheme: None,
        })
    }

    /// A usable bearer token, via the cache when one is configured.
    pub async fn access_token(&self) -> Result<AccessToken, UpstreamError> {
        match &self.cache {
            Some(cache) => cache
                .try_get_with(self.client_id.clone(), self.fetch_token())
                .await
                .map(|cached| cached.token)
                .map_err(|shared: Arc<UpstreamError>| (*shared).clone()),
            None => self.fetch_token().await.map(|cached| cached.token),
        }
    }

    async fn fetch_token(&self) -> Result<CachedToken, UpstreamError> {
        let response = self.exchange().await?;
        if response.status != 200 {
            return Err(UpstreamError::TokenRejected {
                status: response.status,
            });
        }
        let body = match &response.body {
            ResponseBody::Json(value) => value,
            _ => return Err(UpstreamError::MissingToken),
        };
        let token = body
            .get("access_token")
            .and_then(Value::as_str)
            .unwrap_or("");
        if token.is_empty() {
            return Err(UpstreamError::MissingToken);
        }

        let ttl = body
            .get("expires_in")
            .and_then(Value::as_u64)
            .map(|secs| Duration::from_secs(secs.saturating_sub(TOKEN_TTL_MARGIN_SECS)))
            .unwrap_or(self.fallback_ttl);
        debug!(ttl_secs = ttl.as_secs(), "token obtained");

        Ok(CachedToken {
            token: AccessToken::new(token),
            ttl,
        })
    }
}
