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

//! Gateway configuration: TOML file, environment overrides, validation.
//!
//! Partner endpoint URLs, credentials and identifiers have no built-in
//! defaults on purpose. They must be injected through the config file or the
//! `ELIGATE_*` environment variables, and [`GatewayConfig::validate`] refuses
//! to start the gateway without them.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use eligate_core::AuthScheme;

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_accept_invalid_certs() -> bool {
    true
}

fn default_token_cache_ttl() -> u64 {
    300
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: HttpConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Inbound HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            listen_addr: default_listen_addr(),
            enable_cors: default_enable_cors(),
        }
    }
}

/// Partner endpoint settings shared by all outbound callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// OAuth2 client-credentials token endpoint.
    #[serde(default)]
    pub token_url: String,
    /// Member identity (MCID) search endpoint.
    #[serde(default)]
    pub mcid_url: String,
    /// Medical eligibility endpoint.
    #[serde(default)]
    pub medical_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Value of the `Apiuser` header the MCID endpoint requires.
    #[serde(default)]
    pub api_user: String,
    /// `callerId` stamped into every eligibility submit body.
    #[serde(default)]
    pub caller_id: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// The MCID endpoint presents an internal certificate; verification stays
    /// off unless this is flipped.
    #[serde(default = "default_accept_invalid_certs")]
    pub mcid_accept_invalid_certs: bool,
    /// Scheme used for normal eligibility submits.
    #[serde(default)]
    pub auth_scheme: AuthScheme,
    /// Re-enables the ordered multi-scheme fallback on normal submits.
    /// Diagnostics only — leave off once the upstream contract is settled.
    #[serde(default)]
    pub diagnostic_auth_fallback: bool,
    #[serde(default)]
    pub token_cache: TokenCacheConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            token_url: String::new(),
            mcid_url: String::new(),
            medical_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            api_user: String::new(),
            caller_id: String::new(),
            request_timeout_secs: default_request_timeout(),
            mcid_accept_invalid_certs: default_accept_invalid_certs(),
            auth_scheme: AuthScheme::default(),
            diagnostic_auth_fallback: false,
            token_cache: TokenCacheConfig::default(),
        }
    }
}

/// Opt-in cache for client-credentials tokens. Disabled by default: every
/// eligibility submit then fetches a fresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCacheConfig {
    #[serde(default)]
    pub enabled: bool,
    /// TTL used when the token response carries no `expires_in`.
    #[serde(default = "default_token_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for TokenCacheConfig {
    fn default() -> Self {
        TokenCacheConfig {
            enabled: false,
            ttl_secs: default_token_cache_ttl(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file {:?}", path.as_ref()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid config file {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - ELIGATE_LISTEN_ADDR: HTTP listen address (default: 127.0.0.1:8080)
    /// - ELIGATE_ENABLE_CORS: enable CORS (default: true)
    /// - ELIGATE_TOKEN_URL / ELIGATE_MCID_URL / ELIGATE_MEDICAL_URL: partner endpoints
    /// - ELIGATE_CLIENT_ID / ELIGATE_CLIENT_SECRET: OAuth2 client credentials
    /// - ELIGATE_API_USER: MCID `Apiuser` header value
    /// - ELIGATE_CALLER_ID: eligibility `callerId` value
    /// - ELIGATE_REQUEST_TIMEOUT: outbound timeout in seconds (default: 30)
    /// - ELIGATE_MCID_ACCEPT_INVALID_CERTS: skip MCID TLS verification (default: true)
    /// - ELIGATE_AUTH_SCHEME: Bearer | Raw | Token | Basic (default: Bearer)
    /// - ELIGATE_DIAGNOSTIC_AUTH_FALLBACK: ordered multi-scheme fallback (default: false)
    /// - ELIGATE_TOKEN_CACHE_ENABLED / ELIGATE_TOKEN_CACHE_TTL: token cache knobs
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("ELIGATE_LISTEN_ADDR") {
            config.server.listen_addr = addr;
        }
        if let Ok(cors) = std::env::var("ELIGATE_ENABLE_CORS") {
            config.server.enable_cors = cors.parse().unwrap_or(true);
        }

        if let Ok(url) = std::env::var("ELIGATE_TOKEN_URL") {
            config.upstream.token_url = url;
        }
        if let Ok(url) = std::env::var("ELIGATE_MCID_URL") {
            config.upstream.mcid_url = url;
        }
        if let Ok(url) = std::env::var("ELIGATE_MEDICAL_URL") {
            config.upstream.medical_url = url;
        }
        if let Ok(id) = std::env::var("ELIGATE_CLIENT_ID") {
            config.upstream.client_id = id;
        }
        if let Ok(secret) = std::env::var("ELIGATE_CLIENT_SECRET") {
            config.upstream.client_secret = secret;
        }
        if let Ok(user) = std::env::var("ELIGATE_API_USER") {
            config.upstream.api_user = user;
        }
        if let Ok(caller) = std::env::var("ELIGATE_CALLER_ID") {
            config.upstream.caller_id = caller;
        }
        if let Ok(timeout) = std::env::var("ELIGATE_REQUEST_TIMEOUT") {
            if let Ok(val) = timeout.parse() {
                config.upstream.request_timeout_secs = val;
            }
        }
        if let Ok(insecure) = std::env::var("ELIGATE_MCID_ACCEPT_INVALID_CERTS") {
            config.upstream.mcid_accept_invalid_certs = insecure.parse().unwrap_or(true);
        }
        if let Ok(scheme) = std::env::var("ELIGATE_AUTH_SCHEME") {
            if let Ok(val) = scheme.parse() {
                config.upstream.auth_scheme = val;
            }
        }
        if let Ok(fallback) = std::env::var("ELIGATE_DIAGNOSTIC_AUTH_FALLBACK") {
            config.upstream.diagnostic_auth_fallback = fallback.parse().unwrap_or(false);
        }
        if let Ok(enabled) = std::env::var("ELIGATE_TOKEN_CACHE_ENABLED") {
            config.upstream.token_cache.enabled = enabled.parse().unwrap_or(false);
        }
        if let Ok(ttl) = std::env::var("ELIGATE_TOKEN_CACHE_TTL") {
            if let Ok(val) = ttl.parse() {
                config.upstream.token_cache.ttl_secs = val;
            }
        }

        config
    }

    /// Load configuration with priority: env > file > defaults.
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        config = Self::merge_with_env(config);

        Ok(config)
    }

    /// Merge config with environment variables (env takes priority).
    fn merge_with_env(mut config: Self) -> Self {
        let env_config = Self::from_env();

        if std::env::var("ELIGATE_LISTEN_ADDR").is_ok() {
            config.server.listen_addr = env_config.server.listen_addr;
        }
        if std::env::var("ELIGATE_ENABLE_CORS").is_ok() {
            config.server.enable_cors = env_config.server.enable_cors;
        }
        if std::env::var("ELIGATE_TOKEN_URL").is_ok() {
            config.upstream.token_url = env_config.upstream.token_url;
        }
        if std::env::var("ELIGATE_MCID_URL").is_ok() {
            config.upstream.mcid_url = env_config.upstream.mcid_url;
        }
        if std::env::var("ELIGATE_MEDICAL_URL").is_ok() {
            config.upstream.medical_url = env_config.upstream.medical_url;
        }
        if std::env::var("ELIGATE_CLIENT_ID").is_ok() {
            config.upstream.client_id = env_config.upstream.client_id;
        }
        if std::env::var("ELIGATE_CLIENT_SECRET").is_ok() {
            config.upstream.client_secret = env_config.upstream.client_secret;
        }
        if std::env::var("ELIGATE_API_USER").is_ok() {
            config.upstream.api_user = env_config.upstream.api_user;
        }
        if std::env::var("ELIGATE_CALLER_ID").is_ok() {
            config.upstream.caller_id = env_config.upstream.caller_id;
        }
        if std::env::var("ELIGATE_REQUEST_TIMEOUT").is_ok() {
            config.upstream.request_timeout_secs = env_config.upstream.request_timeout_secs;
        }
        if std::env::var("ELIGATE_MCID_ACCEPT_INVALID_CERTS").is_ok() {
            config.upstream.mcid_accept_invalid_certs =
                env_config.upstream.mcid_accept_invalid_certs;
        }
        if std::env::var("ELIGATE_AUTH_SCHEME").is_ok() {
            config.upstream.auth_scheme = env_config.upstream.auth_scheme;
        }
        if std::env::var("ELIGATE_DIAGNOSTIC_AUTH_FALLBACK").is_ok() {
            config.upstream.diagnostic_auth_fallback =
                env_config.upstream.diagnostic_auth_fallback;
        }
        if std::env::var("ELIGATE_TOKEN_CACHE_ENABLED").is_ok() {
            config.upstream.token_cache.enabled = env_config.upstream.token_cache.enabled;
        }
        if std::env::var("ELIGATE_TOKEN_CACHE_TTL").is_ok() {
            config.upstream.token_cache.ttl_secs = env_config.upstream.token_cache.ttl_secs;
        }

        config
    }

    /// Parse listen address as SocketAddr.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.server
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen address: {}", self.server.listen_addr))
    }

    /// Validate configuration. Every partner field is required — the gateway
    /// has nothing sensible to do without them.
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        let required = [
            ("upstream.token_url", "ELIGATE_TOKEN_URL", &self.upstream.token_url),
            ("upstream.mcid_url", "ELIGATE_MCID_URL", &self.upstream.mcid_url),
            ("upstream.medical_url", "ELIGATE_MEDICAL_URL", &self.upstream.medical_url),
            ("upstream.client_id", "ELIGATE_CLIENT_ID", &self.upstream.client_id),
            ("upstream.client_secret", "ELIGATE_CLIENT_SECRET", &self.upstream.client_secret),
            ("upstream.api_user", "ELIGATE_API_USER", &self.upstream.api_user),
            ("upstream.caller_id", "ELIGATE_CALLER_ID", &self.upstream.caller_id),
        ];
        for (key, env_var, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("{key} is not configured (set it in the config file or via {env_var})");
            }
        }

        if self.upstream.request_timeout_secs == 0 {
            anyhow::bail!("upstream.request_timeout_secs must be greater than zero");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn configured() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.upstream.token_url = "https://partner.example/token".to_string();
        config.upstream.mcid_url = "https://partner.example/mcid".to_string();
        config.upstream.medical_url = "https://partner.example/medical".to_string();
        config.upstream.client_id = "client".to_string();
        config.upstream.client_secret = "secret".to_string();
        config.upstream.api_user = "GatewayUser".to_string();
        config.upstream.caller_id = "Gateway-Test".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:8080");
        assert!(config.server.enable_cors);
        assert_eq!(config.upstream.request_timeout_secs, 30);
        assert_eq!(config.upstream.auth_scheme, AuthScheme::Bearer);
        assert!(!config.upstream.diagnostic_auth_fallback);
        assert!(!config.upstream.token_cache.enabled);
        assert_eq!(config.upstream.token_cache.ttl_secs, 300);
        assert!(config.upstream.client_secret.is_empty(), "secrets must not default");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
listen_addr = "0.0.0.0:9090"

[upstream]
token_url = "https://partner.example/token"
mcid_url = "https://partner.example/mcid"
medical_url = "https://partner.example/medical"
client_id = "client"
client_secret = "secret"
api_user = "GatewayUser"
caller_id = "Gateway-Test"
auth_scheme = "Token"
diagnostic_auth_fallback = true

[upstream.token_cache]
enabled = true
ttl_secs = 120
"#
        )
        .unwrap();

        let config = GatewayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:9090");
        assert_eq!(config.upstream.auth_scheme, AuthScheme::Token);
        assert!(config.upstream.diagnostic_auth_fallback);
        assert!(config.upstream.token_cache.enabled);
        assert_eq!(config.upstream.token_cache.ttl_secs, 120);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("ELIGATE_LISTEN_ADDR", "0.0.0.0:8081");
        std::env::set_var("ELIGATE_AUTH_SCHEME", "raw");
        std::env::set_var("ELIGATE_TOKEN_CACHE_ENABLED", "true");

        let config = GatewayConfig::from_env();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8081");
        assert_eq!(config.upstream.auth_scheme, AuthScheme::Raw);
        assert!(config.upstream.token_cache.enabled);

        std::env::remove_var("ELIGATE_LISTEN_ADDR");
        std::env::remove_var("ELIGATE_AUTH_SCHEME");
        std::env::remove_var("ELIGATE_TOKEN_CACHE_ENABLED");
    }

    #[test]
    fn test_validate_requires_partner_settings() {
        let err = GatewayConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("upstream.token_url"));

        let mut config = configured();
        config.upstream.client_secret = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("client_secret"));

        assert!(configured().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_listen_addr() {
        let mut config = configured();
        config.server.listen_addr = "not-an-addr".to_string();
        assert!(config.validate().is_err());
    }
}
