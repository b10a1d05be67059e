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

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// `Authorization` header formats the eligibility endpoint has been observed
/// to accept. The configured scheme is used for normal submits; the ordered
/// candidate lists below exist for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthScheme {
    #[default]
    Bearer,
    Raw,
    Token,
    Basic,
}

impl AuthScheme {
    /// Candidate order for the diagnostic fallback submit. The order is a
    /// fixed priority: the first scheme to yield HTTP 200 wins.
    pub const FALLBACK_ORDER: [AuthScheme; 3] =
        [AuthScheme::Bearer, AuthScheme::Raw, AuthScheme::Token];

    /// Candidate order for the full authorization probe sweep.
    pub const PROBE_ORDER: [AuthScheme; 4] = [
        AuthScheme::Bearer,
        AuthScheme::Raw,
        AuthScheme::Token,
        AuthScheme::Basic,
    ];

    /// Renders the `Authorization` header value for `token`.
    pub fn header_value(&self, token: &str) -> String {
        match self {
            AuthScheme::Bearer => format!("Bearer {token}"),
            AuthScheme::Raw => token.to_string(),
            AuthScheme::Token => format!("Token {token}"),
            AuthScheme::Basic => format!("Basic {token}"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Bearer => "Bearer",
            AuthScheme::Raw => "Raw",
            AuthScheme::Token => "Token",
            AuthScheme::Basic => "Basic",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bearer" => Ok(AuthScheme::Bearer),
            "raw" => Ok(AuthScheme::Raw),
            "token" => Ok(AuthScheme::Token),
            "basic" => Ok(AuthScheme::Basic),
            other => Err(format!("unknown auth scheme: {other}")),
        }
    }
}

/// Opaque bearer credential from the token endpoint.
///
/// The value never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(raw: impl Into<String>) -> Self {
        AccessToken(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(****)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_values_match_each_scheme() {
        assert_eq!(AuthScheme::Bearer.header_value("abc"), "Bearer abc");
        assert_eq!(AuthScheme::Raw.header_value("abc"), "abc");
        assert_eq!(AuthScheme::Token.header_value("abc"), "Token abc");
        assert_eq!(AuthScheme::Basic.header_value("abc"), "Basic abc");
    }

    #[test]
    fn fallback_order_is_bearer_raw_token() {
        assert_eq!(
            AuthScheme::FALLBACK_ORDER,
            [AuthScheme::Bearer, AuthScheme::Raw, AuthScheme::Token]
        );
    }

    #[test]
    fn probe_order_extends_fallback_with_basic() {
        assert_eq!(AuthScheme::PROBE_ORDER[..3], AuthScheme::FALLBACK_ORDER);
        assert_eq!(AuthScheme::PROBE_ORDER[3], AuthScheme::Basic);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("bearer".parse::<AuthScheme>().unwrap(), AuthScheme::Bearer);
        assert_eq!("TOKEN".parse::<AuthScheme>().unwrap(), AuthScheme::Token);
        assert!("negotiate".parse::<AuthScheme>().is_err());
    }

    #[test]
    fn serializes_as_variant_name() {
        assert_eq!(
            serde_json::to_value(AuthScheme::Bearer).unwrap(),
            serde_json::json!("Bearer")
        );
        assert_eq!(
            serde_json::to_value(AuthScheme::Raw).unwrap(),
            serde_json::json!("Raw")
        );
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let token = AccessToken::new("very-secret-value");
        assert_eq!(format!("{token:?}"), "AccessToken(****)");
    }
}
