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

//! MCP over stdio
//!
//! Newline-delimited JSON-RPC on stdin/stdout, for clients that spawn the
//! gateway as a subprocess. Logging must go to stderr in this mode.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::{JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse};

/// Reads requests line by line until stdin closes.
pub async fn serve(handler: Arc<McpHandler>) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if let Some(response) = handle_line(&handler, &line).await {
            let mut payload = serde_json::to_vec(&response)?;
            payload.push(b'\n');
            stdout.write_all(&payload).await?;
            stdout.flush().await?;
        }
    }
    debug!("stdin closed, stdio transport finished");
    Ok(())
}

/// One line in, at most one response out. Blank lines and notifications
/// produce nothing; malformed JSON gets a parse error, valid JSON that is
/// not a request object gets an invalid-request error.
async fn handle_line(handler: &McpHandler, line: &str) -> Option<JsonRpcResponse> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            return Some(JsonRpcResponse::error(
                JsonRpcId::Null,
                JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
            ))
        }
    };
    let id = value
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value(id).ok())
        .unwrap_or(JsonRpcId::Null);
    match serde_json::from_value::<JsonRpcRequest>(value) {
        Ok(request) if request.is_notification() => {
            handler.handle_request(request).await;
            None
        }
        Ok(request) => Some(handler.handle_request(request).await),
        Err(e) => Some(JsonRpcResponse::error(
            id,
            JsonRpcError::invalid_request(format!("Not a JSON-RPC request: {}", e)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AppState;
    use crate::config::UpstreamConfig;
    use crate::upstream::UpstreamClient;
    use serde_json::json;

    fn handler() -> McpHandler {
        let mut config = UpstreamConfig::default();
        config.token_url = "http://127.0.0.1:9/token".to_string();
        config.mcid_url = "http://127.0.0.1:9/mcid".to_string();
        config.medical_url = "http://127.0.0.1:9/medical".to_string();
        config.client_id = "client".to_string();
        config.client_secret = "secret".to_string();
        config.api_user = "partner-user".to_string();
        config.caller_id = "GATEWAY".to_string();
        McpHandler::new(AppState::new(Arc::new(UpstreamClient::new(config).unwrap())))
    }

    #[tokio::test]
    async fn blank_lines_are_ignored() {
        assert!(handle_line(&handler(), "   ").await.is_none());
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let line = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(handle_line(&handler(), line).await.is_none());
    }

    #[tokio::test]
    async fn requests_get_exactly_one_response() {
        let line = r#"{"jsonrpc":"2.0","method":"ping","id":3}"#;
        let response = handle_line(&handler(), line).await.unwrap();
        assert_eq!(response.id, JsonRpcId::Number(3));
        assert_eq!(response.result.unwrap(), json!({}));
    }

    #[tokio::test]
    async fn garbage_lines_get_a_parse_error() {
        let response = handle_line(&handler(), "not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, -32700);
        assert_eq!(response.id, JsonRpcId::Null);
    }

    #[tokio::test]
    async fn non_request_objects_get_an_invalid_request_error() {
        let response = handle_line(&handler(), r#"{"id":9,"method":5}"#).await.unwrap();
        assert_eq!(response.error.unwrap().code, -32600);
        assert_eq!(response.id, JsonRpcId::Number(9));
    }
}
