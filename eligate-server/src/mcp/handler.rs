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

//! MCP Request Handlers
//!
//! Handles JSON-RPC 2.0 requests for the MCP protocol. Tool calls reuse the
//! same dispatch as the HTTP invocation route.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::{dispatch, ApiError, AppState, TOOL_NAMES};
use crate::mcp::protocol::*;

/// Prompt guiding a client through the gateway tools.
const WORKFLOW_PROMPT: &str = "eligibility_workflow";

/// MCP request handler
pub struct McpHandler {
    state: AppState,
}

impl McpHandler {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Handle a JSON-RPC request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, "MCP request received");

        match request.method.as_str() {
            // Health check (MCP protocol standard)
            "ping" => JsonRpcResponse::success(request.id, json!({})),

            // Initialization
            "initialize" => self.handle_initialize(request.id, request.params),
            "initialized" | "notifications/initialized" => {
                JsonRpcResponse::success(request.id, json!({}))
            }

            // Tools
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,

            // Prompts
            "prompts/list" => self.handle_prompts_list(request.id),
            "prompts/get" => self.handle_prompts_get(request.id, request.params),

            // Unknown method
            _ => {
                warn!(method = %request.method, "Unknown MCP method");
                JsonRpcResponse::error(request.id, JsonRpcError::method_not_found(&request.method))
            }
        }
    }

    fn handle_initialize(&self, id: JsonRpcId, params: Option<Value>) -> JsonRpcResponse {
        if let Some(version) = params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
        {
            debug!(client_protocol = version, "MCP client initializing");
        }

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                prompts: Some(PromptsCapability {
                    list_changed: false,
                }),
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: "eligate-gateway".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        success_json(id, &result)
    }

    fn handle_tools_list(&self, id: JsonRpcId) -> JsonRpcResponse {
        let result = ListToolsResult {
            tools: tool_definitions(),
            next_cursor: None,
        };
        success_json(id, &result)
    }

    async fn handle_tools_call(&self, id: JsonRpcId, params: Option<Value>) -> JsonRpcResponse {
        let call_params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid tool call params: {}", e)),
                    )
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing tool call params"),
                )
            }
        };

        info!(tool = %call_params.name, "MCP tool call");
        let args = if call_params.arguments.is_empty() {
            None
        } else {
            Some(Value::Object(call_params.arguments.into_iter().collect()))
        };

        match dispatch(&self.state, &call_params.name, args).await {
            Ok(value) => {
                let text =
                    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                success_json(
                    id,
                    &CallToolResult {
                        content: vec![ToolContent::Text { text }],
                        is_error: None,
                    },
                )
            }
            Err(ApiError::Internal(message)) => {
                JsonRpcResponse::error(id, JsonRpcError::internal_error(message))
            }
            Err(error) => {
                JsonRpcResponse::error(id, JsonRpcError::invalid_params(error.to_string()))
            }
        }
    }

    fn handle_prompts_list(&self, id: JsonRpcId) -> JsonRpcResponse {
        let prompts = vec![Prompt {
            name: WORKFLOW_PROMPT.to_string(),
            description: Some("Walk the gateway tools for one patient query".to_string()),
            arguments: Some(vec![PromptArgument {
                name: "query".to_string(),
                description: Some("What to look up for the patient".to_string()),
                required: Some(true),
            }]),
        }];
        success_json(
            id,
            &ListPromptsResult {
                prompts,
                next_cursor: None,
            },
        )
    }

    fn handle_prompts_get(&self, id: JsonRpcId, params: Option<Value>) -> JsonRpcResponse {
        let get_params: GetPromptParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid prompt params: {}", e)),
                    )
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing prompt params"),
                )
            }
        };

        if get_params.name != WORKFLOW_PROMPT {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params(format!("Unknown prompt: {}", get_params.name)),
            );
        }
        let query = match get_params.arguments.get("query") {
            Some(query) => query.clone(),
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("Missing prompt argument: query"),
                )
            }
        };

        let text = format!(
            "Use the eligibility gateway tools to retrieve identity, token, and claims data for the patient.\nQuery: {query}"
        );
        let result = GetPromptResult {
            description: Some("Eligibility workflow".to_string()),
            messages: vec![PromptMessage {
                role: PromptRole::User,
                content: PromptContent::Text { text },
            }],
        };
        success_json(id, &result)
    }
}

fn success_json<T: Serialize>(id: JsonRpcId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
    }
}

/// The seven gateway tools, with input schemas for the person-record ones.
fn tool_definitions() -> Vec<Tool> {
    let person = person_schema();
    TOOL_NAMES
        .iter()
        .map(|&name| {
            let (description, schema) = match name {
                "get_token" => (
                    "Request an OAuth2 client-credentials token from the partner identity endpoint",
                    empty_schema(),
                ),
                "mcid_search" => (
                    "Search the member index for a person record",
                    person.clone(),
                ),
                "submit_medical" => (
                    "Submit a medical eligibility inquiry for a person record",
                    person.clone(),
                ),
                "probe_medical_auth" => (
                    "Try every known Authorization scheme against the eligibility endpoint and report each outcome",
                    person.clone(),
                ),
                "all" => (
                    "Run token exchange, member search and eligibility submit in one shot",
                    person.clone(),
                ),
                "debug_transforms" => (
                    "Show the outbound request bodies built from a person record, without calling anything",
                    person.clone(),
                ),
                "test_connection" => (
                    "Check reachability of all three partner endpoints",
                    empty_schema(),
                ),
                other => (other, empty_schema()),
            };
            Tool {
                name: name.to_string(),
                description: Some(description.to_string()),
                input_schema: schema,
            }
        })
        .collect()
}

fn person_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "firstName": {"type": "string"},
            "lastName": {"type": "string"},
            "ssn": {"type": "string"},
            "dateOfBirth": {"type": "string", "description": "YYYY-MM-DD"},
            "gender": {"type": "string"},
            "zipCodes": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["firstName", "lastName", "ssn", "dateOfBirth", "gender"]
    })
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;
    use crate::upstream::UpstreamClient;
    use std::sync::Arc;

    fn handler_for(base: &str) -> McpHandler {
        let mut config = UpstreamConfig::default();
        config.token_url = format!("{base}/token");
        config.mcid_url = format!("{base}/mcid");
        config.medical_url = format!("{base}/medical");
        config.client_id = "client".to_string();
        config.client_secret = "secret".to_string();
        config.api_user = "partner-user".to_string();
        config.caller_id = "GATEWAY".to_string();
        McpHandler::new(AppState::new(Arc::new(UpstreamClient::new(config).unwrap())))
    }

    fn request(method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
            id: JsonRpcId::Number(1),
        }
    }

    #[tokio::test]
    async fn initialize_answers_without_params() {
        let handler = handler_for("http://127.0.0.1:9");
        let response = handler.handle_request(request("initialize", None)).await;
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], json!(MCP_PROTOCOL_VERSION));
        assert_eq!(result["serverInfo"]["name"], json!("eligate-gateway"));
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn tools_list_names_every_gateway_tool() {
        let handler = handler_for("http://127.0.0.1:9");
        let response = handler.handle_request(request("tools/list", None)).await;
        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), TOOL_NAMES.len());
        let names: Vec<&str> = tools
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"probe_medical_auth"));
        assert_eq!(tools[0]["inputSchema"]["type"], json!("object"));
    }

    #[tokio::test]
    async fn tools_call_runs_the_token_exchange() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"tok","expires_in":3600}"#)
            .create_async()
            .await;

        let handler = handler_for(&server.url());
        let response = handler
            .handle_request(request("tools/call", Some(json!({"name": "get_token"}))))
            .await;
        let result = response.result.unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        let envelope: Value = serde_json::from_str(text).unwrap();
        assert_eq!(envelope["success"], json!(true));
        assert_eq!(envelope["data"]["access_token"], json!("tok"));
    }

    #[tokio::test]
    async fn tools_call_rejects_unknown_tools() {
        let handler = handler_for("http://127.0.0.1:9");
        let response = handler
            .handle_request(request("tools/call", Some(json!({"name": "nope"}))))
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert!(error.message.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn prompts_get_renders_the_query() {
        let handler = handler_for("http://127.0.0.1:9");
        let response = handler
            .handle_request(request(
                "prompts/get",
                Some(json!({
                    "name": "eligibility_workflow",
                    "arguments": {"query": "coverage for JANE DOE"}
                })),
            ))
            .await;
        let result = response.result.unwrap();
        let text = result["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.ends_with("Query: coverage for JANE DOE"));
    }

    #[tokio::test]
    async fn prompts_get_requires_the_query_argument() {
        let handler = handler_for("http://127.0.0.1:9");
        let response = handler
            .handle_request(request(
                "prompts/get",
                Some(json!({"name": "eligibility_workflow"})),
            ))
            .await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn unknown_methods_are_reported() {
        let handler = handler_for("http://127.0.0.1:9");
        let response = handler.handle_request(request("resources/list", None)).await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn ping_answers_with_an_empty_object() {
        let handler = handler_for("http://127.0.0.1:9");
        let response = handler.handle_request(request("ping", None)).await;
        assert_eq!(response.result.unwrap(), json!({}));
    }
}
