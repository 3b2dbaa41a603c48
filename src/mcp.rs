//! MCP (Model Context Protocol) JSON-RPC handler.
//!
//! Reads JSON-RPC 2.0 requests from stdin, one per line, and writes one
//! response line per request to stdout. Logging goes to stderr so stdout
//! carries protocol traffic only.
//!
//! ## Supported methods
//!
//! | Method       | Description                      |
//! |--------------|----------------------------------|
//! | `initialize` | Handshake, returns capabilities  |
//! | `tools/list` | List available tool definitions  |
//! | `tools/call` | Execute a tool and return result |
//! | `ping`       | Liveness check                   |
//!
//! Notifications (no `id`) never get a response.

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::protocol::UeResponse;
use crate::router::UnrealClient;
use crate::tools::{DispatchError, ToolRegistry};

const SERVER_NAME: &str = "mcp-unreal";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INTERNAL_ERROR: i64 = -32603;

/// Run the MCP server on stdio until EOF.
pub async fn run_stdio(registry: ToolRegistry, client: UnrealClient) {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut reader = BufReader::new(stdin);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "stdin read error");
                break;
            }
        }

        if let Some(response) = handle_line(&line, &registry, &client).await {
            write_response(&mut stdout, &response).await;
        }
    }
    info!("stdin closed, shutting down");
}

/// Handle one input line. Returns the response to write, if any.
pub async fn handle_line(line: &str, registry: &ToolRegistry, client: &UnrealClient) -> Option<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let request: Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "unparseable request");
            return Some(json!({
                "jsonrpc": "2.0",
                "id": null,
                "error": {
                    "code": PARSE_ERROR,
                    "message": format!("Parse error: {}", e)
                }
            }));
        }
    };

    let method = request.get("method").and_then(Value::as_str).unwrap_or("");
    let Some(id) = request.get("id").cloned() else {
        match method {
            "notifications/initialized" | "notifications/cancelled" => {}
            _ => debug!(method, "ignoring notification"),
        }
        return None;
    };

    let response = match method {
        "initialize" => handle_initialize(),
        "tools/list" => json!({
            "jsonrpc": "2.0",
            "result": { "tools": registry.definitions() }
        }),
        "tools/call" => handle_tools_call(&request, registry, client).await,
        "ping" => json!({ "jsonrpc": "2.0", "result": {} }),
        _ => error_response(METHOD_NOT_FOUND, format!("Method not found: {}", method)),
    };

    Some(inject_id(response, id))
}

fn handle_initialize() -> Value {
    json!({
        "jsonrpc": "2.0",
        "result": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            }
        }
    })
}

/// Dispatch `tools/call`. A tool that ran (even one reporting failure)
/// yields a `result`; an unknown tool or a handler error yields an `error`.
async fn handle_tools_call(request: &Value, registry: &ToolRegistry, client: &UnrealClient) -> Value {
    let params = request.get("params").cloned().unwrap_or(json!({}));
    let name = params.get("name").and_then(Value::as_str).unwrap_or("");
    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    debug!(tool = name, "tools/call");
    match registry.invoke(name, client, &args).await {
        Ok(response) => json!({
            "jsonrpc": "2.0",
            "result": tool_result(&response)
        }),
        Err(e) => {
            warn!(tool = name, error = %e, "tool call failed");
            let code = match e {
                DispatchError::NotFound(_) => METHOD_NOT_FOUND,
                DispatchError::Internal(_) => INTERNAL_ERROR,
            };
            error_response(code, e.to_string())
        }
    }
}

/// MCP tool result: the response as pretty JSON text, flagged as an error
/// when the editor reported failure.
fn tool_result(response: &UeResponse) -> Value {
    let text = serde_json::to_string_pretty(response).unwrap_or_default();
    let mut result = json!({
        "content": [{ "type": "text", "text": text }]
    });
    if !response.success {
        result["isError"] = json!(true);
    }
    result
}

fn error_response(code: i64, message: String) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": {
            "code": code,
            "message": message
        }
    })
}

fn inject_id(mut response: Value, id: Value) -> Value {
    response["id"] = id;
    response
}

/// Write one response line to stdout and flush.
async fn write_response(stdout: &mut tokio::io::Stdout, response: &Value) {
    let mut output = serde_json::to_string(response).unwrap_or_default();
    output.push('\n');
    if let Err(e) = stdout.write_all(output.as_bytes()).await {
        error!(error = %e, "stdout write error");
    }
    if let Err(e) = stdout.flush().await {
        error!(error = %e, "stdout flush error");
    }
}
