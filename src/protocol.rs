//! Wire types shared by both editor transports.
//!
//! [`UeResponse`] is the single result shape every command produces, whichever
//! transport satisfied it. The socket protocol types ([`SocketRequest`] and
//! the reply mapping in [`UeResponse::from_socket_reply`]) mirror what the
//! editor's command plugin reads and writes on its TCP port.
//!
//! ## Socket protocol
//!
//! ```text
//! client -> editor   {"type": "<command>", "params": {...}}
//! editor -> client   {"status": "success" | "<other>", "result"?: any, "error"?: "..."}
//! ```

use serde::Serialize;
use serde_json::{json, Value};

/// Result of one editor command.
///
/// `method` tags which transport answered: `TCP:<port>`,
/// `WebRemoteControl:<port>`, or `none` when every HTTP port failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl UeResponse {
    pub fn success(data: Value, method: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            method: Some(method.into()),
        }
    }

    /// A failure that never reached a transport.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            method: None,
        }
    }

    /// Map a parsed socket reply into a response.
    ///
    /// `result` becomes `data`. A successful reply without `result` (e.g. the
    /// plugin's `ping` answer) keeps the whole reply as `data` so nothing the
    /// editor said is lost.
    pub fn from_socket_reply(reply: Value, method: String) -> Self {
        let success = reply.get("status").and_then(Value::as_str) == Some("success");
        let error = reply
            .get("error")
            .and_then(Value::as_str)
            .map(String::from);
        let data = match reply.get("result") {
            Some(result) if !result.is_null() => Some(result.clone()),
            _ if success => Some(reply),
            _ => None,
        };
        Self {
            success,
            data,
            error,
            method: Some(method),
        }
    }

    /// Wrap bytes that never parsed as JSON. Used when the editor closes the
    /// connection after sending something unparseable.
    pub fn raw(bytes: &[u8], method: String) -> Self {
        let text = String::from_utf8_lossy(bytes);
        Self::success(json!({ "rawResponse": text.trim() }), method)
    }
}

/// Request written to the editor's command socket.
#[derive(Debug, Serialize)]
pub struct SocketRequest<'a> {
    #[serde(rename = "type")]
    pub command: &'a str,
    pub params: &'a Value,
}

/// HTTP verb for a Web Remote Control call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}
