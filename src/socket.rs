//! TCP client for the editor's command socket.
//!
//! [`SocketClient`] opens a fresh connection per command, writes a single
//! JSON request, and reads until the accumulated bytes parse as a JSON
//! document. There is no pooling and no shared state between calls, so
//! concurrent sends are independent (and unordered on the editor side).
//!
//! ## Framing
//!
//! The editor plugin neither length-prefixes nor delimits its messages: it
//! writes one JSON document and usually closes. The client therefore parses
//! eagerly after every chunk and treats the first successful parse as the
//! complete reply. See [`ReplyBuffer`] for the consequences.
//!
//! ## Failure modes
//!
//! - connect/read/write errors fail immediately ([`TransportError::Connect`],
//!   [`TransportError::Io`])
//! - nothing useful before [`SOCKET_TIMEOUT`] fails with [`TransportError::Timeout`]
//! - EOF with no bytes fails with [`TransportError::NoResponse`]
//! - EOF with unparseable bytes still succeeds, carrying the raw text

use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::protocol::{SocketRequest, UeResponse};

/// Port the editor's command plugin listens on.
pub const DEFAULT_TCP_PORT: u16 = 55557;

/// Budget for one whole socket exchange (connect + write + read).
pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

const READ_CHUNK: usize = 4096;

/// Errors from a single socket exchange.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("TCP connection error: {0}")]
    Connect(#[source] std::io::Error),
    #[error("TCP I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[error("TCP connection timeout after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("No response received from TCP server")]
    NoResponse,
    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Client for the editor's TCP command socket.
#[derive(Debug, Clone)]
pub struct SocketClient {
    host: String,
    port: u16,
    timeout: Duration,
}

impl SocketClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: SOCKET_TIMEOUT,
        }
    }

    /// Override the exchange timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Transport tag reported in [`UeResponse::method`].
    pub fn method_tag(&self) -> String {
        format!("TCP:{}", self.port)
    }

    /// Send one command and wait for the editor's reply.
    pub async fn send(&self, command: &str, params: &Value) -> Result<UeResponse, TransportError> {
        debug!(command, host = %self.host, port = self.port, "sending socket command");
        match tokio::time::timeout(self.timeout, self.exchange(command, params)).await {
            Ok(result) => result,
            // Dropping the exchange future closes the socket.
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        }
    }

    async fn exchange(&self, command: &str, params: &Value) -> Result<UeResponse, TransportError> {
        let message = serde_json::to_vec(&SocketRequest { command, params })?;

        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(TransportError::Connect)?;
        stream
            .write_all(&message)
            .await
            .map_err(TransportError::Io)?;

        let mut reply = ReplyBuffer::default();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = stream.read(&mut chunk).await.map_err(TransportError::Io)?;
            if n == 0 {
                debug!(command, bytes = reply.len(), "socket closed by editor");
                return reply.finish(self.method_tag());
            }
            if let Some(parsed) = reply.push(&chunk[..n]) {
                debug!(command, bytes = reply.len(), "socket reply complete");
                return Ok(UeResponse::from_socket_reply(parsed, self.method_tag()));
            }
        }
    }
}

/// Accumulates reply bytes and tries to parse them after every chunk.
///
/// The first chunk boundary at which the buffer holds exactly one JSON
/// document ends the read. A document followed by more bytes in the same
/// chunk never parses here and is only resolved at EOF (as raw text), and a
/// reply that happens to be valid JSON at an early chunk boundary is cut
/// short. The editor plugin writes one object per connection, so neither
/// happens in practice.
#[derive(Debug, Default)]
struct ReplyBuffer {
    bytes: Vec<u8>,
}

impl ReplyBuffer {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Append a chunk; returns the reply once the buffer parses.
    fn push(&mut self, chunk: &[u8]) -> Option<Value> {
        self.bytes.extend_from_slice(chunk);
        serde_json::from_slice(&self.bytes).ok()
    }

    /// Resolve the buffer at EOF. Any received bytes yield a response.
    fn finish(self, method: String) -> Result<UeResponse, TransportError> {
        if self.bytes.is_empty() {
            return Err(TransportError::NoResponse);
        }
        match serde_json::from_slice::<Value>(&self.bytes) {
            Ok(parsed) => Ok(UeResponse::from_socket_reply(parsed, method)),
            Err(_) => Ok(UeResponse::raw(&self.bytes, method)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dead_port, socket_editor};
    use serde_json::json;
    use tokio::net::TcpListener;

    fn client(port: u16) -> SocketClient {
        SocketClient::new("127.0.0.1", port).with_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn writes_type_and_params() {
        let (port, server) = socket_editor(vec![br#"{"status":"success"}"#.to_vec()], true).await;
        client(port)
            .send("spawn_actor", &json!({"name": "A"}))
            .await
            .unwrap();
        assert_eq!(
            server.await.unwrap(),
            json!({"type": "spawn_actor", "params": {"name": "A"}})
        );
    }

    #[tokio::test]
    async fn success_reply_without_close() {
        let (port, server) = socket_editor(
            vec![br#"{"status":"success","result":{"x":1}}"#.to_vec()],
            false,
        )
        .await;
        let r = client(port).send("ping", &json!({})).await.unwrap();
        assert!(r.success);
        assert_eq!(r.data, Some(json!({"x": 1})));
        assert_eq!(r.method, Some(format!("TCP:{port}")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn reply_split_across_chunks() {
        let (port, server) = socket_editor(
            vec![
                br#"{"status":"err"#.to_vec(),
                br#"or","error":"boom"}"#.to_vec(),
            ],
            false,
        )
        .await;
        let r = client(port).send("ping", &json!({})).await.unwrap();
        assert!(!r.success);
        assert_eq!(r.error.as_deref(), Some("boom"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unparseable_bytes_then_close_is_raw_success() {
        let samples: Vec<&[u8]> = vec![
            b"hello",
            b"{\"status\":",
            b"{} trailing",
            b"   ",
            b"\xff\xfe",
            b"[1, 2",
        ];
        for sample in samples {
            let (port, server) = socket_editor(vec![sample.to_vec()], true).await;
            let r = client(port).send("ping", &json!({})).await.unwrap();
            assert!(r.success, "sample {sample:?} should resolve");
            assert!(r.data.unwrap().get("rawResponse").is_some());
            server.await.unwrap();
        }
    }

    #[tokio::test]
    async fn close_without_bytes_is_no_response() {
        let (port, server) = socket_editor(vec![], true).await;
        let err = client(port).send("ping", &json!({})).await.unwrap_err();
        assert!(matches!(err, TransportError::NoResponse));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn silent_editor_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let err = SocketClient::new("127.0.0.1", port)
            .with_timeout(Duration::from_millis(100))
            .send("ping", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
        assert!(err.to_string().contains("timeout"));
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let port = dead_port().await;
        let err = client(port).send("ping", &json!({})).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)));
    }

    #[test]
    fn reply_buffer_parses_once_complete() {
        let mut buf = ReplyBuffer::default();
        assert!(buf.push(b"{\"status\"").is_none());
        assert_eq!(
            buf.push(b":\"success\"}"),
            Some(json!({"status": "success"}))
        );
    }

    #[test]
    fn reply_buffer_empty_finish_fails() {
        let err = ReplyBuffer::default().finish("TCP:1".into()).unwrap_err();
        assert!(matches!(err, TransportError::NoResponse));
    }
}
