//! HTTP client for the editor's Web Remote Control plugin.
//!
//! [`RemoteControlClient`] wraps `reqwest::Client` and searches a list of
//! candidate ports for a live Web Remote Control server. The first port that
//! answers is remembered as the active port and tried first next time.
//!
//! ## Port search
//!
//! Candidates are, in order: the active port (if any), the configured
//! primary port, then the fallback list. Zero entries and duplicates are
//! dropped. Each candidate gets exactly one attempt; there is no backoff.
//!
//! ## Error handling
//!
//! [`RemoteControlClient::send`] never returns an error. Exhausting every
//! port yields a failed [`UeResponse`] naming the ports that were tried.
//! Only a `2xx` response counts as an answer. Any other status is a port
//! failure, so an unrelated web server on a fallback port is skipped and
//! never becomes the active port.

use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::protocol::{HttpMethod, UeResponse};

/// Default per-attempt timeout for `GET`.
pub const READ_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default per-attempt timeout for `PUT` and `POST`.
pub const WRITE_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// One Web Remote Control request.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub endpoint: String,
    pub method: HttpMethod,
    pub payload: Option<Value>,
}

impl RemoteCall {
    pub fn get(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method: HttpMethod::Get,
            payload: None,
        }
    }

    pub fn put(endpoint: &str, payload: Value) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            method: HttpMethod::Put,
            payload: Some(payload),
        }
    }
}

/// Last port that answered. Written only on success, never cleared.
///
/// Concurrent writers race benignly: every value stored is a port that
/// worked, and the last write wins.
#[derive(Debug, Default)]
pub struct ActivePort(AtomicU16);

impl ActivePort {
    pub fn get(&self) -> Option<u16> {
        match self.0.load(Ordering::Relaxed) {
            0 => None,
            port => Some(port),
        }
    }

    fn record(&self, port: u16) {
        self.0.store(port, Ordering::Relaxed);
    }
}

/// HTTP client for Web Remote Control with port fallback.
pub struct RemoteControlClient {
    http: reqwest::Client,
    host: String,
    http_port: u16,
    fallback_ports: Vec<u16>,
    active_port: ActivePort,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl RemoteControlClient {
    pub fn new(config: &ClientConfig) -> Self {
        let mut default_headers = reqwest::header::HeaderMap::new();
        default_headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(default_headers)
            .user_agent(concat!("mcp-unreal/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .no_proxy()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            http,
            host: config.host.clone(),
            http_port: config.http_port,
            fallback_ports: config.fallback_ports.clone(),
            active_port: ActivePort::default(),
            read_timeout: READ_ATTEMPT_TIMEOUT,
            write_timeout: WRITE_ATTEMPT_TIMEOUT,
        }
    }

    /// Override the per-attempt timeouts (`GET`, then `PUT`/`POST`).
    pub fn with_attempt_timeouts(mut self, read: Duration, write: Duration) -> Self {
        self.read_timeout = read;
        self.write_timeout = write;
        self
    }

    pub fn active_port(&self) -> Option<u16> {
        self.active_port.get()
    }

    /// Ports to try for the next request, in order.
    pub fn candidate_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = Vec::with_capacity(self.fallback_ports.len() + 2);
        let ordered = self
            .active_port
            .get()
            .into_iter()
            .chain(std::iter::once(self.http_port))
            .chain(self.fallback_ports.iter().copied());
        for port in ordered {
            if port != 0 && !ports.contains(&port) {
                ports.push(port);
            }
        }
        ports
    }

    /// Issue `method endpoint` against each candidate port until one answers.
    pub async fn send(&self, endpoint: &str, method: HttpMethod, payload: Option<&Value>) -> UeResponse {
        let ports = self.candidate_ports();
        for &port in &ports {
            match self.attempt(port, endpoint, method, payload).await {
                Ok(body) => {
                    debug!(port, %method, endpoint, "Web Remote Control answered");
                    self.active_port.record(port);
                    return UeResponse::success(body, format!("WebRemoteControl:{port}"));
                }
                Err(e) => {
                    warn!(port, %method, endpoint, error = %e, "Web Remote Control port failed");
                }
            }
        }

        let tried = ports
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        UeResponse {
            success: false,
            data: None,
            error: Some(format!(
                "Web Remote Control not responding on any port. Tried: {tried}"
            )),
            method: Some("none".to_string()),
        }
    }

    /// [`send`](Self::send) for a prepared [`RemoteCall`].
    pub async fn call(&self, call: &RemoteCall) -> UeResponse {
        self.send(&call.endpoint, call.method, call.payload.as_ref())
            .await
    }

    /// One request to one port. Non-`2xx` statuses are errors. The body is
    /// returned as JSON when it parses, otherwise as a JSON string.
    async fn attempt(
        &self,
        port: u16,
        endpoint: &str,
        method: HttpMethod,
        payload: Option<&Value>,
    ) -> Result<Value, reqwest::Error> {
        let url = format!("http://{}:{}{}", self.host, port, endpoint);
        let request = match method {
            HttpMethod::Get => self.http.get(&url).timeout(self.read_timeout),
            HttpMethod::Put => self.http.put(&url).timeout(self.write_timeout),
            HttpMethod::Post => self.http.post(&url).timeout(self.write_timeout),
        };
        let request = match (method, payload) {
            (HttpMethod::Get, _) | (_, None) => request,
            (_, Some(body)) => request.json(body),
        };

        let body = request.send().await?.error_for_status()?.text().await?;
        Ok(match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) => Value::String(body),
        })
    }
}
