//! Configuration loading for mcp-unreal.
//!
//! Every setting is resolved from the first source that provides it:
//!
//! 1. **CLI flags** (`--host`, `--http-port`, ...)
//! 2. **Environment variables**: `UNREAL_HOST`, `UNREAL_HTTP_PORT`,
//!    `UNREAL_TCP_PORT`, `UNREAL_FALLBACK_PORTS` (comma-separated),
//!    `UNREAL_TIMEOUT_MS`
//! 3. **JSON file** via `--config <path>` or `UNREAL_MCP_CONFIG`
//! 4. **Defaults**: `localhost`, HTTP `30010`, TCP `55557`, fallbacks
//!    `30020, 30000, 8080, 7777`, timeout 15 s, log level `info`
//!
//! Example file:
//!
//! ```json
//! {
//!   "host": "192.168.1.20",
//!   "http_port": 30010,
//!   "tcp_port": 55557,
//!   "fallback_ports": [30020, 30000],
//!   "timeout_ms": 15000,
//!   "log_level": "debug"
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::socket::DEFAULT_TCP_PORT;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_HTTP_PORT: u16 = 30010;
pub const DEFAULT_FALLBACK_PORTS: [u16; 4] = [30020, 30000, 8080, 7777];
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// CLI arguments parsed by `clap`.
#[derive(Parser, Debug, Default)]
#[command(name = "mcp-unreal", version, about = "MCP server for a running Unreal Editor")]
pub struct Cli {
    /// Path to a JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Editor host name or address
    #[arg(long)]
    pub host: Option<String>,
    /// Primary Web Remote Control port
    #[arg(long)]
    pub http_port: Option<u16>,
    /// Command socket port
    #[arg(long)]
    pub tcp_port: Option<u16>,
    /// Web Remote Control ports to try after the primary, comma-separated
    #[arg(long, value_delimiter = ',')]
    pub fallback_ports: Option<Vec<u16>>,
    /// Default HTTP request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    /// tracing filter (overridden by RUST_LOG)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Raw JSON config file structure. Every field is optional.
#[derive(Deserialize, Debug, Default)]
pub struct FileConfig {
    pub host: Option<String>,
    pub http_port: Option<u16>,
    pub tcp_port: Option<u16>,
    pub fallback_ports: Option<Vec<u16>>,
    pub timeout_ms: Option<u64>,
    pub log_level: Option<String>,
}

/// Connection settings for both editor transports.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub host: String,
    /// First Web Remote Control port tried (after the active port).
    pub http_port: u16,
    pub tcp_port: u16,
    pub fallback_ports: Vec<u16>,
    /// Default timeout of the HTTP client.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            tcp_port: DEFAULT_TCP_PORT,
            fallback_ports: DEFAULT_FALLBACK_PORTS.to_vec(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Validated configuration ready for use.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub client: ClientConfig,
    pub log_level: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },
    #[error("{0}")]
    Invalid(String),
}

/// Load and validate configuration from CLI args, env vars, and config file.
pub fn load_config(cli: &Cli) -> Result<ResolvedConfig, ConfigError> {
    resolve(cli, |name| std::env::var(name).ok())
}

fn resolve(cli: &Cli, env: impl Fn(&str) -> Option<String>) -> Result<ResolvedConfig, ConfigError> {
    let file_path = cli
        .config
        .clone()
        .or_else(|| env("UNREAL_MCP_CONFIG").map(PathBuf::from));
    let file = match file_path {
        Some(path) => load_file(&expand_tilde(&path, env("HOME")))?,
        None => FileConfig::default(),
    };

    let defaults = ClientConfig::default();
    let host = cli
        .host
        .clone()
        .or_else(|| env("UNREAL_HOST"))
        .or(file.host)
        .unwrap_or(defaults.host);
    let http_port = match cli.http_port {
        Some(p) => p,
        None => env_parsed(&env, "UNREAL_HTTP_PORT")?
            .or(file.http_port)
            .unwrap_or(defaults.http_port),
    };
    let tcp_port = match cli.tcp_port {
        Some(p) => p,
        None => env_parsed(&env, "UNREAL_TCP_PORT")?
            .or(file.tcp_port)
            .unwrap_or(defaults.tcp_port),
    };
    let fallback_ports = match &cli.fallback_ports {
        Some(ports) => ports.clone(),
        None => env_ports(&env, "UNREAL_FALLBACK_PORTS")?
            .or(file.fallback_ports)
            .unwrap_or(defaults.fallback_ports),
    };
    let timeout_ms = match cli.timeout_ms {
        Some(t) => t,
        None => env_parsed(&env, "UNREAL_TIMEOUT_MS")?
            .or(file.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS),
    };
    let log_level = cli
        .log_level
        .clone()
        .or(file.log_level)
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    let client = ClientConfig {
        host,
        http_port,
        tcp_port,
        fallback_ports,
        timeout: Duration::from_millis(timeout_ms),
    };
    validate(&client)?;

    Ok(ResolvedConfig { client, log_level })
}

fn validate(client: &ClientConfig) -> Result<(), ConfigError> {
    if client.host.trim().is_empty() {
        return Err(ConfigError::Invalid("host is empty".into()));
    }
    if client.http_port == 0 {
        return Err(ConfigError::Invalid("http_port must be non-zero".into()));
    }
    if client.tcp_port == 0 {
        return Err(ConfigError::Invalid("tcp_port must be non-zero".into()));
    }
    if client.fallback_ports.contains(&0) {
        return Err(ConfigError::Invalid(
            "fallback_ports must not contain 0".into(),
        ));
    }
    if client.timeout.is_zero() {
        return Err(ConfigError::Invalid("timeout_ms must be non-zero".into()));
    }
    Ok(())
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_parsed<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match env(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
    }
}

fn env_ports(
    env: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Vec<u16>>, ConfigError> {
    let Some(value) = env(var) else {
        return Ok(None);
    };
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<u16>)
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

/// Expand a leading `~` to `$HOME`.
fn expand_tilde(path: &Path, home: Option<String>) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = home {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}
