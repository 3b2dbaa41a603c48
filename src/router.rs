//! Command routing across the two editor transports.
//!
//! [`CommandRouter::execute`] takes an abstract command name and params,
//! maps it to the command socket's vocabulary, and sends it there first. If
//! the socket fails for any reason (refused, timeout, no reply) the router
//! asks [`fallback_call`] for a Web Remote Control equivalent. Commands with
//! no HTTP equivalent fail with a result naming the command.
//!
//! ## Abstract commands
//!
//! | Command                 | Socket                    | Web Remote Control fallback      |
//! |-------------------------|---------------------------|----------------------------------|
//! | `get_project_info`      | `ping`                    | `GET /remote/info`               |
//! | `create_actor`          | `spawn_actor` (reshaped)  | `PUT /remote/object/call` spawn  |
//! | `spawn_actor`           | `spawn_actor`             | `PUT /remote/object/call` spawn  |
//! | `spawn_blueprint_actor` | `spawn_actor`             | `PUT /remote/object/call` spawn  |
//! | `save_all`              | `ping`                    | `PUT /remote/object/call` save   |
//! | anything else           | passed through unchanged  | none                             |
//!
//! Both transports sit behind traits ([`CommandChannel`], [`RemoteControl`])
//! so the router can be driven with in-memory transports.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::protocol::UeResponse;
use crate::remote_control::{RemoteCall, RemoteControlClient};
use crate::script::{self, Vector3};
use crate::socket::{SocketClient, TransportError};

pub const GET_PROJECT_INFO: &str = "get_project_info";
pub const CREATE_ACTOR: &str = "create_actor";
pub const SPAWN_ACTOR: &str = "spawn_actor";
pub const SPAWN_BLUEPRINT_ACTOR: &str = "spawn_blueprint_actor";
pub const SAVE_ALL: &str = "save_all";

const PING: &str = "ping";
const INFO_ENDPOINT: &str = "/remote/info";
const OBJECT_CALL_ENDPOINT: &str = "/remote/object/call";

/// Actor class the command plugin spawns for `create_actor`.
const SPAWNED_ACTOR_CLASS: &str = "StaticMeshActor";

/// Primary transport: the editor's TCP command socket.
#[allow(async_fn_in_trait)]
pub trait CommandChannel {
    async fn send(&self, command: &str, params: &Value) -> Result<UeResponse, TransportError>;

    /// Port reported by [`CommandRouter::test_connection`].
    fn port(&self) -> u16;
}

/// Secondary transport: Web Remote Control over HTTP.
#[allow(async_fn_in_trait)]
pub trait RemoteControl {
    async fn call(&self, call: &RemoteCall) -> UeResponse;

    fn active_port(&self) -> Option<u16>;
}

impl CommandChannel for SocketClient {
    async fn send(&self, command: &str, params: &Value) -> Result<UeResponse, TransportError> {
        SocketClient::send(self, command, params).await
    }

    fn port(&self) -> u16 {
        SocketClient::port(self)
    }
}

impl RemoteControl for RemoteControlClient {
    async fn call(&self, call: &RemoteCall) -> UeResponse {
        RemoteControlClient::call(self, call).await
    }

    fn active_port(&self) -> Option<u16> {
        RemoteControlClient::active_port(self)
    }
}

/// The client shared by every tool handler.
pub type UnrealClient = CommandRouter<SocketClient, RemoteControlClient>;

/// Routes abstract commands to the socket, falling back to HTTP.
pub struct CommandRouter<S, H> {
    socket: S,
    remote: H,
}

impl UnrealClient {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            SocketClient::new(config.host.clone(), config.tcp_port),
            RemoteControlClient::new(config),
        )
    }
}

impl<S: CommandChannel, H: RemoteControl> CommandRouter<S, H> {
    pub fn new(socket: S, remote: H) -> Self {
        Self { socket, remote }
    }

    /// Run an abstract command: socket first, then the HTTP fallback if one
    /// is defined. Always produces exactly one result.
    pub async fn execute(&self, command: &str, params: Option<Value>) -> UeResponse {
        let params = params.unwrap_or_else(|| json!({}));
        let (socket_command, socket_params) = socket_request(command, &params);

        let socket_error = match self.socket.send(socket_command, &socket_params).await {
            Ok(response) => return response,
            Err(e) => e,
        };
        warn!(command, error = %socket_error, "TCP failed, trying Web Remote Control");

        match fallback_call(command, &params) {
            Some(call) => {
                debug!(command, endpoint = %call.endpoint, method = %call.method, "Web Remote Control fallback");
                self.remote.call(&call).await
            }
            None => UeResponse::failure(format!(
                "Command '{command}' failed on both TCP and Web Remote Control"
            )),
        }
    }

    pub async fn project_info(&self) -> UeResponse {
        self.execute(GET_PROJECT_INFO, None).await
    }

    /// Spawn an actor of `class_name`. Basic shape classes (`CubeActor`,
    /// `SphereActor`, `CylinderActor`) resolve to engine mesh paths; other
    /// names pass through as the blueprint path.
    pub async fn create_actor(&self, class_name: &str, location: Option<Value>) -> UeResponse {
        self.execute(CREATE_ACTOR, Some(create_actor_params(class_name, location)))
            .await
    }

    pub async fn save_all(&self) -> UeResponse {
        self.execute(SAVE_ALL, None).await
    }

    /// Probe both transports and report which one answered.
    pub async fn test_connection(&self) -> UeResponse {
        match self.socket.send(PING, &json!({})).await {
            Ok(pong) => {
                let method = format!("TCP:{}", self.socket.port());
                connection_report(json!({
                    "activePort": self.socket.port(),
                    "method": method,
                    "info": pong.data,
                }))
            }
            Err(e) => {
                warn!(error = %e, "TCP ping failed, probing Web Remote Control");
                let result = self.remote.call(&RemoteCall::get(INFO_ENDPOINT)).await;
                if !result.success {
                    return result;
                }
                connection_report(json!({
                    "activePort": self.remote.active_port(),
                    "method": result.method,
                    "info": result.data,
                }))
            }
        }
    }

    /// Last Web Remote Control port that answered, if any.
    pub fn active_port(&self) -> Option<u16> {
        self.remote.active_port()
    }
}

fn connection_report(data: Value) -> UeResponse {
    UeResponse {
        success: true,
        data: Some(data),
        error: None,
        method: None,
    }
}

/// Socket command and params for an abstract command.
pub fn socket_request<'a>(command: &'a str, params: &Value) -> (&'a str, Value) {
    match command {
        GET_PROJECT_INFO | SAVE_ALL => (PING, json!({})),
        CREATE_ACTOR => {
            let name = params
                .get("actor_name")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| unique_actor_name("Actor"));
            let location = location_components(params.get("location"));
            (
                SPAWN_ACTOR,
                json!({
                    "type": SPAWNED_ACTOR_CLASS,
                    "name": name,
                    "location": location,
                }),
            )
        }
        SPAWN_ACTOR | SPAWN_BLUEPRINT_ACTOR => (SPAWN_ACTOR, params.clone()),
        _ => (command, params.clone()),
    }
}

/// Web Remote Control equivalent of an abstract command, if it has one.
pub fn fallback_call(command: &str, params: &Value) -> Option<RemoteCall> {
    match command {
        GET_PROJECT_INFO => Some(RemoteCall::get(INFO_ENDPOINT)),
        CREATE_ACTOR | SPAWN_ACTOR | SPAWN_BLUEPRINT_ACTOR => {
            let location = location_vector(params.get("location"));
            let blueprint_path = params
                .get("blueprint_path")
                .and_then(Value::as_str)
                .unwrap_or(CUBE_MESH);
            let label = params
                .get("actor_name")
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| unique_actor_name("Actor"));
            let script = script::spawn_actor_script(location, blueprint_path, &label);
            Some(RemoteCall::put(
                OBJECT_CALL_ENDPOINT,
                script::python_call_payload(script),
            ))
        }
        SAVE_ALL => Some(RemoteCall::put(
            OBJECT_CALL_ENDPOINT,
            script::python_call_payload(script::save_all_script()),
        )),
        _ => None,
    }
}

const CUBE_MESH: &str = "/Engine/BasicShapes/Cube";
const SPHERE_MESH: &str = "/Engine/BasicShapes/Sphere";
const CYLINDER_MESH: &str = "/Engine/BasicShapes/Cylinder";

/// Blueprint (or mesh) path for a tool-level actor class name.
pub fn blueprint_path_for(class_name: &str) -> &str {
    match class_name {
        "CubeActor" => CUBE_MESH,
        "SphereActor" => SPHERE_MESH,
        "CylinderActor" => CYLINDER_MESH,
        other => other,
    }
}

/// Params for `create_actor`. The location is passed through untouched.
pub fn create_actor_params(class_name: &str, location: Option<Value>) -> Value {
    json!({
        "blueprint_path": blueprint_path_for(class_name),
        "location": location.unwrap_or_else(|| json!({ "x": 0, "y": 0, "z": 0 })),
        "actor_name": unique_actor_name(class_name),
    })
}

/// `<prefix>_<unix millis>`, matching the editor-side naming convention.
fn unique_actor_name(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{prefix}_{millis}")
}

/// `[x, y, z]` from `{x, y, z}` or a 3-element array, values untouched.
/// Missing components are `0`.
fn location_components(location: Option<&Value>) -> [Value; 3] {
    let zero = || json!(0);
    match location {
        Some(Value::Object(map)) => ["x", "y", "z"].map(|k| map.get(k).cloned().unwrap_or_else(zero)),
        Some(Value::Array(items)) => {
            [0, 1, 2].map(|i| items.get(i).cloned().unwrap_or_else(zero))
        }
        _ => [zero(), zero(), zero()],
    }
}

fn location_vector(location: Option<&Value>) -> Vector3 {
    let [x, y, z] = location_components(location).map(|v| v.as_f64().unwrap_or(0.0));
    Vector3 { x, y, z }
}
