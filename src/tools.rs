//! MCP tool definitions and handlers.
//!
//! Each tool is a [`ToolDescriptor`]: a name, a description, a JSON schema
//! for its arguments, and a [`ToolOperation`]. Implemented tools translate
//! their arguments into a [`CommandRouter`](crate::router::CommandRouter)
//! call. Tools the editor side has no command for are registered as
//! [`ToolOperation::NotSupported`] and answer with a fixed failure, so the
//! gap is visible in the registry rather than hidden in handler bodies.
//!
//! ## Tools
//!
//! - **Implemented**: `create_actor`, `project_info`, `save_all`,
//!   `connection_status`
//! - **Not supported**: `get_actors`, `modify_actor`, `delete_actor`,
//!   `create_blueprint`, `execute_command`, `build_lighting`
//!
//! Schemas are descriptive only; the calling agent host is expected to
//! respect them. Handlers read just the fields they need.

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::protocol::UeResponse;
use crate::router::UnrealClient;

/// Async tool handler bound to the shared client.
pub type Handler =
    for<'a> fn(&'a UnrealClient, &'a Value) -> BoxFuture<'a, Result<UeResponse, ToolError>>;

/// What invoking a tool does.
pub enum ToolOperation {
    Implemented(Handler),
    /// The editor exposes no command for this; always fails with the reason.
    NotSupported(&'static str),
}

pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub operation: ToolOperation,
}

impl ToolDescriptor {
    /// `{name, description, inputSchema}` as listed by `tools/list`.
    pub fn definition(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }
}

/// A handler could not make sense of its arguments.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Missing required parameter: {0}")]
    MissingArgument(&'static str),
    #[error("Invalid parameter '{name}': {source}")]
    InvalidArgument {
        name: &'static str,
        source: serde_json::Error,
    },
}

/// Why a tool call produced no result.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Tool not found: {0}")]
    NotFound(String),
    #[error("Tool execution failed: {0}")]
    Internal(String),
}

/// Every tool this server exposes, in listing order.
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn builtin() -> Self {
        Self {
            tools: builtin_tools(),
        }
    }

    pub fn definitions(&self) -> Vec<Value> {
        self.tools.iter().map(ToolDescriptor::definition).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Look up `name` and run it against `client`.
    pub async fn invoke(
        &self,
        name: &str,
        client: &UnrealClient,
        args: &Value,
    ) -> Result<UeResponse, DispatchError> {
        let tool = self
            .get(name)
            .ok_or_else(|| DispatchError::NotFound(name.to_string()))?;
        match &tool.operation {
            ToolOperation::Implemented(handler) => handler(client, args)
                .await
                .map_err(|e| DispatchError::Internal(e.to_string())),
            ToolOperation::NotSupported(reason) => Ok(UeResponse::failure(*reason)),
        }
    }
}

fn builtin_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "create_actor",
            description: "Create a new actor in the Unreal Engine level. Supports all actor types including meshes, lights, cameras, etc.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "className": {
                        "type": "string",
                        "description": "The class name of the actor to create (e.g., StaticMeshActor, PointLight, CameraActor, CubeActor)"
                    },
                    "location": {
                        "type": "object",
                        "properties": {
                            "x": { "type": "number" },
                            "y": { "type": "number" },
                            "z": { "type": "number" }
                        },
                        "description": "World location for the actor"
                    },
                    "rotation": {
                        "type": "object",
                        "properties": {
                            "pitch": { "type": "number" },
                            "yaw": { "type": "number" },
                            "roll": { "type": "number" }
                        },
                        "description": "Rotation in degrees"
                    },
                    "scale": {
                        "type": "object",
                        "properties": {
                            "x": { "type": "number" },
                            "y": { "type": "number" },
                            "z": { "type": "number" }
                        },
                        "description": "Scale of the actor"
                    },
                    "name": {
                        "type": "string",
                        "description": "Custom name for the actor"
                    }
                },
                "required": ["className"]
            }),
            operation: ToolOperation::Implemented(handle_create_actor),
        },
        ToolDescriptor {
            name: "get_actors",
            description: "Get a list of actors in the current level, optionally filtered by class name",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "className": {
                        "type": "string",
                        "description": "Optional filter by actor class name"
                    }
                }
            }),
            operation: ToolOperation::NotSupported("Get actors not implemented yet"),
        },
        ToolDescriptor {
            name: "modify_actor",
            description: "Modify properties of an existing actor",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "actorId": {
                        "type": "string",
                        "description": "The ID or name of the actor to modify"
                    },
                    "properties": {
                        "type": "object",
                        "description": "Properties to modify (e.g., location, rotation, scale, visibility, material)"
                    }
                },
                "required": ["actorId", "properties"]
            }),
            operation: ToolOperation::NotSupported("Modify actor not implemented yet"),
        },
        ToolDescriptor {
            name: "delete_actor",
            description: "Delete an actor from the level",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "actorId": {
                        "type": "string",
                        "description": "The ID or name of the actor to delete"
                    }
                },
                "required": ["actorId"]
            }),
            operation: ToolOperation::NotSupported("Delete actor not implemented yet"),
        },
        ToolDescriptor {
            name: "create_blueprint",
            description: "Create a new Blueprint class",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name of the Blueprint"
                    },
                    "parentClass": {
                        "type": "string",
                        "description": "Parent class to inherit from (e.g., Actor, Pawn, Character)"
                    },
                    "path": {
                        "type": "string",
                        "description": "Content path where to save the Blueprint (e.g., /Game/Blueprints/)"
                    }
                },
                "required": ["name", "parentClass", "path"]
            }),
            operation: ToolOperation::NotSupported("Create blueprint not implemented yet"),
        },
        ToolDescriptor {
            name: "execute_command",
            description: "Execute a console command in Unreal Engine",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The console command to execute"
                    }
                },
                "required": ["command"]
            }),
            operation: ToolOperation::NotSupported("Console command not implemented yet"),
        },
        ToolDescriptor {
            name: "project_info",
            description: "Get information about the current Unreal Engine project",
            input_schema: empty_schema(),
            operation: ToolOperation::Implemented(handle_project_info),
        },
        ToolDescriptor {
            name: "save_all",
            description: "Save all unsaved assets and levels in the project",
            input_schema: empty_schema(),
            operation: ToolOperation::Implemented(handle_save_all),
        },
        ToolDescriptor {
            name: "build_lighting",
            description: "Build lighting for the current level",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "quality": {
                        "type": "string",
                        "enum": ["Preview", "Medium", "High", "Production"],
                        "description": "Lighting build quality"
                    }
                }
            }),
            operation: ToolOperation::NotSupported("Build lighting not implemented yet"),
        },
        ToolDescriptor {
            name: "connection_status",
            description: "Check which editor transport is reachable (TCP command socket or Web Remote Control) and report the active port.",
            input_schema: empty_schema(),
            operation: ToolOperation::Implemented(handle_connection_status),
        },
    ]
}

fn empty_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

fn required_arg<T: DeserializeOwned>(args: &Value, name: &'static str) -> Result<T, ToolError> {
    let value = args.get(name).ok_or(ToolError::MissingArgument(name))?;
    serde_json::from_value(value.clone()).map_err(|source| ToolError::InvalidArgument { name, source })
}

fn handle_create_actor<'a>(
    client: &'a UnrealClient,
    args: &'a Value,
) -> BoxFuture<'a, Result<UeResponse, ToolError>> {
    Box::pin(async move {
        let class_name: String = required_arg(args, "className")?;
        Ok(client
            .create_actor(&class_name, args.get("location").cloned())
            .await)
    })
}

fn handle_project_info<'a>(
    client: &'a UnrealClient,
    _args: &'a Value,
) -> BoxFuture<'a, Result<UeResponse, ToolError>> {
    Box::pin(async move { Ok(client.project_info().await) })
}

fn handle_save_all<'a>(
    client: &'a UnrealClient,
    _args: &'a Value,
) -> BoxFuture<'a, Result<UeResponse, ToolError>> {
    Box::pin(async move { Ok(client.save_all().await) })
}

fn handle_connection_status<'a>(
    client: &'a UnrealClient,
    _args: &'a Value,
) -> BoxFuture<'a, Result<UeResponse, ToolError>> {
    Box::pin(async move { Ok(client.test_connection().await) })
}
