//! Declarative command catalogue.
//!
//! The command vocabulary is a small, fixed, closed set. Each operation is
//! pure data: its wire name, the parameters it declares, which endpoint it
//! targets, an optional per-call timeout override, and how its response is
//! post-processed. One generic dispatcher in [`crate::tools`] consumes this
//! table; there is no per-operation call/encode/decode code.

use std::time::Duration;

use serde_json::{json, Value};

use crate::bridge::Command;
use crate::endpoint::{Target, SCREENSHOT_TIMEOUT};

/// Declared type of a command parameter. Validation is shape-only; semantic
/// validity (e.g. whether a node path resolves) is the remote side's call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Object,
    List,
}

impl ParamKind {
    pub fn schema_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Object => "object",
            ParamKind::List => "array",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Number => value.is_number(),
            ParamKind::Object => value.is_object(),
            ParamKind::List => value.is_array(),
        }
    }

    /// Default used when an optional parameter is omitted. Optional
    /// parameters are still included in the outgoing document.
    fn empty_value(self) -> Value {
        match self {
            ParamKind::String => json!(""),
            ParamKind::Number => json!(0),
            ParamKind::Object => json!({}),
            ParamKind::List => json!([]),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
}

const fn required(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: ParamKind) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: false,
    }
}

/// Response post-processing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Post {
    /// Return the decoded JSON value, pretty-printed.
    PrettyJson,
    /// Require `image_base64` in the result and decode it as a PNG.
    PngImage,
}

#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub target: Target,
    pub params: &'static [ParamSpec],
    /// Per-call timeout override; `None` means the endpoint default.
    pub timeout: Option<Duration>,
    pub post: Post,
}

const NO_PARAMS: &[ParamSpec] = &[];
const NODE_PATH: &[ParamSpec] = &[required("node_path", ParamKind::String)];
const SCENE_PATH: &[ParamSpec] = &[required("scene_path", ParamKind::String)];

pub const CATALOG: &[ToolSpec] = &[
    // -- Editor commands (plugin on TCP:9500) --------------------------------
    ToolSpec {
        name: "get_scene_tree",
        description: "Get the scene tree from the Godot editor showing all nodes, their types, and hierarchy",
        target: Target::Editor,
        params: NO_PARAMS,
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "get_node_properties",
        description: "Get all properties of a node in the editor scene tree",
        target: Target::Editor,
        params: NODE_PATH,
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "modify_node",
        description: "Set properties on a node in the editor scene tree",
        target: Target::Editor,
        params: &[
            required("node_path", ParamKind::String),
            required("properties", ParamKind::Object),
        ],
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "create_node",
        description: "Create a new node under a parent in the editor scene tree",
        target: Target::Editor,
        params: &[
            required("parent_path", ParamKind::String),
            required("type", ParamKind::String),
            required("name", ParamKind::String),
        ],
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "delete_node",
        description: "Delete a node from the editor scene tree",
        target: Target::Editor,
        params: NODE_PATH,
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "create_resource",
        description: "Create a resource and assign it to a node property",
        target: Target::Editor,
        params: &[
            required("node_path", ParamKind::String),
            required("property", ParamKind::String),
            required("resource_type", ParamKind::String),
            optional("resource_properties", ParamKind::Object),
        ],
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "attach_script",
        description: "Attach a script to a node, either inline source code or an existing script file",
        target: Target::Editor,
        params: &[
            required("node_path", ParamKind::String),
            optional("code", ParamKind::String),
            optional("script_path", ParamKind::String),
        ],
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "list_signals",
        description: "List the signals a node exposes and their current connections",
        target: Target::Editor,
        params: NODE_PATH,
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "connect_signal",
        description: "Connect a signal on one node to a method on another",
        target: Target::Editor,
        params: &[
            required("node_path", ParamKind::String),
            required("signal", ParamKind::String),
            required("target_path", ParamKind::String),
            required("method", ParamKind::String),
        ],
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "list_resource_files",
        description: "List resource files in the project, optionally filtered by directory and extensions",
        target: Target::Editor,
        params: &[
            optional("directory", ParamKind::String),
            optional("extensions", ParamKind::List),
        ],
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "instance_scene",
        description: "Instance a saved scene file under a parent node",
        target: Target::Editor,
        params: &[
            required("scene_path", ParamKind::String),
            required("parent_path", ParamKind::String),
        ],
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "run_project",
        description: "Run the Godot project (play the main scene)",
        target: Target::Editor,
        params: NO_PARAMS,
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "stop_project",
        description: "Stop the currently running Godot game",
        target: Target::Editor,
        params: NO_PARAMS,
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "save_scene",
        description: "Save the currently edited scene",
        target: Target::Editor,
        params: NO_PARAMS,
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "open_scene",
        description: "Open a scene file in the editor",
        target: Target::Editor,
        params: SCENE_PATH,
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "run_scene",
        description: "Run a specific scene instead of the project main scene",
        target: Target::Editor,
        params: SCENE_PATH,
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "get_editor_state",
        description: "Get the current editor state (open scene, whether the game is running, etc.)",
        target: Target::Editor,
        params: NO_PARAMS,
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "get_output",
        description: "Retrieve recent lines from the editor output log",
        target: Target::Editor,
        params: NO_PARAMS,
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "undo",
        description: "Undo the last editor action",
        target: Target::Editor,
        params: NO_PARAMS,
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "redo",
        description: "Redo the last undone editor action",
        target: Target::Editor,
        params: NO_PARAMS,
        timeout: None,
        post: Post::PrettyJson,
    },
    // -- Game commands (autoload on TCP:9501) --------------------------------
    ToolSpec {
        name: "screenshot",
        description: "Take a screenshot of the running game; returns a PNG image",
        target: Target::Game,
        params: NO_PARAMS,
        timeout: Some(SCREENSHOT_TIMEOUT),
        post: Post::PngImage,
    },
    ToolSpec {
        name: "click",
        description: "Send a synthetic click at viewport coordinates in the running game",
        target: Target::Game,
        params: &[
            required("x", ParamKind::Number),
            required("y", ParamKind::Number),
        ],
        timeout: None,
        post: Post::PrettyJson,
    },
    ToolSpec {
        name: "get_runtime_tree",
        description: "Get the live scene tree from the running game",
        target: Target::Game,
        params: NO_PARAMS,
        timeout: None,
        post: Post::PrettyJson,
    },
];

/// Look up a tool by wire name.
pub fn find(name: &str) -> Option<&'static ToolSpec> {
    CATALOG.iter().find(|spec| spec.name == name)
}

/// Build the outgoing command for a tool from caller arguments.
///
/// Required parameters must be present with the declared shape; optional
/// parameters default to their empty value and are still included in the
/// document.
pub fn build_command(spec: &ToolSpec, arguments: &Value) -> Result<Command, String> {
    let args = match arguments {
        Value::Object(map) => map.clone(),
        Value::Null => serde_json::Map::new(),
        _ => return Err("arguments must be a JSON object".to_string()),
    };

    let mut command = Command::new(spec.name);
    for param in spec.params {
        match args.get(param.name) {
            Some(value) => {
                if !param.kind.matches(value) {
                    return Err(format!(
                        "parameter '{}' must be of type {}",
                        param.name,
                        param.kind.schema_type()
                    ));
                }
                command.params.insert(param.name.to_string(), value.clone());
            }
            None if param.required => {
                return Err(format!("missing required parameter: {}", param.name));
            }
            None => {
                command
                    .params
                    .insert(param.name.to_string(), param.kind.empty_value());
            }
        }
    }
    Ok(command)
}
