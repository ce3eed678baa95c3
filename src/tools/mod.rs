//! Tools the agents can call, plus their declarations and registry.

mod greeting;
mod weather;

pub use greeting::{SayGoodbye, SayHello, say_goodbye, say_hello};
pub use weather::{WEATHER_TOOL_NAME, WeatherTool, get_weather_stateful};
pub(crate) use weather::capitalize;

use crate::error::{Error, Result};
use crate::state::SessionState;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

/// A single declared tool argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolArg {
    pub name: String,
    /// JSON Schema type name ("string", "integer", ...)
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub required: bool,
}

/// Declaration of a tool as shown to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub args: Vec<ToolArg>,
    pub returns: Option<String>,
}

impl ToolInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            args: Vec::new(),
            returns: None,
        }
    }

    pub fn arg_required(
        self,
        name: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.arg(name, kind, description, true)
    }

    pub fn arg_optional(
        self,
        name: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.arg(name, kind, description, false)
    }

    fn arg(
        mut self,
        name: impl Into<String>,
        kind: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.args.push(ToolArg {
            name: name.into(),
            kind: kind.into(),
            description: description.into(),
            required,
        });
        self
    }

    pub fn returns(mut self, kind: impl Into<String>) -> Self {
        self.returns = Some(kind.into());
        self
    }

    /// JSON Schema for the argument object.
    ///
    /// Optional arguments also accept `null`.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for arg in &self.args {
            let kind = if arg.required {
                json!(arg.kind)
            } else {
                json!([arg.kind, "null"])
            };
            properties.insert(
                arg.name.clone(),
                json!({ "type": kind, "description": arg.description }),
            );
        }

        let required: Vec<&str> = self
            .args
            .iter()
            .filter(|arg| arg.required)
            .map(|arg| arg.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// One-line signature used in system instructions.
    pub fn describe(&self) -> String {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                let marker = if arg.required { "" } else { "?" };
                format!("{}{}: {}", arg.name, marker, arg.kind)
            })
            .collect();
        let returns = self.returns.as_deref().unwrap_or("null");
        format!(
            "{}({}) -> {}: {}",
            self.name,
            args.join(", "),
            returns,
            self.description
        )
    }
}

/// What a tool sees of the running agent.
pub struct ToolContext<'a> {
    pub agent_name: &'a str,
    pub state: &'a mut SessionState,
}

/// A callable tool.
///
/// Tools run synchronously and to completion; failures are reported in
/// the returned value, not as Rust errors.
pub trait Tool: Send + Sync {
    fn info(&self) -> &ToolInfo;

    fn call(&self, args: &Map<String, Value>, ctx: &mut ToolContext<'_>) -> Value;
}

type ToolFn = dyn Fn(&Map<String, Value>, &mut ToolContext<'_>) -> Value + Send + Sync;

/// A tool backed by a closure.
pub struct FnTool {
    info: ToolInfo,
    f: Box<ToolFn>,
}

impl FnTool {
    pub fn new<F>(info: ToolInfo, f: F) -> Self
    where
        F: Fn(&Map<String, Value>, &mut ToolContext<'_>) -> Value + Send + Sync + 'static,
    {
        Self {
            info,
            f: Box::new(f),
        }
    }
}

impl Tool for FnTool {
    fn info(&self) -> &ToolInfo {
        &self.info
    }

    fn call(&self, args: &Map<String, Value>, ctx: &mut ToolContext<'_>) -> Value {
        (self.f)(args, ctx)
    }
}

/// Structured result shape shared by the weather tool and the guardrails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success { report: String },
    Error { error_message: String },
}

impl ToolOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error_message: message.into(),
        }
    }
}

impl From<ToolOutcome> for Value {
    fn from(outcome: ToolOutcome) -> Self {
        match outcome {
            ToolOutcome::Success { report } => json!({ "status": "success", "report": report }),
            ToolOutcome::Error { error_message } => {
                json!({ "status": "error", "error_message": error_message })
            }
        }
    }
}

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    validator: jsonschema::Validator,
}

/// Tools available to one agent, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, compiling its argument schema.
    ///
    /// A tool registered under an existing name replaces the old one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let info = tool.info();
        let validator =
            jsonschema::Validator::new(&info.parameters_schema()).map_err(|e| Error::ToolSchema {
                tool: info.name.clone(),
                message: e.to_string(),
            })?;

        let name = info.name.clone();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, RegisteredTool { tool, validator });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name).map(|registered| &registered.tool)
    }

    /// Check call arguments against the tool's schema.
    ///
    /// Returns `Err` with every violation joined when the arguments do not
    /// match, or when the tool is unknown.
    pub fn validate(&self, name: &str, args: &Map<String, Value>) -> std::result::Result<(), String> {
        let Some(registered) = self.tools.get(name) else {
            return Err(format!("Unknown tool '{}'", name));
        };

        let instance = Value::Object(args.clone());
        if registered.validator.is_valid(&instance) {
            return Ok(());
        }
        let errors: Vec<String> = registered
            .validator
            .iter_errors(&instance)
            .map(|e| e.to_string())
            .collect();
        Err(errors.join("; "))
    }

    /// Declarations in registration order.
    pub fn infos(&self) -> Vec<ToolInfo> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|registered| registered.tool.info().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
