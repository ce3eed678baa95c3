//! Conversation content exchanged with the model backend.

use crate::tools::ToolInfo;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            args,
        }
    }
}

/// One segment of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    FunctionCall(FunctionCall),
    FunctionResponse { name: String, response: Value },
}

impl Part {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// A user-role turn carrying a tool result back to the model.
    pub fn function_response(name: impl Into<String>, response: Value) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::FunctionResponse {
                name: name.into(),
                response,
            }],
        }
    }

    /// Text of the first segment, if that segment is text.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().and_then(Part::as_text)
    }

    /// All text segments joined together.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.parts.iter().filter_map(|part| match part {
            Part::FunctionCall(call) => Some(call),
            _ => None,
        })
    }
}

/// An agent the model may hand the turn over to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferTarget {
    pub name: String,
    pub description: String,
}

/// Sampling options forwarded to the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Everything the backend needs for one model call.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    pub model: String,
    pub agent_name: String,
    pub system_instruction: String,
    pub contents: Vec<Content>,
    pub tools: Vec<ToolInfo>,
    pub transfer_targets: Vec<TransferTarget>,
    pub config: GenerateConfig,
}

impl LlmRequest {
    /// Text of the most recent user turn that starts with non-empty text.
    ///
    /// Turns carrying only tool results are skipped. Returns an empty
    /// string when there is no such turn.
    pub fn last_user_text(&self) -> &str {
        self.contents
            .iter()
            .rev()
            .filter(|content| content.role == Role::User)
            .find_map(|content| content.first_text().filter(|text| !text.is_empty()))
            .unwrap_or("")
    }
}

/// A model turn, either produced by the backend or substituted by a guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: Content,
}

impl LlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Content::model_text(text),
        }
    }

    pub fn function_call(name: impl Into<String>, args: Value) -> Self {
        Self {
            content: Content {
                role: Role::Model,
                parts: vec![Part::FunctionCall(FunctionCall::new(name, args))],
            },
        }
    }
}
