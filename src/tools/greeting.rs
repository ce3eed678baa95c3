//! Greeting and farewell tools used by the sub-agents.

use super::{Tool, ToolContext, ToolInfo};
use serde_json::{Map, Value};

pub fn say_hello(name: Option<&str>) -> String {
    match name.filter(|name| !name.is_empty()) {
        Some(name) => format!("Hello, {}!", name),
        None => "Hello there!".to_string(),
    }
}

pub fn say_goodbye() -> String {
    "Goodbye! Have a great day.".to_string()
}

pub struct SayHello {
    info: ToolInfo,
}

impl SayHello {
    pub fn new() -> Self {
        Self {
            info: ToolInfo::new(
                "say_hello",
                "Provides a simple greeting. Uses the person's name when one is given.",
            )
            .arg_optional("name", "string", "The name of the person to greet")
            .returns("string"),
        }
    }
}

impl Default for SayHello {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for SayHello {
    fn info(&self) -> &ToolInfo {
        &self.info
    }

    fn call(&self, args: &Map<String, Value>, _ctx: &mut ToolContext<'_>) -> Value {
        let name = args.get("name").and_then(Value::as_str);
        tracing::debug!(?name, "say_hello called");
        Value::String(say_hello(name))
    }
}

pub struct SayGoodbye {
    info: ToolInfo,
}

impl SayGoodbye {
    pub fn new() -> Self {
        Self {
            info: ToolInfo::new(
                "say_goodbye",
                "Provides a simple farewell message to conclude the conversation.",
            )
            .returns("string"),
        }
    }
}

impl Default for SayGoodbye {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for SayGoodbye {
    fn info(&self) -> &ToolInfo {
        &self.info
    }

    fn call(&self, _args: &Map<String, Value>, _ctx: &mut ToolContext<'_>) -> Value {
        tracing::debug!("say_goodbye called");
        Value::String(say_goodbye())
    }
}
