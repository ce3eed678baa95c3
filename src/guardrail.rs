//! Guardrails invoked by the runtime before model and tool calls.
//!
//! A guard inspects what is about to happen and returns a [`Verdict`]:
//! `Proceed` lets the call run, `Override` replaces its result and the
//! call is skipped. When several guards are attached to an agent they run
//! in registration order and the first override wins.
//!
//! Guards never fail. Missing or malformed input (no user text, no `city`
//! argument) is treated as an empty string.

use crate::content::{LlmRequest, LlmResponse};
use crate::error::Result;
use crate::state::SessionState;
use crate::tools::{ToolContext, ToolInfo, ToolOutcome, WEATHER_TOOL_NAME};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

pub const DEFAULT_BLOCKED_KEYWORD: &str = "taiwan";
pub const DEFAULT_BLOCKED_CITY: &str = "paris";

/// Outcome of a guard.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Verdict<T> {
    /// Let the intercepted call run unchanged.
    Proceed,
    /// Skip the call and use this result instead.
    Override(T),
}

impl<T> Verdict<T> {
    pub fn is_override(&self) -> bool {
        matches!(self, Verdict::Override(_))
    }
}

/// What a model guard sees of the running agent.
pub struct CallbackContext<'a> {
    pub agent_name: &'a str,
    pub invocation_id: &'a str,
    pub state: &'a mut SessionState,
}

/// Runs before every model call of the agent it is attached to.
pub trait ModelGuard: Send + Sync {
    fn before_model(
        &self,
        ctx: &mut CallbackContext<'_>,
        request: &LlmRequest,
    ) -> Verdict<LlmResponse>;
}

impl<F> ModelGuard for F
where
    F: Fn(&mut CallbackContext<'_>, &LlmRequest) -> Verdict<LlmResponse> + Send + Sync,
{
    fn before_model(
        &self,
        ctx: &mut CallbackContext<'_>,
        request: &LlmRequest,
    ) -> Verdict<LlmResponse> {
        self(ctx, request)
    }
}

/// Runs before every tool call of the agent it is attached to.
pub trait ToolGuard: Send + Sync {
    fn before_tool(
        &self,
        tool: &ToolInfo,
        args: &Map<String, Value>,
        ctx: &mut ToolContext<'_>,
    ) -> Verdict<Value>;
}

impl<F> ToolGuard for F
where
    F: Fn(&ToolInfo, &Map<String, Value>, &mut ToolContext<'_>) -> Verdict<Value> + Send + Sync,
{
    fn before_tool(
        &self,
        tool: &ToolInfo,
        args: &Map<String, Value>,
        ctx: &mut ToolContext<'_>,
    ) -> Verdict<Value> {
        self(tool, args, ctx)
    }
}

/// Blocks model calls whose latest user message mentions a keyword.
pub struct BlockKeywordGuard {
    keyword: String,
    pattern: Regex,
}

impl BlockKeywordGuard {
    /// Match `keyword` literally, ignoring case.
    pub fn new(keyword: impl Into<String>) -> Result<Self> {
        let keyword = keyword.into();
        let pattern = RegexBuilder::new(&regex::escape(&keyword))
            .case_insensitive(true)
            .build()?;
        Ok(Self { keyword, pattern })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn refusal(&self) -> String {
        format!(
            "I cannot process this request because it contains the blocked keyword '{}'.",
            self.keyword
        )
    }
}

impl ModelGuard for BlockKeywordGuard {
    fn before_model(
        &self,
        ctx: &mut CallbackContext<'_>,
        request: &LlmRequest,
    ) -> Verdict<LlmResponse> {
        let text = request.last_user_text();
        let preview: String = text.chars().take(100).collect();
        tracing::debug!(agent = ctx.agent_name, message = %preview, "inspecting last user message");

        if !self.pattern.is_match(text) {
            tracing::debug!(agent = ctx.agent_name, "keyword not found, allowing model call");
            return Verdict::Proceed;
        }

        tracing::info!(
            agent = ctx.agent_name,
            keyword = %self.keyword,
            "blocked keyword found, skipping model call"
        );
        ctx.state.keyword_block_triggered = true;
        Verdict::Override(LlmResponse::text(self.refusal()))
    }
}

/// Blocks `get_weather_stateful` calls for one city.
pub struct BlockCityToolGuard {
    tool_name: String,
    city: String,
}

impl BlockCityToolGuard {
    pub fn new(city: impl Into<String>) -> Self {
        Self {
            tool_name: WEATHER_TOOL_NAME.to_string(),
            city: city.into(),
        }
    }

    /// Guard a different tool's `city` argument.
    pub fn for_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = tool_name.into();
        self
    }

    fn blocked(&self, city: &str) -> bool {
        !city.is_empty() && city.to_lowercase() == self.city.to_lowercase()
    }
}

impl ToolGuard for BlockCityToolGuard {
    fn before_tool(
        &self,
        tool: &ToolInfo,
        args: &Map<String, Value>,
        ctx: &mut ToolContext<'_>,
    ) -> Verdict<Value> {
        if tool.name != self.tool_name {
            tracing::debug!(tool = %tool.name, "not the guarded tool, allowing");
            return Verdict::Proceed;
        }

        let city = args.get("city").and_then(Value::as_str).unwrap_or("");
        if !self.blocked(city) {
            tracing::debug!(tool = %tool.name, city, "city allowed");
            return Verdict::Proceed;
        }

        tracing::info!(
            tool = %tool.name,
            agent = ctx.agent_name,
            city,
            "blocked city, skipping tool execution"
        );
        ctx.state.tool_block_triggered = true;
        Verdict::Override(
            ToolOutcome::error(format!(
                "Policy restriction: Weather checks for '{}' are currently disabled by a tool guardrail.",
                crate::tools::capitalize(city)
            ))
            .into(),
        )
    }
}
