//! Weather Team - a guarded multi-agent weather assistant
//!
//! A root agent answers weather questions with a mocked, stateful weather
//! tool and hands greetings and farewells to two sub-agents. Two guardrails
//! sit in front of it:
//!
//! - a request guard that refuses model calls mentioning a blocked keyword;
//! - a tool guard that refuses weather lookups for a blocked city.
//!
//! The model is an injected [`ModelBackend`]; the [`Runner`] invokes the
//! guards at their extension points, executes tools and follows transfers.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use weather_team::{
//!     LlmResponse, Runner, ScriptedModel, SessionState, SessionStore, TeamConfig,
//!     build_weather_team,
//! };
//!
//! # tokio_test::block_on(async {
//! let model = Arc::new(ScriptedModel::new([
//!     LlmResponse::function_call("get_weather_stateful", json!({"city": "Tokyo"})),
//!     LlmResponse::text("It's 18°C with light rain in Tokyo."),
//! ]));
//! let runner = Runner::new(build_weather_team(&TeamConfig::default())?, model);
//!
//! let store = SessionStore::new();
//! let mut session = store.create("session_001", SessionState::new())?;
//! let answer = runner.run(&mut session, "What's the weather in Tokyo?").await?;
//! store.save(&session);
//!
//! assert_eq!(answer, "It's 18°C with light rain in Tokyo.");
//! assert_eq!(session.state.last_city_checked.as_deref(), Some("Tokyo"));
//! # Ok::<(), weather_team::Error>(())
//! # }).unwrap();
//! ```

mod agent;
mod content;
mod error;
mod guardrail;
mod session;
mod state;
mod team;
pub mod tools;

pub use agent::{
    Agent, AgentCallbacks, AgentConfig, AgentEvent, DEFAULT_MODEL, EventCallback, ModelBackend,
    Runner, ScriptedModel, TRANSFER_TOOL, verbose_callbacks,
};
pub use content::{
    Content, FunctionCall, GenerateConfig, LlmRequest, LlmResponse, Part, Role, TransferTarget,
};
pub use error::{Error, Result};
pub use guardrail::{
    BlockCityToolGuard, BlockKeywordGuard, CallbackContext, DEFAULT_BLOCKED_CITY,
    DEFAULT_BLOCKED_KEYWORD, ModelGuard, ToolGuard, Verdict,
};
pub use session::{Session, SessionStore};
pub use state::{
    KEYWORD_BLOCK_KEY, LAST_CITY_KEY, LAST_WEATHER_REPORT_KEY, SessionState, TEMPERATURE_UNIT_KEY,
    TOOL_BLOCK_KEY, TemperatureUnit,
};
pub use team::{
    FAREWELL_AGENT_NAME, GREETING_AGENT_NAME, ROOT_AGENT_NAME, TeamConfig, build_weather_team,
};
pub use tools::{Tool, ToolContext, ToolInfo, ToolOutcome};
