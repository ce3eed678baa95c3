//! The weather agent team: a guarded root agent with greeting and farewell
//! sub-agents.

use crate::agent::{Agent, AgentConfig, DEFAULT_MODEL};
use crate::error::Result;
use crate::guardrail::{
    BlockCityToolGuard, BlockKeywordGuard, DEFAULT_BLOCKED_CITY, DEFAULT_BLOCKED_KEYWORD,
};
use crate::state::LAST_WEATHER_REPORT_KEY;
use crate::tools::{SayGoodbye, SayHello, WeatherTool};

pub const ROOT_AGENT_NAME: &str = "weather_agent_v1_model_guardrail";
pub const GREETING_AGENT_NAME: &str = "greeting_agent";
pub const FAREWELL_AGENT_NAME: &str = "farewell_agent";

const ROOT_INSTRUCTION: &str = "You are the main Weather Agent. Provide weather using 'get_weather_stateful'. \
Delegate greetings to 'greeting_agent' and farewells to 'farewell_agent'. \
Handle only weather, greetings, and farewells.";

const GREETING_INSTRUCTION: &str = "You are the Greeting Agent. Your ONLY task is to provide a friendly greeting using the 'say_hello' tool. Do nothing else.";

const FAREWELL_INSTRUCTION: &str = "You are the Farewell Agent. Your ONLY task is to provide a polite goodbye message using the 'say_goodbye' tool. Do not perform any other actions.";

/// Settings for the weather team.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamConfig {
    /// Model shared by every agent of the team
    pub model: String,
    /// Keyword that blocks the root agent's model calls
    pub blocked_keyword: String,
    /// City the weather tool refuses to look up
    pub blocked_city: String,
    /// Maximum model calls per user turn
    pub max_iterations: usize,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            blocked_keyword: DEFAULT_BLOCKED_KEYWORD.to_string(),
            blocked_city: DEFAULT_BLOCKED_CITY.to_string(),
            max_iterations: 10,
        }
    }
}

impl TeamConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn blocked_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.blocked_keyword = keyword.into();
        self
    }

    pub fn blocked_city(mut self, city: impl Into<String>) -> Self {
        self.blocked_city = city.into();
        self
    }

    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    fn agent_config(&self) -> AgentConfig {
        AgentConfig::new(&self.model).max_iterations(self.max_iterations)
    }
}

/// Build the root agent of the weather team.
///
/// Guardrails are attached to the root agent only; the sub-agents run
/// unguarded.
pub fn build_weather_team(config: &TeamConfig) -> Result<Agent> {
    let mut greeting = Agent::new(GREETING_AGENT_NAME, config.agent_config())
        .description("Handles simple greetings and hellos using the 'say_hello' tool.")
        .instruction(GREETING_INSTRUCTION);
    greeting.register(SayHello::new())?;

    let mut farewell = Agent::new(FAREWELL_AGENT_NAME, config.agent_config())
        .description("Handles simple farewells and goodbyes using the 'say_goodbye' tool.")
        .instruction(FAREWELL_INSTRUCTION);
    farewell.register(SayGoodbye::new())?;

    let mut root = Agent::new(ROOT_AGENT_NAME, config.agent_config())
        .description(
            "Main agent: Handles weather, delegates, includes input AND tool guardrails.",
        )
        .instruction(ROOT_INSTRUCTION)
        .sub_agent(greeting)
        .sub_agent(farewell)
        .output_key(LAST_WEATHER_REPORT_KEY)
        .before_model(BlockKeywordGuard::new(&config.blocked_keyword)?)
        .before_tool(BlockCityToolGuard::new(&config.blocked_city));
    root.register(WeatherTool::new())?;

    tracing::debug!(
        root = ROOT_AGENT_NAME,
        model = %config.model,
        "weather team assembled"
    );
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_team_shape() {
        let root = Arc::new(build_weather_team(&TeamConfig::default()).unwrap());
        assert_eq!(root.name(), ROOT_AGENT_NAME);
        assert_eq!(root.config().model, DEFAULT_MODEL);

        let tool_names: Vec<String> = root.tools().infos().into_iter().map(|i| i.name).collect();
        assert_eq!(tool_names, vec!["get_weather_stateful"]);

        let subs: Vec<&str> = root.sub_agents().iter().map(|a| a.name()).collect();
        assert_eq!(subs, vec![GREETING_AGENT_NAME, FAREWELL_AGENT_NAME]);

        let greeting = root.find(GREETING_AGENT_NAME).unwrap();
        assert!(greeting.tools().get("say_hello").is_some());
        let farewell = root.find(FAREWELL_AGENT_NAME).unwrap();
        assert!(farewell.tools().get("say_goodbye").is_some());
    }

    #[test]
    fn test_config_builder() {
        let config = TeamConfig::new("gemini-2.0-flash")
            .blocked_keyword("secret")
            .blocked_city("Berlin")
            .max_iterations(3);
        assert_eq!(config.blocked_keyword, "secret");
        assert_eq!(config.blocked_city, "Berlin");

        let root = build_weather_team(&config).unwrap();
        assert_eq!(root.config().max_iterations, 3);
        assert_eq!(root.config().model, "gemini-2.0-flash");
    }
}
