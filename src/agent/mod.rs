//! Agent definitions and the runner that drives a conversation turn.
//!
//! An [`Agent`] bundles an instruction, tools, sub-agents and guardrails.
//! The [`Runner`] owns the model backend: for each user message it asks the
//! model for the next step, runs the agent's guards at the pre-model and
//! pre-tool extension points, executes tool calls, follows transfers
//! between agents, and stops at the first plain-text reply.

mod backend;
mod config;
mod events;
mod prompt;

pub use backend::{ModelBackend, ScriptedModel};
pub use config::{AgentConfig, DEFAULT_MODEL};
pub use events::{AgentCallbacks, AgentEvent, EventCallback, verbose_callbacks};
pub use prompt::TRANSFER_TOOL;

use crate::content::{
    Content, FunctionCall, GenerateConfig, LlmRequest, LlmResponse, Role, TransferTarget,
};
use crate::error::{Error, Result};
use crate::guardrail::{CallbackContext, ModelGuard, ToolGuard, Verdict};
use crate::session::Session;
use crate::state::SessionState;
use crate::tools::{FnTool, Tool, ToolContext, ToolInfo, ToolOutcome, ToolRegistry};
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};

/// A named agent with its tools, sub-agents and guardrails.
pub struct Agent {
    name: String,
    description: String,
    instruction: String,
    config: AgentConfig,
    tools: ToolRegistry,
    sub_agents: Vec<Arc<Agent>>,
    model_guards: Vec<Arc<dyn ModelGuard>>,
    tool_guards: Vec<Arc<dyn ToolGuard>>,
    /// State key that receives this agent's final answer
    output_key: Option<String>,
}

impl Agent {
    /// Create a new agent with the given name and configuration.
    pub fn new(name: impl Into<String>, config: AgentConfig) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instruction: String::new(),
            config,
            tools: ToolRegistry::new(),
            sub_agents: Vec::new(),
            model_guards: Vec::new(),
            tool_guards: Vec::new(),
            output_key: None,
        }
    }

    /// Set the description other agents see when deciding on a transfer.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn sub_agent(mut self, agent: Agent) -> Self {
        self.sub_agents.push(Arc::new(agent));
        self
    }

    /// Attach a guard that runs before each model call of this agent.
    pub fn before_model<G: ModelGuard + 'static>(mut self, guard: G) -> Self {
        self.model_guards.push(Arc::new(guard));
        self
    }

    /// Attach a guard that runs before each tool call of this agent.
    pub fn before_tool<G: ToolGuard + 'static>(mut self, guard: G) -> Self {
        self.tool_guards.push(Arc::new(guard));
        self
    }

    /// Save the agent's final answer under `key` in session state.
    pub fn output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    // =========================================================================
    // Tool registration
    // =========================================================================

    /// Register a tool with the agent.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.tools.register(Arc::new(tool))
    }

    /// Register a tool with explicit info and callback.
    pub fn register_tool<F>(&mut self, info: ToolInfo, f: F) -> Result<()>
    where
        F: Fn(&Map<String, Value>, &mut ToolContext<'_>) -> Value + Send + Sync + 'static,
    {
        self.register(FnTool::new(info, f))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn sub_agents(&self) -> &[Arc<Agent>] {
        &self.sub_agents
    }

    pub fn model_guards(&self) -> &[Arc<dyn ModelGuard>] {
        &self.model_guards
    }

    pub fn tool_guards(&self) -> &[Arc<dyn ToolGuard>] {
        &self.tool_guards
    }

    /// Find an agent by name in this agent's tree, including itself.
    pub fn find(self: &Arc<Self>, name: &str) -> Option<Arc<Agent>> {
        if self.name == name {
            return Some(Arc::clone(self));
        }
        self.sub_agents.iter().find_map(|sub| sub.find(name))
    }

    /// Find the agent that lists `name` as a direct sub-agent.
    fn parent_of(self: &Arc<Self>, name: &str) -> Option<Arc<Agent>> {
        if self.sub_agents.iter().any(|sub| sub.name == name) {
            return Some(Arc::clone(self));
        }
        self.sub_agents.iter().find_map(|sub| sub.parent_of(name))
    }

    fn summary(&self) -> TransferTarget {
        TransferTarget {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// Drives conversation turns for an agent tree against a model backend.
pub struct Runner {
    root: Arc<Agent>,
    model: Arc<dyn ModelBackend>,
    /// Callbacks for observability
    callbacks: AgentCallbacks,
}

impl Runner {
    pub fn new(root: Agent, model: Arc<dyn ModelBackend>) -> Self {
        Self {
            root: Arc::new(root),
            model,
            callbacks: AgentCallbacks::default(),
        }
    }

    pub fn root(&self) -> &Arc<Agent> {
        &self.root
    }

    // =========================================================================
    // Builder methods for callbacks
    // =========================================================================

    /// Log every runtime event through `tracing`.
    pub fn verbose(mut self, enabled: bool) -> Self {
        if enabled {
            self.callbacks = verbose_callbacks();
        }
        self
    }

    /// Replace all callbacks at once.
    pub fn callbacks(mut self, callbacks: AgentCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Set a callback for tool call events.
    pub fn on_tool_call<F>(mut self, f: F) -> Self
    where
        F: Fn(&AgentEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_tool_call = Some(Arc::new(f));
        self
    }

    /// Set a callback for transfer events.
    pub fn on_transfer<F>(mut self, f: F) -> Self
    where
        F: Fn(&AgentEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_transfer = Some(Arc::new(f));
        self
    }

    /// Set a callback for finish events.
    pub fn on_finish<F>(mut self, f: F) -> Self
    where
        F: Fn(&AgentEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_finish = Some(Arc::new(f));
        self
    }

    /// Set a catch-all callback for any event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&AgentEvent) + Send + Sync + 'static,
    {
        self.callbacks.on_event = Some(Arc::new(f));
        self
    }

    /// Record every event so it can be inspected with [`Runner::take_events`].
    pub fn capture_events(mut self, enabled: bool) -> Self {
        if enabled {
            self.callbacks.captured_events = Some(Arc::new(Mutex::new(Vec::new())));
        } else {
            self.callbacks.captured_events = None;
        }
        self
    }

    /// Take captured events.
    pub fn take_events(&self) -> Vec<AgentEvent> {
        if let Some(ref events) = self.callbacks.captured_events
            && let Ok(mut events) = events.lock()
        {
            return std::mem::take(&mut *events);
        }
        Vec::new()
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn emit(&self, event: AgentEvent) {
        self.callbacks.emit(&event);
    }

    /// Agents the given agent may hand the turn to: its sub-agents, then its parent.
    fn transfer_targets(&self, agent: &Arc<Agent>) -> Vec<Arc<Agent>> {
        let mut targets: Vec<Arc<Agent>> = agent.sub_agents.iter().cloned().collect();
        if let Some(parent) = self.root.parent_of(&agent.name) {
            targets.push(parent);
        }
        targets
    }

    fn build_request(&self, agent: &Arc<Agent>, history: &[Content]) -> LlmRequest {
        let tools = agent.tools.infos();
        let targets: Vec<TransferTarget> = self
            .transfer_targets(agent)
            .iter()
            .map(|target| target.summary())
            .collect();

        let tool_lines: Vec<String> = tools.iter().map(ToolInfo::describe).collect();
        let agent_lines: Vec<String> = targets
            .iter()
            .map(|target| format!("{}: {}", target.name, target.description))
            .collect();

        LlmRequest {
            model: agent.config.model.clone(),
            agent_name: agent.name.clone(),
            system_instruction: prompt::render(&agent.instruction, &tool_lines, &agent_lines),
            contents: history.to_vec(),
            tools,
            transfer_targets: targets,
            config: GenerateConfig {
                temperature: agent.config.temperature,
                max_tokens: agent.config.max_tokens,
            },
        }
    }

    /// Run the agent's model guards; the first override wins.
    fn guard_model_call(
        &self,
        agent: &Agent,
        invocation_id: &str,
        state: &mut SessionState,
        request: &LlmRequest,
    ) -> Option<LlmResponse> {
        for guard in &agent.model_guards {
            let mut ctx = CallbackContext {
                agent_name: &agent.name,
                invocation_id,
                state: &mut *state,
            };
            if let Verdict::Override(response) = guard.before_model(&mut ctx, request) {
                return Some(response);
            }
        }
        None
    }

    /// Resolve a transfer request against the agent's allowed targets.
    fn resolve_transfer(
        &self,
        agent: &Arc<Agent>,
        call: &FunctionCall,
    ) -> std::result::Result<Arc<Agent>, String> {
        let Some(target_name) = call.args.get("agent_name").and_then(Value::as_str) else {
            return Err(format!("{} requires an 'agent_name' argument.", TRANSFER_TOOL));
        };
        self.transfer_targets(agent)
            .into_iter()
            .find(|target| target.name == target_name)
            .ok_or_else(|| {
                format!(
                    "Agent '{}' cannot transfer to unknown agent '{}'.",
                    agent.name, target_name
                )
            })
    }

    /// Validate, guard and execute one tool call.
    fn execute_tool(&self, agent: &Agent, call: &FunctionCall, state: &mut SessionState) -> Value {
        self.emit(AgentEvent::ToolCall {
            agent: agent.name.clone(),
            name: call.name.clone(),
            args: Value::Object(call.args.clone()),
        });

        let Some(tool) = agent.tools.get(&call.name) else {
            tracing::warn!(agent = %agent.name, tool = %call.name, "model called an unknown tool");
            return ToolOutcome::error(format!(
                "Tool '{}' is not available to agent '{}'.",
                call.name, agent.name
            ))
            .into();
        };

        if let Err(message) = agent.tools.validate(&call.name, &call.args) {
            tracing::warn!(tool = %call.name, %message, "invalid tool arguments");
            return ToolOutcome::error(format!(
                "Invalid arguments for tool '{}': {}",
                call.name, message
            ))
            .into();
        }

        let mut ctx = ToolContext {
            agent_name: &agent.name,
            state,
        };

        for guard in &agent.tool_guards {
            if let Verdict::Override(result) = guard.before_tool(tool.info(), &call.args, &mut ctx) {
                self.emit(AgentEvent::ToolOverridden {
                    name: call.name.clone(),
                    result: result.clone(),
                });
                return result;
            }
        }

        let result = tool.call(&call.args, &mut ctx);
        self.emit(AgentEvent::ToolResult {
            name: call.name.clone(),
            result: result.clone(),
        });
        result
    }

    // =========================================================================
    // Main run loop
    // =========================================================================

    /// Run one user turn and return the final text answer.
    ///
    /// Every turn starts at the root agent. The session's history and state
    /// are updated in place. On error the history is truncated back to where
    /// the turn started, so the same message can be retried; state written by
    /// guards and tools is kept.
    pub async fn run(&self, session: &mut Session, text: &str) -> Result<String> {
        let start = session.history.len();
        let result = self.run_turn(session, text).await;
        if result.is_err() {
            session.history.truncate(start);
        }
        result
    }

    async fn run_turn(&self, session: &mut Session, text: &str) -> Result<String> {
        let invocation_id = format!("{}:{}", session.id, session.history.len());
        session.history.push(Content::user_text(text));

        let max_iterations = self.root.config.max_iterations;
        let mut agent = Arc::clone(&self.root);
        let mut iterations = 0;

        loop {
            iterations += 1;

            if iterations > max_iterations {
                self.emit(AgentEvent::Error {
                    message: format!("Max iterations ({}) reached", max_iterations),
                });
                return Err(Error::MaxIterations(max_iterations));
            }

            self.emit(AgentEvent::IterationStart {
                agent: agent.name.clone(),
                iteration: iterations,
                max_iterations,
            });

            let request = self.build_request(&agent, &session.history);

            let response =
                match self.guard_model_call(&agent, &invocation_id, &mut session.state, &request) {
                    Some(response) => {
                        self.emit(AgentEvent::ModelOverridden {
                            agent: agent.name.clone(),
                            content: response.content.text(),
                        });
                        response
                    }
                    None => {
                        self.emit(AgentEvent::ModelRequest {
                            agent: agent.name.clone(),
                            message_count: request.contents.len(),
                        });
                        let response = match self.model.generate(&request).await {
                            Ok(response) => response,
                            Err(e) => {
                                self.emit(AgentEvent::Error {
                                    message: e.to_string(),
                                });
                                return Err(e);
                            }
                        };
                        self.emit(AgentEvent::ModelResponse {
                            agent: agent.name.clone(),
                            content: response.content.text(),
                        });
                        response
                    }
                };

            let mut content = response.content;
            content.role = Role::Model;
            let calls: Vec<FunctionCall> = content.function_calls().cloned().collect();
            let answer = content.text();
            session.history.push(content);

            if calls.is_empty() {
                if let Some(key) = &agent.output_key {
                    session.state.set(key, Value::String(answer.clone()))?;
                }
                self.emit(AgentEvent::Finish {
                    agent: agent.name.clone(),
                    text: answer.clone(),
                });
                return Ok(answer);
            }

            let mut next_agent = None;
            for call in &calls {
                let result = if call.name == TRANSFER_TOOL {
                    match self.resolve_transfer(&agent, call) {
                        Ok(target) => {
                            self.emit(AgentEvent::Transfer {
                                from: agent.name.clone(),
                                to: target.name.clone(),
                            });
                            let result = json!({ "status": "success", "transferred_to": target.name });
                            next_agent = Some(target);
                            result
                        }
                        Err(message) => {
                            tracing::warn!(agent = %agent.name, %message, "transfer rejected");
                            ToolOutcome::error(message).into()
                        }
                    }
                } else {
                    self.execute_tool(&agent, call, &mut session.state)
                };
                session.history.push(Content::function_response(&call.name, result));
            }

            if let Some(next) = next_agent {
                agent = next;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrail::{BlockCityToolGuard, BlockKeywordGuard};
    use crate::tools::{SayHello, WeatherTool};

    fn weather_agent() -> Agent {
        let mut agent = Agent::new("weather", AgentConfig::new("test").max_iterations(4))
            .description("Weather agent")
            .instruction("Provide weather.")
            .sub_agent({
                let mut greeter = Agent::new("greeter", AgentConfig::new("test"))
                    .description("Says hello");
                greeter.register(SayHello::new()).unwrap();
                greeter
            })
            .output_key("last_weather_report");
        agent.register(WeatherTool::new()).unwrap();
        agent
    }

    #[test]
    fn test_find_and_parent() {
        let root = Arc::new(weather_agent());
        assert_eq!(root.find("greeter").unwrap().name(), "greeter");
        assert!(root.find("nobody").is_none());
        assert_eq!(root.parent_of("greeter").unwrap().name(), "weather");
        assert!(root.parent_of("weather").is_none());
    }

    #[test]
    fn test_build_request_lists_tools_and_targets() {
        let runner = Runner::new(weather_agent(), Arc::new(ScriptedModel::default()));
        let root = Arc::clone(runner.root());
        let request = runner.build_request(&root, &[Content::user_text("hi")]);

        assert_eq!(request.agent_name, "weather");
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.transfer_targets[0].name, "greeter");
        assert!(request.system_instruction.starts_with("Provide weather."));
        assert!(request.system_instruction.contains("get_weather_stateful(city: string)"));
        assert!(request.system_instruction.contains("greeter: Says hello"));

        let greeter = root.find("greeter").unwrap();
        let request = runner.build_request(&greeter, &[]);
        assert_eq!(request.transfer_targets[0].name, "weather");
    }

    #[tokio::test]
    async fn test_plain_answer_writes_output_key() {
        let model = Arc::new(ScriptedModel::new([LlmResponse::text("All good.")]));
        let runner = Runner::new(weather_agent(), model.clone());
        let mut session = Session::new("s1", SessionState::new());

        let answer = runner.run(&mut session, "hello?").await.unwrap();
        assert_eq!(answer, "All good.");
        assert_eq!(session.state.last_weather_report.as_deref(), Some("All good."));
        assert_eq!(session.history.len(), 2);
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let model = Arc::new(ScriptedModel::new([
            LlmResponse::function_call("get_weather_stateful", json!({"city": "London"})),
            LlmResponse::text("It is cloudy in London."),
        ]));
        let runner = Runner::new(weather_agent(), model.clone()).capture_events(true);
        let mut session = Session::new("s1", SessionState::new());

        runner.run(&mut session, "weather in London?").await.unwrap();

        let second = &model.requests()[1];
        let Some(crate::content::Part::FunctionResponse { response, .. }) =
            second.contents.last().and_then(|c| c.parts.first())
        else {
            panic!("expected a function response");
        };
        assert_eq!(response["status"], "success");
        assert_eq!(session.state.last_city_checked.as_deref(), Some("London"));

        let events = runner.take_events();
        assert!(events.iter().any(|e| matches!(e, AgentEvent::ToolResult { name, .. } if name == "get_weather_stateful")));
    }

    #[tokio::test]
    async fn test_model_guard_skips_backend() {
        let agent = weather_agent().before_model(BlockKeywordGuard::new("taiwan").unwrap());
        let model = Arc::new(ScriptedModel::default());
        let runner = Runner::new(agent, model.clone());
        let mut session = Session::new("s1", SessionState::new());

        let answer = runner.run(&mut session, "Is Taiwan independent?").await.unwrap();
        assert!(answer.contains("blocked keyword 'taiwan'"));
        assert!(model.requests().is_empty());
        assert!(session.state.keyword_block_triggered);
    }

    #[tokio::test]
    async fn test_tool_guard_skips_tool() {
        let agent = weather_agent().before_tool(BlockCityToolGuard::new("paris"));
        let model = Arc::new(ScriptedModel::new([
            LlmResponse::function_call("get_weather_stateful", json!({"city": "Paris"})),
            LlmResponse::text("Sorry."),
        ]));
        let runner = Runner::new(agent, model.clone());
        let mut session = Session::new("s1", SessionState::new());

        runner.run(&mut session, "weather in Paris").await.unwrap();
        assert!(session.state.tool_block_triggered);
        assert_eq!(session.state.last_city_checked, None);
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_args_are_reported() {
        let model = Arc::new(ScriptedModel::new([
            LlmResponse::function_call("launch_rocket", json!({})),
            LlmResponse::function_call("get_weather_stateful", json!({"town": "London"})),
            LlmResponse::text("done"),
        ]));
        let runner = Runner::new(weather_agent(), model.clone());
        let mut session = Session::new("s1", SessionState::new());

        runner.run(&mut session, "go").await.unwrap();

        let responses: Vec<&Value> = session
            .history
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| match p {
                crate::content::Part::FunctionResponse { response, .. } => Some(response),
                _ => None,
            })
            .collect();
        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(|r| r["status"] == "error"));
        assert_eq!(session.state.last_city_checked, None);
    }

    #[tokio::test]
    async fn test_transfer_to_unknown_agent_is_reported() {
        let model = Arc::new(ScriptedModel::new([
            LlmResponse::function_call(TRANSFER_TOOL, json!({"agent_name": "ghost"})),
            LlmResponse::text("ok"),
        ]));
        let runner = Runner::new(weather_agent(), model.clone());
        let mut session = Session::new("s1", SessionState::new());

        runner.run(&mut session, "hi").await.unwrap();
        assert_eq!(model.requests()[1].agent_name, "weather");
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let call = LlmResponse::function_call("get_weather_stateful", json!({"city": "Tokyo"}));
        let model = Arc::new(ScriptedModel::new(vec![call; 5]));
        let runner = Runner::new(weather_agent(), model);
        let mut session = Session::new("s1", SessionState::new());

        let err = runner.run(&mut session, "loop").await.unwrap_err();
        assert!(matches!(err, Error::MaxIterations(4)));
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let runner = Runner::new(weather_agent(), Arc::new(ScriptedModel::default()));
        let mut session = Session::new("s1", SessionState::new());
        let err = runner.run(&mut session, "hi").await.unwrap_err();
        assert!(matches!(err, Error::Model(_)));
    }

    fn function_responses(session: &Session) -> Vec<Value> {
        session
            .history
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| match p {
                crate::content::Part::FunctionResponse { response, .. } => Some(response.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_failed_turn_can_be_retried() {
        let model = Arc::new(ScriptedModel::default());
        let runner = Runner::new(weather_agent(), model.clone());
        let mut session = Session::new("s1", SessionState::new());

        assert!(runner.run(&mut session, "weather in Tokyo?").await.is_err());
        assert!(session.history.is_empty());

        model.push(LlmResponse::function_call(
            "get_weather_stateful",
            json!({"city": "Tokyo"}),
        ));
        assert!(runner.run(&mut session, "weather in Tokyo?").await.is_err());
        assert!(session.history.is_empty());
        // The tool ran before the backend gave out.
        assert_eq!(session.state.last_city_checked.as_deref(), Some("Tokyo"));

        model.push(LlmResponse::text("Light rain in Tokyo."));
        let answer = runner.run(&mut session, "weather in Tokyo?").await.unwrap();
        assert_eq!(answer, "Light rain in Tokyo.");
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].first_text(), Some("weather in Tokyo?"));
    }

    #[tokio::test]
    async fn test_max_iterations_rolls_back_history() {
        let mut session = Session::new("s1", SessionState::new());
        session.history.push(Content::user_text("earlier"));
        session.history.push(Content::model_text("reply"));

        let call = LlmResponse::function_call("get_weather_stateful", json!({"city": "Tokyo"}));
        let runner = Runner::new(weather_agent(), Arc::new(ScriptedModel::new(vec![call; 4])));

        assert!(runner.run(&mut session, "loop").await.is_err());
        assert_eq!(session.history.len(), 2);
    }

    #[tokio::test]
    async fn test_register_tool_closure() {
        let mut agent = weather_agent();
        agent
            .register_tool(
                ToolInfo::new("get_humidity", "Humidity for a city")
                    .arg_required("city", "string", "City name")
                    .returns("object"),
                |args, ctx| {
                    let city = args.get("city").and_then(Value::as_str).unwrap_or_default();
                    json!({ "city": city, "humidity": 80, "agent": ctx.agent_name })
                },
            )
            .unwrap();
        let model = Arc::new(ScriptedModel::new([
            LlmResponse::function_call("get_humidity", json!({"city": "Tokyo"})),
            LlmResponse::text("80% humidity."),
        ]));
        let runner = Runner::new(agent, model.clone());
        let mut session = Session::new("s1", SessionState::new());

        runner.run(&mut session, "humidity in Tokyo?").await.unwrap();

        assert_eq!(
            function_responses(&session),
            vec![json!({"city": "Tokyo", "humidity": 80, "agent": "weather"})]
        );
        assert!(model.requests()[0].tools.iter().any(|t| t.name == "get_humidity"));
    }

    #[tokio::test]
    async fn test_city_guard_for_other_tool() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut agent = weather_agent()
            .before_tool(BlockCityToolGuard::new("paris").for_tool("get_forecast"));
        agent
            .register_tool(
                ToolInfo::new("get_forecast", "Three-day forecast")
                    .arg_required("city", "string", "City name"),
                move |_args, _ctx| {
                    counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    json!({"status": "success", "report": "sunny"})
                },
            )
            .unwrap();
        let model = Arc::new(ScriptedModel::new([
            LlmResponse::function_call("get_forecast", json!({"city": "PARIS"})),
            LlmResponse::function_call("get_forecast", json!({"city": "London"})),
            LlmResponse::function_call("get_weather_stateful", json!({"city": "London"})),
            LlmResponse::text("done"),
        ]));
        let runner = Runner::new(agent, model);
        let mut session = Session::new("s1", SessionState::new());

        runner.run(&mut session, "forecasts").await.unwrap();

        let responses = function_responses(&session);
        assert_eq!(
            responses[0]["error_message"],
            "Policy restriction: Weather checks for 'Paris' are currently disabled by a tool guardrail."
        );
        assert_eq!(responses[1]["status"], "success");
        // The weather tool is no longer the guarded one.
        assert_eq!(responses[2]["status"], "success");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(session.state.tool_block_triggered);
    }

    #[tokio::test]
    async fn test_callbacks_fire_during_delegation() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let transfers = Arc::new(Mutex::new(Vec::new()));
        let tool_calls = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(Mutex::new(None));
        let all = Arc::new(AtomicUsize::new(0));

        let model = Arc::new(ScriptedModel::new([
            LlmResponse::function_call(TRANSFER_TOOL, json!({"agent_name": "greeter"})),
            LlmResponse::function_call("say_hello", json!({"name": "Alice"})),
            LlmResponse::text("Hello, Alice!"),
        ]));
        let runner = Runner::new(weather_agent(), model)
            .on_transfer({
                let transfers = Arc::clone(&transfers);
                move |e| {
                    if let AgentEvent::Transfer { from, to } = e {
                        transfers.lock().unwrap().push((from.clone(), to.clone()));
                    }
                }
            })
            .on_tool_call({
                let tool_calls = Arc::clone(&tool_calls);
                move |_| {
                    tool_calls.fetch_add(1, Ordering::SeqCst);
                }
            })
            .on_finish({
                let finished = Arc::clone(&finished);
                move |e| {
                    if let AgentEvent::Finish { agent, .. } = e {
                        *finished.lock().unwrap() = Some(agent.clone());
                    }
                }
            })
            .on_event({
                let all = Arc::clone(&all);
                move |_| {
                    all.fetch_add(1, Ordering::SeqCst);
                }
            })
            .capture_events(true);
        let mut session = Session::new("s1", SessionState::new());

        runner.run(&mut session, "hi, I'm alice").await.unwrap();

        assert_eq!(
            transfers.lock().unwrap().as_slice(),
            &[("weather".to_string(), "greeter".to_string())]
        );
        assert_eq!(tool_calls.load(Ordering::SeqCst), 1);
        assert_eq!(finished.lock().unwrap().as_deref(), Some("greeter"));
        assert_eq!(all.load(Ordering::SeqCst), runner.take_events().len());
        // The final answer came from the greeter, which has no output key.
        assert_eq!(session.state.last_weather_report, None);
    }

    #[tokio::test]
    async fn test_replaced_callbacks() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let errors = Arc::new(AtomicUsize::new(0));
        let callbacks = AgentCallbacks {
            on_error: Some(Arc::new({
                let errors = Arc::clone(&errors);
                move |_| {
                    errors.fetch_add(1, Ordering::SeqCst);
                }
            })),
            ..Default::default()
        };
        let runner =
            Runner::new(weather_agent(), Arc::new(ScriptedModel::default())).callbacks(callbacks);
        let mut session = Session::new("s1", SessionState::new());

        assert!(runner.run(&mut session, "hi").await.is_err());
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transfer_back_to_parent() {
        let model = Arc::new(ScriptedModel::new([
            LlmResponse::function_call(TRANSFER_TOOL, json!({"agent_name": "greeter"})),
            LlmResponse::function_call(TRANSFER_TOOL, json!({"agent_name": "weather"})),
            LlmResponse::text("Back at the weather desk."),
        ]));
        let runner = Runner::new(weather_agent(), model.clone());
        let mut session = Session::new("s1", SessionState::new());

        let answer = runner.run(&mut session, "weather please").await.unwrap();

        let agents: Vec<String> = model.requests().iter().map(|r| r.agent_name.clone()).collect();
        assert_eq!(agents, vec!["weather", "greeter", "weather"]);
        assert_eq!(session.state.last_weather_report.as_deref(), Some(answer.as_str()));
    }
}
