//! Agent configuration.

/// Model name used when none is given.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-live-001";

/// Model and loop settings for one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// The model to use (e.g., "gemini-2.0-flash")
    pub model: String,
    /// Maximum number of model calls within one user turn
    pub max_iterations: usize,
    /// Temperature for LLM sampling
    pub temperature: Option<f32>,
    /// Maximum tokens for LLM response
    pub max_tokens: Option<u32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_iterations: 10,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl AgentConfig {
    /// Create a new config with the specified model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the maximum number of iterations.
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = Some(t);
        self
    }

    /// Set the max tokens.
    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }
}
