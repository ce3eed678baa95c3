//! Runtime events and callbacks for observability.

use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Events emitted while the runner drives a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Starting a new iteration
    IterationStart {
        agent: String,
        iteration: usize,
        max_iterations: usize,
    },
    /// About to call the model backend
    ModelRequest { agent: String, message_count: usize },
    /// Model backend responded
    ModelResponse { agent: String, content: String },
    /// A model guard replaced the model call
    ModelOverridden { agent: String, content: String },
    /// The model asked for a tool
    ToolCall {
        agent: String,
        name: String,
        args: Value,
    },
    /// A tool guard replaced the tool call
    ToolOverridden { name: String, result: Value },
    /// A tool returned a result
    ToolResult { name: String, result: Value },
    /// The turn moved to another agent
    Transfer { from: String, to: String },
    /// The turn produced its final answer
    Finish { agent: String, text: String },
    /// An error occurred
    Error { message: String },
}

/// Type alias for event callbacks
pub type EventCallback = Arc<dyn Fn(&AgentEvent) + Send + Sync>;

/// Storage for runner callbacks
#[derive(Default, Clone)]
pub struct AgentCallbacks {
    pub on_iteration_start: Option<EventCallback>,
    pub on_model_request: Option<EventCallback>,
    pub on_model_response: Option<EventCallback>,
    pub on_model_overridden: Option<EventCallback>,
    pub on_tool_call: Option<EventCallback>,
    pub on_tool_overridden: Option<EventCallback>,
    pub on_tool_result: Option<EventCallback>,
    pub on_transfer: Option<EventCallback>,
    pub on_finish: Option<EventCallback>,
    pub on_error: Option<EventCallback>,
    /// Catch-all callback for any event
    pub on_event: Option<EventCallback>,
    pub(crate) captured_events: Option<Arc<Mutex<Vec<AgentEvent>>>>,
}

impl AgentCallbacks {
    /// Emit an event to the appropriate callback(s)
    pub fn emit(&self, event: &AgentEvent) {
        if let Some(ref events) = self.captured_events
            && let Ok(mut events) = events.lock()
        {
            events.push(event.clone());
        }

        let specific = match event {
            AgentEvent::IterationStart { .. } => &self.on_iteration_start,
            AgentEvent::ModelRequest { .. } => &self.on_model_request,
            AgentEvent::ModelResponse { .. } => &self.on_model_response,
            AgentEvent::ModelOverridden { .. } => &self.on_model_overridden,
            AgentEvent::ToolCall { .. } => &self.on_tool_call,
            AgentEvent::ToolOverridden { .. } => &self.on_tool_overridden,
            AgentEvent::ToolResult { .. } => &self.on_tool_result,
            AgentEvent::Transfer { .. } => &self.on_transfer,
            AgentEvent::Finish { .. } => &self.on_finish,
            AgentEvent::Error { .. } => &self.on_error,
        };

        if let Some(cb) = specific {
            cb(event);
        }

        if let Some(cb) = &self.on_event {
            cb(event);
        }
    }
}

fn preview(text: &str, limit: usize) -> String {
    let head: String = text.chars().take(limit).collect();
    let suffix = if text.chars().count() > limit { "..." } else { "" };
    format!("{}{}", head.replace('\n', "\\n"), suffix)
}

/// Callbacks that log every event through `tracing`.
pub fn verbose_callbacks() -> AgentCallbacks {
    AgentCallbacks {
        on_iteration_start: Some(Arc::new(|e| {
            if let AgentEvent::IterationStart {
                agent,
                iteration,
                max_iterations,
            } = e
            {
                tracing::info!(%agent, "iteration {}/{}", iteration, max_iterations);
            }
        })),
        on_model_response: Some(Arc::new(|e| {
            if let AgentEvent::ModelResponse { agent, content } = e {
                tracing::info!(%agent, "model: {}", preview(content, 100));
            }
        })),
        on_model_overridden: Some(Arc::new(|e| {
            if let AgentEvent::ModelOverridden { agent, content } = e {
                tracing::info!(%agent, "model call overridden: {}", preview(content, 100));
            }
        })),
        on_tool_call: Some(Arc::new(|e| {
            if let AgentEvent::ToolCall { agent, name, args } = e {
                tracing::info!(%agent, "tool: {}({})", name, args);
            }
        })),
        on_tool_overridden: Some(Arc::new(|e| {
            if let AgentEvent::ToolOverridden { name, result } = e {
                tracing::info!("tool {} overridden: {}", name, result);
            }
        })),
        on_tool_result: Some(Arc::new(|e| {
            if let AgentEvent::ToolResult { name, result } = e {
                tracing::info!("tool {} -> {}", name, preview(&result.to_string(), 80));
            }
        })),
        on_transfer: Some(Arc::new(|e| {
            if let AgentEvent::Transfer { from, to } = e {
                tracing::info!("transfer: {} -> {}", from, to);
            }
        })),
        on_finish: Some(Arc::new(|e| {
            if let AgentEvent::Finish { agent, text } = e {
                tracing::info!(%agent, "finish: {}", preview(text, 100));
            }
        })),
        on_error: Some(Arc::new(|e| {
            if let AgentEvent::Error { message } = e {
                tracing::error!("{}", message);
            }
        })),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_specific_and_catch_all_both_fire() {
        let specific = Arc::new(AtomicUsize::new(0));
        let all = Arc::new(AtomicUsize::new(0));

        let specific_clone = specific.clone();
        let all_clone = all.clone();
        let callbacks = AgentCallbacks {
            on_finish: Some(Arc::new(move |_| {
                specific_clone.fetch_add(1, Ordering::SeqCst);
            })),
            on_event: Some(Arc::new(move |_| {
                all_clone.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        };

        callbacks.emit(&AgentEvent::Finish {
            agent: "a".to_string(),
            text: "done".to_string(),
        });
        callbacks.emit(&AgentEvent::Error {
            message: "boom".to_string(),
        });

        assert_eq!(specific.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_capture() {
        let callbacks = AgentCallbacks {
            captured_events: Some(Arc::new(Mutex::new(Vec::new()))),
            ..Default::default()
        };
        let event = AgentEvent::Transfer {
            from: "root".to_string(),
            to: "greeting_agent".to_string(),
        };
        callbacks.emit(&event);

        let captured = callbacks.captured_events.unwrap();
        assert_eq!(captured.lock().unwrap().as_slice(), &[event]);
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("line\nbreak", 20), "line\\nbreak");
        assert_eq!(preview("abcdef", 3), "abc...");
    }
}
