//! System instruction templates.

/// Function the model calls to hand the turn to another agent.
pub const TRANSFER_TOOL: &str = "transfer_to_agent";

/// System instruction template shared by every agent.
pub const SYSTEM_PROMPT_TEMPLATE: &str = r#"{instruction}

<tools>
{tools}
</tools>

<agents>
{agents}
</agents>

<rules>
- Call at most the tools listed above, with the listed arguments
- Tool results come back as function responses; read "status" before answering
- To hand the conversation to another agent, call transfer_to_agent(agent_name) with one of the agents listed above
- Reply with plain text once you have the answer
</rules>
"#;

pub fn render(instruction: &str, tools: &[String], agents: &[String]) -> String {
    let tools = if tools.is_empty() {
        "No tools available.".to_string()
    } else {
        tools.join("\n")
    };
    let agents = if agents.is_empty() {
        "No other agents available.".to_string()
    } else {
        agents.join("\n")
    };
    SYSTEM_PROMPT_TEMPLATE
        .replace("{instruction}", instruction)
        .replace("{tools}", &tools)
        .replace("{agents}", &agents)
}
