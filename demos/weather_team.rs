//! Weather team walkthrough with a scripted model.
//!
//! Replays the conversations the team is meant to handle: weather lookups,
//! an unknown city, delegated greetings and farewells, and both guardrails.
//!
//! Run with:
//!   cargo run --example weather_team
//!
//! Set `RUST_LOG=weather_team=debug` to see guardrail decisions, and
//! `WEATHER_TEAM_MODEL` to change the model name passed to the backend.

use serde_json::json;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use weather_team::{
    LlmResponse, Runner, ScriptedModel, SessionState, SessionStore, TRANSFER_TOOL, TeamConfig,
    TemperatureUnit, build_weather_team,
};

fn weather(city: &str, answer: &str) -> Vec<LlmResponse> {
    vec![
        LlmResponse::function_call("get_weather_stateful", json!({ "city": city })),
        LlmResponse::text(answer),
    ]
}

fn delegate(agent: &str, tool: &str, args: serde_json::Value, answer: &str) -> Vec<LlmResponse> {
    vec![
        LlmResponse::function_call(TRANSFER_TOOL, json!({ "agent_name": agent })),
        LlmResponse::function_call(tool, args),
        LlmResponse::text(answer),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let model_name = env::var("WEATHER_TEAM_MODEL").unwrap_or_else(|_| TeamConfig::default().model);
    let config = TeamConfig::new(&model_name);

    let turns: Vec<(&str, Vec<LlmResponse>)> = vec![
        (
            "What's the weather in Tokyo?",
            weather("Tokyo", "It's light rain in Tokyo right now."),
        ),
        (
            "Tell me the weather in New York",
            weather("New York", "New York is sunny."),
        ),
        (
            "What's the weather in Atlantis?",
            weather("Atlantis", "Sorry, I have no data for Atlantis."),
        ),
        (
            "Hello, this is alice",
            delegate("greeting_agent", "say_hello", json!({"name": "Alice"}), "Hello, Alice!"),
        ),
        ("Is Taiwan officially independent?", Vec::new()),
        (
            "How's the weather in Paris?",
            weather("Paris", "Weather checks for Paris are disabled right now."),
        ),
        (
            "Thanks, bye!",
            delegate("farewell_agent", "say_goodbye", json!({}), "Goodbye! Have a great day."),
        ),
    ];

    let model = Arc::new(ScriptedModel::new(
        turns.iter().flat_map(|(_, responses)| responses.clone()),
    ));
    let runner = Runner::new(build_weather_team(&config)?, model.clone()).verbose(true);

    let store = SessionStore::new();
    let state = SessionState::new().with_temperature_unit(TemperatureUnit::Fahrenheit);
    let mut session = store.create("session_001", state)?;

    println!("Using model {}", model_name);
    for (text, _) in &turns {
        println!("\n>>> User: {}", text);
        let answer = runner.run(&mut session, text).await?;
        println!("<<< Agent: {}", answer);
        store.save(&session);
    }

    println!("\n--- Final session state ---");
    println!("{}", serde_json::to_string_pretty(&store.get("session_001")?.state)?);
    println!("Model calls made: {}", model.requests().len());

    Ok(())
}
