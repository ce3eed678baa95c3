//! Mocked stateful weather lookup.

use super::{Tool, ToolContext, ToolInfo, ToolOutcome};
use crate::state::SessionState;
use serde_json::{Map, Value};

pub const WEATHER_TOOL_NAME: &str = "get_weather_stateful";

struct Reading {
    celsius: f64,
    condition: &'static str,
}

fn lookup(normalized_city: &str) -> Option<Reading> {
    let (celsius, condition) = match normalized_city {
        "newyork" => (25.0, "sunny"),
        "london" => (15.0, "cloudy"),
        "tokyo" => (18.0, "light rain"),
        _ => return None,
    };
    Some(Reading { celsius, condition })
}

fn normalize_city(city: &str) -> String {
    city.to_lowercase().split_whitespace().collect()
}

/// Upper-case the first character and lower-case the rest.
pub(crate) fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Look up the weather for `city`, reporting in the session's preferred unit.
///
/// A hit records the city, as given, in `last_city_checked_stateful`. A
/// miss leaves the state untouched.
pub fn get_weather_stateful(city: &str, state: &mut SessionState) -> ToolOutcome {
    let unit = state.temperature_unit;
    tracing::debug!(city, %unit, "weather lookup");

    let Some(reading) = lookup(&normalize_city(city)) else {
        tracing::debug!(city, "city not found");
        return ToolOutcome::error(format!(
            "Sorry, I don't have weather information for '{}'.",
            city
        ));
    };

    let temperature = unit.from_celsius(reading.celsius).round() as i64;
    let report = format!(
        "The weather in {} is {} with a temperature of {}{}.",
        capitalize(city),
        reading.condition,
        temperature,
        unit.symbol()
    );

    state.last_city_checked = Some(city.to_string());
    tracing::debug!(city, "updated last city checked");

    ToolOutcome::Success { report }
}

/// Tool wrapper around [`get_weather_stateful`].
pub struct WeatherTool {
    info: ToolInfo,
}

impl WeatherTool {
    pub fn new() -> Self {
        Self {
            info: ToolInfo::new(
                WEATHER_TOOL_NAME,
                "Retrieves the current weather report for a city, in the user's preferred temperature unit.",
            )
            .arg_required("city", "string", "The name of the city, e.g. \"New York\"")
            .returns("object"),
        }
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for WeatherTool {
    fn info(&self) -> &ToolInfo {
        &self.info
    }

    fn call(&self, args: &Map<String, Value>, ctx: &mut ToolContext<'_>) -> Value {
        let city = args.get("city").and_then(Value::as_str).unwrap_or("");
        get_weather_stateful(city, ctx.state).into()
    }
}
