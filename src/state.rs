//! Per-session state shared by guardrails and tools.
//!
//! The keys the team relies on are typed fields; anything else written
//! through [`SessionState::set`] lands in an untyped extras map. The
//! serialized form uses the conventional key names, so a state snapshot
//! reads the same as a plain key-value store.
//!
//! # Example
//!
//! ```
//! use weather_team::{SessionState, TemperatureUnit};
//! use serde_json::json;
//!
//! let mut state = SessionState::default();
//! state.set("user_preference_temperature_unit", json!("Fahrenheit")).unwrap();
//! assert_eq!(state.temperature_unit, TemperatureUnit::Fahrenheit);
//!
//! state.set("favorite_color", json!("green")).unwrap();
//! assert_eq!(state.get("favorite_color"), Some(json!("green")));
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

pub const TEMPERATURE_UNIT_KEY: &str = "user_preference_temperature_unit";
pub const LAST_CITY_KEY: &str = "last_city_checked_stateful";
pub const KEYWORD_BLOCK_KEY: &str = "guardrail_block_keyword_triggered";
pub const TOOL_BLOCK_KEY: &str = "guardrail_tool_block_triggered";
pub const LAST_WEATHER_REPORT_KEY: &str = "last_weather_report";

/// Unit the user wants temperatures reported in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    /// Convert a Celsius reading into this unit.
    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Celsius => f.write_str("Celsius"),
            Self::Fahrenheit => f.write_str("Fahrenheit"),
        }
    }
}

/// State scoped to one conversation session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(rename = "user_preference_temperature_unit", default)]
    pub temperature_unit: TemperatureUnit,

    /// City passed to the last successful weather lookup, as the user wrote it
    #[serde(
        rename = "last_city_checked_stateful",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_city_checked: Option<String>,

    #[serde(rename = "guardrail_block_keyword_triggered", default)]
    pub keyword_block_triggered: bool,

    #[serde(rename = "guardrail_tool_block_triggered", default)]
    pub tool_block_triggered: bool,

    /// Final answer of the root agent, written through its output key
    #[serde(
        rename = "last_weather_report",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_weather_report: Option<String>,

    #[serde(flatten)]
    extras: HashMap<String, Value>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a preferred temperature unit.
    pub fn with_temperature_unit(mut self, unit: TemperatureUnit) -> Self {
        self.temperature_unit = unit;
        self
    }

    /// Get the raw JSON value for a key.
    ///
    /// Unset optional keys return `None`; flags and the unit preference
    /// always have a value.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            TEMPERATURE_UNIT_KEY => Some(Value::String(self.temperature_unit.to_string())),
            LAST_CITY_KEY => self.last_city_checked.clone().map(Value::String),
            KEYWORD_BLOCK_KEY => Some(Value::Bool(self.keyword_block_triggered)),
            TOOL_BLOCK_KEY => Some(Value::Bool(self.tool_block_triggered)),
            LAST_WEATHER_REPORT_KEY => self.last_weather_report.clone().map(Value::String),
            _ => self.extras.get(key).cloned(),
        }
    }

    /// Get the value for a key, falling back to `default` when unset.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Retrieve a value as a concrete type.
    ///
    /// Returns `None` if the key is unset or the value does not deserialize.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    /// Store a value.
    ///
    /// Typed keys reject values of the wrong shape; `null` clears the
    /// optional ones.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let invalid = |source| Error::InvalidState {
            key: key.to_string(),
            source,
        };

        match key {
            TEMPERATURE_UNIT_KEY => {
                self.temperature_unit = serde_json::from_value(value).map_err(invalid)?;
            }
            LAST_CITY_KEY => {
                self.last_city_checked = serde_json::from_value(value).map_err(invalid)?;
            }
            KEYWORD_BLOCK_KEY => {
                self.keyword_block_triggered = serde_json::from_value(value).map_err(invalid)?;
            }
            TOOL_BLOCK_KEY => {
                self.tool_block_triggered = serde_json::from_value(value).map_err(invalid)?;
            }
            LAST_WEATHER_REPORT_KEY => {
                self.last_weather_report = serde_json::from_value(value).map_err(invalid)?;
            }
            _ => {
                self.extras.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Remove an untyped key.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.extras.remove(key)
    }

    /// Keys stored outside the typed fields.
    pub fn extra_keys(&self) -> Vec<String> {
        self.extras.keys().cloned().collect()
    }
}
