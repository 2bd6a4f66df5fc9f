//! Weather lookup for a city. Readings are mocked.

use crate::contract::{AgentBase, AgentContract};
use crate::errors::{AgentError, AgentResult, ErrorKind, SuggestedAction};
use crate::types::{Payload, SchemaDescriptor};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

pub const AGENT_CODE: &str = "weather_agent";

const CONDITIONS: [&str; 6] = [
    "sunny",
    "cloudy",
    "overcast",
    "light rain",
    "moderate rain",
    "thunderstorm",
];

/// Temperature unit, selected by the `unit` configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    fn parse(value: &Value) -> AgentResult<Self> {
        match value.as_str() {
            Some("celsius") => Ok(Self::Celsius),
            Some("fahrenheit") => Ok(Self::Fahrenheit),
            _ => Err(AgentError::configuration(format!(
                "unit must be \"celsius\" or \"fahrenheit\", got {}",
                value
            ))
            .with_suggestion(SuggestedAction::CheckConfig { key: "unit".into() })),
        }
    }

    fn render(&self, celsius: i32) -> String {
        match self {
            Self::Celsius => format!("{}°C", celsius),
            Self::Fahrenheit => {
                let fahrenheit = (f64::from(celsius) * 9.0 / 5.0 + 32.0).round();
                format!("{}°F", fahrenheit as i64)
            }
        }
    }
}

/// Mocked reading, stable for a given city and day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub celsius: i32,
    pub condition: &'static str,
    pub humidity_percent: u8,
    pub wind_speed_ms: u8,
}

impl Reading {
    pub fn mock(city: &str, at: DateTime<Utc>) -> Self {
        let seed = format!("{}|{}", city.to_lowercase(), at.format("%Y-%m-%d"));
        let digest = blake3::hash(seed.as_bytes());
        let bytes = digest.as_bytes();
        Self {
            celsius: 15 + i32::from(bytes[0] % 21),
            condition: CONDITIONS[usize::from(bytes[1]) % CONDITIONS.len()],
            humidity_percent: 40 + bytes[2] % 51,
            wind_speed_ms: 1 + bytes[3] % 15,
        }
    }
}

/// Answers "what's the weather in <city>" with mocked readings.
pub struct WeatherAgent {
    base: AgentBase,
}

impl WeatherAgent {
    pub fn new() -> Self {
        Self {
            base: AgentBase::new(
                AGENT_CODE,
                "Weather Agent",
                "Looks up the weather for a city: temperature, humidity and conditions. \
                 Call this agent when the user asks about the weather.",
            ),
        }
    }

    fn unit(&self) -> TemperatureUnit {
        self.configuration()
            .get("unit")
            .and_then(|v| TemperatureUnit::parse(v).ok())
            .unwrap_or_default()
    }
}

impl Default for WeatherAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentContract for WeatherAgent {
    fn base(&self) -> &AgentBase {
        &self.base
    }

    fn execute(&self, input: &Payload) -> AgentResult<Payload> {
        let city = input
            .get("city")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::execution("city must be a string"))?;
        let now = Utc::now();
        let reading = Reading::mock(city, now);

        let output = json!({
            "city": city,
            "temperature": self.unit().render(reading.celsius),
            "weather": reading.condition,
            "humidity": format!("{}%", reading.humidity_percent),
            "wind_speed": format!("{}m/s", reading.wind_speed_ms),
            "update_time": now.format("%Y-%m-%d %H:%M:%S").to_string(),
        });
        Ok(output.as_object().cloned().unwrap_or_default())
    }

    fn input_schema(&self) -> SchemaDescriptor {
        SchemaDescriptor::object()
            .property(
                "city",
                SchemaDescriptor::string().describe("City name, e.g. Beijing, Shanghai, Shenzhen"),
            )
            .require("city")
    }

    fn output_schema(&self) -> SchemaDescriptor {
        let text = |d: &str| SchemaDescriptor::string().describe(d);
        SchemaDescriptor::object()
            .property("city", text("City name"))
            .property("temperature", text("Temperature with unit"))
            .property("weather", text("Weather condition"))
            .property("humidity", text("Relative humidity"))
            .property("wind_speed", text("Wind speed"))
            .property("update_time", text("Time of the reading"))
    }

    fn capabilities(&self) -> Vec<String> {
        ["weather-lookup", "current-weather", "forecast"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn category(&self) -> String {
        "weather".to_string()
    }

    fn tags(&self) -> Vec<String> {
        ["weather", "lookup", "realtime"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn set_configuration(&self, config: Payload) -> AgentResult<()> {
        if let Some(unit) = config.get("unit") {
            TemperatureUnit::parse(unit)?;
        }
        self.base.replace_configuration(config.into());
        Ok(())
    }

    fn validate_input(&self, input: &Payload) -> AgentResult<bool> {
        let city = input
            .get("city")
            .ok_or_else(|| AgentError::validation("missing required parameter: city"))?;
        match city.as_str() {
            Some(name) if !name.trim().is_empty() => Ok(true),
            _ => Err(AgentError::validation("city must be a non-empty string")),
        }
    }

    fn before_execute(&self, input: &mut Payload) -> AgentResult<()> {
        if let Some(Value::String(city)) = input.get_mut("city") {
            let trimmed = city.trim().to_string();
            *city = trimmed;
        }
        Ok(())
    }

    fn on_error(&self, error: &AgentError) -> Payload {
        let mut details = error.to_details();
        if error.kind == ErrorKind::Validation {
            details.insert(
                "hint".into(),
                "send a non-empty city name, e.g. {\"city\": \"Beijing\"}".into(),
            );
        }
        details
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn input(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_mock_reading_is_stable_and_in_range() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let a = Reading::mock("Beijing", at);
        let b = Reading::mock("beijing", at);
        assert_eq!(a, b);
        assert!((15..=35).contains(&a.celsius));
        assert!((40..=90).contains(&a.humidity_percent));
        assert!((1..=15).contains(&a.wind_speed_ms));
        assert!(CONDITIONS.contains(&a.condition));
    }

    #[test]
    fn test_execute_output_shape() {
        let out = WeatherAgent::new()
            .execute(&input(json!({"city": "Shanghai"})))
            .unwrap();
        assert_eq!(out["city"], "Shanghai");
        assert!(out["temperature"].as_str().unwrap().ends_with("°C"));
        assert!(out["humidity"].as_str().unwrap().ends_with('%'));
        assert!(out["wind_speed"].as_str().unwrap().ends_with("m/s"));
        assert_eq!(out["update_time"].as_str().unwrap().len(), 19);
    }

    #[test]
    fn test_fahrenheit_configuration() {
        let agent = WeatherAgent::new();
        agent
            .set_configuration(input(json!({"unit": "fahrenheit"})))
            .unwrap();
        let out = agent.execute(&input(json!({"city": "Shenzhen"}))).unwrap();
        assert!(out["temperature"].as_str().unwrap().ends_with("°F"));
    }

    #[test]
    fn test_bad_unit_rejected_and_not_applied() {
        let agent = WeatherAgent::new();
        agent
            .set_configuration(input(json!({"unit": "fahrenheit"})))
            .unwrap();
        let err = agent
            .set_configuration(input(json!({"unit": "kelvin"})))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert_eq!(agent.configuration().get_str("unit"), Some("fahrenheit"));
    }

    #[test]
    fn test_validation() {
        let agent = WeatherAgent::new();
        assert!(agent.validate_input(&input(json!({"city": "Beijing"}))).unwrap());
        assert_eq!(
            agent.validate_input(&input(json!({}))).unwrap_err().message,
            "missing required parameter: city"
        );
        assert_eq!(
            agent
                .validate_input(&input(json!({"city": "   "})))
                .unwrap_err()
                .message,
            "city must be a non-empty string"
        );
        assert!(agent.validate_input(&input(json!({"city": 7}))).is_err());
    }

    #[test]
    fn test_before_execute_trims_city() {
        let agent = WeatherAgent::new();
        let mut payload = input(json!({"city": "  Beijing "}));
        agent.before_execute(&mut payload).unwrap();
        assert_eq!(payload["city"], "Beijing");
    }

    #[test]
    fn test_on_error_adds_hint_for_validation() {
        let agent = WeatherAgent::new();
        let details = agent.on_error(&AgentError::validation("missing required parameter: city"));
        assert!(details.contains_key("hint"));
        assert_eq!(details["error_kind"], "VALIDATION");

        let details = agent.on_error(&AgentError::execution("boom"));
        assert!(!details.contains_key("hint"));
    }

    #[test]
    fn test_fahrenheit_render() {
        assert_eq!(TemperatureUnit::Fahrenheit.render(20), "68°F");
        assert_eq!(TemperatureUnit::Fahrenheit.render(16), "61°F");
        assert_eq!(TemperatureUnit::Fahrenheit.render(-7), "19°F");
        assert_eq!(TemperatureUnit::Celsius.render(20), "20°C");
    }
}
