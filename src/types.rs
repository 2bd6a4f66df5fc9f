//! Shared types used across the protocol.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Open key/value mapping used for inputs, outputs, configuration and
/// error details.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Identity of an agent. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentDescriptor {
    code: String,
    name: String,
    description: String,
}

impl AgentDescriptor {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            description: description.into(),
        }
    }

    /// Unique agent code, used by callers to confirm identity
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Display for AgentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// Value type in a [`SchemaDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
}

/// Self-describing shape of an input or output payload.
///
/// Serializes to a JSON Schema subset: `type`, `description`, `enum`,
/// `items`, `properties` and `required`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Enumerated value set
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<serde_json::Value>>,

    /// Element schema for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaDescriptor>>,

    /// Field schemas for objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaDescriptor>>,

    /// Required field names for objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl SchemaDescriptor {
    fn of(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            description: None,
            allowed_values: None,
            items: None,
            properties: None,
            required: None,
        }
    }

    /// Object with no properties.
    pub fn object() -> Self {
        Self {
            properties: Some(BTreeMap::new()),
            ..Self::of(SchemaType::Object)
        }
    }

    /// Object with no properties and an explicit, empty required list.
    ///
    /// This is the default input schema.
    pub fn empty_input() -> Self {
        Self {
            required: Some(Vec::new()),
            ..Self::object()
        }
    }

    pub fn array(items: SchemaDescriptor) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of(SchemaType::Array)
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaType::String)
    }

    pub fn number() -> Self {
        Self::of(SchemaType::Number)
    }

    pub fn integer() -> Self {
        Self::of(SchemaType::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(SchemaType::Boolean)
    }

    /// Set the human-readable description
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restrict to an enumerated value set
    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<serde_json::Value>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Add a field
    pub fn property(mut self, name: impl Into<String>, schema: SchemaDescriptor) -> Self {
        self.properties
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), schema);
        self
    }

    /// Mark a field as required
    pub fn require(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let required = self.required.get_or_insert_with(Vec::new);
        if !required.contains(&name) {
            required.push(name);
        }
        self
    }

    /// Look up a field schema
    pub fn field(&self, name: &str) -> Option<&SchemaDescriptor> {
        self.properties.as_ref().and_then(|p| p.get(name))
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required
            .as_ref()
            .map(|r| r.iter().any(|n| n == name))
            .unwrap_or(false)
    }

    /// Render as a JSON value
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Default for SchemaDescriptor {
    fn default() -> Self {
        Self::object()
    }
}

/// Outcome status discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Identifier of a single invocation (log and event correlation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(pub Uuid);

impl InvocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "inv_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_schemas() {
        assert_eq!(
            SchemaDescriptor::empty_input().to_value(),
            json!({"type": "object", "properties": {}, "required": []})
        );
        assert_eq!(
            SchemaDescriptor::object().to_value(),
            json!({"type": "object", "properties": {}})
        );
    }

    #[test]
    fn test_schema_builder() {
        let schema = SchemaDescriptor::object()
            .property(
                "data",
                SchemaDescriptor::array(SchemaDescriptor::number()).describe("numbers"),
            )
            .property(
                "operation",
                SchemaDescriptor::string().one_of(["sum", "avg"]),
            )
            .require("data")
            .require("operation")
            .require("data");

        assert!(schema.is_required("data"));
        assert!(!schema.is_required("missing"));
        assert_eq!(schema.required.as_ref().unwrap().len(), 2);
        assert_eq!(
            schema.to_value()["properties"]["operation"]["enum"],
            json!(["sum", "avg"])
        );
        assert_eq!(
            schema.to_value()["properties"]["data"]["items"],
            json!({"type": "number"})
        );
    }

    #[test]
    fn test_schema_deserializes() {
        let raw = json!({
            "type": "object",
            "properties": {"city": {"type": "string", "description": "City name"}},
            "required": ["city"]
        });
        let schema: SchemaDescriptor = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(schema.field("city").unwrap().schema_type, SchemaType::String);
        assert_eq!(schema.to_value(), raw);
    }

    #[test]
    fn test_descriptor_display() {
        let d = AgentDescriptor::new("weather_agent", "Weather Agent", "Looks up weather");
        assert_eq!(d.to_string(), "Weather Agent (weather_agent)");
        assert_eq!(d.code(), "weather_agent");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(Status::Success).unwrap(), json!("success"));
        assert_eq!(Status::Error.to_string(), "error");
    }
}
