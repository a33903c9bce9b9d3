//! Tool definition types for describing tools to LLMs.
//!
//! A [`ToolDefinition`] is produced by the orchestration layer and handed to a
//! model adapter as-is; the adapter decides how to render it on the wire.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// JSON Schema for an object type (tool parameters).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectJsonSchema {
    /// The schema type (always "object" for tool parameters).
    #[serde(rename = "type")]
    pub schema_type: String,

    /// Property definitions.
    pub properties: IndexMap<String, JsonValue>,

    /// List of required property names.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,

    /// Description of the schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Shared sub-schemas referenced through `$ref`.
    #[serde(rename = "$defs", skip_serializing_if = "IndexMap::is_empty", default)]
    pub defs: IndexMap<String, JsonValue>,
}

impl ObjectJsonSchema {
    /// Create a new empty object schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: IndexMap::new(),
            required: Vec::new(),
            description: None,
            defs: IndexMap::new(),
        }
    }

    /// Add a property to the schema.
    #[must_use]
    pub fn with_property(mut self, name: &str, schema: JsonValue, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required && !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add a named definition, reachable as `#/$defs/{name}`.
    #[must_use]
    pub fn with_def(mut self, name: &str, schema: JsonValue) -> Self {
        self.defs.insert(name.to_string(), schema);
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Check if a property is required.
    #[must_use]
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Check if the schema declares no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl Default for ObjectJsonSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ObjectJsonSchema> for JsonValue {
    fn from(schema: ObjectJsonSchema) -> Self {
        serde_json::to_value(schema).unwrap_or(JsonValue::Null)
    }
}

/// Tool definition sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Tool name, unique within one request.
    pub name: String,

    /// What the tool does, shown to the model.
    pub description: String,

    /// JSON Schema of the tool's parameters.
    pub parameters_json_schema: JsonValue,
}

impl ToolDefinition {
    /// Create a new tool definition with an empty object schema.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters_json_schema: ObjectJsonSchema::new().into(),
        }
    }

    /// Set the parameters schema.
    #[must_use]
    pub fn with_parameters(mut self, schema: impl Into<JsonValue>) -> Self {
        self.parameters_json_schema = schema.into();
        self
    }

    /// Get the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the parameters schema.
    #[must_use]
    pub fn parameters(&self) -> &JsonValue {
        &self.parameters_json_schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_object_json_schema_new() {
        let schema = ObjectJsonSchema::new();
        assert_eq!(schema.schema_type, "object");
        assert!(schema.is_empty());
        assert!(schema.required.is_empty());
    }

    #[test]
    fn test_object_json_schema_with_property() {
        let schema = ObjectJsonSchema::new()
            .with_property("name", json!({"type": "string"}), true)
            .with_property("age", json!({"type": "integer"}), false)
            .with_property("name", json!({"type": "string"}), true);

        assert_eq!(schema.properties.len(), 2);
        assert!(schema.is_required("name"));
        assert!(!schema.is_required("age"));
        assert_eq!(schema.required, vec!["name".to_string()]);
    }

    #[test]
    fn test_schema_to_json() {
        let schema = ObjectJsonSchema::new()
            .with_property("loc", json!({"$ref": "#/$defs/Location"}), true)
            .with_def("Location", json!({"type": "string", "title": "Location"}));
        let value: JsonValue = schema.into();
        assert_eq!(
            value,
            json!({
                "type": "object",
                "properties": {"loc": {"$ref": "#/$defs/Location"}},
                "required": ["loc"],
                "$defs": {"Location": {"type": "string", "title": "Location"}}
            })
        );
    }

    #[test]
    fn test_tool_definition() {
        let tool = ToolDefinition::new("get_weather", "Get the weather").with_parameters(
            ObjectJsonSchema::new().with_property("city", json!({"type": "string"}), true),
        );
        assert_eq!(tool.name(), "get_weather");
        assert_eq!(tool.description(), "Get the weather");
        assert_eq!(tool.parameters()["properties"]["city"]["type"], "string");
    }

    #[test]
    fn test_default_parameters_are_empty_object() {
        let tool = ToolDefinition::new("noop", "Does nothing");
        assert_eq!(tool.parameters(), &json!({"type": "object", "properties": {}}));
    }
}
