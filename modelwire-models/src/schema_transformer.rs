//! JSON schema transformation for model compatibility.
//!
//! Tool parameter schemas are produced elsewhere in full JSON Schema. Some
//! providers accept only a restricted dialect, so before a schema goes on the
//! wire it is rewritten:
//!
//! - `$ref`s into the top-level `$defs` table are inlined, and a reference
//!   cycle is rejected;
//! - unsupported keys (`title`, `default`, ...) are stripped at every node;
//! - truthy `additionalProperties` on an object is rejected.
//!
//! The walk follows `anyOf` branches, object `properties`, array `items` and
//! `prefixItems`.

use modelwire_core::UserError;
use serde_json::{Map, Value as JsonValue};

/// Rewrites JSON schemas into a provider's restricted dialect.
#[derive(Debug, Clone)]
pub struct JsonSchemaTransformer {
    /// Provider name used in error messages.
    pub provider: String,
    /// Keys removed from every schema node.
    pub strip_keys: Vec<String>,
    /// Inline `$ref`s and drop `$defs`.
    pub inline_refs: bool,
    /// Fail on objects allowing additional properties.
    pub reject_additional_properties: bool,
}

impl JsonSchemaTransformer {
    /// Create a transformer that changes nothing.
    #[must_use]
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            strip_keys: Vec::new(),
            inline_refs: false,
            reject_additional_properties: false,
        }
    }

    /// Create a Gemini-compatible transformer.
    #[must_use]
    pub fn gemini() -> Self {
        Self::new("Gemini")
            .strip_key("title")
            .strip_key("default")
            .with_inline_refs(true)
            .with_reject_additional_properties(true)
    }

    /// Add a key to strip.
    #[must_use]
    pub fn strip_key(mut self, key: impl Into<String>) -> Self {
        self.strip_keys.push(key.into());
        self
    }

    /// Enable inlining of `$ref` definitions.
    #[must_use]
    pub fn with_inline_refs(mut self, inline: bool) -> Self {
        self.inline_refs = inline;
        self
    }

    /// Enable rejection of `additionalProperties`.
    #[must_use]
    pub fn with_reject_additional_properties(mut self, reject: bool) -> Self {
        self.reject_additional_properties = reject;
        self
    }

    /// Transform a schema, leaving the input untouched.
    pub fn transform(&self, schema: &JsonValue) -> Result<JsonValue, UserError> {
        let mut schema = schema.clone();
        let Some(root) = schema.as_object_mut() else {
            return Ok(schema);
        };

        let defs = if self.inline_refs {
            match root.remove("$defs") {
                Some(JsonValue::Object(defs)) => defs,
                _ => Map::new(),
            }
        } else {
            Map::new()
        };

        let mut stack = Vec::new();
        self.simplify(root, &defs, &mut stack)?;
        Ok(schema)
    }

    fn simplify(
        &self,
        schema: &mut Map<String, JsonValue>,
        defs: &Map<String, JsonValue>,
        stack: &mut Vec<String>,
    ) -> Result<(), UserError> {
        for key in &self.strip_keys {
            schema.remove(key);
        }

        if self.inline_refs {
            if let Some(reference) = schema.remove("$ref") {
                return self.inline(schema, reference, defs, stack);
            }
        }

        if let Some(JsonValue::Array(branches)) = schema.get_mut("anyOf") {
            for branch in branches.iter_mut() {
                self.simplify_value(branch, defs, stack)?;
            }
        }

        let schema_type = schema.get("type").and_then(JsonValue::as_str).map(str::to_owned);
        match schema_type.as_deref() {
            Some("object") => self.simplify_object(schema, defs, stack),
            Some("array") => self.simplify_array(schema, defs, stack),
            _ => Ok(()),
        }
    }

    fn simplify_value(
        &self,
        value: &mut JsonValue,
        defs: &Map<String, JsonValue>,
        stack: &mut Vec<String>,
    ) -> Result<(), UserError> {
        match value.as_object_mut() {
            Some(map) => self.simplify(map, defs, stack),
            None => Ok(()),
        }
    }

    fn inline(
        &self,
        schema: &mut Map<String, JsonValue>,
        reference: JsonValue,
        defs: &Map<String, JsonValue>,
        stack: &mut Vec<String>,
    ) -> Result<(), UserError> {
        let reference = reference.as_str().unwrap_or_default();
        let key = reference.strip_prefix("#/$defs/").unwrap_or(reference);

        if stack.iter().any(|k| k == key) {
            return Err(UserError::new(format!(
                "Recursive `$ref`s in JSON Schema are not supported by {}",
                self.provider
            )));
        }

        let mut definition = match defs.get(key) {
            Some(JsonValue::Object(def)) => def.clone(),
            _ => {
                return Err(UserError::new(format!(
                    "Unresolvable `$ref` in JSON Schema: {}",
                    reference
                )))
            }
        };

        stack.push(key.to_string());
        let result = self.simplify(&mut definition, defs, stack);
        stack.pop();
        result?;

        schema.extend(definition);
        Ok(())
    }

    fn simplify_object(
        &self,
        schema: &mut Map<String, JsonValue>,
        defs: &Map<String, JsonValue>,
        stack: &mut Vec<String>,
    ) -> Result<(), UserError> {
        if self.reject_additional_properties {
            if let Some(additional) = schema.remove("additionalProperties") {
                if is_truthy(&additional) {
                    return Err(UserError::new(format!(
                        "Additional properties in JSON Schema are not supported by {}",
                        self.provider
                    )));
                }
            }
        }

        if let Some(JsonValue::Object(properties)) = schema.get_mut("properties") {
            for property in properties.values_mut() {
                self.simplify_value(property, defs, stack)?;
            }
        }
        Ok(())
    }

    fn simplify_array(
        &self,
        schema: &mut Map<String, JsonValue>,
        defs: &Map<String, JsonValue>,
        stack: &mut Vec<String>,
    ) -> Result<(), UserError> {
        if let Some(JsonValue::Array(prefix_items)) = schema.get_mut("prefixItems") {
            for item in prefix_items.iter_mut() {
                self.simplify_value(item, defs, stack)?;
            }
        }
        if let Some(items) = schema.get_mut("items") {
            self.simplify_value(items, defs, stack)?;
        }
        Ok(())
    }
}

fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Object(map) => !map.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
    }
}
