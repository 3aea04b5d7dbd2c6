//! Schema descriptors for capability inputs.
//!
//! A deliberately small subset of JSON Schema: `type`, `properties`,
//! `required`, `items`, `enum`, `minimum` and `maximum`. Enough to describe
//! capability inputs in listings and to reject obviously bad arguments before
//! a handler runs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaDescriptor>>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

impl SchemaDescriptor {
    fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    pub fn object() -> Self {
        Self::typed("object")
    }

    pub fn string() -> Self {
        Self::typed("string")
    }

    pub fn number() -> Self {
        Self::typed("number")
    }

    pub fn integer() -> Self {
        Self::typed("integer")
    }

    pub fn boolean() -> Self {
        Self::typed("boolean")
    }

    pub fn array(items: SchemaDescriptor) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed("array")
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a property; `required` also lists it under `required`.
    pub fn property(mut self, name: impl Into<String>, schema: SchemaDescriptor, required: bool) -> Self {
        let name = name.into();
        if required && !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    pub fn range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn one_of(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.enum_values = Some(values.into_iter().collect());
        self
    }

    /// Check an argument object against this schema.
    ///
    /// Required keys must be present; present properties must satisfy their
    /// own `type`, `enum` and numeric bounds. Unknown keys are allowed.
    pub fn validate_arguments(&self, arguments: &Map<String, Value>) -> Result<(), String> {
        for key in &self.required {
            if !arguments.contains_key(key) {
                return Err(format!("missing required argument '{key}'"));
            }
        }
        for (key, value) in arguments {
            if let Some(schema) = self.properties.get(key) {
                schema.validate_value(key, value)?;
            }
        }
        Ok(())
    }

    fn validate_value(&self, path: &str, value: &Value) -> Result<(), String> {
        if let Some(expected) = self.schema_type.as_deref() {
            let matches = match expected {
                "object" => value.is_object(),
                "array" => value.is_array(),
                "string" => value.is_string(),
                "number" => value.is_number(),
                "integer" => value.is_i64() || value.is_u64(),
                "boolean" => value.is_boolean(),
                "null" => value.is_null(),
                _ => true,
            };
            if !matches {
                return Err(format!("argument '{path}' must be of type {expected}"));
            }
        }

        if let Some(allowed) = &self.enum_values {
            if !allowed.contains(value) {
                return Err(format!(
                    "argument '{path}' must be one of {}",
                    Value::Array(allowed.clone())
                ));
            }
        }

        if let Some(number) = value.as_f64() {
            if let Some(min) = self.minimum.filter(|min| number < *min) {
                return Err(format!("argument '{path}' must be >= {min}"));
            }
            if let Some(max) = self.maximum.filter(|max| number > *max) {
                return Err(format!("argument '{path}' must be <= {max}"));
            }
        }

        match value {
            Value::Object(inner) if !self.properties.is_empty() || !self.required.is_empty() => {
                self.validate_arguments(inner).map_err(|e| format!("{path}: {e}"))
            }
            Value::Array(elements) => match &self.items {
                Some(items) => elements
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, element)| items.validate_value(&format!("{path}[{i}]"), element)),
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fly_to_schema() -> SchemaDescriptor {
        SchemaDescriptor::object()
            .property(
                "longitude",
                SchemaDescriptor::number().range(Some(-180.0), Some(180.0)),
                true,
            )
            .property(
                "latitude",
                SchemaDescriptor::number().range(Some(-90.0), Some(90.0)),
                true,
            )
            .property("height", SchemaDescriptor::number().range(Some(0.0), None), false)
    }

    #[test]
    fn serializes_with_json_schema_keywords() {
        let schema = SchemaDescriptor::object()
            .property(
                "mode",
                SchemaDescriptor::string().one_of([json!("2D"), json!("3D")]),
                true,
            )
            .property("tags", SchemaDescriptor::array(SchemaDescriptor::string()), false);
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["type"], "object");
        assert_eq!(value["required"], json!(["mode"]));
        assert_eq!(value["properties"]["mode"]["enum"], json!(["2D", "3D"]));
        assert_eq!(value["properties"]["tags"]["items"]["type"], "string");
    }

    #[test]
    fn rejects_missing_required_and_out_of_range() {
        let schema = fly_to_schema();
        let ok = json!({"longitude": 2.35, "latitude": 48.85});
        assert!(schema.validate_arguments(ok.as_object().unwrap()).is_ok());

        let missing = json!({"longitude": 2.35});
        let err = schema.validate_arguments(missing.as_object().unwrap()).unwrap_err();
        assert!(err.contains("latitude"));

        let out_of_range = json!({"longitude": 200, "latitude": 0});
        assert!(schema.validate_arguments(out_of_range.as_object().unwrap()).is_err());
    }

    #[test]
    fn checks_types_and_enums() {
        let schema = SchemaDescriptor::object()
            .property("mode", SchemaDescriptor::string().one_of([json!("2D"), json!("3D")]), false)
            .property("count", SchemaDescriptor::integer(), false);

        let bad_enum = json!({"mode": "4D"});
        assert!(schema.validate_arguments(bad_enum.as_object().unwrap()).is_err());

        let bad_type = json!({"count": 1.5});
        assert!(schema.validate_arguments(bad_type.as_object().unwrap()).is_err());

        let unknown_key = json!({"other": true});
        assert!(schema.validate_arguments(unknown_key.as_object().unwrap()).is_ok());
    }
}
