//! Parameter schemas for catalog actions.
//!
//! A small JSON-Schema subset: an `object` root with named `properties`, a
//! `required` list, and per-property `type`, `enum`, `items` (arrays) and
//! `additionalProperties` (maps). Parameters not declared in `properties` are
//! rejected. A `null` value counts as absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ValueType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::Array => "array",
            ValueType::Object => "object",
        }
    }

    fn is_scalar(self) -> bool {
        !matches!(self, ValueType::Array | ValueType::Object)
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            ValueType::String => value.is_string(),
            ValueType::Integer => value.is_i64() || value.is_u64(),
            ValueType::Number => value.is_number(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Array => value.is_array(),
            ValueType::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// ParameterViolation
// ---------------------------------------------------------------------------

/// One field that failed validation, e.g. `depth: expected integer, got string`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterViolation {
    pub field: String,
    pub message: String,
}

impl ParameterViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ParameterViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

// ---------------------------------------------------------------------------
// PropertySchema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<PropertySchema>>,
}

impl PropertySchema {
    pub fn of(value_type: ValueType) -> Self {
        Self {
            value_type,
            description: None,
            allowed: None,
            items: None,
            additional_properties: None,
        }
    }

    /// Structural sanity check, run once when the catalog is loaded.
    fn check(&self, path: &str) -> Result<(), String> {
        if let Some(allowed) = &self.allowed {
            if !self.value_type.is_scalar() {
                return Err(format!("{path}: enum is only supported on scalar types"));
            }
            if allowed.is_empty() {
                return Err(format!("{path}: enum must list at least one value"));
            }
            if let Some(bad) = allowed.iter().find(|v| !self.value_type.matches(v)) {
                return Err(format!(
                    "{path}: enum value {bad} is not of type {}",
                    self.value_type
                ));
            }
        }
        match (&self.items, self.value_type) {
            (Some(items), ValueType::Array) => items.check(&format!("{path}[]"))?,
            (Some(_), _) => return Err(format!("{path}: items is only valid on arrays")),
            _ => {}
        }
        match (&self.additional_properties, self.value_type) {
            (Some(values), ValueType::Object) => values.check(&format!("{path}.*"))?,
            (Some(_), _) => {
                return Err(format!(
                    "{path}: additionalProperties is only valid on objects"
                ))
            }
            _ => {}
        }
        Ok(())
    }

    fn validate_value(&self, path: &str, value: &Value, out: &mut Vec<ParameterViolation>) {
        if !self.value_type.matches(value) {
            out.push(ParameterViolation::new(
                path,
                format!(
                    "expected {}, got {}",
                    self.value_type,
                    json_type_name(value)
                ),
            ));
            return;
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(value) {
                let options: Vec<String> = allowed
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                out.push(ParameterViolation::new(
                    path,
                    format!("must be one of: {}", options.join(", ")),
                ));
            }
        }

        match value {
            Value::Array(elements) => {
                if let Some(items) = &self.items {
                    for (i, element) in elements.iter().enumerate() {
                        items.validate_value(&format!("{path}[{i}]"), element, out);
                    }
                }
            }
            Value::Object(map) => {
                if let Some(values) = &self.additional_properties {
                    for (key, element) in map {
                        values.validate_value(&format!("{path}.{key}"), element, out);
                    }
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// ParameterSchema
// ---------------------------------------------------------------------------

/// The accepted parameters of one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    #[serde(rename = "type", default = "object_type")]
    pub schema_type: ValueType,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

fn object_type() -> ValueType {
    ValueType::Object
}

impl Default for ParameterSchema {
    fn default() -> Self {
        Self {
            schema_type: ValueType::Object,
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

impl ParameterSchema {
    pub fn with_property(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    pub fn with_required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    /// Reject schemas that can never validate consistently.
    pub fn check(&self) -> Result<(), String> {
        if self.schema_type != ValueType::Object {
            return Err(format!(
                "parameter schema root must be of type object, got {}",
                self.schema_type
            ));
        }
        for name in &self.required {
            if !self.properties.contains_key(name) {
                return Err(format!("required parameter '{name}' is not declared"));
            }
        }
        for (name, property) in &self.properties {
            property.check(name)?;
        }
        Ok(())
    }

    /// Validate `params`, returning every violation found (empty = valid).
    pub fn validate(&self, params: &Map<String, Value>) -> Vec<ParameterViolation> {
        let mut out = Vec::new();

        for name in &self.required {
            match params.get(name) {
                None | Some(Value::Null) => {
                    out.push(ParameterViolation::new(name, "is required"));
                }
                Some(_) => {}
            }
        }

        for (name, value) in params {
            if value.is_null() {
                continue;
            }
            match self.properties.get(name) {
                Some(property) => property.validate_value(name, value, &mut out),
                None => out.push(ParameterViolation::new(name, "is not an accepted parameter")),
            }
        }

        out
    }
}
