//! Validation and conversion of generic message attributes.
//!
//! Producers accept attributes as an open `serde_json::Value` map so callers can
//! pass whatever their serialization layer produces. Before anything reaches a
//! provider the map is validated into the closed [`AttributeValue`] set and then
//! converted into [`TypedAttribute`]s, the `(data type, string value)` pair that
//! SQS and SNS message attributes are built from.
//!
//! Supported value types:
//! - String: passed through unchanged, typed `String`
//! - Number: natural decimal form (`10` → `"10"`, `99.5` → `"99.5"`), typed `Number`
//! - Boolean: `"true"` / `"false"`, typed `String` (the providers have no boolean type)
//!
//! Null values fail with [`AttributeError::InvalidAttribute`]; arrays and objects
//! (lists, nested maps, binary payloads) fail with
//! [`AttributeError::UnsupportedType`].

use crate::error::AttributeError;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;

/// Generic attribute bag accepted at the producer boundary
pub type Attributes = HashMap<String, Value>;

/// Provider-side data type of a converted attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeDataType {
    String,
    Number,
}

impl AttributeDataType {
    /// Get the data type name as the providers spell it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "Number",
        }
    }

    /// Parse a provider data type name.
    ///
    /// Custom suffixes (`Number.float`, `String.json`) map to their base type.
    pub fn from_provider(data_type: &str) -> Option<Self> {
        let base = data_type.split('.').next().unwrap_or(data_type);
        match base {
            "String" => Some(Self::String),
            "Number" => Some(Self::Number),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Number(Number),
    Boolean(bool),
}

impl AttributeValue {
    /// Validate an open JSON value into the closed attribute set
    pub fn from_json(key: &str, value: &Value) -> Result<Self, AttributeError> {
        match value {
            Value::Null => Err(AttributeError::InvalidAttribute {
                key: key.to_string(),
            }),
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Bool(b) => Ok(Self::Boolean(*b)),
            Value::Number(n) => Ok(Self::Number(n.clone())),
            Value::Array(_) => Err(AttributeError::UnsupportedType {
                key: key.to_string(),
                type_name: "array".to_string(),
            }),
            Value::Object(_) => Err(AttributeError::UnsupportedType {
                key: key.to_string(),
                type_name: "object".to_string(),
            }),
        }
    }

    /// Create a numeric attribute from a float.
    ///
    /// Returns `None` for NaN and infinities, which have no decimal form.
    pub fn float(value: f64) -> Option<Self> {
        Number::from_f64(value).map(Self::Number)
    }

    /// Convert into the provider representation
    pub fn to_typed(&self) -> TypedAttribute {
        match self {
            Self::String(s) => TypedAttribute::new(AttributeDataType::String, s.clone()),
            Self::Boolean(b) => TypedAttribute::new(AttributeDataType::String, b.to_string()),
            Self::Number(n) => TypedAttribute::new(AttributeDataType::Number, n.to_string()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<u64> for AttributeValue {
    fn from(value: u64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<AttributeValue> for Value {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::String(s) => Value::String(s),
            AttributeValue::Number(n) => Value::Number(n),
            AttributeValue::Boolean(b) => Value::Bool(b),
        }
    }
}

/// An attribute in provider form: a data type plus its string encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedAttribute {
    pub data_type: AttributeDataType,
    pub string_value: String,
}

impl TypedAttribute {
    /// Create new typed attribute
    pub fn new(data_type: AttributeDataType, string_value: impl Into<String>) -> Self {
        Self {
            data_type,
            string_value: string_value.into(),
        }
    }

    /// Map a received attribute back into a generic value.
    ///
    /// Numbers that do not parse as JSON numbers are returned as strings so
    /// nothing a provider hands back is dropped.
    pub fn to_value(&self) -> Value {
        match self.data_type {
            AttributeDataType::String => Value::String(self.string_value.clone()),
            AttributeDataType::Number => self
                .string_value
                .parse::<Number>()
                .map(Value::Number)
                .unwrap_or_else(|_| Value::String(self.string_value.clone())),
        }
    }
}

/// Convert a generic attribute map into provider attributes.
///
/// `None` and empty maps produce an empty result.
pub fn convert(
    attributes: Option<&Attributes>,
) -> Result<HashMap<String, TypedAttribute>, AttributeError> {
    convert_with(attributes, TypedAttribute::new)
}

/// Convert a generic attribute map using a provider-specific factory.
///
/// The factory receives the data type and string value of every validated
/// entry, so a provider can build its SDK attribute type directly. Conversion
/// stops at the first invalid entry; the factory is never called for it.
pub fn convert_with<T, F>(
    attributes: Option<&Attributes>,
    mut factory: F,
) -> Result<HashMap<String, T>, AttributeError>
where
    F: FnMut(AttributeDataType, String) -> T,
{
    let Some(attributes) = attributes else {
        return Ok(HashMap::new());
    };

    let mut converted = HashMap::with_capacity(attributes.len());
    for (key, value) in attributes {
        let typed = AttributeValue::from_json(key, value)?.to_typed();
        converted.insert(key.clone(), factory(typed.data_type, typed.string_value));
    }

    Ok(converted)
}

#[cfg(test)]
#[path = "attributes_tests.rs"]
mod tests;
