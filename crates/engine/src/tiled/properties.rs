use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl PropertyValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(value) => Some(*value),
            PropertyValue::Float(value) => Some(*value as i64),
            PropertyValue::String(text) => text.trim().parse().ok(),
            PropertyValue::Bool(_) => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(value) => Some(*value as f64),
            PropertyValue::Float(value) => Some(*value),
            PropertyValue::String(text) => text.trim().parse().ok(),
            PropertyValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(value) => Some(*value),
            PropertyValue::Int(value) => Some(*value != 0),
            PropertyValue::String(text) => handle_bool(text).ok(),
            PropertyValue::Float(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Int(value) => write!(f, "{value}"),
            PropertyValue::Float(value) => write!(f, "{value}"),
            PropertyValue::Bool(value) => write!(f, "{value}"),
            PropertyValue::String(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("invalid boolean value '{value}'")]
    InvalidBool { value: String },
    #[error("invalid value '{value}' for '{key}': expected {expected}")]
    InvalidPropertyValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// Attribute kinds from the map format's coercion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Int,
    Float,
    Bool,
    String,
}

pub fn attribute_kind(key: &str) -> AttributeKind {
    match key {
        "version" | "opacity" => AttributeKind::Float,
        "width" | "height" | "tilewidth" | "tileheight" | "firstgid" | "spacing" | "margin"
        | "id" | "x" | "y" | "gid" => AttributeKind::Int,
        "visible" => AttributeKind::Bool,
        _ => AttributeKind::String,
    }
}

/// Integer text (non-zero is true) or `true`/`yes`/`false`/`no`, case-insensitive.
pub fn handle_bool(text: &str) -> Result<bool, PropertyError> {
    let trimmed = text.trim();
    if let Ok(number) = trimmed.parse::<i64>() {
        return Ok(number != 0);
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "yes" => Ok(true),
        "false" | "no" => Ok(false),
        _ => Err(PropertyError::InvalidBool {
            value: text.to_string(),
        }),
    }
}

pub fn coerce_attribute(key: &str, raw: &str) -> Result<PropertyValue, PropertyError> {
    coerce_as(attribute_kind(key), key, raw)
}

pub(crate) fn coerce_as(
    kind: AttributeKind,
    key: &str,
    raw: &str,
) -> Result<PropertyValue, PropertyError> {
    let invalid = |expected: &'static str| PropertyError::InvalidPropertyValue {
        key: key.to_string(),
        value: raw.to_string(),
        expected,
    };
    match kind {
        AttributeKind::Int => parse_int(raw)
            .map(PropertyValue::Int)
            .ok_or_else(|| invalid("integer")),
        AttributeKind::Float => raw
            .trim()
            .parse::<f64>()
            .map(PropertyValue::Float)
            .map_err(|_| invalid("number")),
        AttributeKind::Bool => handle_bool(raw)
            .map(PropertyValue::Bool)
            .map_err(|_| invalid("boolean")),
        AttributeKind::String => Ok(PropertyValue::String(raw.to_string())),
    }
}

// Editors write object coordinates as floats ("64.5"); integers truncate toward zero.
fn parse_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(|value| value as i64))
}

/// String-keyed bag of typed values, kept in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    values: BTreeMap<String, PropertyValue>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(PropertyValue::as_str)
    }

    /// Like `get_str`, but renders non-string values as text.
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.values.get(key).map(ToString::to_string)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(PropertyValue::as_int)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(PropertyValue::as_float)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(PropertyValue::as_bool)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }
}
