//! Tagged setting values

use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime type tag of a [`SettingValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingValueType {
    String,
    Number,
    Boolean,
}

impl SettingValueType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single preference scalar.
///
/// Serializes as `{ "type": "string" | "number" | "boolean", "value": <T> }`,
/// the shape used by both the local snapshot file and cloud records.
/// Deserialization rejects a value whose JSON type disagrees with its tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SettingValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl SettingValue {
    pub const fn value_type(&self) -> SettingValueType {
        match self {
            Self::String(_) => SettingValueType::String,
            Self::Number(_) => SettingValueType::Number,
            Self::Boolean(_) => SettingValueType::Boolean,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Whether the value has a JSON encoding; NaN and infinities do not.
    pub fn is_storable(&self) -> bool {
        match self {
            Self::Number(value) => value.is_finite(),
            _ => true,
        }
    }

    /// Parse user-entered text as a value of the given type.
    pub fn parse_as(value_type: SettingValueType, raw: &str) -> Option<Self> {
        match value_type {
            SettingValueType::String => Some(Self::String(raw.to_string())),
            SettingValueType::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .map(Self::Number),
            SettingValueType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(Self::Boolean(true)),
                "0" | "false" | "no" | "off" => Some(Self::Boolean(false)),
                _ => None,
            },
        }
    }

    /// Text form used by string-typed storage columns; inverse of [`Self::parse_as`].
    pub fn to_storage_text(&self) -> String {
        match self {
            Self::String(value) => value.clone(),
            Self::Number(value) => value.to_string(),
            Self::Boolean(value) => value.to_string(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) => write!(f, "{value:?}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}
