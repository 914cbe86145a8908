//! Configuration descriptors for component instantiation.
//!
//! A descriptor is either an explicit `{ target, params }` mapping or one of
//! two sentinel strings that stand in for "no component here". The sentinels
//! are modeled as enum variants rather than compared as magic strings at every
//! call site.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::registry::InstantiateError;

/// Keyword arguments forwarded to a component constructor.
pub type Params = serde_json::Map<String, Value>;

/// Sentinel string selecting the [`ComponentConfig::FirstStage`] variant.
pub const FIRST_STAGE_SENTINEL: &str = "__is_first_stage__";
/// Sentinel string selecting the [`ComponentConfig::Unconditional`] variant.
pub const UNCONDITIONAL_SENTINEL: &str = "__is_unconditional__";

/// A configuration descriptor for one pipeline component.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentConfig {
    /// Construct the component named by `target`, forwarding `params` as
    /// keyword arguments.
    Explicit {
        /// Dotted reference of the form `module.path.TypeName`.
        target: String,
        /// Constructor arguments; empty when the descriptor omits `params`.
        params: Params,
    },
    /// The first-stage model slot is filled elsewhere; instantiation yields
    /// no component.
    FirstStage,
    /// Unconditional guidance slot; instantiation yields no component.
    Unconditional,
}

impl ComponentConfig {
    /// Descriptor with a target and no constructor arguments.
    pub fn target(target: impl Into<String>) -> Self {
        Self::Explicit {
            target: target.into(),
            params: Params::new(),
        }
    }

    /// Parse a descriptor from loosely-typed JSON.
    ///
    /// Accepts either a bare sentinel string or a mapping with a required
    /// `target` key and an optional `params` mapping.
    pub fn from_value(value: &Value) -> Result<Self, InstantiateError> {
        match value {
            Value::String(s) if s == FIRST_STAGE_SENTINEL => Ok(Self::FirstStage),
            Value::String(s) if s == UNCONDITIONAL_SENTINEL => Ok(Self::Unconditional),
            Value::String(s) => Err(InstantiateError::UnknownSentinel { value: s.clone() }),
            Value::Object(map) => {
                let target = match map.get("target") {
                    Some(Value::String(t)) => t.clone(),
                    _ => return Err(InstantiateError::MissingTarget),
                };
                let params = match map.get("params") {
                    None | Some(Value::Null) => Params::new(),
                    Some(Value::Object(p)) => p.clone(),
                    Some(other) => {
                        return Err(InstantiateError::InvalidDescriptor {
                            found: kind_of(other),
                        })
                    }
                };
                Ok(Self::Explicit { target, params })
            }
            other => Err(InstantiateError::InvalidDescriptor {
                found: kind_of(other),
            }),
        }
    }

    /// Render the descriptor back to its JSON form.
    pub fn to_value(&self) -> Value {
        match self {
            Self::FirstStage => Value::String(FIRST_STAGE_SENTINEL.to_string()),
            Self::Unconditional => Value::String(UNCONDITIONAL_SENTINEL.to_string()),
            Self::Explicit { target, params } => {
                let mut map = serde_json::Map::new();
                map.insert("target".to_string(), Value::String(target.clone()));
                if !params.is_empty() {
                    map.insert("params".to_string(), Value::Object(params.clone()));
                }
                Value::Object(map)
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<'de> Deserialize<'de> for ComponentConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ComponentConfig::from_value(&value).map_err(D::Error::custom)
    }
}

impl Serialize for ComponentConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}
