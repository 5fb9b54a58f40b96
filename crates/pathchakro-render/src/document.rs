//! Serde view of the editor's stored document.
//!
//! The editor writes `{ "type": "doc", "content": [...] }` trees. Stored
//! documents are old, hand-edited, or half-migrated often enough that one
//! badly shaped field must not cost the whole document, so every field
//! deserializes leniently: a value of the wrong JSON type reads as absent.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_object",
        skip_serializing_if = "Map::is_empty"
    )]
    pub attrs: Map<String, Value>,
    #[serde(
        default,
        deserialize_with = "lenient_vec",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub content: Vec<RawNode>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub text: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_vec",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub marks: Vec<RawMark>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMark {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_object",
        skip_serializing_if = "Map::is_empty"
    )]
    pub attrs: Map<String, Value>,
}

impl RawNode {
    /// Builds the tree from an already decoded JSON value.
    ///
    /// Only fails when `value` itself is not an object; problems further down
    /// are absorbed by the lenient field handling.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            tracing::debug!("root value is not a node object");
            return None;
        }
        match serde_json::from_value(value.clone()) {
            Ok(node) => Some(node),
            Err(e) => {
                tracing::debug!(error = %e, "failed to read root node");
                None
            }
        }
    }

    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("")
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name).filter(|v| !v.is_null())
    }

    /// String attribute, with numbers rendered as their JSON text.
    pub fn attr_str(&self, name: &str) -> Option<String> {
        match self.attr(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl RawMark {
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("")
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(Value::as_str)
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

fn lenient_object<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed document entry");
                None
            }
        })
        .collect())
}
