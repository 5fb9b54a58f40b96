//! Turns whatever was stored for a piece of content into a renderable root.
//!
//! Stored content shows up as a JSON document string, a JSON string holding a
//! JSON document string (double encoded by an older save path), plain text
//! from before the rich editor existed, an already parsed value, or nothing.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::DEFAULT_MAX_DEPTH;
use crate::document::RawNode;
use crate::error::RenderError;

/// Input accepted by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawContent<'a> {
    Missing,
    Str(&'a str),
    Json(&'a Value),
}

impl<'a> From<&'a str> for RawContent<'a> {
    fn from(s: &'a str) -> Self {
        RawContent::Str(s)
    }
}

impl<'a> From<&'a String> for RawContent<'a> {
    fn from(s: &'a String) -> Self {
        RawContent::Str(s.as_str())
    }
}

impl<'a> From<Option<&'a str>> for RawContent<'a> {
    fn from(s: Option<&'a str>) -> Self {
        s.map_or(RawContent::Missing, RawContent::Str)
    }
}

impl<'a> From<&'a Value> for RawContent<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => RawContent::Missing,
            Value::String(s) => RawContent::Str(s.as_str()),
            other => RawContent::Json(other),
        }
    }
}

impl<'a> From<Option<&'a Value>> for RawContent<'a> {
    fn from(value: Option<&'a Value>) -> Self {
        value.map_or(RawContent::Missing, RawContent::from)
    }
}

/// Outcome of decoding stored content.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A document tree, already coerced to have a root node.
    Document(RawNode),
    /// Text that is not JSON and is shown as a single escaped paragraph.
    PlainText(String),
    /// Nothing worth showing.
    Unrecoverable,
}

/// Decodes with the default nesting limit. Content nested too deeply to
/// render is `Unrecoverable`.
pub fn decode(content: RawContent<'_>) -> Decoded {
    decode_with_limit(content, DEFAULT_MAX_DEPTH).unwrap_or(Decoded::Unrecoverable)
}

/// Decodes stored content, refusing JSON text nested deeper than a document
/// of `max_depth` nodes can be.
///
/// Each node takes two levels of JSON (the node object and its `content`
/// array), so the JSON parser's own recursion limit would reject documents
/// the tree walk accepts. The nesting is measured up front instead and the
/// parser runs unbounded.
pub fn decode_with_limit(content: RawContent<'_>, max_depth: usize) -> Result<Decoded, RenderError> {
    match content {
        RawContent::Missing => Ok(Decoded::Unrecoverable),
        RawContent::Str(s) => decode_str(s, max_depth),
        RawContent::Json(value) => Ok(coerce_shape(value)),
    }
}

fn decode_str(s: &str, max_depth: usize) -> Result<Decoded, RenderError> {
    if s.is_empty() {
        return Ok(Decoded::Unrecoverable);
    }

    let parsed = match parse_json(s, max_depth)? {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "content is not json, rendering as text");
            return Ok(Decoded::PlainText(s.to_string()));
        }
    };

    let Value::String(inner) = parsed else {
        return Ok(coerce_shape(&parsed));
    };

    // Double encoded: one more level, no further.
    if inner.is_empty() {
        return Ok(Decoded::Unrecoverable);
    }
    Ok(match parse_json(&inner, max_depth)? {
        Ok(Value::String(_)) => {
            tracing::debug!("content is encoded more than twice");
            Decoded::Unrecoverable
        }
        Ok(value) => coerce_shape(&value),
        Err(_) => Decoded::PlainText(inner),
    })
}

/// JSON nesting a document within `max_depth` nodes can reach: two levels per
/// node, plus a node's marks array, a mark object and its attrs.
fn json_depth_limit(max_depth: usize) -> usize {
    max_depth.saturating_mul(2).saturating_add(2)
}

/// Parses `s` as JSON. The outer error is for nesting past the limit, the
/// inner one for text that is not JSON.
fn parse_json(s: &str, max_depth: usize) -> Result<Result<Value, serde_json::Error>, RenderError> {
    if json_nesting(s) > json_depth_limit(max_depth) {
        return Err(RenderError::NestingTooDeep { limit: max_depth });
    }
    let mut deserializer = serde_json::Deserializer::from_str(s);
    deserializer.disable_recursion_limit();
    let parsed = Value::deserialize(&mut deserializer).and_then(|value| {
        deserializer.end()?;
        Ok(value)
    });
    Ok(parsed)
}

/// Deepest bracket nesting outside string literals. Malformed text gets a
/// best-effort count; the parser rejects it afterwards.
fn json_nesting(s: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    let mut in_string = false;
    let mut escaped = false;
    for byte in s.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

/// Finds the root node in a decoded value.
///
/// Objects with a string `type` are used as they are. A bare array of nodes
/// becomes the content of a `doc`, as does an untyped object with a
/// `content` array.
fn coerce_shape(value: &Value) -> Decoded {
    let root = match value {
        Value::Object(map) if map.get("type").is_some_and(Value::is_string) => {
            RawNode::from_value(value)
        }
        Value::Array(_) => RawNode::from_value(&doc_with_content(value.clone())),
        Value::Object(map) if map.get("content").is_some_and(Value::is_array) => {
            let mut map = map.clone();
            map.insert("type".into(), Value::String("doc".into()));
            RawNode::from_value(&Value::Object(map))
        }
        _ => None,
    };

    match root {
        Some(root) => Decoded::Document(root),
        None => {
            tracing::debug!("content has no document shape");
            Decoded::Unrecoverable
        }
    }
}

fn doc_with_content(content: Value) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), Value::String("doc".into()));
    map.insert("content".into(), content);
    Value::Object(map)
}
