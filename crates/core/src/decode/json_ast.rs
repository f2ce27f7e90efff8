//! Decoder for bodies delivered as a JSON document tree.
//!
//! Accepts ProseMirror-style nodes: `{"type": "...", "attrs": {...},
//! "content": [...]}` with text leaves `{"type": "text", "text": "...",
//! "marks": [...]}`. Bare strings are text leaves; a top-level array is a
//! document of its elements. Any structurally invalid value fails the whole
//! decode.

use serde_json::{Map, Value};

use crate::document::{AstElement, AstNode, Mark, NodeKind, TextLeaf};
use crate::error::DecodeError;

/// Parses a JSON string into a document tree.
pub fn parse_document_str(json: &str) -> Result<AstNode, DecodeError> {
    let value: Value = serde_json::from_str(json.trim())?;
    parse_document(&value)
}

/// Converts a parsed JSON value into a document tree.
pub fn parse_document(value: &Value) -> Result<AstNode, DecodeError> {
    match value {
        Value::Object(_) | Value::Array(_) => node_from_value(value),
        other => Err(DecodeError::NotADocument(format!("expected object or array, found {}", kind_name(other)))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn node_from_value(value: &Value) -> Result<AstNode, DecodeError> {
    match value {
        Value::String(text) => Ok(AstNode::text(text.clone())),
        Value::Array(items) => {
            let mut doc = AstElement::new(NodeKind::Doc);
            doc.children = children_from(items)?;
            Ok(doc.into())
        }
        Value::Object(obj) => node_from_object(obj),
        other => Err(DecodeError::NotADocument(format!("unexpected {} in document", kind_name(other)))),
    }
}

fn children_from(items: &[Value]) -> Result<Vec<AstNode>, DecodeError> {
    items.iter().filter(|v| !v.is_null()).map(node_from_value).collect()
}

fn node_from_object(obj: &Map<String, Value>) -> Result<AstNode, DecodeError> {
    let name = obj.get("type").and_then(Value::as_str).unwrap_or_default();
    let attrs = match obj.get("attrs") {
        Some(Value::Object(attrs)) => attrs.clone(),
        Some(Value::Null) | None => Map::new(),
        Some(other) => return Err(DecodeError::NotADocument(format!("attrs must be an object, found {}", kind_name(other)))),
    };

    if name == "text" {
        let text = obj.get("text").and_then(Value::as_str).unwrap_or_default().to_string();
        let marks = match obj.get("marks") {
            Some(Value::Array(marks)) => marks.iter().filter_map(mark_from_value).collect(),
            _ => Vec::new(),
        };
        return Ok(AstNode::Text(TextLeaf { text, marks }));
    }

    let children = match obj.get("content").or_else(|| obj.get("children")) {
        Some(Value::Array(items)) => children_from(items)?,
        Some(Value::String(text)) => vec![AstNode::text(text.clone())],
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            return Err(DecodeError::NotADocument(format!("content must be an array, found {}", kind_name(other))));
        }
    };

    let kind = NodeKind::classify(name, &attrs);
    Ok(AstElement { kind, attrs, children }.into())
}

fn mark_from_value(value: &Value) -> Option<Mark> {
    match value {
        Value::String(name) => Some(Mark::classify(name, &Map::new())),
        Value::Object(obj) => {
            let name = obj.get("type").and_then(Value::as_str)?;
            let attrs = obj.get("attrs").and_then(Value::as_object).cloned().unwrap_or_default();
            Some(Mark::classify(name, &attrs))
        }
        _ => None,
    }
}
