//! Protocol node type.
//!
//! Queries such as the profile-picture update are expressed as XML-like
//! nodes. The gateway bridge carries them as JSON (`{tag, attrs, content}`),
//! with byte content encoded as base64.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::types::JID;

/// Attributes of an XML node
pub type Attrs = HashMap<String, AttrValue>;

/// Possible values for node attributes
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    String(String),
    Int(i64),
    Bool(bool),
    JID(JID),
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Int(n)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<JID> for AttrValue {
    fn from(jid: JID) -> Self {
        AttrValue::JID(jid)
    }
}

impl AttrValue {
    /// Get as string if possible
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            AttrValue::String(s) => Value::String(s.clone()),
            AttrValue::Int(n) => json!(n),
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::JID(jid) => Value::String(jid.to_string()),
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(AttrValue::String(s.clone())),
            Value::Number(n) => n.as_i64().map(AttrValue::Int),
            Value::Bool(b) => Some(AttrValue::Bool(*b)),
            _ => None,
        }
    }
}

/// Node represents one protocol element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    /// The tag name of the element
    pub tag: String,
    /// The attributes of the element
    pub attrs: Attrs,
    /// The content inside the element (nil, children, or bytes)
    pub content: NodeContent,
}

/// Content of a node
#[derive(Debug, Clone, Default, PartialEq)]
pub enum NodeContent {
    #[default]
    None,
    /// Child nodes
    Children(Vec<Node>),
    /// Binary data
    Bytes(Vec<u8>),
}

/// Error raised when a JSON value does not describe a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeJsonError {
    #[error("node is not a JSON object")]
    NotAnObject,
    #[error("node has no tag")]
    MissingTag,
    #[error("node bytes are not valid base64: {0}")]
    InvalidBytes(String),
}

impl Node {
    /// Create a new node with the given tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Attrs::new(),
            content: NodeContent::None,
        }
    }

    /// Set an attribute on this node
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(key.into(), value.into());
    }

    /// Builder form of [`Node::set_attr`].
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Get an attribute as string
    pub fn get_attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(|v| v.as_str())
    }

    /// Add a child node
    pub fn add_child(&mut self, child: Node) {
        match &mut self.content {
            NodeContent::Children(children) => children.push(child),
            _ => self.content = NodeContent::Children(vec![child]),
        }
    }

    /// Set the content to bytes
    pub fn set_bytes(&mut self, bytes: Vec<u8>) {
        self.content = NodeContent::Bytes(bytes);
    }

    /// Get children if content is children
    pub fn get_children(&self) -> Option<&[Node]> {
        match &self.content {
            NodeContent::Children(children) => Some(children),
            _ => None,
        }
    }

    /// Get first child with the given tag
    pub fn get_child_by_tag(&self, tag: &str) -> Option<&Node> {
        self.get_children()?.iter().find(|n| n.tag == tag)
    }

    /// Get bytes content if present
    pub fn get_bytes(&self) -> Option<&[u8]> {
        match &self.content {
            NodeContent::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Encode the node in the bridge's JSON shape.
    pub fn to_json(&self) -> Value {
        let attrs: Map<String, Value> = self
            .attrs
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        let content = match &self.content {
            NodeContent::None => Value::Null,
            NodeContent::Children(children) => {
                Value::Array(children.iter().map(Node::to_json).collect())
            }
            NodeContent::Bytes(bytes) => Value::String(STANDARD.encode(bytes)),
        };
        json!({ "tag": self.tag, "attrs": attrs, "content": content })
    }

    /// Decode a node from the bridge's JSON shape.
    ///
    /// Attributes with non-scalar values are skipped.
    pub fn from_json(value: &Value) -> Result<Self, NodeJsonError> {
        let object = value.as_object().ok_or(NodeJsonError::NotAnObject)?;
        let tag = object
            .get("tag")
            .and_then(Value::as_str)
            .ok_or(NodeJsonError::MissingTag)?;

        let mut node = Node::new(tag);
        if let Some(attrs) = object.get("attrs").and_then(Value::as_object) {
            for (key, raw) in attrs {
                if let Some(attr) = AttrValue::from_json(raw) {
                    node.attrs.insert(key.clone(), attr);
                }
            }
        }

        node.content = match object.get("content") {
            Some(Value::Array(children)) => NodeContent::Children(
                children
                    .iter()
                    .map(Node::from_json)
                    .collect::<Result<_, _>>()?,
            ),
            Some(Value::String(encoded)) => NodeContent::Bytes(
                STANDARD
                    .decode(encoded)
                    .map_err(|e| NodeJsonError::InvalidBytes(e.to_string()))?,
            ),
            _ => NodeContent::None,
        };
        Ok(node)
    }
}
