//! Property values of declaration proxies.
//!
//! A revived value is ordinary JSON data except that two wire forms carry
//! references: `{"@": label}` points at another proxy and `{"#": id}` points
//! at a markup node. The reviver resolves the latter into [`ProxyId`]
//! handles; the serializer re-encodes both forms on save.

use indexmap::IndexMap;
use serde_json::Number;

use crate::node_proxy::ProxyId;

/// Wire key of a proxy reference.
pub(crate) const OBJECT_REF_KEY: &str = "@";
/// Wire key of a markup-node reference.
pub(crate) const ELEMENT_REF_KEY: &str = "#";

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Map(IndexMap<String, Value>),
    /// Reference to another declaration proxy, by label.
    ObjectRef(String),
    /// Reference to a markup-node proxy in the document's shadow tree.
    Element(ProxyId),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<ProxyId> {
        match self {
            Value::Element(id) => Some(*id),
            _ => None,
        }
    }

    /// Falsy in the editor-metadata sense: absent, `false`, or empty string.
    pub fn is_falsy(&self) -> bool {
        matches!(self, Value::Null | Value::Bool(false))
            || matches!(self, Value::String(s) if s.is_empty())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}
