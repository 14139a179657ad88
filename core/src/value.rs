//! Generic structured data exchanged with the remote API.
//!
//! # Design
//! The API is dynamically typed: any method takes any arguments and headers
//! carry arbitrary records. `Value` is the one type both wire codecs encode
//! from and decode into. Struct members keep their insertion order so that
//! requests serialize deterministically and normalized arrays iterate in
//! index order.
//!
//! `serde_json` is the bridge to typed Rust data: build arguments with
//! `json!` or `Value::from_serialize`, and read results back with
//! `Value::deserialize_into`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;

/// Ordered string-keyed members of a struct value.
pub type Map = IndexMap<String, Value>;

/// A dynamically typed API value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Struct(Map),
    /// A typed scalar as produced by the XML-RPC decoder for wire types that
    /// have no plain counterpart. Never present in a normalized result.
    Typed(TypedScalar),
}

/// A decoded XML-RPC scalar tagged with its wire type.
///
/// `base64` scalars hold the decoded bytes; `datetime` scalars hold the raw
/// ISO 8601 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedScalar {
    pub xmlrpc_type: String,
    pub scalar: Vec<u8>,
}

impl Value {
    /// An empty struct.
    pub fn new_struct() -> Self {
        Value::Struct(Map::new())
    }

    /// Build a struct from `(name, value)` pairs, keeping their order.
    pub fn record<K, V, I>(members: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Struct(
            members
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Member lookup on a struct. `None` for any other variant.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Struct(map) => map.get(key),
            _ => None,
        }
    }

    /// Positional lookup on an array, or on a struct by insertion order.
    pub fn index(&self, i: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => items.get(i),
            Value::Struct(map) => map.get_index(i).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Iterate the elements of an array or the member values of a struct.
    pub fn values(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Value::Array(items) => Box::new(items.iter()),
            Value::Struct(map) => Box::new(map.values()),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Number of elements or members; zero for scalars.
    pub fn len(&self) -> usize {
        match self {
            Value::Array(items) => items.len(),
            Value::Struct(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Convert any serializable value, going through its JSON form.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(Value::from)
            .map_err(|e| ApiError::SerializationError(e.to_string()))
    }

    /// Convert into a typed Rust value, going through the JSON form.
    ///
    /// Normalized XML-RPC arrays are structs keyed `"0".."n"`, so deserialize
    /// those into maps rather than sequences.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.to_json())
            .map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    /// Render as JSON. Bytes become standard base64 text, typed scalars their
    /// textual form.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Nil => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Double(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::String(STANDARD.encode(b)),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Struct(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Typed(t) if t.xmlrpc_type == "base64" => Json::String(STANDARD.encode(&t.scalar)),
            Value::Typed(t) => Json::String(String::from_utf8_lossy(&t.scalar).into_owned()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Nil,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Double(n.as_f64().unwrap_or_default()),
            },
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(members) => Value::Struct(
                members
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
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
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Struct(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Nil)
    }
}
