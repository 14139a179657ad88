//! Call headers sent along with every API request.
//!
//! The remote service reads authentication, initialization parameters,
//! object masks, object filters and result limits from named headers. The
//! names below are part of the wire contract.

use indexmap::IndexMap;

use crate::value::Value;

pub const AUTHENTICATE: &str = "authenticate";
pub const RESULT_LIMIT: &str = "resultLimit";

pub fn init_parameters_key(service_name: &str) -> String {
    format!("{service_name}InitParameters")
}

pub fn object_mask_key(service_name: &str) -> String {
    format!("{service_name}ObjectMask")
}

pub fn object_filter_key(service_name: &str) -> String {
    format!("{service_name}ObjectFilter")
}

/// Header name → value, in the order headers were first set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderSet {
    entries: IndexMap<String, Value>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `name`, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Remove `name` if present. Removing an absent header is a no-op.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All headers as a single struct, the shape XML-RPC sends them in.
    pub fn to_value(&self) -> Value {
        Value::Struct(self.entries.clone())
    }
}
