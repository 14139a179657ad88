//! Post-processing of decoded XML-RPC results.
//!
//! Runs in two passes, always in this order:
//!
//! 1. `unwrap_typed` replaces typed scalars. `base64` becomes its raw bytes;
//!    every other wire type is dropped to `Nil`.
//! 2. `to_object` turns every container into a struct. Arrays become structs
//!    keyed by their decimal index, so callers use member access for both.

use tracing::debug;

use crate::value::{Map, TypedScalar, Value};

/// Apply both passes to a decoded result.
pub fn normalize(value: Value) -> Value {
    to_object(unwrap_typed(value))
}

pub fn unwrap_typed(value: Value) -> Value {
    match value {
        Value::Typed(TypedScalar { xmlrpc_type, scalar }) => match xmlrpc_type.as_str() {
            "base64" => Value::Bytes(scalar),
            other => {
                debug!(xmlrpc_type = other, "dropping unrecognized XML-RPC scalar");
                Value::Nil
            }
        },
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_typed).collect()),
        Value::Struct(map) => Value::Struct(
            map.into_iter()
                .map(|(k, v)| (k, unwrap_typed(v)))
                .collect(),
        ),
        other => other,
    }
}

pub fn to_object(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Struct(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), to_object(v)))
                .collect::<Map>(),
        ),
        Value::Struct(map) => Value::Struct(
            map.into_iter()
                .map(|(k, v)| (k, to_object(v)))
                .collect(),
        ),
        other => other,
    }
}
