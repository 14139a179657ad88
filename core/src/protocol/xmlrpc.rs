//! XML-RPC codec.
//!
//! Every call is a `methodCall` whose first parameter is a struct holding all
//! call headers under `headers`; the caller's arguments follow in order.
//! Responses are decoded into `Value` (base64 and dateTime scalars as
//! `Value::Typed`) and then normalized, see `crate::normalize`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use roxmltree::{Document, Node};

use super::{decode_body, Protocol};
use crate::error::{ApiError, TransportError};
use crate::headers::HeaderSet;
use crate::http::{HttpRequest, HttpResponse};
use crate::normalize::normalize;
use crate::value::{Map, TypedScalar, Value};
use crate::xml::{self, XmlWriter};

/// The XML-RPC flavour of the API.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlRpc;

impl Protocol for XmlRpc {
    const NAME: &'static str = "xmlrpc";
    const PUBLIC_ENDPOINT: &'static str = "https://api.softlayer.com/xmlrpc/v3/";
    const PRIVATE_ENDPOINT: &'static str = "http://api.service.softlayer.com/xmlrpc/v3/";
    const TEXT_MASK_HEADER: &'static str = "ObjectMask";
    const SKIPS_BLANK_TEXT_MASK: bool = false;

    fn build_request(
        url: &str,
        _service_name: &str,
        method: &str,
        headers: &HeaderSet,
        args: &[Value],
    ) -> Result<HttpRequest, ApiError> {
        let mut params = Vec::with_capacity(args.len() + 1);
        params.push(Value::record([("headers", headers.to_value())]));
        params.extend_from_slice(args);

        Ok(HttpRequest {
            url: url.to_string(),
            headers: vec![("content-type".to_string(), "text/xml".to_string())],
            body: encode_call(method, &params)?,
        })
    }

    fn parse_response(response: &HttpResponse) -> Result<Value, TransportError> {
        decode_body(response, decode_response).map(normalize)
    }
}

/// Encode a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> Result<String, ApiError> {
    let mut w = XmlWriter::new()?;
    w.open("methodCall", &[])?;
    w.leaf("methodName", &[], method)?;
    w.open("params", &[])?;
    for param in params {
        w.open("param", &[])?;
        encode_value(&mut w, param)?;
        w.close("param")?;
    }
    w.close("params")?;
    w.close("methodCall")?;
    w.finish()
}

fn encode_value(w: &mut XmlWriter, value: &Value) -> Result<(), ApiError> {
    w.open("value", &[])?;
    match value {
        Value::Nil => w.empty("nil", &[])?,
        Value::Bool(b) => w.leaf("boolean", &[], if *b { "1" } else { "0" })?,
        Value::Int(n) => w.leaf("int", &[], &n.to_string())?,
        Value::Double(n) => w.leaf("double", &[], &n.to_string())?,
        Value::String(s) => w.leaf("string", &[], s)?,
        Value::Bytes(b) => w.leaf("base64", &[], &STANDARD.encode(b))?,
        Value::Typed(t) if t.xmlrpc_type == "base64" => w.leaf("base64", &[], &STANDARD.encode(&t.scalar))?,
        Value::Typed(t) => w.leaf("dateTime.iso8601", &[], &String::from_utf8_lossy(&t.scalar))?,
        Value::Array(items) => {
            w.open("array", &[])?;
            w.open("data", &[])?;
            for item in items {
                encode_value(w, item)?;
            }
            w.close("data")?;
            w.close("array")?;
        }
        Value::Struct(map) => {
            w.open("struct", &[])?;
            for (name, member) in map {
                w.open("member", &[])?;
                w.leaf("name", &[], name)?;
                encode_value(w, member)?;
                w.close("member")?;
            }
            w.close("struct")?;
        }
    }
    w.close("value")
}

/// Decode a `methodResponse` document without normalizing it.
///
/// A `<fault>` response becomes `TransportError::Fault`.
pub fn decode_response(body: &str) -> Result<Value, TransportError> {
    let doc = Document::parse(body).map_err(|e| TransportError::Malformed(e.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "methodResponse" {
        return Err(malformed(format!("unexpected root element <{}>", root.tag_name().name())));
    }

    if let Some(fault) = xml::child(root, "fault") {
        let value = xml::child(fault, "value")
            .map(decode_value)
            .transpose()?
            .unwrap_or_default();
        return Err(fault_error(&value));
    }

    let value = xml::child(root, "params")
        .and_then(|params| xml::child(params, "param"))
        .and_then(|param| xml::child(param, "value"))
        .ok_or_else(|| malformed("response carries neither params nor fault"))?;
    decode_value(value)
}

fn decode_value(node: Node<'_, '_>) -> Result<Value, TransportError> {
    let Some(typed) = xml::elements(node).next() else {
        // An untyped <value> is a string.
        return Ok(Value::String(xml::text(node)));
    };

    let text = xml::text(typed);
    let value = match typed.tag_name().name() {
        "string" => Value::String(text),
        "int" | "i4" | "i8" => Value::Int(
            text.trim()
                .parse()
                .map_err(|_| malformed(format!("invalid integer {text:?}")))?,
        ),
        "double" => Value::Double(
            text.trim()
                .parse()
                .map_err(|_| malformed(format!("invalid double {text:?}")))?,
        ),
        "boolean" => match text.trim() {
            "1" | "true" => Value::Bool(true),
            "0" | "false" => Value::Bool(false),
            other => return Err(malformed(format!("invalid boolean {other:?}"))),
        },
        "nil" => Value::Nil,
        "base64" => {
            let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let scalar = STANDARD
                .decode(compact)
                .map_err(|e| malformed(format!("invalid base64: {e}")))?;
            Value::Typed(TypedScalar {
                xmlrpc_type: "base64".to_string(),
                scalar,
            })
        }
        "dateTime.iso8601" => Value::Typed(TypedScalar {
            xmlrpc_type: "datetime".to_string(),
            scalar: text.trim().as_bytes().to_vec(),
        }),
        "array" => {
            let items = xml::child(typed, "data")
                .map(|data| {
                    xml::elements(data)
                        .filter(|n| n.tag_name().name() == "value")
                        .map(decode_value)
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()?
                .unwrap_or_default();
            Value::Array(items)
        }
        "struct" => {
            let mut map = Map::new();
            for member in xml::elements(typed).filter(|n| n.tag_name().name() == "member") {
                let name = xml::child(member, "name")
                    .map(xml::text)
                    .ok_or_else(|| malformed("struct member without a name"))?;
                let value = xml::child(member, "value")
                    .map(decode_value)
                    .transpose()?
                    .unwrap_or_default();
                map.insert(name, value);
            }
            Value::Struct(map)
        }
        other => return Err(malformed(format!("unknown value type <{other}>"))),
    };
    Ok(value)
}

fn fault_error(value: &Value) -> TransportError {
    let code = match value.get("faultCode") {
        Some(Value::Int(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    let message = value
        .get("faultString")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    TransportError::Fault { code, message }
}

fn malformed(message: impl Into<String>) -> TransportError {
    TransportError::Malformed(message.into())
}
