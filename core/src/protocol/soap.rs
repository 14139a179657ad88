//! SOAP 1.1 codec (RPC style, SOAP section 5 encoding).
//!
//! Every call header becomes an element of `SOAP-ENV:Header` in the API
//! namespace; arguments are positional parts named `param0`, `param1`, ...
//! The first element inside the response wrapper is the return value, which
//! is handed back as decoded without further normalization.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use roxmltree::{Document, Node};

use super::{decode_body, Protocol};
use crate::error::{ApiError, TransportError};
use crate::headers::HeaderSet;
use crate::http::{HttpRequest, HttpResponse};
use crate::value::{Map, Value};
use crate::xml::{self, XmlWriter};

/// Namespace of every API header and method element.
pub const DEFAULT_NAMESPACE: &str = "http://api.service.softlayer.com/soap/v3.1/";

const ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const ENCODING_NS: &str = "http://schemas.xmlsoap.org/soap/encoding/";
const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// The SOAP flavour of the API.
#[derive(Debug, Clone, Copy, Default)]
pub struct Soap;

impl Protocol for Soap {
    const NAME: &'static str = "soap";
    const PUBLIC_ENDPOINT: &'static str = "https://api.softlayer.com/soap/v3.1/";
    const PRIVATE_ENDPOINT: &'static str = "http://api.service.softlayer.com/soap/v3.1/";
    const TEXT_MASK_HEADER: &'static str = "SoftLayer_ObjectMask";
    const SKIPS_BLANK_TEXT_MASK: bool = true;

    fn build_request(
        url: &str,
        service_name: &str,
        method: &str,
        headers: &HeaderSet,
        args: &[Value],
    ) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest {
            url: url.to_string(),
            headers: vec![
                ("content-type".to_string(), "text/xml; charset=utf-8".to_string()),
                ("soapaction".to_string(), format!("\"{DEFAULT_NAMESPACE}{service_name}Action\"")),
            ],
            body: encode_envelope(method, headers, args)?,
        })
    }

    fn parse_response(response: &HttpResponse) -> Result<Value, TransportError> {
        decode_body(response, decode_envelope)
    }
}

/// Encode a request envelope.
pub fn encode_envelope(method: &str, headers: &HeaderSet, args: &[Value]) -> Result<String, ApiError> {
    let mut w = XmlWriter::new()?;
    w.open(
        "SOAP-ENV:Envelope",
        &[
            ("xmlns:SOAP-ENV", ENVELOPE_NS),
            ("xmlns:ns1", DEFAULT_NAMESPACE),
            ("xmlns:xsd", XSD_NS),
            ("xmlns:xsi", XSI_NS),
            ("xmlns:SOAP-ENC", ENCODING_NS),
            ("SOAP-ENV:encodingStyle", ENCODING_NS),
        ],
    )?;

    if !headers.is_empty() {
        w.open("SOAP-ENV:Header", &[])?;
        for (name, value) in headers.iter() {
            check_name(name)?;
            encode_element(&mut w, &format!("ns1:{name}"), value)?;
        }
        w.close("SOAP-ENV:Header")?;
    }

    w.open("SOAP-ENV:Body", &[])?;
    check_name(method)?;
    let call = format!("ns1:{method}");
    if args.is_empty() {
        w.empty(&call, &[])?;
    } else {
        w.open(&call, &[])?;
        for (i, arg) in args.iter().enumerate() {
            encode_element(&mut w, &format!("param{i}"), arg)?;
        }
        w.close(&call)?;
    }
    w.close("SOAP-ENV:Body")?;
    w.close("SOAP-ENV:Envelope")?;
    w.finish()
}

fn encode_element(w: &mut XmlWriter, name: &str, value: &Value) -> Result<(), ApiError> {
    match value {
        Value::Nil => w.empty(name, &[("xsi:nil", "true")]),
        Value::Bool(b) => w.leaf(name, &[("xsi:type", "xsd:boolean")], if *b { "true" } else { "false" }),
        Value::Int(n) => w.leaf(name, &[("xsi:type", "xsd:int")], &n.to_string()),
        Value::Double(n) => w.leaf(name, &[("xsi:type", "xsd:double")], &n.to_string()),
        Value::String(s) => w.leaf(name, &[("xsi:type", "xsd:string")], s),
        Value::Bytes(b) => w.leaf(name, &[("xsi:type", "xsd:base64Binary")], &STANDARD.encode(b)),
        Value::Typed(t) if t.xmlrpc_type == "base64" => {
            w.leaf(name, &[("xsi:type", "xsd:base64Binary")], &STANDARD.encode(&t.scalar))
        }
        Value::Typed(t) => w.leaf(name, &[("xsi:type", "xsd:dateTime")], &String::from_utf8_lossy(&t.scalar)),
        Value::Array(items) => {
            let array_type = format!("xsd:anyType[{}]", items.len());
            w.open(
                name,
                &[("xsi:type", "SOAP-ENC:Array"), ("SOAP-ENC:arrayType", array_type.as_str())],
            )?;
            for item in items {
                encode_element(w, "item", item)?;
            }
            w.close(name)
        }
        Value::Struct(map) if map.is_empty() => w.empty(name, &[]),
        Value::Struct(map) => {
            w.open(name, &[])?;
            for (member, v) in map {
                check_name(member)?;
                encode_element(w, member, v)?;
            }
            w.close(name)
        }
    }
}

/// Member, header and method names become element names, so they must be
/// unprefixed XML names.
fn check_name(name: &str) -> Result<(), ApiError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c == '-' || c == '.' || c.is_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(ApiError::SerializationError(format!(
            "{name:?} cannot be encoded as a SOAP element name"
        )))
    }
}

/// Decode a response envelope into the call's return value.
///
/// `SOAP-ENV:Fault` becomes `TransportError::Fault`. A response wrapper
/// without a return part decodes to `Value::Nil`.
pub fn decode_envelope(body: &str) -> Result<Value, TransportError> {
    let doc = Document::parse(body).map_err(|e| TransportError::Malformed(e.to_string()))?;
    let envelope = doc.root_element();
    if envelope.tag_name().name() != "Envelope" {
        return Err(malformed(format!("unexpected root element <{}>", envelope.tag_name().name())));
    }
    let body = xml::child(envelope, "Body").ok_or_else(|| malformed("envelope without a Body"))?;
    let wrapper = xml::elements(body)
        .next()
        .ok_or_else(|| malformed("empty SOAP Body"))?;

    if wrapper.tag_name().name() == "Fault" {
        let field = |name: &str| xml::child(wrapper, name).map(xml::text).unwrap_or_default();
        return Err(TransportError::Fault {
            code: field("faultcode").trim().to_string(),
            message: field("faultstring").trim().to_string(),
        });
    }

    let ret = xml::elements(wrapper).next();
    match ret {
        Some(ret) => decode_element(ret),
        None => Ok(Value::Nil),
    }
}

fn decode_element(node: Node<'_, '_>) -> Result<Value, TransportError> {
    if matches!(node.attribute((XSI_NS, "nil")), Some("true" | "1")) {
        return Ok(Value::Nil);
    }

    let xsi_type = node.attribute((XSI_NS, "type"));
    let (type_ns, type_name) = match xsi_type {
        Some(qualified) => resolve_qname(node, qualified),
        None => (None, ""),
    };

    let is_array = node.attribute((ENCODING_NS, "arrayType")).is_some()
        || (type_ns == Some(ENCODING_NS) && type_name == "Array");
    if is_array {
        return xml::elements(node)
            .map(decode_element)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    if xml::elements(node).next().is_some() {
        return decode_struct(node);
    }

    let text = xml::text(node);
    if type_ns != Some(XSD_NS) {
        // A complex type with no members is an empty object, not a string.
        return Ok(match xsi_type {
            Some(_) => Value::Struct(Map::new()),
            None => Value::String(text),
        });
    }

    let value = match type_name {
        "int" | "integer" | "long" | "short" | "byte" | "unsignedInt" | "unsignedShort"
        | "unsignedByte" | "unsignedLong" | "nonNegativeInteger" | "positiveInteger" => Value::Int(
            text.trim()
                .parse()
                .map_err(|_| malformed(format!("invalid integer {text:?}")))?,
        ),
        "double" | "float" | "decimal" => Value::Double(
            text.trim()
                .parse()
                .map_err(|_| malformed(format!("invalid number {text:?}")))?,
        ),
        "boolean" => match text.trim() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            other => return Err(malformed(format!("invalid boolean {other:?}"))),
        },
        "base64Binary" => {
            let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            Value::Bytes(
                STANDARD
                    .decode(compact)
                    .map_err(|e| malformed(format!("invalid base64: {e}")))?,
            )
        }
        _ => Value::String(text),
    };
    Ok(value)
}

/// Members in document order. A repeated member name collects its values
/// into an array.
fn decode_struct(node: Node<'_, '_>) -> Result<Value, TransportError> {
    let mut map = Map::new();
    for member in xml::elements(node) {
        let name = member.tag_name().name().to_string();
        let value = decode_element(member)?;
        match map.get_mut(&name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::take(existing);
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(name, value);
            }
        }
    }
    Ok(Value::Struct(map))
}

/// Split `prefix:local` and look up the prefix's namespace on `node`.
fn resolve_qname<'a>(node: Node<'a, '_>, qualified: &'a str) -> (Option<&'a str>, &'a str) {
    match qualified.split_once(':') {
        Some((prefix, local)) => (node.lookup_namespace_uri(Some(prefix)), local),
        None => (node.lookup_namespace_uri(None), qualified),
    }
}

fn malformed(message: impl Into<String>) -> TransportError {
    TransportError::Malformed(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"{ENVELOPE_NS}\" xmlns:ns1=\"{DEFAULT_NAMESPACE}\" \
             xmlns:xsd=\"{XSD_NS}\" xmlns:xsi=\"{XSI_NS}\" xmlns:SOAP-ENC=\"{ENCODING_NS}\">\
             <SOAP-ENV:Body>{body}</SOAP-ENV:Body></SOAP-ENV:Envelope>"
        )
    }

    #[test]
    fn request_carries_headers_and_positional_params() {
        let mut headers = HeaderSet::new();
        headers.set("authenticate", Value::record([("username", "u"), ("apiKey", "k")]));
        headers.set("SoftLayer_ObjectMask", Value::record([("mask", "mask[id]")]));

        let req = Soap::build_request(
            "https://api.softlayer.com/soap/v3.1/SoftLayer_Ticket",
            "SoftLayer_Ticket",
            "getObject",
            &headers,
            &[Value::Int(1), Value::from("x")],
        )
        .unwrap();

        assert!(req
            .headers
            .contains(&("soapaction".to_string(), format!("\"{DEFAULT_NAMESPACE}SoftLayer_TicketAction\""))));

        let doc = Document::parse(&req.body).unwrap();
        let envelope = doc.root_element();
        let header = xml::child(envelope, "Header").unwrap();
        let auth = xml::child(header, "authenticate").unwrap();
        assert_eq!(auth.tag_name().namespace(), Some(DEFAULT_NAMESPACE));
        assert_eq!(xml::child(auth, "username").map(xml::text).as_deref(), Some("u"));
        let mask = xml::child(header, "SoftLayer_ObjectMask").unwrap();
        assert_eq!(xml::child(mask, "mask").map(xml::text).as_deref(), Some("mask[id]"));

        let call = xml::child(xml::child(envelope, "Body").unwrap(), "getObject").unwrap();
        let params: Vec<_> = xml::elements(call).map(|n| n.tag_name().name().to_string()).collect();
        assert_eq!(params, ["param0", "param1"]);
    }

    #[test]
    fn tree_masks_encode_as_empty_elements() {
        let mut headers = HeaderSet::new();
        let mut tree = crate::mask::ObjectMask::new();
        tree.child("id");
        tree.child("datacenter").child("longName");
        headers.set("SoftLayer_TicketObjectMask", Value::record([("mask", tree.to_value())]));

        let body = encode_envelope("getObject", &headers, &[]).unwrap();
        assert!(body.contains("<mask><id/><datacenter><longName/></datacenter></mask>"));
        assert!(body.contains("<ns1:getObject/>"));
    }

    #[test]
    fn index_keyed_structs_are_rejected_before_sending() {
        let normalized = Value::record([("0", "a"), ("1", "b")]);
        let err = encode_envelope("editObjects", &HeaderSet::new(), &[normalized]).unwrap_err();
        assert!(matches!(err, ApiError::SerializationError(_)));
    }

    #[test]
    fn invalid_header_and_method_names_are_rejected() {
        let mut headers = HeaderSet::new();
        headers.set("bad header", Value::Int(1));
        assert!(encode_envelope("getObject", &headers, &[]).is_err());
        assert!(encode_envelope("get<Object>", &HeaderSet::new(), &[]).is_err());
    }

    #[test]
    fn ordinary_names_encode_to_a_well_formed_envelope() {
        let template = Value::record([("hostname", "db1"), ("_private.x-y", "z")]);
        let body = encode_envelope("editObject", &HeaderSet::new(), &[template]).unwrap();
        assert!(Document::parse(&body).is_ok());
    }

    #[test]
    fn decodes_typed_return_values() {
        let body = envelope(
            "<ns1:getObjectResponse><getObjectReturn xsi:type=\"tns:SoftLayer_Account\">\
               <id xsi:type=\"xsd:int\">1234</id>\
               <companyName xsi:type=\"xsd:string\">Example &amp; Co</companyName>\
               <isReseller xsi:type=\"xsd:boolean\">false</isReseller>\
               <balance xsi:type=\"xsd:decimal\">12.5</balance>\
               <logo xsi:type=\"xsd:base64Binary\">aGk=</logo>\
               <parent xsi:nil=\"true\"/>\
               <address xsi:type=\"tns:SoftLayer_Address\"/>\
             </getObjectReturn></ns1:getObjectResponse>",
        );
        let value = decode_envelope(&body).unwrap();
        assert_eq!(value.get("id"), Some(&Value::Int(1234)));
        assert_eq!(value.get("companyName").and_then(Value::as_str), Some("Example & Co"));
        assert_eq!(value.get("isReseller"), Some(&Value::Bool(false)));
        assert_eq!(value.get("balance"), Some(&Value::Double(12.5)));
        assert_eq!(value.get("logo"), Some(&Value::Bytes(b"hi".to_vec())));
        assert_eq!(value.get("parent"), Some(&Value::Nil));
        assert_eq!(value.get("address"), Some(&Value::new_struct()));
    }

    #[test]
    fn decodes_encoded_arrays() {
        let body = envelope(
            "<ns1:getVirtualGuestsResponse>\
               <getVirtualGuestsReturn SOAP-ENC:arrayType=\"tns:SoftLayer_Virtual_Guest[2]\" xsi:type=\"SOAP-ENC:Array\">\
                 <item><id xsi:type=\"xsd:int\">1</id></item>\
                 <item><id xsi:type=\"xsd:int\">2</id></item>\
               </getVirtualGuestsReturn>\
             </ns1:getVirtualGuestsResponse>",
        );
        let value = decode_envelope(&body).unwrap();
        let ids: Vec<i64> = value
            .values()
            .filter_map(|guest| guest.get("id").and_then(Value::as_i64))
            .collect();
        assert_eq!(ids, [1, 2]);
        assert!(matches!(value, Value::Array(_)));
    }

    #[test]
    fn repeated_members_collect_into_an_array() {
        let body = envelope(
            "<r><ret><tag>a</tag><tag>b</tag><tag>c</tag><name>n</name></ret></r>",
        );
        let value = decode_envelope(&body).unwrap();
        assert_eq!(value.get("tag"), Some(&Value::from(vec!["a", "b", "c"])));
        assert_eq!(value.get("name").and_then(Value::as_str), Some("n"));
    }

    #[test]
    fn void_responses_decode_to_nil() {
        let body = envelope("<ns1:deleteObjectResponse/>");
        assert_eq!(decode_envelope(&body).unwrap(), Value::Nil);
    }

    #[test]
    fn faults_become_fault_errors() {
        let body = envelope(
            "<SOAP-ENV:Fault><faultcode>SoftLayer_Exception_ObjectNotFound</faultcode>\
             <faultstring>Unable to find object with id of '99'.</faultstring></SOAP-ENV:Fault>",
        );
        let http = HttpResponse {
            status: 500,
            headers: Vec::new(),
            body,
        };
        match Soap::parse_response(&http).unwrap_err() {
            TransportError::Fault { code, message } => {
                assert_eq!(code, "SoftLayer_Exception_ObjectNotFound");
                assert_eq!(message, "Unable to find object with id of '99'.");
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn non_envelope_error_pages_are_http_errors() {
        let http = HttpResponse {
            status: 503,
            headers: Vec::new(),
            body: "Service Unavailable".to_string(),
        };
        assert!(matches!(
            Soap::parse_response(&http),
            Err(TransportError::HttpError { status: 503, .. })
        ));
    }
}
