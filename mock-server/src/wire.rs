//! Minimal XML-RPC and SOAP handling for the mock API.
//!
//! Defined independently of `softlayer-core` so the client's codecs are
//! checked against a second implementation rather than against themselves.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use quick_xml::escape::escape;
use roxmltree::{Document, Node};

const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const ENCODING_NS: &str = "http://schemas.xmlsoap.org/soap/encoding/";
const API_NS: &str = "http://api.service.softlayer.com/soap/v3.1/";

#[derive(Debug, Clone, PartialEq)]
pub enum Wire {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Base64(Vec<u8>),
    DateTime(String),
    Array(Vec<Wire>),
    Struct(Vec<(String, Wire)>),
}

impl Wire {
    pub fn get(&self, key: &str) -> Option<&Wire> {
        match self {
            Wire::Struct(members) => members.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Wire::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integers, or strings holding one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Wire::Int(n) => Some(*n),
            Wire::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A decoded method call, whichever protocol it arrived over.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub headers: Vec<(String, Wire)>,
    pub args: Vec<Wire>,
}

impl Call {
    pub fn header(&self, name: &str) -> Option<&Wire> {
        self.headers.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

fn elements<'a, 'i>(node: Node<'a, 'i>) -> impl Iterator<Item = Node<'a, 'i>> {
    node.children().filter(Node::is_element)
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    elements(node).find(|n| n.tag_name().name() == name)
}

fn text(node: Node<'_, '_>) -> String {
    node.children().filter(Node::is_text).filter_map(|n| n.text()).collect()
}

fn decode_base64(text: &str) -> Result<Vec<u8>, String> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// XML-RPC
// ---------------------------------------------------------------------------

/// Parse a `methodCall`. The first parameter must be the `{headers: ...}`
/// struct the client always sends.
pub fn parse_xmlrpc_call(body: &str) -> Result<Call, String> {
    let doc = Document::parse(body).map_err(|e| e.to_string())?;
    let root = doc.root_element();
    if root.tag_name().name() != "methodCall" {
        return Err("not a methodCall".to_string());
    }
    let method = child(root, "methodName").map(text).ok_or("missing methodName")?;

    let mut params = Vec::new();
    if let Some(list) = child(root, "params") {
        for param in elements(list) {
            let value = child(param, "value").ok_or("param without value")?;
            params.push(xmlrpc_value(value)?);
        }
    }

    let mut params = params.into_iter();
    let headers = match params.next() {
        Some(first) => match first.get("headers") {
            Some(Wire::Struct(members)) => members.clone(),
            Some(_) | None => return Err("first parameter carries no headers struct".to_string()),
        },
        None => Vec::new(),
    };

    Ok(Call {
        method,
        headers,
        args: params.collect(),
    })
}

fn xmlrpc_value(node: Node<'_, '_>) -> Result<Wire, String> {
    let Some(typed) = elements(node).next() else {
        return Ok(Wire::Str(text(node)));
    };
    let t = text(typed);
    Ok(match typed.tag_name().name() {
        "string" => Wire::Str(t),
        "int" | "i4" | "i8" => Wire::Int(t.trim().parse().map_err(|_| format!("bad int {t}"))?),
        "double" => Wire::Double(t.trim().parse().map_err(|_| format!("bad double {t}"))?),
        "boolean" => Wire::Bool(t.trim() == "1"),
        "nil" => Wire::Nil,
        "base64" => Wire::Base64(decode_base64(&t)?),
        "dateTime.iso8601" => Wire::DateTime(t),
        "array" => {
            let mut items = Vec::new();
            if let Some(data) = child(typed, "data") {
                for value in elements(data) {
                    items.push(xmlrpc_value(value)?);
                }
            }
            Wire::Array(items)
        }
        "struct" => {
            let mut members = Vec::new();
            for member in elements(typed) {
                let name = child(member, "name").map(text).ok_or("member without name")?;
                let value = child(member, "value").ok_or("member without value")?;
                members.push((name, xmlrpc_value(value)?));
            }
            Wire::Struct(members)
        }
        other => return Err(format!("unknown type {other}")),
    })
}

pub fn render_xmlrpc_response(value: &Wire) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<methodResponse><params><param>");
    render_xmlrpc_value(&mut out, value);
    out.push_str("</param></params></methodResponse>");
    out
}

pub fn render_xmlrpc_fault(code: &str, message: &str) -> String {
    let fault = Wire::Struct(vec![
        ("faultCode".to_string(), Wire::Str(code.to_string())),
        ("faultString".to_string(), Wire::Str(message.to_string())),
    ]);
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<methodResponse><fault>");
    render_xmlrpc_value(&mut out, &fault);
    out.push_str("</fault></methodResponse>");
    out
}

fn render_xmlrpc_value(out: &mut String, value: &Wire) {
    out.push_str("<value>");
    match value {
        Wire::Nil => out.push_str("<nil/>"),
        Wire::Bool(b) => out.push_str(if *b { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" }),
        Wire::Int(n) => out.push_str(&format!("<int>{n}</int>")),
        Wire::Double(n) => out.push_str(&format!("<double>{n}</double>")),
        Wire::Str(s) => out.push_str(&format!("<string>{}</string>", escape(s.as_str()))),
        Wire::Base64(b) => out.push_str(&format!("<base64>{}</base64>", STANDARD.encode(b))),
        Wire::DateTime(t) => out.push_str(&format!("<dateTime.iso8601>{}</dateTime.iso8601>", escape(t.as_str()))),
        Wire::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                render_xmlrpc_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Wire::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str(&format!("<member><name>{}</name>", escape(name.as_str())));
                render_xmlrpc_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

// ---------------------------------------------------------------------------
// SOAP
// ---------------------------------------------------------------------------

/// Parse a request envelope: header elements by local name, then the method
/// element and its positional parts.
pub fn parse_soap_call(body: &str) -> Result<Call, String> {
    let doc = Document::parse(body).map_err(|e| e.to_string())?;
    let envelope = doc.root_element();
    if envelope.tag_name().name() != "Envelope" {
        return Err("not a SOAP envelope".to_string());
    }

    let mut headers = Vec::new();
    if let Some(header) = child(envelope, "Header") {
        for entry in elements(header) {
            if entry.tag_name().namespace() != Some(API_NS) {
                return Err(format!("header {} outside the API namespace", entry.tag_name().name()));
            }
            headers.push((entry.tag_name().name().to_string(), soap_value(entry)?));
        }
    }

    let body = child(envelope, "Body").ok_or("envelope without Body")?;
    let call = elements(body).next().ok_or("empty Body")?;
    let args = elements(call).map(soap_value).collect::<Result<Vec<_>, _>>()?;

    Ok(Call {
        method: call.tag_name().name().to_string(),
        headers,
        args,
    })
}

fn soap_value(node: Node<'_, '_>) -> Result<Wire, String> {
    if node.attribute((XSI_NS, "nil")) == Some("true") {
        return Ok(Wire::Nil);
    }
    if node.attribute((ENCODING_NS, "arrayType")).is_some() {
        return Ok(Wire::Array(elements(node).map(soap_value).collect::<Result<Vec<_>, _>>()?));
    }
    if elements(node).next().is_some() {
        let members = elements(node)
            .map(|m| Ok((m.tag_name().name().to_string(), soap_value(m)?)))
            .collect::<Result<Vec<_>, String>>()?;
        return Ok(Wire::Struct(members));
    }

    let t = text(node);
    let xsi_type = node.attribute((XSI_NS, "type")).unwrap_or_default();
    let local = xsi_type.rsplit(':').next().unwrap_or_default();
    Ok(match local {
        "" if t.trim().is_empty() => Wire::Struct(Vec::new()),
        "int" | "long" => Wire::Int(t.trim().parse().map_err(|_| format!("bad int {t}"))?),
        "double" => Wire::Double(t.trim().parse().map_err(|_| format!("bad double {t}"))?),
        "boolean" => Wire::Bool(t.trim() == "true" || t.trim() == "1"),
        "base64Binary" => Wire::Base64(decode_base64(&t)?),
        "dateTime" => Wire::DateTime(t),
        _ => Wire::Str(t),
    })
}

fn soap_envelope(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <SOAP-ENV:Envelope xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\" \
         xmlns:ns1=\"{API_NS}\" xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\" \
         xmlns:xsi=\"{XSI_NS}\" xmlns:SOAP-ENC=\"{ENCODING_NS}\">\
         <SOAP-ENV:Body>{body}</SOAP-ENV:Body></SOAP-ENV:Envelope>"
    )
}

pub fn render_soap_response(method: &str, value: &Wire) -> String {
    let mut out = format!("<ns1:{method}Response>");
    render_soap_element(&mut out, &format!("{method}Return"), value);
    out.push_str(&format!("</ns1:{method}Response>"));
    soap_envelope(&out)
}

pub fn render_soap_fault(code: &str, message: &str) -> String {
    soap_envelope(&format!(
        "<SOAP-ENV:Fault><faultcode>{}</faultcode><faultstring>{}</faultstring></SOAP-ENV:Fault>",
        escape(code),
        escape(message)
    ))
}

fn render_soap_element(out: &mut String, name: &str, value: &Wire) {
    let leaf = |out: &mut String, xsd: &str, text: &str| {
        out.push_str(&format!("<{name} xsi:type=\"xsd:{xsd}\">{}</{name}>", escape(text)));
    };
    match value {
        Wire::Nil => out.push_str(&format!("<{name} xsi:nil=\"true\"/>")),
        Wire::Bool(b) => leaf(out, "boolean", if *b { "true" } else { "false" }),
        Wire::Int(n) => leaf(out, "int", &n.to_string()),
        Wire::Double(n) => leaf(out, "double", &n.to_string()),
        Wire::Str(s) => leaf(out, "string", s),
        Wire::Base64(b) => leaf(out, "base64Binary", &STANDARD.encode(b)),
        Wire::DateTime(t) => leaf(out, "dateTime", t),
        Wire::Array(items) => {
            out.push_str(&format!(
                "<{name} SOAP-ENC:arrayType=\"xsd:anyType[{}]\" xsi:type=\"SOAP-ENC:Array\">",
                items.len()
            ));
            for item in items {
                render_soap_element(out, "item", item);
            }
            out.push_str(&format!("</{name}>"));
        }
        Wire::Struct(members) => {
            out.push_str(&format!("<{name} xsi:type=\"SOAP-ENC:Struct\">"));
            for (member, v) in members {
                render_soap_element(out, member, v);
            }
            out.push_str(&format!("</{name}>"));
        }
    }
}
