//! In-memory stand-in for the SoftLayer API, speaking both XML-RPC and SOAP.
//!
//! Serves `POST /xmlrpc/v3/{service}` and `POST /soap/v3.1/{service}`. Every
//! call must authenticate as `MOCK_USERNAME` / `MOCK_API_KEY`. Two services
//! are implemented:
//!
//! - `SoftLayer_Account`: `getObject`.
//! - `SoftLayer_Ticket`: `createObject`, `getObject`, `getAllObjects`
//!   (honours `resultLimit`), `editObject`, `deleteObject`, `getAttachedFile`
//!   (base64) and `getCreateDate` (dateTime).
//!
//! Any service also answers `getReceivedHeaders` with the names of the
//! headers it was sent, in order.

pub mod wire;

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

use wire::{Call, Wire};

pub const MOCK_USERNAME: &str = "mockUser";
pub const MOCK_API_KEY: &str = "mockKey";
pub const MOCK_COMPANY: &str = "Mock Hosting Ltd";
pub const MOCK_CREATE_DATE: &str = "20240115T08:30:00";

#[derive(Clone, Debug, PartialEq)]
pub struct Ticket {
    pub id: i64,
    pub title: String,
    pub status: String,
}

impl Ticket {
    fn to_wire(&self) -> Wire {
        Wire::Struct(vec![
            ("id".to_string(), Wire::Int(self.id)),
            ("title".to_string(), Wire::Str(self.title.clone())),
            ("status".to_string(), Wire::Str(self.status.clone())),
        ])
    }
}

#[derive(Debug, Default)]
pub struct Store {
    tickets: BTreeMap<i64, Ticket>,
    next_id: i64,
}

pub type Db = Arc<RwLock<Store>>;

/// A fault the mock answers with instead of a result.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub code: String,
    pub message: String,
}

impl Fault {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/xmlrpc/v3/{service}", post(xmlrpc_endpoint))
        .route("/soap/v3.1/{service}", post(soap_endpoint))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn xml(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "text/xml; charset=utf-8")], body).into_response()
}

async fn xmlrpc_endpoint(State(db): State<Db>, Path(service): Path<String>, body: String) -> Response {
    let call = match wire::parse_xmlrpc_call(&body) {
        Ok(call) => call,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };
    match dispatch(&db, &service, &call).await {
        Ok(value) => xml(StatusCode::OK, wire::render_xmlrpc_response(&value)),
        // XML-RPC reports faults in a successful HTTP response.
        Err(fault) => xml(StatusCode::OK, wire::render_xmlrpc_fault(&fault.code, &fault.message)),
    }
}

async fn soap_endpoint(State(db): State<Db>, Path(service): Path<String>, body: String) -> Response {
    let call = match wire::parse_soap_call(&body) {
        Ok(call) => call,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };
    match dispatch(&db, &service, &call).await {
        Ok(value) => xml(StatusCode::OK, wire::render_soap_response(&call.method, &value)),
        Err(fault) => xml(
            StatusCode::INTERNAL_SERVER_ERROR,
            wire::render_soap_fault(&fault.code, &fault.message),
        ),
    }
}

/// Authenticate and run one call against the store.
pub async fn dispatch(db: &Db, service: &str, call: &Call) -> Result<Wire, Fault> {
    authenticate(call)?;
    info!(service, method = %call.method, "mock API call");

    if call.method == "getReceivedHeaders" {
        return Ok(Wire::Array(
            call.headers
                .iter()
                .map(|(name, _)| Wire::Str(name.clone()))
                .collect(),
        ));
    }

    match service {
        "SoftLayer_Account" => account(call),
        "SoftLayer_Ticket" => ticket(db, call).await,
        other => Err(Fault::new(
            "SoftLayer_Exception_Public",
            format!("Service {other} does not exist"),
        )),
    }
}

fn authenticate(call: &Call) -> Result<(), Fault> {
    let auth = call.header("authenticate");
    let username = auth.and_then(|a| a.get("username")).and_then(Wire::as_str);
    let api_key = auth.and_then(|a| a.get("apiKey")).and_then(Wire::as_str);
    if username == Some(MOCK_USERNAME) && api_key == Some(MOCK_API_KEY) {
        return Ok(());
    }
    debug!(?username, "rejecting call with bad credentials");
    Err(Fault::new("SoftLayer_Exception_InvalidLegacyToken", "Invalid API token."))
}

fn unknown_method(service: &str, method: &str) -> Fault {
    Fault::new(
        "SoftLayer_Exception_Public",
        format!("Function (\"{method}\") is not a valid method for this service ({service})."),
    )
}

fn account(call: &Call) -> Result<Wire, Fault> {
    match call.method.as_str() {
        "getObject" => Ok(Wire::Struct(vec![
            ("id".to_string(), Wire::Int(1001)),
            ("companyName".to_string(), Wire::Str(MOCK_COMPANY.to_string())),
            ("isReseller".to_string(), Wire::Bool(false)),
        ])),
        other => Err(unknown_method("SoftLayer_Account", other)),
    }
}

/// The init parameter id, as an integer, if the call carries one.
fn init_id(call: &Call) -> Option<i64> {
    call.header("SoftLayer_TicketInitParameters")
        .and_then(|p| p.get("id"))
        .and_then(Wire::as_i64)
}

fn require_ticket(store: &Store, call: &Call) -> Result<Ticket, Fault> {
    let id = init_id(call).ok_or_else(|| {
        Fault::new(
            "SoftLayer_Exception_MissingInitParameter",
            "An initialization parameter is required for this method.",
        )
    })?;
    store.tickets.get(&id).cloned().ok_or_else(|| {
        Fault::new(
            "SoftLayer_Exception_ObjectNotFound",
            format!("Unable to find object with id of '{id}'."),
        )
    })
}

async fn ticket(db: &Db, call: &Call) -> Result<Wire, Fault> {
    match call.method.as_str() {
        "createObject" => {
            let title = call
                .args
                .first()
                .and_then(|t| t.get("title"))
                .and_then(Wire::as_str)
                .ok_or_else(|| Fault::new("SoftLayer_Exception_Public", "A ticket title is required."))?;
            let mut store = db.write().await;
            store.next_id += 1;
            let ticket = Ticket {
                id: store.next_id,
                title: title.to_string(),
                status: "OPEN".to_string(),
            };
            store.tickets.insert(ticket.id, ticket.clone());
            Ok(ticket.to_wire())
        }
        "getObject" => Ok(require_ticket(&*db.read().await, call)?.to_wire()),
        "getAllObjects" => {
            let store = db.read().await;
            let limit = call.header("resultLimit");
            let offset = limit
                .and_then(|l| l.get("offset"))
                .and_then(Wire::as_i64)
                .unwrap_or(0)
                .max(0) as usize;
            let count = limit
                .and_then(|l| l.get("limit"))
                .and_then(Wire::as_i64)
                .map(|n| n.max(0) as usize)
                .unwrap_or(usize::MAX);
            Ok(Wire::Array(
                store
                    .tickets
                    .values()
                    .skip(offset)
                    .take(count)
                    .map(Ticket::to_wire)
                    .collect(),
            ))
        }
        "editObject" => {
            let mut store = db.write().await;
            let mut ticket = require_ticket(&store, call)?;
            let template = call.args.first();
            if let Some(title) = template.and_then(|t| t.get("title")).and_then(Wire::as_str) {
                ticket.title = title.to_string();
            }
            if let Some(status) = template.and_then(|t| t.get("status")).and_then(Wire::as_str) {
                ticket.status = status.to_string();
            }
            store.tickets.insert(ticket.id, ticket);
            Ok(Wire::Bool(true))
        }
        "deleteObject" => {
            let mut store = db.write().await;
            let ticket = require_ticket(&store, call)?;
            store.tickets.remove(&ticket.id);
            Ok(Wire::Bool(true))
        }
        "getAttachedFile" => {
            let ticket = require_ticket(&*db.read().await, call)?;
            Ok(Wire::Base64(format!("attachment for ticket {}", ticket.id).into_bytes()))
        }
        "getCreateDate" => {
            require_ticket(&*db.read().await, call)?;
            Ok(Wire::DateTime(MOCK_CREATE_DATE.to_string()))
        }
        other => Err(unknown_method("SoftLayer_Ticket", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authed(method: &str) -> Call {
        Call {
            method: method.to_string(),
            headers: vec![(
                "authenticate".to_string(),
                Wire::Struct(vec![
                    ("username".to_string(), Wire::Str(MOCK_USERNAME.to_string())),
                    ("apiKey".to_string(), Wire::Str(MOCK_API_KEY.to_string())),
                ]),
            )],
            args: Vec::new(),
        }
    }

    fn with_id(mut call: Call, id: i64) -> Call {
        call.headers.push((
            "SoftLayer_TicketInitParameters".to_string(),
            Wire::Struct(vec![("id".to_string(), Wire::Int(id))]),
        ));
        call
    }

    fn title(title: &str) -> Wire {
        Wire::Struct(vec![("title".to_string(), Wire::Str(title.to_string()))])
    }

    #[tokio::test]
    async fn unauthenticated_calls_fault() {
        let db = Db::default();
        let call = Call {
            method: "getObject".to_string(),
            headers: Vec::new(),
            args: Vec::new(),
        };
        let fault = dispatch(&db, "SoftLayer_Account", &call).await.unwrap_err();
        assert_eq!(fault.code, "SoftLayer_Exception_InvalidLegacyToken");
    }

    #[tokio::test]
    async fn created_tickets_get_sequential_ids() {
        let db = Db::default();
        for expected in 1..=3 {
            let mut call = authed("createObject");
            call.args.push(title("t"));
            let ticket = dispatch(&db, "SoftLayer_Ticket", &call).await.unwrap();
            assert_eq!(ticket.get("id"), Some(&Wire::Int(expected)));
        }
    }

    #[tokio::test]
    async fn get_all_objects_honours_result_limit() {
        let db = Db::default();
        for name in ["a", "b", "c", "d"] {
            let mut call = authed("createObject");
            call.args.push(title(name));
            dispatch(&db, "SoftLayer_Ticket", &call).await.unwrap();
        }

        let mut call = authed("getAllObjects");
        call.headers.push((
            "resultLimit".to_string(),
            Wire::Struct(vec![
                ("limit".to_string(), Wire::Int(2)),
                ("offset".to_string(), Wire::Int(1)),
            ]),
        ));
        let page = dispatch(&db, "SoftLayer_Ticket", &call).await.unwrap();
        let titles: Vec<&str> = match &page {
            Wire::Array(items) => items.iter().filter_map(|t| t.get("title")).filter_map(Wire::as_str).collect(),
            other => panic!("expected array, got {other:?}"),
        };
        assert_eq!(titles, ["b", "c"]);
    }

    #[tokio::test]
    async fn missing_ticket_is_object_not_found() {
        let db = Db::default();
        let fault = dispatch(&db, "SoftLayer_Ticket", &with_id(authed("getObject"), 42))
            .await
            .unwrap_err();
        assert_eq!(fault.code, "SoftLayer_Exception_ObjectNotFound");
        assert_eq!(fault.message, "Unable to find object with id of '42'.");
    }

    #[tokio::test]
    async fn string_init_ids_are_accepted() {
        let db = Db::default();
        let mut create = authed("createObject");
        create.args.push(title("x"));
        dispatch(&db, "SoftLayer_Ticket", &create).await.unwrap();

        let mut call = authed("getObject");
        call.headers.push((
            "SoftLayer_TicketInitParameters".to_string(),
            Wire::Struct(vec![("id".to_string(), Wire::Str("1".to_string()))]),
        ));
        let ticket = dispatch(&db, "SoftLayer_Ticket", &call).await.unwrap();
        assert_eq!(ticket.get("title"), Some(&Wire::Str("x".to_string())));
    }

    #[tokio::test]
    async fn received_headers_are_echoed_in_order() {
        let db = Db::default();
        let call = with_id(authed("getReceivedHeaders"), 1);
        let names = dispatch(&db, "SoftLayer_Virtual_Guest", &call).await.unwrap();
        assert_eq!(
            names,
            Wire::Array(vec![
                Wire::Str("authenticate".to_string()),
                Wire::Str("SoftLayer_TicketInitParameters".to_string()),
            ])
        );
    }

    #[tokio::test]
    async fn unknown_services_and_methods_fault() {
        let db = Db::default();
        let fault = dispatch(&db, "SoftLayer_Nope", &authed("getObject")).await.unwrap_err();
        assert_eq!(fault.code, "SoftLayer_Exception_Public");
        let fault = dispatch(&db, "SoftLayer_Account", &authed("explode")).await.unwrap_err();
        assert!(fault.message.contains("explode"));
    }
}
