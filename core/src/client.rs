//! The API client: header management plus call dispatch.
//!
//! # Design
//! `Client<P>` is bound to one service at construction and owns the headers
//! sent with every call. Calls come in two shapes:
//!
//! - `call` / `call_with` run the whole round-trip through a `Transport`.
//! - `build_call` produces an `HttpRequest` and `parse_call` consumes the
//!   matching `HttpResponse`, so the caller can run the I/O whenever and
//!   however it likes in between.
//!
//! A result limit applies to exactly one call: `parse_call` drops the
//! `resultLimit` header after a successful call, and only then. Every mutator
//! takes `&mut self`, so one client cannot be shared between concurrent calls.

use std::fmt::{self, Display};
use std::marker::PhantomData;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ClientOptions;
use crate::error::{ApiError, TransportError};
use crate::headers::{self, HeaderSet};
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::mask::Mask;
use crate::protocol::{Protocol, Soap, XmlRpc};
use crate::value::Value;

/// Client for one API service over protocol `P`.
pub struct Client<P: Protocol> {
    service_name: String,
    endpoint_url: String,
    headers: HeaderSet,
    transport: UreqTransport,
    timeout: Option<Duration>,
    trace: bool,
    last_request: Option<String>,
    last_response: Option<String>,
    protocol: PhantomData<P>,
}

pub type SoapClient = Client<Soap>;
pub type XmlRpcClient = Client<XmlRpc>;

/// A request built by `Client::build_call`, waiting for its response.
#[derive(Debug, Clone)]
pub struct PendingCall {
    method: String,
    request: HttpRequest,
}

impl PendingCall {
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request to execute.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }
}

impl<P: Protocol> Client<P> {
    /// Create a client for `service_name`.
    ///
    /// Fails when the service name is blank or when an endpoint override is
    /// given but blank. Without an override the protocol's public endpoint is
    /// used. Authentication is set only when both a username and an API key
    /// are present and non-blank; the init parameter only for a given id.
    pub fn new(service_name: &str, options: ClientOptions) -> Result<Self, ApiError> {
        let service_name = service_name.trim();
        if service_name.is_empty() {
            return Err(ApiError::validation("Please provide a SoftLayer API service name."));
        }

        let endpoint_url = match options.endpoint_url.as_deref().map(str::trim) {
            Some("") => return Err(ApiError::validation("Please provide a valid API endpoint.")),
            Some(url) => url.to_string(),
            None => P::PUBLIC_ENDPOINT.to_string(),
        };

        let mut client = Self {
            service_name: service_name.to_string(),
            endpoint_url,
            headers: HeaderSet::new(),
            transport: UreqTransport::new(options.timeout),
            timeout: options.timeout,
            trace: options.trace,
            last_request: None,
            last_response: None,
            protocol: PhantomData,
        };

        let non_blank = |s: &Option<String>| s.as_deref().filter(|v| !v.trim().is_empty()).map(str::to_string);
        match (non_blank(&options.username), non_blank(&options.api_key)) {
            (Some(username), Some(api_key)) => {
                client.set_authentication(&username, &api_key)?;
            }
            _ => debug!(service = %client.service_name, "no API credentials supplied"),
        }

        if let Some(id) = options.id {
            client.set_init_parameter(id);
        }

        Ok(client)
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Body of the last request, when tracing is on.
    pub fn last_request(&self) -> Option<&str> {
        self.last_request.as_deref()
    }

    /// Body of the last response, when tracing is on.
    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    /// Set a call header, replacing any previous value under `name`.
    pub fn set_header(&mut self, name: &str, value: impl Into<Value>) -> &mut Self {
        self.headers.set(name, value);
        self
    }

    /// Remove a call header. Removing a header that is not set does nothing.
    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.headers.remove(name);
        self
    }

    /// Authenticate calls with an API username and key.
    pub fn set_authentication(&mut self, username: &str, api_key: &str) -> Result<&mut Self, ApiError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::validation("Please provide a SoftLayer API username."));
        }
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ApiError::validation("Please provide a SoftLayer API key."));
        }

        Ok(self.set_header(
            headers::AUTHENTICATE,
            Value::record([("username", username), ("apiKey", api_key)]),
        ))
    }

    /// Act on the service object with this id. A blank id sets nothing.
    ///
    /// Ids that parse as integers are sent as integers, anything else as a
    /// string.
    pub fn set_init_parameter(&mut self, id: impl Display) -> &mut Self {
        let id = id.to_string();
        let id = id.trim();
        if id.is_empty() {
            return self;
        }

        let value = match id.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::from(id),
        };
        let key = headers::init_parameters_key(&self.service_name);
        self.set_header(&key, Value::record([("id", value)]))
    }

    /// Ask for related properties along with the result.
    ///
    /// Text masks travel under the protocol's fixed mask header, tree masks
    /// under `<Service>ObjectMask`. Over SOAP a blank text mask sets nothing;
    /// XML-RPC sends it as given.
    pub fn set_object_mask(&mut self, mask: impl Into<Mask>) -> &mut Self {
        let mask = mask.into();
        if P::SKIPS_BLANK_TEXT_MASK && mask.is_empty() {
            return self;
        }

        let key = match mask {
            Mask::Text(_) => P::TEXT_MASK_HEADER.to_string(),
            Mask::Tree(_) => headers::object_mask_key(&self.service_name),
        };
        self.set_header(&key, Value::record([("mask", mask.into_value())]))
    }

    /// Limit the next call to `limit` results starting at `offset`.
    pub fn set_result_limit(&mut self, limit: i64, offset: i64) -> &mut Self {
        self.set_header(
            headers::RESULT_LIMIT,
            Value::record([("limit", limit), ("offset", offset)]),
        )
    }

    /// Encode a call to `method` with the current headers.
    pub fn build_call(&self, method: &str, args: &[Value]) -> Result<PendingCall, ApiError> {
        if method.trim().is_empty() {
            return Err(ApiError::validation("Please provide a SoftLayer API method name."));
        }

        let url = format!("{}{}", self.base_url(), self.service_name);
        debug!(
            protocol = P::NAME,
            service = %self.service_name,
            method,
            %url,
            headers = self.headers.len(),
            "dispatching API call"
        );
        let request = P::build_request(&url, &self.service_name, method, &self.headers, args)?;
        Ok(PendingCall {
            method: method.to_string(),
            request,
        })
    }

    /// Decode the response to a call built by `build_call`.
    ///
    /// On success the result limit header is removed; on failure every header
    /// is left as it was.
    pub fn parse_call(&mut self, call: PendingCall, response: HttpResponse) -> Result<Value, ApiError> {
        if self.trace {
            self.last_request = Some(call.request.body);
            self.last_response = Some(response.body.clone());
        }

        let result = P::parse_response(&response).inspect_err(|e| {
            if let TransportError::Fault { code, message } = e {
                warn!(service = %self.service_name, method = %call.method, %code, %message, "API fault");
            }
        })?;

        if self.headers.remove(headers::RESULT_LIMIT).is_some() {
            debug!(service = %self.service_name, "result limit consumed");
        }
        Ok(result)
    }

    /// Call `method` through the built-in `ureq` transport.
    pub fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, ApiError> {
        let pending = self.build_call(method, args)?;
        self.record_request(&pending);
        let response = self.transport.execute(&pending.request)?;
        self.parse_call(pending, response)
    }

    /// Call `method` through a caller-supplied transport.
    pub fn call_with<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
        method: &str,
        args: &[Value],
    ) -> Result<Value, ApiError> {
        let pending = self.build_call(method, args)?;
        self.record_request(&pending);
        let response = transport.execute(&pending.request)?;
        self.parse_call(pending, response)
    }

    /// Keep the outgoing body before it is sent, so a failed exchange still
    /// shows what was attempted.
    fn record_request(&mut self, call: &PendingCall) {
        if self.trace {
            self.last_request = Some(call.request.body.clone());
            self.last_response = None;
        }
    }

    fn base_url(&self) -> String {
        if self.endpoint_url.ends_with('/') {
            self.endpoint_url.clone()
        } else {
            format!("{}/", self.endpoint_url)
        }
    }
}

impl Client<Soap> {
    /// Restrict results server-side. An empty filter sets nothing.
    pub fn set_object_filter(&mut self, filter: impl Into<Value>) -> &mut Self {
        let filter = filter.into();
        if filter.is_nil() || (matches!(filter, Value::Struct(_) | Value::Array(_)) && filter.is_empty()) {
            return self;
        }
        let key = headers::object_filter_key(&self.service_name);
        self.set_header(&key, filter)
    }
}

impl<P: Protocol> fmt::Debug for Client<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("protocol", &P::NAME)
            .field("service_name", &self.service_name)
            .field("endpoint_url", &self.endpoint_url)
            .field("headers", &self.headers.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}
