//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The client
//! builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network; a `Transport` executes the round-trip in between.
//! `UreqTransport` is the blocking implementation used by `Client::call`, and
//! tests or hosts with their own HTTP stack can plug in anything else.
//!
//! Both wire protocols only ever POST, so requests carry no method.

use std::fmt;
use std::time::Duration;

use crate::error::TransportError;

/// An HTTP POST described as plain data.
///
/// Built by `Client::build_call`. The caller is responsible for executing it
/// and handing the matching `HttpResponse` to `Client::parse_call`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes a single blocking HTTP round-trip.
///
/// Implementations must return non-2xx responses as data; the protocol
/// decoders decide whether a 500 carries a fault or is an HTTP error.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `Transport` backed by a `ureq` agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Build an agent that reports every status code as data and optionally
    /// bounds the time spent establishing a connection.
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(connect_timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let connection_error = |e: ureq::Error| TransportError::Connection {
            url: request.url.clone(),
            message: e.to_string(),
        };

        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder
            .send(request.body.as_bytes())
            .map_err(connection_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(connection_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_covers_the_2xx_range_only() {
        let mut response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
        };
        assert!(response.is_success());
        response.status = 299;
        assert!(response.is_success());
        response.status = 500;
        assert!(!response.is_success());
        response.status = 404;
        assert!(!response.is_success());
    }

    #[test]
    fn unreachable_endpoint_is_a_connection_error() {
        // Port 9 (discard) on localhost is closed in every sane test environment.
        let transport = UreqTransport::new(Some(Duration::from_secs(2)));
        let request = HttpRequest {
            url: "http://127.0.0.1:9/xmlrpc/v3/SoftLayer_Account".to_string(),
            headers: vec![("content-type".to_string(), "text/xml".to_string())],
            body: String::new(),
        };
        let err = transport.execute(&request).unwrap_err();
        assert!(matches!(err, TransportError::Connection { .. }));
    }
}
