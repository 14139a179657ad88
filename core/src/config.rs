//! Construction options for `Client`.
//!
//! Nothing here has a compiled-in secret: a client built from
//! `ClientOptions::default()` sends no credentials at all.

use std::env;
use std::time::Duration;

use crate::protocol::Protocol;

pub const ENV_USERNAME: &str = "SL_USER";
pub const ENV_API_KEY: &str = "SL_APIKEY";
pub const ENV_ENDPOINT: &str = "SL_ENDPOINT";
pub const ENV_TIMEOUT_SECS: &str = "SL_TIMEOUT_SECS";

/// Everything `Client::new` accepts besides the service name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    /// Object id to initialize the service with.
    pub id: Option<i64>,
    pub username: Option<String>,
    pub api_key: Option<String>,
    /// Base URL overriding the protocol's public endpoint. The service name
    /// is appended to it.
    pub endpoint_url: Option<String>,
    /// Connect timeout for the built-in transport.
    pub timeout: Option<Duration>,
    /// Keep the last request and response bodies for inspection.
    pub trace: bool,
}

impl ClientOptions {
    /// Read credentials, endpoint and timeout from `SL_USER`, `SL_APIKEY`,
    /// `SL_ENDPOINT` and `SL_TIMEOUT_SECS`. Unset or blank variables leave the
    /// option unset; an unparsable timeout is ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            username: var(ENV_USERNAME),
            api_key: var(ENV_API_KEY),
            endpoint_url: var(ENV_ENDPOINT),
            timeout: var(ENV_TIMEOUT_SECS)
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs),
            ..Self::default()
        }
    }

    /// Talk to the API over the private network instead of the Internet.
    pub fn private_network<P: Protocol>(mut self) -> Self {
        self.endpoint_url = Some(P::PRIVATE_ENDPOINT.to_string());
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_credentials(mut self, username: &str, api_key: &str) -> Self {
        self.username = Some(username.to_string());
        self.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_endpoint(mut self, endpoint_url: &str) -> Self {
        self.endpoint_url = Some(endpoint_url.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}
