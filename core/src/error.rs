//! Error types for the API client.
//!
//! # Design
//! Validation failures are raised before any network I/O and carry the
//! human-readable message a caller would show. Everything that happens during
//! or after the round-trip lands in `TransportError`, which keeps the remote
//! fault code and message intact for debugging.

use thiserror::Error;

/// Errors returned by the client and the wire codecs.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad input rejected before a request was built.
    #[error("{0}")]
    Validation(String),

    /// The round-trip failed or the remote service reported an error.
    #[error("There was an error querying the SoftLayer API: {0}")]
    Transport(#[from] TransportError),

    /// A request value could not be encoded.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A decoded value could not be converted into the requested type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),
}

/// Failures of the network round-trip itself.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint could not be reached or the body could not be read.
    #[error("unable to contact the API at {url}: {message}")]
    Connection { url: String, message: String },

    /// Non-2xx status whose body did not decode into a fault.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The remote service answered with a SOAP or XML-RPC fault.
    #[error("{message} ({code})")]
    Fault { code: String, message: String },

    /// The body was not a well-formed response envelope.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    pub(crate) fn validation(message: &str) -> Self {
        ApiError::Validation(message.to_string())
    }
}
