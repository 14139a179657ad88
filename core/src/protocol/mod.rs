//! Wire protocols the client can speak.
//!
//! # Design
//! Header management and call dispatch are identical for both protocols; only
//! the envelope, a few constants and the mask header name differ. `Protocol`
//! captures exactly those differences so `Client<P>` is written once.

pub mod soap;
pub mod xmlrpc;

pub use soap::Soap;
pub use xmlrpc::XmlRpc;

use crate::error::{ApiError, TransportError};
use crate::headers::HeaderSet;
use crate::http::{HttpRequest, HttpResponse};
use crate::value::Value;

/// Request encoding and response decoding for one wire protocol.
pub trait Protocol {
    /// Short label for log output.
    const NAME: &'static str;

    /// Base URL of the API over the public Internet.
    const PUBLIC_ENDPOINT: &'static str;

    /// Base URL of the API over the private network.
    const PRIVATE_ENDPOINT: &'static str;

    /// Header name for a mask given as plain text. Tree masks always use
    /// `<Service>ObjectMask`.
    const TEXT_MASK_HEADER: &'static str;

    /// Whether a blank text mask is dropped instead of sent.
    const SKIPS_BLANK_TEXT_MASK: bool;

    /// Encode one method call. `url` is the endpoint with the service name
    /// already appended.
    fn build_request(
        url: &str,
        service_name: &str,
        method: &str,
        headers: &HeaderSet,
        args: &[Value],
    ) -> Result<HttpRequest, ApiError>;

    /// Decode the result of a call, turning remote faults into errors.
    fn parse_response(response: &HttpResponse) -> Result<Value, TransportError>;
}

/// Run `decode` on the body, reporting an HTTP error instead when a non-2xx
/// body turned out not to be a protocol envelope at all.
pub(crate) fn decode_body<T>(
    response: &HttpResponse,
    decode: impl FnOnce(&str) -> Result<T, TransportError>,
) -> Result<T, TransportError> {
    match decode(&response.body) {
        Err(TransportError::Malformed(_)) if !response.is_success() => Err(TransportError::HttpError {
            status: response.status,
            body: response.body.clone(),
        }),
        other => other,
    }
}
