//! Synchronous client for the SoftLayer API over SOAP or XML-RPC.
//!
//! # Overview
//! A `Client` is bound to one API service. It accumulates call headers
//! (authentication, init parameters, object masks, object filters, result
//! limits), dispatches any method by name, and decodes the response into a
//! generic `Value` graph.
//!
//! # Design
//! - `Client<P>` is generic over the wire `Protocol`; `SoapClient` and
//!   `XmlRpcClient` are the two instantiations.
//! - Calls can be split into `build_call` (produces an `HttpRequest`) and
//!   `parse_call` (consumes an `HttpResponse`), so the I/O boundary is
//!   explicit. `call` runs both halves over a blocking `ureq` transport.
//! - XML-RPC results are normalized: base64 scalars become bytes, other typed
//!   scalars are dropped and arrays become index-keyed structs.
//!
//! ```no_run
//! use softlayer_core::{ClientOptions, SoapClient};
//!
//! # fn main() -> Result<(), softlayer_core::ApiError> {
//! let mut client = SoapClient::new("SoftLayer_Account", ClientOptions::from_env())?;
//! client.set_object_mask("mask[id,companyName]");
//! let account = client.call("getObject", &[])?;
//! println!("{:?}", account.get("companyName"));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod http;
pub mod mask;
pub mod normalize;
pub mod protocol;
pub mod value;

mod xml;

pub use client::{Client, PendingCall, SoapClient, XmlRpcClient};
pub use config::ClientOptions;
pub use error::{ApiError, TransportError};
pub use headers::HeaderSet;
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
pub use mask::{Mask, ObjectMask};
pub use protocol::{Protocol, Soap, XmlRpc};
pub use value::{Map, TypedScalar, Value};
