//! Client core for the Emarsys marketing REST API (v2).
//!
//! # Overview
//! Every call is a signed JSON request answered by a `{replyCode, replyText,
//! data}` envelope. The crate resolves symbolic field and choice names to the
//! numeric ids the API expects, signs each request with a WSSE
//! `UsernameToken`, and decodes the reply into a `ResponseEnvelope` or one of
//! the closed `EmarsysError` variants.
//!
//! # Design
//! - `EmarsysClient` splits each call into `build_request` and
//!   `parse_response`. `send` runs an injected `HttpTransport` in between;
//!   hosts that do their own I/O (the C binding) call the halves directly.
//! - Configuration is explicit (`ClientConfig`), with bundled reference data
//!   for the standard contact fields.
//! - A non-zero `replyCode` is data, not an error.
//! - Wire types are defined independently from the mock-server crate;
//!   integration tests catch schema drift.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod http;
pub mod mapping;
pub mod operations;
pub mod reference;
pub mod signer;

pub use client::{Body, EmarsysClient};
pub use config::{ClientConfig, ConfigError, LIVE_BASE_URL};
pub use endpoint::{EmailFilter, EmailStatus, Endpoint, FieldType, LaunchStatus, ResponseSummaryRange};
pub use envelope::ResponseEnvelope;
pub use error::{ClientError, EmarsysError, Result, ServerError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError, UreqTransport};
pub use mapping::{ChoiceRef, FieldKey, FieldRef, MappingTable};
pub use signer::{Credentials, DigestEncoding, WsseSigner, WsseToken};
