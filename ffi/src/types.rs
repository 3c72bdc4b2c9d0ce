//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, pointer plus length instead of `Vec`,
//! and enums with explicit discriminants. Conversions live here to keep
//! `lib.rs` focused on the `extern "C"` surface.

use std::ffi::CString;
use std::os::raw::c_char;

use emarsys_core::{EmarsysClient, EmarsysError, HttpMethod, HttpRequest, ResponseEnvelope};

/// Opaque handle to an `EmarsysClient`. The host performs the HTTP
/// round-trip itself, so the client carries no transport.
pub struct FfiEmarsysClient {
    pub(crate) inner: EmarsysClient<()>,
}

/// Owned C string from `s`. Interior NUL bytes are dropped.
pub(crate) fn to_c_string(s: impl Into<String>) -> *mut c_char {
    let s: String = s.into();
    let bytes: Vec<u8> = s.into_bytes().into_iter().filter(|b| *b != 0).collect();
    CString::new(bytes).unwrap_or_default().into_raw()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[repr(C)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// Method names accepted by `emarsys_build_request`.
pub(crate) fn parse_method(name: &str) -> Option<HttpMethod> {
    match name.to_ascii_uppercase().as_str() {
        "GET" => Some(HttpMethod::Get),
        "POST" => Some(HttpMethod::Post),
        "PUT" => Some(HttpMethod::Put),
        "DELETE" => Some(HttpMethod::Delete),
        _ => None,
    }
}

#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// A signed request, ready for the host to send.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let mut headers: Vec<FfiHeader> = req
            .headers
            .into_iter()
            .map(|(k, v)| FfiHeader {
                key: to_c_string(k),
                value: to_c_string(v),
            })
            .collect();
        headers.shrink_to_fit();
        let headers_len = headers.len() as u32;
        let headers_ptr = if headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ptr = headers.as_mut_ptr();
            std::mem::forget(headers);
            ptr
        };

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            url: to_c_string(req.url),
            headers: headers_ptr,
            headers_len,
            body: to_c_string(req.body),
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// Raw reply as received by the host. The body need not be NUL-terminated;
/// the FFI layer reads `body_len` bytes and never frees them.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const u8,
    pub body_len: usize,
}

// ---------------------------------------------------------------------------
// Result type
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorKind {
    Ok = 0,
    /// Caller-attributable failure (`ClientError`).
    Client = 1,
    /// Service or network failure (`ServerError`).
    Server = 2,
    Panic = 3,
    NullArg = 4,
    /// An argument was present but unusable (bad UTF-8, bad JSON).
    InvalidArg = 5,
}

/// Outcome of every FFI call that returns data.
///
/// On success `error_kind` is `Ok`, `error_message` is null and `data_json`
/// holds the payload as JSON. For parsed responses `reply_code` and
/// `reply_text` carry the envelope status. A `ClientError::Reply` failure
/// also sets `reply_code`. Strings that do not apply are null.
#[repr(C)]
pub struct FfiResult {
    pub error_kind: FfiErrorKind,
    pub error_message: *mut c_char,
    pub reply_code: i64,
    pub reply_text: *mut c_char,
    pub data_json: *mut c_char,
}

impl FfiResult {
    fn boxed(self) -> *mut Self {
        Box::into_raw(Box::new(self))
    }

    pub(crate) fn ok_envelope(envelope: ResponseEnvelope) -> *mut Self {
        FfiResult {
            error_kind: FfiErrorKind::Ok,
            error_message: std::ptr::null_mut(),
            reply_code: envelope.reply_code(),
            reply_text: to_c_string(envelope.reply_text()),
            data_json: to_c_string(envelope.data().to_string()),
        }
        .boxed()
    }

    pub(crate) fn ok_json(value: serde_json::Value) -> *mut Self {
        FfiResult {
            error_kind: FfiErrorKind::Ok,
            error_message: std::ptr::null_mut(),
            reply_code: 0,
            reply_text: std::ptr::null_mut(),
            data_json: to_c_string(value.to_string()),
        }
        .boxed()
    }

    pub(crate) fn ok_empty() -> *mut Self {
        FfiResult {
            error_kind: FfiErrorKind::Ok,
            error_message: std::ptr::null_mut(),
            reply_code: 0,
            reply_text: std::ptr::null_mut(),
            data_json: std::ptr::null_mut(),
        }
        .boxed()
    }

    pub(crate) fn from_error(err: EmarsysError) -> *mut Self {
        let error_kind = match &err {
            EmarsysError::Client(_) => FfiErrorKind::Client,
            EmarsysError::Server(_) => FfiErrorKind::Server,
        };
        Self::failure(error_kind, err.reply_code().unwrap_or(0), err.to_string())
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::failure(FfiErrorKind::NullArg, 0, format!("null argument: {name}"))
    }

    pub(crate) fn invalid_arg(name: &str, reason: impl std::fmt::Display) -> *mut Self {
        Self::failure(FfiErrorKind::InvalidArg, 0, format!("invalid argument {name}: {reason}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::failure(FfiErrorKind::Panic, 0, msg.to_string())
    }

    fn failure(error_kind: FfiErrorKind, reply_code: i64, msg: String) -> *mut Self {
        FfiResult {
            error_kind,
            error_message: to_c_string(msg),
            reply_code,
            reply_text: std::ptr::null_mut(),
            data_json: std::ptr::null_mut(),
        }
        .boxed()
    }
}
