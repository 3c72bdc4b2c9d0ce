//! C-ABI wrapper around `emarsys-core`.
//!
//! # Overview
//! Exposes request signing, field/choice mapping and envelope parsing through
//! `extern "C"` functions. The host language performs the HTTP round-trip:
//! it asks for a signed request with `emarsys_build_request`, sends it, and
//! hands the raw reply to `emarsys_parse_response`.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Null arguments are reported (or answered with null), never dereferenced.
//! - One `FfiResult` shape carries payloads as JSON text plus the error kind,
//!   so the C surface stays small.
//! - The C caller owns all returned pointers and must release them with the
//!   matching `emarsys_free_*` function.

pub mod types;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use emarsys_core::{Body, ClientConfig, EmarsysClient, FieldKey, HttpResponse};
use serde_json::Value;

use types::*;

/// Borrow a C string as UTF-8, `None` for null or invalid input.
fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn read_object(name: &str, ptr: *const c_char) -> Result<Body, *mut FfiResult> {
    let Some(text) = read_str(ptr) else {
        return Err(FfiResult::invalid_arg(name, "not valid UTF-8"));
    };
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(FfiResult::invalid_arg(name, "expected a JSON object")),
        Err(e) => Err(FfiResult::invalid_arg(name, e)),
    }
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client for `username`/`secret`. `base_url` may be null for the
/// production endpoint.
///
/// Returns null if a credential is null or not UTF-8, or on internal failure.
/// The caller must free the returned pointer with `emarsys_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn emarsys_client_new(
    username: *const c_char,
    secret: *const c_char,
    base_url: *const c_char,
) -> *mut FfiEmarsysClient {
    catch_unwind(|| {
        let (Some(username), Some(secret)) = (read_str(username), read_str(secret)) else {
            return std::ptr::null_mut();
        };
        let mut config = ClientConfig::new(username, secret);
        if let Some(url) = read_str(base_url) {
            config = config.with_base_url(url);
        }
        match EmarsysClient::new(config, ()) {
            Ok(inner) => Box::into_raw(Box::new(FfiEmarsysClient { inner })),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `emarsys_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn emarsys_client_free(client: *mut FfiEmarsysClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Merge a `{"name": id, ...}` JSON object into the field mapping.
/// Entries whose id is not an integer are skipped.
#[unsafe(no_mangle)]
pub extern "C" fn emarsys_add_fields_mapping(
    client: *mut FfiEmarsysClient,
    mapping_json: *const c_char,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if mapping_json.is_null() {
            return FfiResult::null_arg("mapping_json");
        }
        let additions = match read_object("mapping_json", mapping_json) {
            Ok(map) => map,
            Err(result) => return result,
        };
        let client = unsafe { &mut *client };
        client.inner.add_fields_mapping(
            additions
                .into_iter()
                .filter_map(|(name, id)| id.as_i64().map(|id| (name, id))),
        );
        FfiResult::ok_empty()
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in emarsys_add_fields_mapping"))
}

/// Merge a `{"field": {"label": id, ...}, ...}` JSON object into the choice
/// mapping.
#[unsafe(no_mangle)]
pub extern "C" fn emarsys_add_choices_mapping(
    client: *mut FfiEmarsysClient,
    mapping_json: *const c_char,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if mapping_json.is_null() {
            return FfiResult::null_arg("mapping_json");
        }
        let additions = match read_object("mapping_json", mapping_json) {
            Ok(map) => map,
            Err(result) => return result,
        };
        let client = unsafe { &mut *client };
        client.inner.add_choices_mapping(&additions);
        FfiResult::ok_empty()
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in emarsys_add_choices_mapping"))
}

/// Resolve a field name. `data_json` holds the numeric id, or the name
/// itself as a JSON string for system fields.
#[unsafe(no_mangle)]
pub extern "C" fn emarsys_field_id(
    client: *const FfiEmarsysClient,
    name: *const c_char,
) -> *mut FfiResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let Some(name) = read_str(name) else {
            return FfiResult::null_arg("name");
        };
        let client = unsafe { &*client };
        match client.inner.field_id(name) {
            Ok(FieldKey::Id(id)) => FfiResult::ok_json(Value::from(id)),
            Ok(FieldKey::System(name)) => FfiResult::ok_json(Value::String(name)),
            Err(e) => FfiResult::from_error(e.into()),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in emarsys_field_id"))
}

/// Resolve a choice label of `field`. `data_json` holds the numeric id.
#[unsafe(no_mangle)]
pub extern "C" fn emarsys_choice_id(
    client: *const FfiEmarsysClient,
    field: *const c_char,
    choice: *const c_char,
) -> *mut FfiResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        let Some(field) = read_str(field) else {
            return FfiResult::null_arg("field");
        };
        let Some(choice) = read_str(choice) else {
            return FfiResult::null_arg("choice");
        };
        let client = unsafe { &*client };
        match client.inner.choice_id(field, choice) {
            Ok(id) => FfiResult::ok_json(Value::from(id)),
            Err(e) => FfiResult::from_error(e.into()),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in emarsys_choice_id"))
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// Build a signed request.
///
/// `method` is `GET`, `POST`, `PUT` or `DELETE`; `path` is relative to the
/// base URL; `body_json` may be null for an empty object. With
/// `map_contacts` set, symbolic field names in the body (and in its
/// `contacts` batch) are resolved to ids first.
///
/// On success `*out` receives the request, which the caller must free with
/// `emarsys_free_request`. On failure `*out` is set to null and the result
/// carries the error kind and message. The result itself is always freed
/// with `emarsys_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn emarsys_build_request(
    client: *const FfiEmarsysClient,
    method: *const c_char,
    path: *const c_char,
    body_json: *const c_char,
    map_contacts: bool,
    out: *mut *mut FfiHttpRequest,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if out.is_null() {
            return FfiResult::null_arg("out");
        }
        unsafe { *out = std::ptr::null_mut() };
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if method.is_null() {
            return FfiResult::null_arg("method");
        }
        if path.is_null() {
            return FfiResult::null_arg("path");
        }
        let Some(method_name) = read_str(method) else {
            return FfiResult::invalid_arg("method", "not valid UTF-8");
        };
        let Some(method) = parse_method(method_name) else {
            return FfiResult::invalid_arg("method", format!("unsupported method {method_name:?}"));
        };
        let Some(path) = read_str(path) else {
            return FfiResult::invalid_arg("path", "not valid UTF-8");
        };
        let body = if body_json.is_null() {
            Body::new()
        } else {
            match read_object("body_json", body_json) {
                Ok(body) => body,
                Err(result) => return result,
            }
        };
        let client = unsafe { &*client };
        let body = if map_contacts {
            match client.inner.mapping().map_contact_body(&body) {
                Ok(body) => body,
                Err(e) => return FfiResult::from_error(e.into()),
            }
        } else {
            body
        };
        match client.inner.build_request(method, path, &body) {
            Ok(req) => {
                unsafe { *out = FfiHttpRequest::from_core(req) };
                FfiResult::ok_empty()
            }
            Err(e) => FfiResult::from_error(e.into()),
        }
    }))
    .unwrap_or_else(|_| FfiResult::panic("panic in emarsys_build_request"))
}

/// Decode a raw reply into an envelope.
///
/// On success `reply_code`, `reply_text` and `data_json` carry the envelope;
/// a non-zero `reply_code` is still a success.
#[unsafe(no_mangle)]
pub extern "C" fn emarsys_parse_response(
    client: *const FfiEmarsysClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        let body = if resp.body.is_null() || resp.body_len == 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(resp.body, resp.body_len) }.to_vec()
        };
        match client.inner.parse_response(&HttpResponse::new(resp.status, body)) {
            Ok(envelope) => FfiResult::ok_envelope(envelope),
            Err(e) => FfiResult::from_error(e),
        }
    })
    .unwrap_or_else(|_| FfiResult::panic("panic in emarsys_parse_response"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `emarsys_build_request`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn emarsys_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.url);
        free_c_string(req.body);
        if !req.headers.is_null() && req.headers_len > 0 {
            let headers = unsafe {
                Vec::from_raw_parts(req.headers, req.headers_len as usize, req.headers_len as usize)
            };
            for h in headers {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
    });
}

/// Free an `FfiResult` returned by any `emarsys_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn emarsys_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        free_c_string(result.reply_text);
        free_c_string(result.data_json);
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn emarsys_free_string(s: *mut c_char) {
    let _ = catch_unwind(|| free_c_string(s));
}

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
