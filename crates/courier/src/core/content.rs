//! Request body encoding and response content classification.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::Value;

use crate::data::{FormData, RequestBody};

pub const CONTENT_TYPE_HEADER: &str = "content-type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Body in the form handed to a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportBody {
    Text(String),
    Bytes(Bytes),
    Form(FormData),
    UrlEncoded(Vec<(String, String)>),
}

impl TransportBody {
    /// Length in bytes when known without encoding the body.
    pub fn known_length(&self) -> Option<u64> {
        match self {
            Self::Text(text) => Some(text.len() as u64),
            Self::Bytes(bytes) => Some(bytes.len() as u64),
            Self::Form(_) | Self::UrlEncoded(_) => None,
        }
    }
}

/// Whether `body` is a plain structured value that should become JSON.
pub fn shall_convert_to_json(body: &RequestBody) -> bool {
    matches!(body, RequestBody::Json(Value::Object(_) | Value::Array(_)))
}

/// Whether a content type names a JSON media type, ignoring case.
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type.to_ascii_uppercase().contains("JSON")
}

/// Whether a content type names textual content, JSON included.
pub fn is_textual_content_type(content_type: &str) -> bool {
    let upper = content_type.to_ascii_uppercase();
    upper.contains("JSON") || upper.contains("TEXT")
}

/// Turn the caller's body into the transport body.
///
/// With automatic JSON encoding enabled, an object or array body is
/// serialized and `content-type` is set to `application/json` unless the
/// existing content type already names JSON. `headers` must be lower-cased.
pub fn encode_request_body(
    body: Option<RequestBody>,
    automatic_json: bool,
    headers: &mut BTreeMap<String, String>,
) -> serde_json::Result<Option<TransportBody>> {
    let Some(body) = body else {
        return Ok(None);
    };

    if automatic_json && shall_convert_to_json(&body) {
        let already_json = headers
            .get(CONTENT_TYPE_HEADER)
            .is_some_and(|content_type| is_json_content_type(content_type));

        if !already_json {
            headers.insert(CONTENT_TYPE_HEADER.to_string(), JSON_CONTENT_TYPE.to_string());
        }
    }

    let body = match body {
        RequestBody::Json(Value::Null) => return Ok(None),
        RequestBody::Json(Value::String(text)) => TransportBody::Text(text),
        RequestBody::Json(value) => TransportBody::Text(serde_json::to_string(&value)?),
        RequestBody::Text(text) => TransportBody::Text(text),
        RequestBody::Bytes(bytes) => TransportBody::Bytes(bytes),
        RequestBody::Form(form) => TransportBody::Form(form),
        RequestBody::UrlEncoded(pairs) => TransportBody::UrlEncoded(pairs),
    };

    Ok(Some(body))
}
