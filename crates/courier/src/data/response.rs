use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use super::options::RequestOptions;

/// Client-synthesized status codes. Real HTTP statuses are never negative.
pub mod status {
    /// No transport could be created in this environment.
    pub const NOT_SUPPORTED: i32 = -1;
    /// The transport failed before a status line was received.
    pub const ERROR: i32 = -2;
    pub const TIMED_OUT: i32 = -3;
    pub const ABORTED: i32 = -4;
}

/// Value of a response header: a scalar until the name is seen again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// Add another occurrence, promoting a scalar to a list.
    pub fn push(&mut self, value: String) {
        match self {
            Self::Single(first) => {
                let first = std::mem::take(first);
                *self = Self::Multiple(vec![first, value]);
            }
            Self::Multiple(values) => values.push(value),
        }
    }

    /// The scalar value, or `None` when the header was repeated.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multiple(_) => None,
        }
    }

    /// All values in arrival order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Parsed response headers keyed by the name as received.
pub type ResponseHeaders = BTreeMap<String, HeaderValue>;

/// Outcome of one exchange.
///
/// `status` carries the transport's HTTP status on success, or one of the
/// negative [`status`] codes for failures the client synthesized itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    pub status: i32,
    pub message: Option<String>,
    pub headers: Option<ResponseHeaders>,
    pub raw_data: Option<Bytes>,
    pub text_data: Option<String>,
    pub json_data: Option<Value>,
    pub request_options: Option<Arc<RequestOptions>>,
}

impl HttpResponse {
    /// A response the client produced without a server reply.
    pub fn failure(status: i32, message: impl Into<String>, options: Option<Arc<RequestOptions>>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            request_options: options,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the status is one of the client-synthesized codes.
    pub fn is_client_failure(&self) -> bool {
        self.status < 0
    }

    /// Header lookup ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers
            .as_ref()?
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }
}
