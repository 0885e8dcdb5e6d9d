use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use serde_json::{Map, Value};

use super::bag::FormData;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown HTTP method: {0}")]
pub struct ParseMethodError(pub String);

impl FromStr for HttpMethod {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(ParseMethodError(s.to_string())),
        }
    }
}

/// The body of a request as supplied by the caller.
///
/// Only [`RequestBody::Json`] holding an object or an array counts as a
/// "plain" structured value that is serialized to JSON automatically. Every
/// other variant is treated as pre-encoded and passed to the transport as is.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
    Bytes(Bytes),
    Form(FormData),
    UrlEncoded(Vec<(String, String)>),
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Map<String, Value>> for RequestBody {
    fn from(map: Map<String, Value>) -> Self {
        Self::Json(Value::Object(map))
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<FormData> for RequestBody {
    fn from(form: FormData) -> Self {
        Self::Form(form)
    }
}

/// Options describing a single request.
///
/// # Examples
///
/// ```
/// use courier::{HttpMethod, RequestOptions};
/// use std::time::Duration;
///
/// let options = RequestOptions::new("https://example.com/api/users")
///     .method(HttpMethod::Post)
///     .timeout(Duration::from_secs(5))
///     .header("Authorization", "Bearer token")
///     .json(serde_json::json!({ "name": "Ada" }));
///
/// assert_eq!(options.method, HttpMethod::Post);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub url: String,

    /// Default: `GET`.
    pub method: HttpMethod,

    /// Time the whole exchange may take. [`Duration::ZERO`] means no limit.
    ///
    /// Default: `Duration::ZERO`
    pub timeout: Duration,

    /// Header names are case-insensitive; the request engine lower-cases them.
    pub headers: BTreeMap<String, String>,

    pub body: Option<RequestBody>,

    /// Send credentials (cookies, authorization) on cross-site requests.
    ///
    /// Default: false
    pub allow_credentials_on_cross_site_requests: bool,

    /// Serialize a structured body as JSON and set `content-type` accordingly.
    ///
    /// Default: true
    pub automatic_json_request_body_parsing: bool,

    /// Parse a JSON response body into [`HttpResponse::json_data`](crate::HttpResponse::json_data).
    ///
    /// Default: true
    pub automatic_json_response_body_parsing: bool,

    /// Caller data carried alongside the request and echoed back in events
    /// and responses.
    pub additional_data: Option<Map<String, Value>>,

    /// Caller tags carried alongside the request.
    pub request_tags: Vec<String>,
}

impl RequestOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            timeout: Duration::ZERO,
            headers: BTreeMap::new(),
            body: None,
            allow_credentials_on_cross_site_requests: false,
            automatic_json_request_body_parsing: true,
            automatic_json_response_body_parsing: true,
            additional_data: None,
            request_tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a single header, replacing an earlier value under the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replace all headers.
    #[must_use]
    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn json(self, value: Value) -> Self {
        self.body(RequestBody::Json(value))
    }

    #[must_use]
    pub fn allow_credentials_on_cross_site_requests(mut self, allow: bool) -> Self {
        self.allow_credentials_on_cross_site_requests = allow;
        self
    }

    #[must_use]
    pub fn automatic_json_request_body_parsing(mut self, enabled: bool) -> Self {
        self.automatic_json_request_body_parsing = enabled;
        self
    }

    #[must_use]
    pub fn automatic_json_response_body_parsing(mut self, enabled: bool) -> Self {
        self.automatic_json_response_body_parsing = enabled;
        self
    }

    #[must_use]
    pub fn additional_data(mut self, data: Map<String, Value>) -> Self {
        self.additional_data = Some(data);
        self
    }

    #[must_use]
    pub fn request_tag(mut self, tag: impl Into<String>) -> Self {
        self.request_tags.push(tag.into());
        self
    }

    /// Whether [`timeout`](Self::timeout) bounds the exchange.
    pub fn has_timeout(&self) -> bool {
        !self.timeout.is_zero()
    }
}

impl From<&str> for RequestOptions {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for RequestOptions {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

impl From<&String> for RequestOptions {
    fn from(url: &String) -> Self {
        Self::new(url.as_str())
    }
}
