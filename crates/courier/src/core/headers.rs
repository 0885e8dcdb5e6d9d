use std::collections::BTreeMap;

use crate::data::{HeaderValue, ResponseHeaders};

/// Fold a raw `Name: value` header block into a mapping.
///
/// Lines without a colon are skipped. Names keep the case they arrived in;
/// values are trimmed. A name seen more than once maps to all its values in
/// arrival order.
///
/// # Examples
///
/// ```
/// use courier::core::fold_headers;
/// use courier::HeaderValue;
///
/// let headers = fold_headers("Set-Cookie: a=1\r\nSet-Cookie: b=2\r\nVary: Accept\r\n");
///
/// assert_eq!(headers["Vary"], HeaderValue::Single("Accept".into()));
/// assert_eq!(headers["Set-Cookie"].values(), vec!["a=1", "b=2"]);
/// ```
pub fn fold_headers(raw: &str) -> ResponseHeaders {
    let mut headers = ResponseHeaders::new();

    for line in raw.trim().split(['\r', '\n']).filter(|line| !line.is_empty()) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();

        match headers.get_mut(name) {
            Some(existing) => existing.push(value),
            None => {
                headers.insert(name.to_string(), HeaderValue::Single(value));
            }
        }
    }

    headers
}

/// Lower-case every header name. When two names collide after folding, the
/// one that is last in byte order wins. Upper-case ASCII sorts first, so
/// `content-type` beats `Content-Type`.
pub fn lowercase_header_names(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .collect()
}
