use once_cell::sync::Lazy;
use regex::Regex;

use crate::data::ParameterInfo;

static PATH_PARAMETER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+\??)\}").expect("path parameter pattern is valid"));

/// A `{token}` found in a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParameter {
    /// The token exactly as written, braces included, e.g. `{postId?}`.
    pub token: String,
    pub info: ParameterInfo,
}

/// Parse a declaration such as `name`, `name?`, `name[]` or `name[]?`.
///
/// A trailing `?` marks the parameter optional and is stripped first; a
/// trailing `[]` then marks it array-typed.
///
/// # Examples
///
/// ```
/// use courier::core::parse_parameter;
///
/// let info = parse_parameter("tags[]?");
/// assert_eq!(info.name, "tags");
/// assert!(info.is_array);
/// assert!(!info.is_mandatory);
/// ```
pub fn parse_parameter(declaration: &str) -> ParameterInfo {
    let (declaration, is_mandatory) = match declaration.strip_suffix('?') {
        Some(stripped) => (stripped, false),
        None => (declaration, true),
    };
    let (name, is_array) = match declaration.strip_suffix("[]") {
        Some(stripped) => (stripped, true),
        None => (declaration, false),
    };

    ParameterInfo {
        name: name.to_string(),
        is_mandatory,
        is_array,
    }
}

/// Every `{token}` in `template`, left to right, one entry per occurrence.
pub fn extract_path_parameters(template: &str) -> Vec<PathParameter> {
    PATH_PARAMETER
        .captures_iter(template)
        .map(|captures| PathParameter {
            token: captures[0].to_string(),
            info: parse_parameter(&captures[1]),
        })
        .collect()
}

/// Collapse repeated `/` and drop a single trailing `/`.
///
/// # Examples
///
/// ```
/// use courier::core::sanitize_path;
///
/// assert_eq!(sanitize_path("/a//b///c/"), "/a/b/c");
/// ```
pub fn sanitize_path(path: &str) -> String {
    let mut sanitized = String::with_capacity(path.len());
    let mut previous_was_slash = false;

    for c in path.chars() {
        if c == '/' && previous_was_slash {
            continue;
        }
        previous_was_slash = c == '/';
        sanitized.push(c);
    }

    if sanitized.ends_with('/') {
        sanitized.pop();
    }

    sanitized
}
