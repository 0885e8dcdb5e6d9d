use super::binder::{
    prepare_form_data, prepare_request_body, prepare_request_headers, set_path_parameters,
    set_query_parameters,
};
use crate::data::{DataBag, HttpMethod, RequestBody, RequestOptions};
use crate::error::BindingError;

/// Declarative description of an endpoint.
///
/// # Examples
///
/// ```
/// use courier::{DataBag, HttpMethod, RequestTemplate};
/// use serde_json::json;
///
/// let template = RequestTemplate::new(HttpMethod::Post, "/users/{id}/posts")
///     .query(["draft?"])
///     .headers(["x-api-key"])
///     .body(["title", "tags?"]);
///
/// let data = DataBag::try_from(json!({
///     "id": 7,
///     "x-api-key": "secret",
///     "title": "Hello",
/// }))
/// .unwrap();
///
/// let options = template.bind("https://api.example.com/", &data).unwrap();
/// assert_eq!(options.url, "https://api.example.com/users/7/posts");
/// assert_eq!(options.headers["x-api-key"], "secret");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestTemplate {
    pub method: HttpMethod,
    /// Path with `{name}` / `{name?}` tokens.
    pub path: String,
    pub query: Vec<String>,
    pub headers: Vec<String>,
    pub body: Vec<String>,
    pub form: Vec<String>,
}

impl RequestTemplate {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn query<I, S>(mut self, declarations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query = declarations.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn headers<I, S>(mut self, declarations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = declarations.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn body<I, S>(mut self, declarations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body = declarations.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn form<I, S>(mut self, declarations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.form = declarations.into_iter().map(Into::into).collect();
        self
    }

    /// Bind `data` against every declaration and assemble request options.
    ///
    /// Binding runs path, query, headers, body, form, and stops at the first
    /// failure. When form fields are declared the form becomes the body;
    /// otherwise declared body parameters are sent as a JSON object.
    pub fn bind(&self, base_url: &str, data: &DataBag) -> Result<RequestOptions, BindingError> {
        let path = set_path_parameters(&self.path, data)?;
        let path = set_query_parameters(&path, self.query.as_slice(), data)?;
        let headers = prepare_request_headers(self.headers.as_slice(), data)?;
        let body = prepare_request_body(self.body.as_slice(), data)?;
        let form = prepare_form_data(self.form.as_slice(), data)?;

        let body = match (form, body) {
            (Some(form), _) => Some(RequestBody::Form(form)),
            (None, Some(body)) => Some(RequestBody::from(body)),
            (None, None) => None,
        };

        let mut options = RequestOptions::new(join_url(base_url, &path))
            .method(self.method)
            .headers(headers);
        options.body = body;

        Ok(options)
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    if base_url.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return base_url.to_string();
    }

    match (base_url.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base_url, &path[1..]),
        (false, false) => format!("{base_url}/{path}"),
        _ => format!("{base_url}{path}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FormData, ParameterLocation};
    use serde_json::json;

    #[test]
    fn binds_json_body() {
        let template = RequestTemplate::new(HttpMethod::Put, "/items/{id}").body(["name", "price?"]);
        let data = DataBag::try_from(json!({ "id": 3, "name": "pen" })).unwrap();

        let options = template.bind("http://localhost:8080", &data).unwrap();

        assert_eq!(options.url, "http://localhost:8080/items/3");
        assert_eq!(options.method, HttpMethod::Put);
        assert_eq!(options.body, Some(RequestBody::Json(json!({ "name": "pen" }))));
    }

    #[test]
    fn form_wins_over_body() {
        let template = RequestTemplate::new(HttpMethod::Post, "/upload").form(["files[]"]);
        let mut inbound = FormData::new();
        inbound.append("files[0]", "a");

        let options = template.bind("", &DataBag::Form(inbound)).unwrap();

        assert_eq!(options.url, "/upload");
        assert!(matches!(options.body, Some(RequestBody::Form(ref form)) if form.len() == 1));
    }

    #[test]
    fn first_failure_is_reported() {
        let template = RequestTemplate::new(HttpMethod::Get, "/users/{id}").query(["q"]);
        let error = template.bind("", &DataBag::default()).unwrap_err();

        assert_eq!(error.location, ParameterLocation::Path);
    }

    #[test]
    fn url_joining() {
        assert_eq!(join_url("http://h/", "/a"), "http://h/a");
        assert_eq!(join_url("http://h", "a"), "http://h/a");
        assert_eq!(join_url("http://h", "/a?x=1"), "http://h/a?x=1");
        assert_eq!(join_url("http://h", ""), "http://h");
    }
}
