//! Declarative parameter binding.
//!
//! Each function takes parameter declarations (see
//! [`parse_parameter`](super::parse_parameter)) and a [`DataBag`], and
//! produces one part of a request. A mandatory parameter that cannot be
//! satisfied fails with a [`BindingError`] naming the parameter and where it
//! was expected.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::parameter::{extract_path_parameters, parse_parameter, sanitize_path};
use crate::data::{DataBag, DataValue, FormData, ParameterInfo, ParameterLocation};
use crate::error::BindingError;

/// Replace every `{name}` / `{name?}` token in `template` with its value
/// from `data`, then sanitize the path.
///
/// A missing optional value becomes the empty string; the sanitize step
/// folds the slashes it leaves behind.
///
/// # Examples
///
/// ```
/// use courier::core::set_path_parameters;
/// use courier::DataBag;
/// use serde_json::json;
///
/// let data = DataBag::try_from(json!({ "id": 7 })).unwrap();
/// let path = set_path_parameters("/users/{id}/posts/{postId?}", &data).unwrap();
///
/// assert_eq!(path, "/users/7/posts");
/// ```
pub fn set_path_parameters(template: &str, data: &DataBag) -> Result<String, BindingError> {
    let parameters = extract_path_parameters(template);

    if parameters.is_empty() {
        return Ok(template.to_string());
    }

    let mut path = template.to_string();

    for parameter in parameters {
        let value = scalar(&parameter.info, data);

        if value.is_none() && parameter.info.is_mandatory {
            return Err(BindingError::missing(parameter.info.name, ParameterLocation::Path));
        }

        // Substitutes the first occurrence in the partially bound path, so a
        // value that spells a later token is bound again by that token.
        path = path.replacen(&parameter.token, value.as_deref().unwrap_or_default(), 1);
    }

    Ok(sanitize_path(&path))
}

/// Append each declared query parameter present in `data` to `path`.
///
/// Values are percent-encoded. The first parameter starts the query with
/// `?` unless `path` already has one, in which case `&` is used.
pub fn set_query_parameters<S: AsRef<str>>(
    path: &str,
    declarations: &[S],
    data: &DataBag,
) -> Result<String, BindingError> {
    let mut path = path.to_string();
    let mut has_query = path.contains('?');

    for declaration in declarations {
        let info = parse_parameter(declaration.as_ref());

        let Some(value) = scalar(&info, data) else {
            if info.is_mandatory {
                return Err(BindingError::missing(info.name, ParameterLocation::Query));
            }
            continue;
        };

        path.push(if has_query { '&' } else { '?' });
        path.push_str(&info.name);
        path.push('=');
        path.push_str(&urlencoding::encode(&value));
        has_query = true;
    }

    Ok(path)
}

/// Collect declared headers from `data`. Only string values satisfy a
/// header; names are stored lower-cased.
pub fn prepare_request_headers<S: AsRef<str>>(
    declarations: &[S],
    data: &DataBag,
) -> Result<BTreeMap<String, String>, BindingError> {
    let mut headers = BTreeMap::new();

    for declaration in declarations {
        let info = parse_parameter(declaration.as_ref());
        let value = data
            .get_value(&info.name, true)
            .and_then(|value| value.as_str().map(str::to_string));

        let Some(value) = value else {
            if info.is_mandatory {
                return Err(BindingError::missing(info.name, ParameterLocation::Header));
            }
            continue;
        };

        headers.insert(info.name.to_ascii_lowercase(), value);
    }

    Ok(headers)
}

/// Collect declared body parameters from `data` into a JSON object.
///
/// Returns `None` when nothing is declared. Any non-null value is accepted.
pub fn prepare_request_body<S: AsRef<str>>(
    declarations: &[S],
    data: &DataBag,
) -> Result<Option<Map<String, Value>>, BindingError> {
    if declarations.is_empty() {
        return Ok(None);
    }

    let mut body = Map::new();

    for declaration in declarations {
        let info = parse_parameter(declaration.as_ref());
        let value = data.get_value(&info.name, true).and_then(DataValue::into_json);

        let Some(value) = value else {
            if info.is_mandatory {
                return Err(BindingError::missing(info.name, ParameterLocation::Body));
            }
            continue;
        };

        body.insert(info.name, value);
    }

    Ok(Some(body))
}

/// Build a multipart form from declared fields.
///
/// Scalar fields take every value stored under their name. Array fields
/// (`name[]`) take every key of a multipart `data` that starts with `name`,
/// such as `name[0]`, `name[1]`, and copy their values under the same keys.
/// A map bag never satisfies an array field. Returns
/// `None` when nothing is declared.
pub fn prepare_form_data<S: AsRef<str>>(
    declarations: &[S],
    data: &DataBag,
) -> Result<Option<FormData>, BindingError> {
    if declarations.is_empty() {
        return Ok(None);
    }

    let mut form = FormData::new();
    let mut array_fields: Vec<ParameterInfo> = Vec::new();

    for declaration in declarations {
        let info = parse_parameter(declaration.as_ref());

        if info.is_array {
            array_fields.push(info);
            continue;
        }

        let value = data.get_value(&info.name, false).filter(|value| !value.is_null());

        let Some(value) = value else {
            if info.is_mandatory {
                return Err(BindingError::missing(info.name, ParameterLocation::Form));
            }
            continue;
        };

        for element in value.into_form_values() {
            form.append(info.name.as_str(), element);
        }
    }

    for info in array_fields {
        let keys = array_entry_keys(&info.name, data);

        if keys.is_empty() && info.is_mandatory {
            return Err(BindingError::missing(info.name, ParameterLocation::Form));
        }

        for key in keys {
            if let Some(value) = data.get_value(key, false) {
                for element in value.into_form_values() {
                    form.append(key, element);
                }
            }
        }
    }

    Ok(Some(form))
}

/// Keys of a multipart bag that start with the array field `name`. A map
/// bag has no indexed keys to forward.
fn array_entry_keys<'a>(name: &str, data: &'a DataBag) -> Vec<&'a str> {
    match data {
        DataBag::Map(_) => Vec::new(),
        DataBag::Form(form) => form.keys().into_iter().filter(|key| key.starts_with(name)).collect(),
    }
}

/// Scalar lookup shared by path and query binding. Null, binary and empty
/// values count as absent.
fn scalar(info: &ParameterInfo, data: &DataBag) -> Option<String> {
    data.get_value(&info.name, true)
        .and_then(|value| value.to_scalar_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Blob, FormValue};
    use serde_json::json;

    fn bag(value: Value) -> DataBag {
        DataBag::try_from(value).unwrap()
    }

    #[test]
    fn path_substitution_drops_empty_optional() {
        let path = set_path_parameters("/users/{id}/posts/{postId?}", &bag(json!({ "id": 7 }))).unwrap();
        assert_eq!(path, "/users/7/posts");
    }

    #[test]
    fn path_substitution_fills_all_tokens() {
        let data = bag(json!({ "id": "u1", "postId": 42 }));
        let path = set_path_parameters("/users/{id}/posts/{postId?}/", &data).unwrap();
        assert_eq!(path, "/users/u1/posts/42");
    }

    #[test]
    fn path_missing_mandatory_fails() {
        let error = set_path_parameters("/users/{id}/posts/{postId?}", &DataBag::default()).unwrap_err();

        assert_eq!(error.parameter, "id");
        assert_eq!(error.location, ParameterLocation::Path);
        assert_eq!(error.status, 400);
    }

    #[test]
    fn path_duplicate_tokens_each_replaced() {
        let path = set_path_parameters("/{a}/x/{a}", &bag(json!({ "a": "v" }))).unwrap();
        assert_eq!(path, "/v/x/v");
    }

    #[test]
    fn path_value_spelling_a_later_token_is_rebound() {
        let data = bag(json!({ "a": "{b}", "b": "v" }));
        assert_eq!(set_path_parameters("/{a}/{b}", &data).unwrap(), "/v/{b}");
    }

    #[test]
    fn path_without_tokens_is_untouched() {
        assert_eq!(set_path_parameters("/plain//path/", &DataBag::default()).unwrap(), "/plain//path/");
    }

    #[test]
    fn query_appends_present_values() {
        let path = set_query_parameters("/search", &["q", "page?"], &bag(json!({ "q": "cats" }))).unwrap();
        assert_eq!(path, "/search?q=cats");
    }

    #[test]
    fn query_percent_encodes_and_joins() {
        let data = bag(json!({ "q": "cats & dogs/=?", "page": 2 }));
        let path = set_query_parameters("/search?lang=en", &["q", "page?"], &data).unwrap();
        assert_eq!(path, "/search?lang=en&q=cats%20%26%20dogs%2F%3D%3F&page=2");
    }

    #[test]
    fn query_missing_mandatory_fails() {
        let error = set_query_parameters("/search", &["q"], &DataBag::default()).unwrap_err();
        assert_eq!(error.location, ParameterLocation::Query);
        assert_eq!(error.parameter, "q");
    }

    #[test]
    fn header_requires_string_value() {
        let error = prepare_request_headers(&["x-api-key"], &bag(json!({ "x-api-key": 12 }))).unwrap_err();
        assert_eq!(error.location, ParameterLocation::Header);

        let error = prepare_request_headers(&["x-api-key"], &DataBag::default()).unwrap_err();
        assert_eq!(error.parameter, "x-api-key");
    }

    #[test]
    fn optional_header_missing_yields_empty_map() {
        let headers = prepare_request_headers(&["x-api-key?"], &DataBag::default()).unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn header_names_are_lowercased() {
        let headers = prepare_request_headers(&["X-Api-Key"], &bag(json!({ "X-Api-Key": "secret" }))).unwrap();
        assert_eq!(headers.get("x-api-key").map(String::as_str), Some("secret"));
    }

    #[test]
    fn body_collects_any_non_null_value() {
        let data = bag(json!({ "name": "Ada", "tags": ["a"], "nothing": null }));
        let body = prepare_request_body(&["name", "tags", "nothing?", "absent?"], &data)
            .unwrap()
            .unwrap();

        assert_eq!(Value::Object(body), json!({ "name": "Ada", "tags": ["a"] }));
    }

    #[test]
    fn body_missing_mandatory_fails() {
        let data = bag(json!({ "nothing": null }));
        let error = prepare_request_body(&["nothing"], &data).unwrap_err();
        assert_eq!(error.location, ParameterLocation::Body);
    }

    #[test]
    fn body_without_declarations_is_none() {
        let declarations: [&str; 0] = [];
        assert_eq!(prepare_request_body(&declarations, &DataBag::default()).unwrap(), None);
    }

    #[test]
    fn form_scalar_field_appends_each_value() {
        let inbound: FormData = [("file", "x"), ("file", "y"), ("note", "n")].into_iter().collect();
        let form = prepare_form_data(&["file", "note?", "other?"], &DataBag::Form(inbound))
            .unwrap()
            .unwrap();

        let entries: Vec<_> = form.entries().map(|(k, v)| (k, v.as_text().unwrap())).collect();
        assert_eq!(entries, vec![("file", "x"), ("file", "y"), ("note", "n")]);
    }

    #[test]
    fn form_scalar_field_from_map_splits_arrays() {
        let form = prepare_form_data(&["ids"], &bag(json!({ "ids": [1, 2] }))).unwrap().unwrap();
        assert_eq!(form.get_all("ids"), vec![&FormValue::from("1"), &FormValue::from("2")]);
    }

    #[test]
    fn form_array_field_forwards_indexed_keys() {
        let mut inbound = FormData::new();
        inbound.append("tags[0]", "a");
        inbound.append("tags[1]", "b");
        inbound.append("tagsExtra", "nope");
        inbound.append("avatar", Blob::new(vec![1u8, 2, 3]).file_name("a.png"));

        let form = prepare_form_data(&["tags[]", "avatar"], &DataBag::Form(inbound))
            .unwrap()
            .unwrap();

        let keys: Vec<_> = form.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["avatar", "tags[0]", "tags[1]", "tagsExtra"]);
        assert_eq!(form.get("tags[0]"), Some(&FormValue::from("a")));
        assert_eq!(form.get("tags[1]"), Some(&FormValue::from("b")));
    }

    #[test]
    fn form_mandatory_array_without_keys_fails() {
        let inbound: FormData = [("other", "x")].into_iter().collect();
        let error = prepare_form_data(&["tags[]"], &DataBag::Form(inbound)).unwrap_err();

        assert_eq!(error.parameter, "tags");
        assert_eq!(error.location, ParameterLocation::Form);
    }

    #[test]
    fn form_array_field_matches_any_key_with_prefix() {
        let inbound: FormData = [("tagsExtra", "x")].into_iter().collect();
        let form = prepare_form_data(&["tags[]"], &DataBag::Form(inbound)).unwrap().unwrap();

        assert_eq!(form.get("tagsExtra"), Some(&FormValue::from("x")));
    }

    #[test]
    fn form_array_field_ignores_map_bags() {
        let data = bag(json!({ "tags": ["a", "b"], "tags[0]": "a" }));
        let error = prepare_form_data(&["tags[]"], &data).unwrap_err();

        assert_eq!(error.parameter, "tags");
        assert_eq!(error.location, ParameterLocation::Form);

        let form = prepare_form_data(&["tags[]?"], &data).unwrap().unwrap();
        assert!(form.is_empty());
    }

    #[test]
    fn form_optional_array_without_keys_is_empty() {
        let form = prepare_form_data(&["tags[]?"], &DataBag::Form(FormData::new())).unwrap().unwrap();
        assert!(form.is_empty());
    }

    #[test]
    fn form_missing_mandatory_scalar_fails() {
        let error = prepare_form_data(&["name"], &DataBag::default()).unwrap_err();
        assert_eq!(error.location, ParameterLocation::Form);
    }
}
