//! Loosely-typed data bags and uniform access to them.
//!
//! A [`DataBag`] is either a plain key-value mapping or a multipart form
//! parameter set. Both expose the same get/set/keys operations; the form
//! variant resolves names that map to several values through the `single`
//! flag of [`DataBag::get_value`].

use bytes::Bytes;
use serde_json::{Map, Value};

/// Binary part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl Blob {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            file_name: None,
            content_type: None,
        }
    }

    #[must_use]
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// One value of a multipart form entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    Blob(Blob),
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Blob(_) => None,
        }
    }

    /// Converts a JSON value the way a form field coerces it: strings are
    /// kept, everything else is stored as its JSON text.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<&str> for FormValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FormValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Blob> for FormValue {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

/// Ordered multipart form parameter set. A name may appear several times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value under `name`, keeping existing values.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<FormValue>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replace every value under `name` with `value`.
    ///
    /// The new value takes the position of the first existing entry, or is
    /// appended when the name is new.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FormValue>) {
        let name = name.into();
        let value = value.into();

        match self.entries.iter().position(|(key, _)| *key == name) {
            Some(first) => {
                self.entries[first].1 = value;
                let mut index = 0;
                self.entries.retain(|(key, _)| {
                    let keep = index <= first || *key != name;
                    index += 1;
                    keep
                });
            }
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn get_all(&self, name: &str) -> Vec<&FormValue> {
        self.entries
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value)
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Distinct names in first-seen order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (key, _) in &self.entries {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<FormValue>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = FormData::new();
        for (key, value) in iter {
            form.append(key, value);
        }
        form
    }
}

impl IntoIterator for FormData {
    type Item = (String, FormValue);
    type IntoIter = std::vec::IntoIter<(String, FormValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A value looked up from a [`DataBag`].
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Json(Value),
    Field(FormValue),
    Fields(Vec<FormValue>),
}

impl DataValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Json(Value::Null))
    }

    /// The value as a string, if it holds exactly a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Json(Value::String(text)) => Some(text),
            Self::Field(FormValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Renders the value as text for a path segment or query value.
    ///
    /// Returns `None` for null and binary values.
    pub fn to_scalar_string(&self) -> Option<String> {
        match self {
            Self::Json(value) => json_scalar_string(value),
            Self::Field(value) => value.as_text().map(str::to_string),
            Self::Fields(values) => {
                let texts: Vec<&str> = values.iter().filter_map(FormValue::as_text).collect();
                (!texts.is_empty()).then(|| texts.join(","))
            }
        }
    }

    /// Converts into a JSON value. Binary form values have no JSON form and
    /// yield `None`.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(Value::Null) => None,
            Self::Json(value) => Some(value),
            Self::Field(FormValue::Text(text)) => Some(Value::String(text)),
            Self::Field(FormValue::Blob(_)) => None,
            Self::Fields(values) => {
                let texts: Vec<Value> = values
                    .into_iter()
                    .filter_map(|value| match value {
                        FormValue::Text(text) => Some(Value::String(text)),
                        FormValue::Blob(_) => None,
                    })
                    .collect();
                (!texts.is_empty()).then_some(Value::Array(texts))
            }
        }
    }

    /// Splits into the individual values a form field receives: a JSON
    /// array contributes one value per element.
    pub fn into_form_values(self) -> Vec<FormValue> {
        match self {
            Self::Json(Value::Null) => Vec::new(),
            Self::Json(Value::Array(items)) => items.into_iter().map(FormValue::from_json).collect(),
            Self::Json(value) => vec![FormValue::from_json(value)],
            Self::Field(value) => vec![value],
            Self::Fields(values) => values,
        }
    }
}

fn json_scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| json_scalar_string(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Either payload representation a caller may bind parameters from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataBag {
    Map(Map<String, Value>),
    Form(FormData),
}

impl Default for DataBag {
    fn default() -> Self {
        Self::Map(Map::new())
    }
}

impl From<Map<String, Value>> for DataBag {
    fn from(map: Map<String, Value>) -> Self {
        Self::Map(map)
    }
}

impl From<FormData> for DataBag {
    fn from(form: FormData) -> Self {
        Self::Form(form)
    }
}

impl TryFrom<Value> for DataBag {
    type Error = Value;

    /// Only JSON objects are bags; any other value is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self::Map(map)),
            other => Err(other),
        }
    }
}

impl DataBag {
    /// Looks up `name`.
    ///
    /// For a form bag every value stored under `name` is considered: none
    /// yields `None`; one value, or `single == true`, yields the first as
    /// [`DataValue::Field`]; otherwise all of them as [`DataValue::Fields`].
    pub fn get_value(&self, name: &str, single: bool) -> Option<DataValue> {
        match self {
            Self::Map(map) => map.get(name).cloned().map(DataValue::Json),
            Self::Form(form) => {
                let mut values = form.get_all(name);
                match values.len() {
                    0 => None,
                    1 => Some(DataValue::Field(values.remove(0).clone())),
                    _ if single => Some(DataValue::Field(values.remove(0).clone())),
                    _ => Some(DataValue::Fields(values.into_iter().cloned().collect())),
                }
            }
        }
    }

    /// Stores `value` under `name`.
    ///
    /// A map bag always replaces. A form bag appends unless `overwrite` is
    /// set, in which case all previous values under `name` are dropped.
    pub fn set_value(&mut self, name: &str, value: DataValue, overwrite: bool) {
        match self {
            Self::Map(map) => {
                let json = match value {
                    DataValue::Json(json) => json,
                    other => other.into_json().unwrap_or(Value::Null),
                };
                map.insert(name.to_string(), json);
            }
            Self::Form(form) => {
                let mut values = value.into_form_values().into_iter();
                if overwrite {
                    match values.next() {
                        Some(first) => form.set(name, first),
                        None => {
                            form.entries.retain(|(key, _)| key != name);
                            return;
                        }
                    }
                }
                for value in values {
                    form.append(name, value);
                }
            }
        }
    }

    /// Distinct keys in insertion order (map keys follow `serde_json`'s map
    /// ordering).
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Map(map) => map.keys().map(String::as_str).collect(),
            Self::Form(form) => form.keys(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Map(map) => map.is_empty(),
            Self::Form(form) => form.is_empty(),
        }
    }
}
