use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a bound parameter ends up in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Body,
    Form,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "PATH",
            Self::Query => "QUERY",
            Self::Header => "HEADER",
            Self::Body => "BODY",
            Self::Form => "FORM",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed parameter declaration such as `id`, `page?` or `tags[]?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    /// Name without the `?` and `[]` suffixes.
    pub name: String,
    pub is_mandatory: bool,
    pub is_array: bool,
}
