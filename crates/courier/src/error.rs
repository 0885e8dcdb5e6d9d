//! Error types for courier.

use serde_json::json;
use thiserror::Error;

use crate::data::{HttpResponse, ParameterLocation, status};

/// Status carried by every binding failure.
pub const BINDING_ERROR_STATUS: u16 = 400;

/// A declared parameter was missing or had the wrong type.
///
/// Raised synchronously while a request is being assembled, before any
/// network I/O.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BindingError {
    pub status: u16,
    pub message: String,
    pub parameter: String,
    pub location: ParameterLocation,
}

impl BindingError {
    pub fn missing(parameter: impl Into<String>, location: ParameterLocation) -> Self {
        let parameter = parameter.into();
        let message = match location {
            ParameterLocation::Path => format!("Mandatory path parameter '{parameter}' not provided."),
            ParameterLocation::Query => format!("Mandatory query parameter '{parameter}' not provided."),
            ParameterLocation::Header => format!("Mandatory header '{parameter}' not provided."),
            ParameterLocation::Body => format!("Mandatory body parameter '{parameter}' not provided."),
            ParameterLocation::Form => format!("Mandatory field '{parameter}' not provided."),
        };

        Self {
            status: BINDING_ERROR_STATUS,
            message,
            parameter,
            location,
        }
    }

    /// Project into the response shape so callers can treat it like any
    /// other outcome.
    pub fn to_response(&self) -> HttpResponse {
        HttpResponse {
            status: i32::from(self.status),
            message: Some(self.message.clone()),
            json_data: Some(json!({
                "parameter": self.parameter,
                "location": self.location,
            })),
            ..HttpResponse::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("request has already been sent; a request can only be sent once")]
    AlreadySent,

    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// Project into the response shape. Binding errors keep their own
    /// status, an unsupported environment maps to
    /// [`status::NOT_SUPPORTED`], everything else to 500.
    pub fn to_response(&self) -> HttpResponse {
        match self {
            Self::Binding(e) => e.to_response(),
            Self::UnsupportedEnvironment(_) => {
                HttpResponse::failure(status::NOT_SUPPORTED, self.to_string(), None)
            }
            _ => HttpResponse::failure(500, self.to_string(), None),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
