//! Pure transformations: nothing here performs I/O.
//!
//! Percentage math, header folding, parameter parsing and binding, request
//! body encoding, and request templates.

mod binder;
mod content;
mod headers;
mod parameter;
mod percentage;
mod template;

pub use binder::{
    prepare_form_data, prepare_request_body, prepare_request_headers, set_path_parameters,
    set_query_parameters,
};
pub use content::{
    CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE, TransportBody, encode_request_body,
    is_json_content_type, is_textual_content_type, shall_convert_to_json,
};
pub use headers::{fold_headers, lowercase_header_names};
pub use parameter::{PathParameter, extract_path_parameters, parse_parameter, sanitize_path};
pub use percentage::calculate_percentage;
pub use template::RequestTemplate;
