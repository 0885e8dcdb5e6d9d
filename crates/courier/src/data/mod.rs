//! Immutable data types shared by the binder and the request engine.
//!
//! Options, responses, data bags, events and the small state enums live
//! here. Nothing in this module performs I/O.

pub mod bag;
pub mod event;
pub mod options;
pub mod parameter;
pub mod progress;
pub mod response;
pub mod state;

pub use bag::{Blob, DataBag, DataValue, FormData, FormValue};
pub use event::{HttpEvent, HttpEventArgs};
pub use options::{HttpMethod, ParseMethodError, RequestBody, RequestOptions};
pub use parameter::{ParameterInfo, ParameterLocation};
pub use progress::ProgressState;
pub use response::{HeaderValue, HttpResponse, ResponseHeaders, status};
pub use state::{ExchangeState, RequestState};
